//! Filter documents.
//!
//! A filter document is a JSON object whose keys are predicate parameter
//! names:
//!
//! ```json
//! {
//!   "include_sensor_ids": ["rgb_center", "lidar"],
//!   "exclude_object_types": ["person"],
//!   "include_attributes": {"occluded": false, "colour": null},
//!   "start_time": "1631337747.123123123"
//! }
//! ```
//!
//! A `null` attribute value matches any value. Timestamps may be strings
//! or numbers; both keep their full decimal precision.

use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{AttributeMatch, FilterPredicate};
use crate::error::RaillabelError;
use crate::io::parse_timestamp;
use crate::model::{AnnotationId, AnnotationKind, AttributeValue, ObjectId, SensorType};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterSpec {
    include_frame_ids: Option<Vec<u64>>,
    exclude_frame_ids: Option<Vec<u64>>,
    include_annotation_ids: Option<Vec<Uuid>>,
    exclude_annotation_ids: Option<Vec<Uuid>>,
    include_annotation_types: Option<Vec<String>>,
    exclude_annotation_types: Option<Vec<String>>,
    include_sensor_ids: Option<Vec<String>>,
    exclude_sensor_ids: Option<Vec<String>>,
    include_sensor_types: Option<Vec<SensorType>>,
    exclude_sensor_types: Option<Vec<SensorType>>,
    include_object_ids: Option<Vec<Uuid>>,
    exclude_object_ids: Option<Vec<Uuid>>,
    include_object_types: Option<Vec<String>>,
    exclude_object_types: Option<Vec<String>>,
    include_attributes: Option<BTreeMap<String, Value>>,
    exclude_attributes: Option<BTreeMap<String, Value>>,
    start_time: Option<Box<RawValue>>,
    end_time: Option<Box<RawValue>>,
}

/// Parses a filter document into predicates.
///
/// Predicates come out in a fixed order (frame ids, annotation ids,
/// annotation types, sensor ids, sensor types, object ids, object types,
/// attributes, start time, end time) regardless of key order. Unknown
/// keys and malformed values are [`RaillabelError::Argument`].
pub fn parse_filter_spec(json: &[u8]) -> Result<Vec<FilterPredicate>, RaillabelError> {
    let spec: FilterSpec = serde_json::from_slice(json)
        .map_err(|e| RaillabelError::Argument(format!("invalid filter document: {e}")))?;

    let mut predicates = Vec::new();

    if let Some(ids) = spec.include_frame_ids {
        predicates.push(FilterPredicate::IncludeFrameIds(ids));
    }
    if let Some(ids) = spec.exclude_frame_ids {
        predicates.push(FilterPredicate::ExcludeFrameIds(ids));
    }
    if let Some(ids) = spec.include_annotation_ids {
        predicates.push(FilterPredicate::IncludeAnnotationIds(
            ids.into_iter().map(AnnotationId::new).collect(),
        ));
    }
    if let Some(ids) = spec.exclude_annotation_ids {
        predicates.push(FilterPredicate::ExcludeAnnotationIds(
            ids.into_iter().map(AnnotationId::new).collect(),
        ));
    }
    if let Some(kinds) = spec.include_annotation_types {
        predicates.push(FilterPredicate::IncludeAnnotationTypes(parse_kinds(&kinds)?));
    }
    if let Some(kinds) = spec.exclude_annotation_types {
        predicates.push(FilterPredicate::ExcludeAnnotationTypes(parse_kinds(&kinds)?));
    }
    if let Some(ids) = spec.include_sensor_ids {
        predicates.push(FilterPredicate::IncludeSensorIds(ids));
    }
    if let Some(ids) = spec.exclude_sensor_ids {
        predicates.push(FilterPredicate::ExcludeSensorIds(ids));
    }
    if let Some(types) = spec.include_sensor_types {
        predicates.push(FilterPredicate::IncludeSensorTypes(types));
    }
    if let Some(types) = spec.exclude_sensor_types {
        predicates.push(FilterPredicate::ExcludeSensorTypes(types));
    }
    if let Some(ids) = spec.include_object_ids {
        predicates.push(FilterPredicate::IncludeObjectIds(
            ids.into_iter().map(ObjectId::new).collect(),
        ));
    }
    if let Some(ids) = spec.exclude_object_ids {
        predicates.push(FilterPredicate::ExcludeObjectIds(
            ids.into_iter().map(ObjectId::new).collect(),
        ));
    }
    if let Some(types) = spec.include_object_types {
        predicates.push(FilterPredicate::IncludeObjectTypes(types));
    }
    if let Some(types) = spec.exclude_object_types {
        predicates.push(FilterPredicate::ExcludeObjectTypes(types));
    }
    if let Some(matches) = spec.include_attributes {
        predicates.push(FilterPredicate::IncludeAttributes(parse_attribute_matches(
            "include_attributes",
            matches,
        )?));
    }
    if let Some(matches) = spec.exclude_attributes {
        predicates.push(FilterPredicate::ExcludeAttributes(parse_attribute_matches(
            "exclude_attributes",
            matches,
        )?));
    }
    if let Some(raw) = spec.start_time {
        let ts = parse_timestamp(&raw)
            .map_err(|e| RaillabelError::Argument(format!("start_time: {e}")))?;
        predicates.push(FilterPredicate::StartTime(ts));
    }
    if let Some(raw) = spec.end_time {
        let ts = parse_timestamp(&raw)
            .map_err(|e| RaillabelError::Argument(format!("end_time: {e}")))?;
        predicates.push(FilterPredicate::EndTime(ts));
    }

    Ok(predicates)
}

fn parse_kinds(kinds: &[String]) -> Result<Vec<AnnotationKind>, RaillabelError> {
    kinds
        .iter()
        .map(|kind| kind.parse::<AnnotationKind>().map_err(RaillabelError::Argument))
        .collect()
}

fn parse_attribute_matches(
    parameter: &str,
    matches: BTreeMap<String, Value>,
) -> Result<BTreeMap<String, AttributeMatch>, RaillabelError> {
    matches
        .into_iter()
        .map(|(name, value)| {
            let expected = match value {
                Value::Null => AttributeMatch::Any,
                value => AttributeValue::from_json(&value)
                    .map(AttributeMatch::Value)
                    .ok_or_else(|| {
                        RaillabelError::Argument(format!(
                            "{parameter}.{name}: unsupported attribute value {value}"
                        ))
                    })?,
            };
            Ok((name, expected))
        })
        .collect()
}
