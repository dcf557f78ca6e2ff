//! Scene filtering.
//!
//! [`filter`] produces a pruned copy of a scene. Predicates are applied in
//! three passes:
//! - frame predicates drop whole frames
//! - sensor predicates drop frame sensor references and sensor-bound samples
//! - annotation predicates drop individual annotations
//!
//! Afterwards every sensor and object that is no longer referenced by a
//! surviving frame is removed, so the result keeps all referential
//! invariants of the input.
//!
//! The built-in predicates are listed by [`FilterPredicate`]. Custom
//! predicates implement [`FramePredicate`], [`AnnotationPredicate`] or
//! [`SensorPredicate`] and are added to a [`FilterPipeline`] directly.

mod predicates;
mod spec;

pub use predicates::{
    AnnotationIdFilter, AnnotationPredicate, AnnotationTypeFilter, AttributeFilter, AttributeMatch,
    EndTimeFilter, FrameIdFilter, FramePredicate, Mode, ObjectIdFilter, ObjectTypeFilter,
    SensorIdFilter, SensorPredicate, SensorTypeFilter, StartTimeFilter,
};
pub use spec::parse_filter_spec;

use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::RaillabelError;
use crate::model::{AnnotationId, AnnotationKind, Frame, ObjectId, Scene, SensorType, Timestamp};
use crate::warnings::{WarningCode, WarningContext, Warnings};

/// A built-in filter predicate.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterPredicate {
    IncludeFrameIds(Vec<u64>),
    ExcludeFrameIds(Vec<u64>),
    IncludeAnnotationIds(Vec<AnnotationId>),
    ExcludeAnnotationIds(Vec<AnnotationId>),
    IncludeAnnotationTypes(Vec<AnnotationKind>),
    ExcludeAnnotationTypes(Vec<AnnotationKind>),
    IncludeSensorIds(Vec<String>),
    ExcludeSensorIds(Vec<String>),
    IncludeSensorTypes(Vec<SensorType>),
    ExcludeSensorTypes(Vec<SensorType>),
    IncludeObjectIds(Vec<ObjectId>),
    ExcludeObjectIds(Vec<ObjectId>),
    IncludeObjectTypes(Vec<String>),
    ExcludeObjectTypes(Vec<String>),
    IncludeAttributes(BTreeMap<String, AttributeMatch>),
    ExcludeAttributes(BTreeMap<String, AttributeMatch>),
    /// Keeps frames at or after this instant.
    StartTime(Timestamp),
    /// Keeps frames at or before this instant.
    EndTime(Timestamp),
}

/// The property a predicate looks at. Include and exclude predicates on
/// the same dimension cannot be combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Dimension {
    FrameId,
    AnnotationId,
    AnnotationType,
    SensorId,
    SensorType,
    ObjectId,
    ObjectType,
    Attributes,
    StartTime,
    EndTime,
}

impl FilterPredicate {
    /// The snake-case parameter name used in filter documents.
    pub fn parameter(&self) -> &'static str {
        match self {
            FilterPredicate::IncludeFrameIds(_) => "include_frame_ids",
            FilterPredicate::ExcludeFrameIds(_) => "exclude_frame_ids",
            FilterPredicate::IncludeAnnotationIds(_) => "include_annotation_ids",
            FilterPredicate::ExcludeAnnotationIds(_) => "exclude_annotation_ids",
            FilterPredicate::IncludeAnnotationTypes(_) => "include_annotation_types",
            FilterPredicate::ExcludeAnnotationTypes(_) => "exclude_annotation_types",
            FilterPredicate::IncludeSensorIds(_) => "include_sensor_ids",
            FilterPredicate::ExcludeSensorIds(_) => "exclude_sensor_ids",
            FilterPredicate::IncludeSensorTypes(_) => "include_sensor_types",
            FilterPredicate::ExcludeSensorTypes(_) => "exclude_sensor_types",
            FilterPredicate::IncludeObjectIds(_) => "include_object_ids",
            FilterPredicate::ExcludeObjectIds(_) => "exclude_object_ids",
            FilterPredicate::IncludeObjectTypes(_) => "include_object_types",
            FilterPredicate::ExcludeObjectTypes(_) => "exclude_object_types",
            FilterPredicate::IncludeAttributes(_) => "include_attributes",
            FilterPredicate::ExcludeAttributes(_) => "exclude_attributes",
            FilterPredicate::StartTime(_) => "start_time",
            FilterPredicate::EndTime(_) => "end_time",
        }
    }

    /// Include or exclude; `None` for the temporal bounds.
    pub fn mode(&self) -> Option<Mode> {
        match self {
            FilterPredicate::IncludeFrameIds(_)
            | FilterPredicate::IncludeAnnotationIds(_)
            | FilterPredicate::IncludeAnnotationTypes(_)
            | FilterPredicate::IncludeSensorIds(_)
            | FilterPredicate::IncludeSensorTypes(_)
            | FilterPredicate::IncludeObjectIds(_)
            | FilterPredicate::IncludeObjectTypes(_)
            | FilterPredicate::IncludeAttributes(_) => Some(Mode::Include),
            FilterPredicate::StartTime(_) | FilterPredicate::EndTime(_) => None,
            _ => Some(Mode::Exclude),
        }
    }

    fn dimension(&self) -> Dimension {
        match self {
            FilterPredicate::IncludeFrameIds(_) | FilterPredicate::ExcludeFrameIds(_) => {
                Dimension::FrameId
            }
            FilterPredicate::IncludeAnnotationIds(_) | FilterPredicate::ExcludeAnnotationIds(_) => {
                Dimension::AnnotationId
            }
            FilterPredicate::IncludeAnnotationTypes(_)
            | FilterPredicate::ExcludeAnnotationTypes(_) => Dimension::AnnotationType,
            FilterPredicate::IncludeSensorIds(_) | FilterPredicate::ExcludeSensorIds(_) => {
                Dimension::SensorId
            }
            FilterPredicate::IncludeSensorTypes(_) | FilterPredicate::ExcludeSensorTypes(_) => {
                Dimension::SensorType
            }
            FilterPredicate::IncludeObjectIds(_) | FilterPredicate::ExcludeObjectIds(_) => {
                Dimension::ObjectId
            }
            FilterPredicate::IncludeObjectTypes(_) | FilterPredicate::ExcludeObjectTypes(_) => {
                Dimension::ObjectType
            }
            FilterPredicate::IncludeAttributes(_) | FilterPredicate::ExcludeAttributes(_) => {
                Dimension::Attributes
            }
            FilterPredicate::StartTime(_) => Dimension::StartTime,
            FilterPredicate::EndTime(_) => Dimension::EndTime,
        }
    }
}

/// An ordered set of predicates at frame, sensor and annotation scope.
#[derive(Default)]
pub struct FilterPipeline {
    frame: Vec<Box<dyn FramePredicate>>,
    sensor: Vec<Box<dyn SensorPredicate>>,
    annotation: Vec<Box<dyn AnnotationPredicate>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles built-in predicates into a pipeline.
    ///
    /// Returns [`RaillabelError::Argument`] if an include and an exclude
    /// predicate share a dimension.
    pub fn from_predicates(predicates: &[FilterPredicate]) -> Result<Self, RaillabelError> {
        check_exclusive(predicates)?;

        let mut pipeline = Self::new();
        for predicate in predicates {
            pipeline.push(predicate);
        }
        Ok(pipeline)
    }

    pub fn push_frame_predicate(&mut self, predicate: impl FramePredicate + 'static) {
        self.frame.push(Box::new(predicate));
    }

    pub fn push_sensor_predicate(&mut self, predicate: impl SensorPredicate + 'static) {
        self.sensor.push(Box::new(predicate));
    }

    pub fn push_annotation_predicate(&mut self, predicate: impl AnnotationPredicate + 'static) {
        self.annotation.push(Box::new(predicate));
    }

    fn push(&mut self, predicate: &FilterPredicate) {
        let mode = predicate.mode().unwrap_or(Mode::Include);
        match predicate {
            FilterPredicate::IncludeFrameIds(ids) | FilterPredicate::ExcludeFrameIds(ids) => {
                self.push_frame_predicate(FrameIdFilter {
                    mode,
                    ids: ids.iter().copied().collect(),
                });
            }
            FilterPredicate::StartTime(ts) => self.push_frame_predicate(StartTimeFilter(*ts)),
            FilterPredicate::EndTime(ts) => self.push_frame_predicate(EndTimeFilter(*ts)),
            FilterPredicate::IncludeAnnotationIds(ids)
            | FilterPredicate::ExcludeAnnotationIds(ids) => {
                self.push_annotation_predicate(AnnotationIdFilter {
                    mode,
                    ids: ids.iter().copied().collect(),
                });
            }
            FilterPredicate::IncludeAnnotationTypes(kinds)
            | FilterPredicate::ExcludeAnnotationTypes(kinds) => {
                self.push_annotation_predicate(AnnotationTypeFilter {
                    mode,
                    kinds: kinds.iter().copied().collect(),
                });
            }
            FilterPredicate::IncludeSensorIds(ids) | FilterPredicate::ExcludeSensorIds(ids) => {
                let filter = SensorIdFilter {
                    mode,
                    ids: ids.iter().cloned().collect(),
                };
                self.push_sensor_predicate(filter.clone());
                self.push_annotation_predicate(filter);
            }
            FilterPredicate::IncludeSensorTypes(types)
            | FilterPredicate::ExcludeSensorTypes(types) => {
                let filter = SensorTypeFilter {
                    mode,
                    types: types.iter().copied().collect(),
                };
                self.push_sensor_predicate(filter.clone());
                self.push_annotation_predicate(filter);
            }
            FilterPredicate::IncludeObjectIds(ids) | FilterPredicate::ExcludeObjectIds(ids) => {
                self.push_annotation_predicate(ObjectIdFilter {
                    mode,
                    ids: ids.iter().copied().collect(),
                });
            }
            FilterPredicate::IncludeObjectTypes(types)
            | FilterPredicate::ExcludeObjectTypes(types) => {
                self.push_annotation_predicate(ObjectTypeFilter {
                    mode,
                    types: types.iter().cloned().collect(),
                });
            }
            FilterPredicate::IncludeAttributes(matches)
            | FilterPredicate::ExcludeAttributes(matches) => {
                self.push_annotation_predicate(AttributeFilter {
                    mode,
                    matches: matches.clone(),
                });
            }
        }
    }

    /// Applies every predicate and prunes unreferenced sensors and objects.
    pub fn apply(&self, scene: &Scene) -> Scene {
        let keep_sensor =
            |sensor_id: &str| self.sensor.iter().all(|p| p.keep_sensor(sensor_id, scene));

        let mut frames = BTreeMap::new();
        for (frame_id, frame) in &scene.frames {
            if !self.frame.iter().all(|p| p.keep_frame(*frame_id, frame)) {
                continue;
            }

            let sensors = frame
                .sensors
                .iter()
                .filter(|(sensor_id, _)| keep_sensor(sensor_id))
                .map(|(sensor_id, reference)| (sensor_id.clone(), reference.clone()))
                .collect();
            let frame_data = frame
                .frame_data
                .iter()
                .filter(|(_, num)| num.sensor_id.as_deref().map_or(true, keep_sensor))
                .map(|(name, num)| (name.clone(), num.clone()))
                .collect();
            let annotations = frame
                .annotations
                .iter()
                .filter(|(id, annotation)| {
                    self.annotation
                        .iter()
                        .all(|p| p.keep_annotation(**id, annotation, scene))
                })
                .map(|(id, annotation)| (*id, annotation.clone()))
                .collect();

            frames.insert(
                *frame_id,
                Frame {
                    timestamp: frame.timestamp,
                    sensors,
                    frame_data,
                    annotations,
                },
            );
        }

        prune(scene, frames)
    }
}

/// Filters a scene with built-in predicates.
///
/// Include predicates naming values that do not occur in the scene add an
/// [`WarningCode::UnmatchedFilterValue`] warning. The input scene is left
/// untouched.
pub fn filter(
    scene: &Scene,
    predicates: &[FilterPredicate],
    warnings: &mut Warnings,
) -> Result<Scene, RaillabelError> {
    let pipeline = FilterPipeline::from_predicates(predicates)?;
    for predicate in predicates {
        report_unmatched(scene, predicate, warnings);
    }

    let filtered = pipeline.apply(scene);
    tracing::debug!(
        predicates = predicates.len(),
        frames_before = scene.frames.len(),
        frames_after = filtered.frames.len(),
        sensors_after = filtered.sensors.len(),
        objects_after = filtered.objects.len(),
        "filtered scene"
    );
    Ok(filtered)
}

fn check_exclusive(predicates: &[FilterPredicate]) -> Result<(), RaillabelError> {
    let mut seen: HashMap<Dimension, &FilterPredicate> = HashMap::new();
    for predicate in predicates {
        let Some(mode) = predicate.mode() else {
            continue;
        };
        match seen.get(&predicate.dimension()) {
            Some(first) if first.mode() != Some(mode) => {
                return Err(RaillabelError::Argument(format!(
                    "'{}' and '{}' cannot be combined",
                    first.parameter(),
                    predicate.parameter()
                )));
            }
            Some(_) => {}
            None => {
                seen.insert(predicate.dimension(), predicate);
            }
        }
    }
    Ok(())
}

fn report_unmatched(scene: &Scene, predicate: &FilterPredicate, warnings: &mut Warnings) {
    let unmatched: Vec<String> = match predicate {
        FilterPredicate::IncludeFrameIds(ids) => ids
            .iter()
            .filter(|id| !scene.frames.contains_key(*id))
            .map(u64::to_string)
            .collect(),
        FilterPredicate::IncludeAnnotationIds(ids) => {
            let present: HashSet<AnnotationId> = scene.annotations().map(|(_, id, _)| id).collect();
            ids.iter()
                .filter(|id| !present.contains(*id))
                .map(AnnotationId::to_string)
                .collect()
        }
        FilterPredicate::IncludeAnnotationTypes(kinds) => {
            let present: HashSet<AnnotationKind> =
                scene.annotations().map(|(_, _, a)| a.kind()).collect();
            kinds
                .iter()
                .filter(|kind| !present.contains(*kind))
                .map(AnnotationKind::to_string)
                .collect()
        }
        FilterPredicate::IncludeSensorIds(ids) => ids
            .iter()
            .filter(|id| !scene.sensors.contains_key(id.as_str()))
            .cloned()
            .collect(),
        FilterPredicate::IncludeSensorTypes(types) => {
            let present: HashSet<SensorType> =
                scene.sensors.values().map(|s| s.sensor_type()).collect();
            types
                .iter()
                .filter(|t| !present.contains(*t))
                .map(SensorType::to_string)
                .collect()
        }
        FilterPredicate::IncludeObjectIds(ids) => ids
            .iter()
            .filter(|id| !scene.objects.contains_key(*id))
            .map(ObjectId::to_string)
            .collect(),
        FilterPredicate::IncludeObjectTypes(types) => {
            let present: HashSet<&str> = scene
                .objects
                .values()
                .map(|o| o.object_type.as_str())
                .collect();
            types
                .iter()
                .filter(|t| !present.contains(t.as_str()))
                .cloned()
                .collect()
        }
        FilterPredicate::IncludeAttributes(matches) => {
            let present: HashSet<&str> = scene
                .annotations()
                .flat_map(|(_, _, a)| a.attributes.keys().map(String::as_str))
                .collect();
            matches
                .keys()
                .filter(|name| !present.contains(name.as_str()))
                .cloned()
                .collect()
        }
        _ => Vec::new(),
    };

    for value in unmatched {
        warnings.push(
            WarningCode::UnmatchedFilterValue,
            format!("'{value}' does not occur in the scene"),
            WarningContext::Filter {
                parameter: predicate.parameter().to_string(),
            },
        );
    }
}

/// Builds the output scene, keeping only sensors and objects still
/// referenced by `frames`. Sensor and object order is preserved.
fn prune(scene: &Scene, frames: BTreeMap<u64, Frame>) -> Scene {
    let mut sensor_ids: BTreeSet<String> = BTreeSet::new();
    let mut object_ids: HashSet<ObjectId> = HashSet::new();
    for frame in frames.values() {
        sensor_ids.extend(frame.sensors.keys().cloned());
        sensor_ids.extend(frame.frame_data.values().filter_map(|num| num.sensor_id.clone()));
        for annotation in frame.annotations.values() {
            sensor_ids.extend(annotation.sensor_id.clone());
            object_ids.insert(annotation.object_id);
        }
    }

    let sensors: IndexMap<_, _> = scene
        .sensors
        .iter()
        .filter(|(id, _)| sensor_ids.contains(id.as_str()))
        .map(|(id, sensor)| (id.clone(), sensor.clone()))
        .collect();
    let objects: IndexMap<_, _> = scene
        .objects
        .iter()
        .filter(|(id, _)| object_ids.contains(id))
        .map(|(id, object)| (*id, object.clone()))
        .collect();

    Scene {
        metadata: scene.metadata.clone(),
        sensors,
        objects,
        frames,
    }
}
