//! Predicate traits and their concrete implementations.
//!
//! Predicates act at three scopes. Frame predicates run first and drop
//! whole frames. Annotation predicates run on every annotation of a
//! surviving frame. Sensor predicates decide which frame sensor references
//! and sensor-bound samples survive.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    Annotation, AnnotationId, AnnotationKind, AttributeValue, Frame, ObjectId, Scene, SensorType,
    Timestamp,
};

/// Decides whether a frame survives.
pub trait FramePredicate {
    fn keep_frame(&self, frame_id: u64, frame: &Frame) -> bool;
}

/// Decides whether an annotation survives. The scene is available for
/// lookups such as the type of the referenced object.
pub trait AnnotationPredicate {
    fn keep_annotation(
        &self,
        annotation_id: AnnotationId,
        annotation: &Annotation,
        scene: &Scene,
    ) -> bool;
}

/// Decides whether a frame may keep data bound to a sensor.
pub trait SensorPredicate {
    fn keep_sensor(&self, sensor_id: &str, scene: &Scene) -> bool;
}

/// Whether matching elements are kept or removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Include,
    Exclude,
}

impl Mode {
    /// Applies the mode to a match result.
    pub fn keep(self, matched: bool) -> bool {
        match self {
            Mode::Include => matched,
            Mode::Exclude => !matched,
        }
    }
}

/// The expected value of an attribute in an attribute filter.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeMatch {
    /// Matches any value, as long as the attribute is present.
    Any,
    /// Matches one exact value.
    Value(AttributeValue),
}

impl AttributeMatch {
    /// Shorthand for `AttributeMatch::Value(value.into())`.
    pub fn value(value: impl Into<AttributeValue>) -> Self {
        AttributeMatch::Value(value.into())
    }

    pub fn matches(&self, value: Option<&AttributeValue>) -> bool {
        match (self, value) {
            (_, None) => false,
            (AttributeMatch::Any, Some(_)) => true,
            (AttributeMatch::Value(expected), Some(value)) => expected == value,
        }
    }
}

// ============================================================================
// Frame-level
// ============================================================================

#[derive(Clone, Debug)]
pub struct FrameIdFilter {
    pub mode: Mode,
    pub ids: BTreeSet<u64>,
}

impl FramePredicate for FrameIdFilter {
    fn keep_frame(&self, frame_id: u64, _frame: &Frame) -> bool {
        self.mode.keep(self.ids.contains(&frame_id))
    }
}

/// Keeps frames at or after an instant. Frames without a timestamp pass.
#[derive(Clone, Copy, Debug)]
pub struct StartTimeFilter(pub Timestamp);

impl FramePredicate for StartTimeFilter {
    fn keep_frame(&self, _frame_id: u64, frame: &Frame) -> bool {
        frame.timestamp.map_or(true, |ts| ts >= self.0)
    }
}

/// Keeps frames at or before an instant. Frames without a timestamp pass.
#[derive(Clone, Copy, Debug)]
pub struct EndTimeFilter(pub Timestamp);

impl FramePredicate for EndTimeFilter {
    fn keep_frame(&self, _frame_id: u64, frame: &Frame) -> bool {
        frame.timestamp.map_or(true, |ts| ts <= self.0)
    }
}

// ============================================================================
// Annotation-level
// ============================================================================

#[derive(Clone, Debug)]
pub struct AnnotationIdFilter {
    pub mode: Mode,
    pub ids: BTreeSet<AnnotationId>,
}

impl AnnotationPredicate for AnnotationIdFilter {
    fn keep_annotation(
        &self,
        annotation_id: AnnotationId,
        _annotation: &Annotation,
        _scene: &Scene,
    ) -> bool {
        self.mode.keep(self.ids.contains(&annotation_id))
    }
}

#[derive(Clone, Debug)]
pub struct AnnotationTypeFilter {
    pub mode: Mode,
    pub kinds: BTreeSet<AnnotationKind>,
}

impl AnnotationPredicate for AnnotationTypeFilter {
    fn keep_annotation(
        &self,
        _annotation_id: AnnotationId,
        annotation: &Annotation,
        _scene: &Scene,
    ) -> bool {
        self.mode.keep(self.kinds.contains(&annotation.kind()))
    }
}

/// Filters by sensor id. Annotations without a sensor never match.
#[derive(Clone, Debug)]
pub struct SensorIdFilter {
    pub mode: Mode,
    pub ids: BTreeSet<String>,
}

impl AnnotationPredicate for SensorIdFilter {
    fn keep_annotation(
        &self,
        _annotation_id: AnnotationId,
        annotation: &Annotation,
        _scene: &Scene,
    ) -> bool {
        let matched = annotation
            .sensor_id
            .as_ref()
            .is_some_and(|id| self.ids.contains(id));
        self.mode.keep(matched)
    }
}

impl SensorPredicate for SensorIdFilter {
    fn keep_sensor(&self, sensor_id: &str, _scene: &Scene) -> bool {
        self.mode.keep(self.ids.contains(sensor_id))
    }
}

/// Filters by the type of the referenced sensor.
#[derive(Clone, Debug)]
pub struct SensorTypeFilter {
    pub mode: Mode,
    pub types: BTreeSet<SensorType>,
}

impl SensorTypeFilter {
    fn matches(&self, sensor_id: &str, scene: &Scene) -> bool {
        scene
            .sensors
            .get(sensor_id)
            .is_some_and(|sensor| self.types.contains(&sensor.sensor_type()))
    }
}

impl AnnotationPredicate for SensorTypeFilter {
    fn keep_annotation(
        &self,
        _annotation_id: AnnotationId,
        annotation: &Annotation,
        scene: &Scene,
    ) -> bool {
        let matched = annotation
            .sensor_id
            .as_deref()
            .is_some_and(|id| self.matches(id, scene));
        self.mode.keep(matched)
    }
}

impl SensorPredicate for SensorTypeFilter {
    fn keep_sensor(&self, sensor_id: &str, scene: &Scene) -> bool {
        self.mode.keep(self.matches(sensor_id, scene))
    }
}

#[derive(Clone, Debug)]
pub struct ObjectIdFilter {
    pub mode: Mode,
    pub ids: BTreeSet<ObjectId>,
}

impl AnnotationPredicate for ObjectIdFilter {
    fn keep_annotation(
        &self,
        _annotation_id: AnnotationId,
        annotation: &Annotation,
        _scene: &Scene,
    ) -> bool {
        self.mode.keep(self.ids.contains(&annotation.object_id))
    }
}

#[derive(Clone, Debug)]
pub struct ObjectTypeFilter {
    pub mode: Mode,
    pub types: BTreeSet<String>,
}

impl AnnotationPredicate for ObjectTypeFilter {
    fn keep_annotation(
        &self,
        _annotation_id: AnnotationId,
        annotation: &Annotation,
        scene: &Scene,
    ) -> bool {
        let matched = scene
            .object_type(&annotation.object_id)
            .is_some_and(|object_type| self.types.contains(object_type));
        self.mode.keep(matched)
    }
}

/// Include: every listed attribute must match. Exclude: no listed
/// attribute may match.
#[derive(Clone, Debug)]
pub struct AttributeFilter {
    pub mode: Mode,
    pub matches: BTreeMap<String, AttributeMatch>,
}

impl AnnotationPredicate for AttributeFilter {
    fn keep_annotation(
        &self,
        _annotation_id: AnnotationId,
        annotation: &Annotation,
        _scene: &Scene,
    ) -> bool {
        let mut matches = self
            .matches
            .iter()
            .map(|(name, expected)| expected.matches(annotation.attributes.get(name)));
        match self.mode {
            Mode::Include => matches.all(|m| m),
            Mode::Exclude => !matches.any(|m| m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bbox, Timestamp};
    use uuid::Uuid;

    fn annotation() -> Annotation {
        Annotation::new("rgb_center", ObjectId::new(Uuid::from_u128(7)), Bbox::default())
            .with_attribute("colour", "red")
            .with_attribute("occluded", false)
    }

    #[test]
    fn test_mode_inverts_match() {
        assert!(Mode::Include.keep(true));
        assert!(!Mode::Include.keep(false));
        assert!(Mode::Exclude.keep(false));
    }

    #[test]
    fn test_time_bounds_are_inclusive_and_pass_missing_timestamps() {
        let ts = |s: &str| Timestamp::parse(s).unwrap();
        let at_one = Frame::new(Some(ts("1.0")));
        let untimed = Frame::new(None);

        assert!(StartTimeFilter(ts("1")).keep_frame(0, &at_one));
        assert!(!StartTimeFilter(ts("1.000000001")).keep_frame(0, &at_one));
        assert!(EndTimeFilter(ts("1")).keep_frame(0, &at_one));
        assert!(!EndTimeFilter(ts("0.9")).keep_frame(0, &at_one));
        assert!(StartTimeFilter(ts("5")).keep_frame(0, &untimed));
        assert!(EndTimeFilter(ts("0")).keep_frame(0, &untimed));
    }

    #[test]
    fn test_attribute_include_requires_all() {
        let scene = Scene::default();
        let id = AnnotationId::new(Uuid::from_u128(1));
        let filter = AttributeFilter {
            mode: Mode::Include,
            matches: [
                ("colour".to_string(), AttributeMatch::value("red")),
                ("occluded".to_string(), AttributeMatch::Any),
            ]
            .into(),
        };
        assert!(filter.keep_annotation(id, &annotation(), &scene));

        let filter = AttributeFilter {
            mode: Mode::Include,
            matches: [
                ("colour".to_string(), AttributeMatch::value("red")),
                ("size".to_string(), AttributeMatch::Any),
            ]
            .into(),
        };
        assert!(!filter.keep_annotation(id, &annotation(), &scene));
    }

    #[test]
    fn test_attribute_exclude_rejects_any_match() {
        let scene = Scene::default();
        let id = AnnotationId::new(Uuid::from_u128(1));
        let filter = AttributeFilter {
            mode: Mode::Exclude,
            matches: [
                ("colour".to_string(), AttributeMatch::value("blue")),
                ("occluded".to_string(), AttributeMatch::value(false)),
            ]
            .into(),
        };
        assert!(!filter.keep_annotation(id, &annotation(), &scene));
    }

    #[test]
    fn test_annotation_without_sensor_never_matches_sensor_ids() {
        let scene = Scene::default();
        let id = AnnotationId::new(Uuid::from_u128(1));
        let mut unbound = annotation();
        unbound.sensor_id = None;
        let include = SensorIdFilter {
            mode: Mode::Include,
            ids: ["rgb_center".to_string()].into(),
        };
        let exclude = SensorIdFilter {
            mode: Mode::Exclude,
            ids: ["rgb_center".to_string()].into(),
        };
        assert!(!include.keep_annotation(id, &unbound, &scene));
        assert!(exclude.keep_annotation(id, &unbound, &scene));
    }
}
