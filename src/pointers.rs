//! Derivation of per-object frame intervals and object-data pointers.
//!
//! Both views are pure functions of the frames' contents. They are
//! recomputed on every save and ignored on load.

use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{AnnotationKind, AttributeKind, FrameInterval, ObjectId, Scene};
use crate::warnings::{WarningCode, WarningContext, Warnings};

/// Derived summary of one object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectPointers {
    /// Frames in which the object has at least one annotation.
    pub frame_intervals: Vec<FrameInterval>,
    /// Pointers keyed by the derived annotation name.
    pub object_data_pointers: BTreeMap<String, ElementDataPointer>,
}

/// Summary of all annotations of one object sharing a derived name.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementDataPointer {
    pub kind: AnnotationKind,
    pub frame_intervals: Vec<FrameInterval>,
    pub attribute_pointers: BTreeMap<String, AttributeKind>,
}

#[derive(Default)]
struct PointerAccumulator {
    kind: Option<AnnotationKind>,
    frames: BTreeSet<u64>,
    attributes: BTreeMap<String, AttributeKind>,
}

/// Computes the pointers of every object in the scene.
///
/// Objects keep the scene's order; objects without annotations get empty
/// summaries. When annotations under one name disagree on the type of an
/// attribute, the later one wins and an
/// [`AttributeTypeConflict`](WarningCode::AttributeTypeConflict) warning is
/// recorded.
pub fn derive_pointers(
    scene: &Scene,
    warnings: &mut Warnings,
) -> IndexMap<ObjectId, ObjectPointers> {
    let mut frames_by_object: IndexMap<ObjectId, BTreeSet<u64>> = scene
        .objects
        .keys()
        .map(|id| (*id, BTreeSet::new()))
        .collect();
    let mut groups: IndexMap<ObjectId, BTreeMap<String, PointerAccumulator>> = IndexMap::new();

    for (frame_id, annotation_id, annotation) in scene.annotations() {
        let Some(object_type) = scene.object_type(&annotation.object_id) else {
            continue;
        };
        if let Some(frames) = frames_by_object.get_mut(&annotation.object_id) {
            frames.insert(frame_id);
        }

        let name = annotation.name(object_type);
        let group = groups
            .entry(annotation.object_id)
            .or_default()
            .entry(name.clone())
            .or_default();
        group.kind = Some(annotation.kind());
        group.frames.insert(frame_id);

        for (attr_name, value) in &annotation.attributes {
            let kind = value.kind();
            if let Some(previous) = group.attributes.insert(attr_name.clone(), kind) {
                if previous != kind {
                    warnings.push(
                        WarningCode::AttributeTypeConflict,
                        format!(
                            "attribute '{attr_name}' of '{name}' is {previous} elsewhere but {kind} here; using {kind}"
                        ),
                        WarningContext::Annotation {
                            frame: frame_id,
                            id: annotation_id.to_string(),
                        },
                    );
                }
            }
        }
    }

    frames_by_object
        .into_iter()
        .map(|(object_id, frames)| {
            let object_data_pointers = groups
                .shift_remove(&object_id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(name, acc)| {
                    let kind = acc.kind?;
                    Some((
                        name,
                        ElementDataPointer {
                            kind,
                            frame_intervals: FrameInterval::from_frame_ids(acc.frames),
                            attribute_pointers: acc.attributes,
                        },
                    ))
                })
                .collect();
            let pointers = ObjectPointers {
                frame_intervals: FrameInterval::from_frame_ids(frames),
                object_data_pointers,
            };
            (object_id, pointers)
        })
        .collect()
}
