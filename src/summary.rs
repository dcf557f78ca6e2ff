//! Scene summaries for terminal and JSON output.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::model::{FrameInterval, Scene, SensorType};
use crate::warnings::Warnings;

/// Counts and identifiers describing a loaded scene.
#[derive(Clone, Debug, Serialize)]
pub struct SceneSummary {
    pub schema_version: String,
    pub name: Option<String>,
    pub sensors: Vec<SensorSummary>,
    pub objects: usize,
    /// Object counts by object type.
    pub object_types: BTreeMap<String, usize>,
    pub frames: usize,
    /// Frame numbers as `[start, end]` pairs.
    pub frame_intervals: Vec<[u64; 2]>,
    pub annotations: usize,
    /// Annotation counts by kind name (`bbox`, `seg3d`, ...).
    pub annotation_kinds: BTreeMap<&'static str, usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SensorSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub sensor_type: SensorType,
}

impl SceneSummary {
    pub fn new(scene: &Scene) -> Self {
        let mut object_types = BTreeMap::new();
        for object in scene.objects.values() {
            *object_types.entry(object.object_type.clone()).or_insert(0) += 1;
        }

        let mut annotations = 0;
        let mut annotation_kinds = BTreeMap::new();
        for (_, _, annotation) in scene.annotations() {
            annotations += 1;
            *annotation_kinds.entry(annotation.kind().as_str()).or_insert(0) += 1;
        }

        Self {
            schema_version: scene.metadata.schema_version.clone(),
            name: scene.metadata.name.clone(),
            sensors: scene
                .sensors
                .iter()
                .map(|(id, sensor)| SensorSummary {
                    id: id.clone(),
                    sensor_type: sensor.sensor_type(),
                })
                .collect(),
            objects: scene.objects.len(),
            object_types,
            frames: scene.frames.len(),
            frame_intervals: scene
                .frame_intervals()
                .iter()
                .map(|FrameInterval { start, end }| [*start, *end])
                .collect(),
            annotations,
            annotation_kinds,
        }
    }
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => writeln!(f, "Scene '{}' (OpenLABEL {})", name, self.schema_version)?,
            None => writeln!(f, "Scene (OpenLABEL {})", self.schema_version)?,
        }

        writeln!(f, "  Sensors:     {:>8}", self.sensors.len())?;
        for sensor in &self.sensors {
            writeln!(f, "    {:<24} {}", sensor.id, sensor.sensor_type)?;
        }

        writeln!(f, "  Objects:     {:>8}", self.objects)?;
        for (object_type, count) in &self.object_types {
            writeln!(f, "    {:<24} {:>6}", object_type, count)?;
        }

        writeln!(f, "  Frames:      {:>8}", self.frames)?;
        if !self.frame_intervals.is_empty() {
            let intervals: Vec<String> = self
                .frame_intervals
                .iter()
                .map(|[start, end]| {
                    if start == end {
                        start.to_string()
                    } else {
                        format!("{start}-{end}")
                    }
                })
                .collect();
            writeln!(f, "    {}", intervals.join(", "))?;
        }

        writeln!(f, "  Annotations: {:>8}", self.annotations)?;
        for (kind, count) in &self.annotation_kinds {
            writeln!(f, "    {:<24} {:>6}", kind, count)?;
        }
        Ok(())
    }
}

/// A summary together with the warnings collected while loading.
#[derive(Serialize)]
pub struct LoadReport<'a> {
    pub summary: SceneSummary,
    pub warnings: &'a Warnings,
}
