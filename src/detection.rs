use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::motion::ObjectClass;

/// A single blob seen by the detector in one frame: centre and diameter in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

impl Detection {
    pub fn new(x: f32, y: f32, size: f32) -> Self {
        Self { x, y, size }
    }

    pub fn position(&self) -> Vector2<f32> {
        Vector2::new(self.x, self.y)
    }

    /// Detection halfway between two others, with their mean size.
    pub fn midpoint(&self, other: &Detection) -> Detection {
        let centre = (self.position() + other.position()) * 0.5;
        Detection::new(centre.x, centre.y, (self.size + other.size) * 0.5)
    }
}

/// Everything the detector found in one frame, grouped by class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame_id: u64,
    #[serde(default)]
    pub detections: BTreeMap<ObjectClass, Vec<Detection>>,
}

impl FrameDetections {
    pub fn new(frame_id: u64) -> Self {
        Self {
            frame_id,
            detections: BTreeMap::new(),
        }
    }

    pub fn with(mut self, class: ObjectClass, detections: Vec<Detection>) -> Self {
        self.detections.insert(class, detections);
        self
    }

    /// Detections of one class; empty when the class was not seen.
    pub fn of(&self, class: ObjectClass) -> &[Detection] {
        self.detections.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Load a recorded detection stream (a JSON array of frames) for replay.
pub fn load_recording<P: AsRef<Path>>(path: P) -> Result<Vec<FrameDetections>> {
    let data = fs::read_to_string(path)?;
    let frames: Vec<FrameDetections> = serde_json::from_str(&data)?;
    Ok(frames)
}
