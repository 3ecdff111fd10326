use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TrackError};

/// Kind of jewelry moving along the belt. Each class is tracked independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectClass {
    Ring,
    Necklace,
    /// Two earrings lying side by side, seen by the detector as two blobs.
    EarringPair,
    Bracelet,
}

impl ObjectClass {
    pub const ALL: [ObjectClass; 4] = [
        ObjectClass::Ring,
        ObjectClass::Necklace,
        ObjectClass::EarringPair,
        ObjectClass::Bracelet,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ObjectClass::Ring => "ring",
            ObjectClass::Necklace => "necklace",
            ObjectClass::EarringPair => "earring_pair",
            ObjectClass::Bracelet => "bracelet",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static motion and retirement rules of one object class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Expected belt drift per frame while the object is unobserved
    pub dx_per_frame: f32,
    pub dy_per_frame: f32,
    /// Acceptable per-axis deviation at zero missing frames
    pub x_tolerance: f32,
    pub y_tolerance: f32,
    /// Missing frames needed before an object may be retired
    pub invisible_after_missing_frames: u32,
    /// Belt exit zone; the last seen x must be at or past it to retire
    pub invisible_after_x_coordinate: f32,
    /// Set only for classes that show up as two detections per item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_distance_threshold: Option<f32>,
}

impl MotionProfile {
    /// Default profile of a class, as calibrated on the belt footage.
    pub fn for_class(class: ObjectClass) -> Self {
        match class {
            ObjectClass::Ring => MotionProfile {
                dx_per_frame: 4.0,
                dy_per_frame: 1.0,
                x_tolerance: 10.0,
                y_tolerance: 10.0,
                invisible_after_missing_frames: 10,
                invisible_after_x_coordinate: 1000.0,
                pairing_distance_threshold: None,
            },
            // Necklaces lie still in the frames we get them from
            ObjectClass::Necklace => MotionProfile {
                dx_per_frame: 0.0,
                dy_per_frame: 0.0,
                x_tolerance: 38.0,
                y_tolerance: 38.0,
                invisible_after_missing_frames: 10,
                invisible_after_x_coordinate: 800.0,
                pairing_distance_threshold: None,
            },
            ObjectClass::EarringPair => MotionProfile {
                dx_per_frame: 4.0,
                dy_per_frame: 1.0,
                x_tolerance: 10.0,
                y_tolerance: 10.0,
                invisible_after_missing_frames: 10,
                invisible_after_x_coordinate: 1000.0,
                pairing_distance_threshold: Some(60.0),
            },
            ObjectClass::Bracelet => MotionProfile {
                dx_per_frame: 4.0,
                dy_per_frame: 1.0,
                x_tolerance: 10.0,
                y_tolerance: 10.0,
                invisible_after_missing_frames: 10,
                invisible_after_x_coordinate: 800.0,
                pairing_distance_threshold: None,
            },
        }
    }

    pub fn drift(&self) -> Vector2<f32> {
        Vector2::new(self.dx_per_frame, self.dy_per_frame)
    }

    pub fn tolerance(&self) -> Vector2<f32> {
        Vector2::new(self.x_tolerance, self.y_tolerance)
    }

    /// Check that the profile can drive a tracker.
    pub fn validate(&self, class: ObjectClass) -> Result<()> {
        if !self.dx_per_frame.is_finite() || !self.dy_per_frame.is_finite() {
            return Err(TrackError::invalid_profile(class, "drift must be finite"));
        }
        for (axis, tol) in [("x", self.x_tolerance), ("y", self.y_tolerance)] {
            if !tol.is_finite() || tol < 0.0 {
                return Err(TrackError::invalid_profile(
                    class,
                    format!("{axis} tolerance must be finite and non-negative, got {tol}"),
                ));
            }
        }
        if !self.invisible_after_x_coordinate.is_finite() {
            return Err(TrackError::invalid_profile(class, "exit coordinate must be finite"));
        }
        if let Some(threshold) = self.pairing_distance_threshold {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(TrackError::invalid_profile(
                    class,
                    format!("pairing distance threshold must be positive, got {threshold}"),
                ));
            }
        }
        Ok(())
    }
}
