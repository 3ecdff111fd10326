use nalgebra::Vector2;

use crate::detection::Detection;
use crate::motion::MotionProfile;

/// One physical item followed across frames.
///
/// Identity is the object's slot in the owning tracker. The history is
/// seeded at construction and only ever grows.
#[derive(Debug, Clone)]
pub struct TrackedObject {
    /// Every detection matched to this object, oldest first
    history: Vec<Detection>,
    /// Frames with a matched detection, the seeding one included
    found_frame_count: u32,
    /// Consecutive frames without a match since the last one
    missing_frame_count: u32,
    /// Set when a detection was matched during the current frame
    matched_this_frame: bool,
    /// Cleared once the object has left the belt; never set again
    visible: bool,
}

impl TrackedObject {
    /// Start tracking from the detection that could not be matched.
    pub fn new(seed: Detection) -> Self {
        TrackedObject {
            history: vec![seed],
            found_frame_count: 1,
            missing_frame_count: 0,
            matched_this_frame: true,
            visible: true,
        }
    }

    pub fn history(&self) -> &[Detection] {
        &self.history
    }

    pub fn last(&self) -> &Detection {
        self.history
            .last()
            .expect("tracked object history is seeded at construction")
    }

    pub fn found_frame_count(&self) -> u32 {
        self.found_frame_count
    }

    pub fn missing_frame_count(&self) -> u32 {
        self.missing_frame_count
    }

    pub fn matched_this_frame(&self) -> bool {
        self.matched_this_frame
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Frames the belt has moved the object since it was last matched,
    /// counting the frame being assigned.
    pub fn frames_since_seen(&self) -> u32 {
        self.missing_frame_count + 1
    }

    /// Where the belt should have carried the object by now.
    pub fn predicted_position(&self, profile: &MotionProfile) -> Vector2<f32> {
        self.last().position() + profile.drift() * self.frames_since_seen() as f32
    }

    /// Per-axis absolute distance between a candidate and the predicted position.
    pub fn distance_to(&self, candidate: &Detection, profile: &MotionProfile) -> Vector2<f32> {
        (candidate.position() - self.predicted_position(profile)).abs()
    }

    /// Whether a per-axis distance is close enough to belong to this object.
    /// The tolerance widens with every frame the object has gone unobserved.
    pub fn accepts(&self, distance: &Vector2<f32>, profile: &MotionProfile) -> bool {
        let mux = self.frames_since_seen() as f32;
        distance.x <= profile.x_tolerance * mux && distance.y <= profile.y_tolerance * mux
    }

    pub(crate) fn begin_frame(&mut self) {
        self.matched_this_frame = false;
    }

    pub(crate) fn record_match(&mut self, detection: Detection) {
        self.history.push(detection);
        self.matched_this_frame = true;
        self.missing_frame_count = 0;
        self.found_frame_count += 1;
    }

    /// End-of-frame bookkeeping for an unmatched object.
    ///
    /// Returns `true` when this call retired the object.
    pub(crate) fn mark_missed(&mut self, profile: &MotionProfile) -> bool {
        if !self.visible || self.matched_this_frame {
            return false;
        }
        if self.missing_frame_count >= profile.invisible_after_missing_frames
            && self.last().x >= profile.invisible_after_x_coordinate
        {
            self.visible = false;
            return true;
        }
        self.missing_frame_count += 1;
        false
    }
}
