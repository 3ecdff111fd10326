use log::debug;
use nalgebra::Vector2;

use crate::detection::Detection;
use crate::motion::{MotionProfile, ObjectClass};
use crate::observer::{LogObserver, TrackEvent, TrackObserver};
use crate::track::TrackedObject;

/// Closest visible object for one detection: slot and per-axis distance.
type Candidate = (usize, Vector2<f32>);

/// Multi-object tracker for a single object class.
///
/// Matches each frame's detections to the objects already on the belt using
/// drift-compensated per-axis distance, and spawns new objects for whatever
/// stays unmatched.
#[derive(Debug, Clone)]
pub struct Tracker {
    /// Class this tracker follows
    class: ObjectClass,
    /// Motion and retirement rules of the class
    profile: MotionProfile,
    /// Every object seen so far, retired ones included
    objects: Vec<TrackedObject>,
}

impl Tracker {
    pub fn new(class: ObjectClass, profile: MotionProfile) -> Self {
        Tracker {
            class,
            profile,
            objects: Vec::new(),
        }
    }

    pub fn class(&self) -> ObjectClass {
        self.class
    }

    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    pub fn objects(&self) -> &[TrackedObject] {
        &self.objects
    }

    pub fn visible_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_visible()).count()
    }

    /// Assign one frame's detections, logging lifecycle events.
    pub fn assign(&mut self, detections: &[Detection]) {
        self.assign_with(detections, &mut LogObserver);
    }

    /// Assign one frame's detections, reporting lifecycle events to `observer`.
    ///
    /// Must be called exactly once per frame, in capture order: the drift
    /// prediction depends on how many frames each object has been missing.
    pub fn assign_with(&mut self, detections: &[Detection], observer: &mut dyn TrackObserver) {
        for object in self.objects.iter_mut().filter(|o| o.is_visible()) {
            object.begin_frame();
        }

        // Built up front, so objects spawned below are not candidates this frame
        let closest: Vec<Option<Candidate>> = detections
            .iter()
            .map(|det| self.closest_visible(det))
            .collect();

        for (det, candidate) in detections.iter().zip(closest) {
            match candidate {
                Some((idx, distance)) if self.objects[idx].accepts(&distance, &self.profile) => {
                    self.objects[idx].record_match(*det);
                }
                Some((idx, distance)) => {
                    debug!(
                        "{} at ({:.1}, {:.1}) rejected by closest #{}: dx={:.1} dy={:.1}",
                        self.class, det.x, det.y, idx, distance.x, distance.y
                    );
                    self.spawn(*det, observer);
                }
                None => self.spawn(*det, observer),
            }
        }

        for (index, object) in self.objects.iter_mut().enumerate() {
            if object.mark_missed(&self.profile) {
                observer.on_event(&TrackEvent::Retired {
                    class: self.class,
                    index,
                    found_frames: object.found_frame_count(),
                    last: *object.last(),
                });
            }
        }
    }

    /// Drop every object found on fewer than `min_found_frames` frames.
    ///
    /// Returns the number of objects removed.
    pub fn remove_phantoms(&mut self, min_found_frames: u32, observer: &mut dyn TrackObserver) -> usize {
        let before = self.objects.len();
        let class = self.class;
        self.objects.retain(|object| {
            if object.found_frame_count() >= min_found_frames {
                return true;
            }
            observer.on_event(&TrackEvent::PhantomRemoved {
                class,
                found_frames: object.found_frame_count(),
                last: *object.last(),
            });
            false
        });
        before - self.objects.len()
    }

    /// Visible object with the smallest L1 distance to the detection.
    /// The first one wins a tie.
    fn closest_visible(&self, det: &Detection) -> Option<Candidate> {
        let mut best: Option<(Candidate, f32)> = None;
        for (idx, object) in self.objects.iter().enumerate() {
            if !object.is_visible() {
                continue;
            }
            let distance = object.distance_to(det, &self.profile);
            let l1 = distance.x + distance.y;
            match best {
                Some((_, best_l1)) if best_l1 <= l1 => {}
                _ => best = Some(((idx, distance), l1)),
            }
        }
        best.map(|(candidate, _)| candidate)
    }

    fn spawn(&mut self, seed: Detection, observer: &mut dyn TrackObserver) {
        self.objects.push(TrackedObject::new(seed));
        observer.on_event(&TrackEvent::Created {
            class: self.class,
            index: self.objects.len() - 1,
            seed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;

    fn belt_profile(tolerance: f32) -> MotionProfile {
        MotionProfile {
            dx_per_frame: 4.0,
            dy_per_frame: 1.0,
            x_tolerance: tolerance,
            y_tolerance: tolerance,
            invisible_after_missing_frames: 3,
            invisible_after_x_coordinate: 500.0,
            pairing_distance_threshold: None,
        }
    }

    fn det(x: f32, y: f32) -> Detection {
        Detection::new(x, y, 10.0)
    }

    #[test]
    fn test_single_detection_creates_object() {
        let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(10.0));
        tracker.assign(&[det(100.0, 100.0)]);

        assert_eq!(tracker.objects().len(), 1);
        let object = &tracker.objects()[0];
        assert_eq!(object.history().len(), 1);
        assert_eq!(object.found_frame_count(), 1);
        assert_eq!(object.missing_frame_count(), 0);
    }

    #[test]
    fn test_stable_redetection() {
        let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(10.0));
        tracker.assign(&[det(100.0, 100.0)]);
        tracker.assign(&[det(104.0, 101.0)]);

        assert_eq!(tracker.objects().len(), 1);
        assert_eq!(tracker.objects()[0].found_frame_count(), 2);
        assert_eq!(tracker.objects()[0].history().len(), 2);
    }

    #[test]
    fn test_redetection_after_gap_compensates_drift() {
        let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(0.5));
        tracker.assign(&[det(100.0, 100.0)]);
        tracker.assign(&[]);
        assert_eq!(tracker.objects()[0].missing_frame_count(), 1);

        // Two frames of drift: exactly on the predicted position
        tracker.assign(&[det(108.0, 102.0)]);
        assert_eq!(tracker.objects().len(), 1);
        assert_eq!(tracker.objects()[0].missing_frame_count(), 0);
    }

    #[test]
    fn test_tolerance_scaling() {
        // Missing for k = 2 frames; predicted (112, 103), tolerance 10 * 3
        let run = |candidate: Detection| {
            let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(10.0));
            tracker.assign(&[det(100.0, 100.0)]);
            tracker.assign(&[]);
            tracker.assign(&[]);
            assert_eq!(tracker.objects()[0].missing_frame_count(), 2);
            tracker.assign(&[candidate]);
            tracker.objects().len()
        };

        assert_eq!(run(det(142.0, 103.0)), 1);
        assert_eq!(run(det(112.0, 73.0)), 1);
        assert_eq!(run(det(143.0, 103.0)), 2);
        assert_eq!(run(det(112.0, 134.0)), 2);
    }

    #[test]
    fn test_retirement_is_terminal() {
        let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(10.0));
        tracker.assign(&[det(600.0, 100.0)]);
        for _ in 0..4 {
            tracker.assign(&[]);
        }
        assert!(!tracker.objects()[0].is_visible());

        // Right where the retired object would be predicted: spawns instead
        let predicted = tracker.objects()[0].predicted_position(tracker.profile());
        tracker.assign(&[det(predicted.x, predicted.y)]);
        assert_eq!(tracker.objects().len(), 2);
        assert!(!tracker.objects()[0].is_visible());
        assert_eq!(tracker.objects()[0].found_frame_count(), 1);

        for _ in 0..20 {
            tracker.assign(&[det(600.0, 100.0)]);
            assert!(!tracker.objects()[0].is_visible());
        }
    }

    #[test]
    fn test_object_before_exit_zone_never_retires() {
        let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(10.0));
        tracker.assign(&[det(100.0, 100.0)]);
        for _ in 0..30 {
            tracker.assign(&[]);
        }
        assert!(tracker.objects()[0].is_visible());
        assert_eq!(tracker.objects()[0].missing_frame_count(), 30);
    }

    #[test]
    fn test_end_to_end_three_frames() {
        let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(2.0));
        tracker.assign(&[det(50.0, 50.0)]);
        tracker.assign(&[det(54.0, 51.0)]);
        tracker.assign(&[det(58.0, 52.0)]);

        assert_eq!(tracker.objects().len(), 1);
        let object = &tracker.objects()[0];
        assert_eq!(object.found_frame_count(), 3);
        assert_eq!(object.missing_frame_count(), 0);
        assert!(object.is_visible());
    }

    #[test]
    fn test_far_detection_spawns_second_object() {
        let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(10.0));
        tracker.assign(&[det(100.0, 100.0), det(300.0, 100.0)]);
        assert_eq!(tracker.objects().len(), 2);

        tracker.assign(&[det(304.0, 101.0), det(104.0, 101.0)]);
        assert_eq!(tracker.objects().len(), 2);
        assert_eq!(tracker.objects()[0].last().x, 104.0);
        assert_eq!(tracker.objects()[1].last().x, 304.0);
    }

    #[test]
    fn test_two_detections_may_share_closest_object() {
        let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(10.0));
        tracker.assign(&[det(100.0, 100.0)]);
        tracker.assign(&[det(104.0, 101.0), det(106.0, 101.0)]);

        // Both matched the same object; no exclusivity within a frame
        assert_eq!(tracker.objects().len(), 1);
        assert_eq!(tracker.objects()[0].found_frame_count(), 3);
        assert_eq!(tracker.objects()[0].last().x, 106.0);
    }

    #[test]
    fn test_same_frame_spawns_are_not_candidates() {
        let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(10.0));
        // Both detections of the first frame spawn, even though they are close
        tracker.assign(&[det(100.0, 100.0), det(102.0, 100.0)]);
        assert_eq!(tracker.objects().len(), 2);
    }

    #[test]
    fn test_empty_frame_counts_missing() {
        let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(10.0));
        tracker.assign(&[det(100.0, 100.0), det(200.0, 100.0)]);
        tracker.assign(&[]);
        tracker.assign(&[det(208.0, 102.0)]);

        assert_eq!(tracker.objects()[0].missing_frame_count(), 2);
        assert_eq!(tracker.objects()[1].missing_frame_count(), 0);
        assert_eq!(tracker.visible_count(), 2);
    }

    #[test]
    fn test_lifecycle_events() {
        let mut events = Vec::new();
        let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(10.0));
        let mut record = |e: &TrackEvent| events.push(e.clone());

        tracker.assign_with(&[det(600.0, 100.0)], &mut record);
        for _ in 0..4 {
            tracker.assign_with(&[], &mut record);
        }

        assert_eq!(
            events,
            vec![
                TrackEvent::Created {
                    class: ObjectClass::Ring,
                    index: 0,
                    seed: det(600.0, 100.0),
                },
                TrackEvent::Retired {
                    class: ObjectClass::Ring,
                    index: 0,
                    found_frames: 1,
                    last: det(600.0, 100.0),
                },
            ]
        );
    }

    #[test]
    fn test_remove_phantoms() {
        let mut tracker = Tracker::new(ObjectClass::Ring, belt_profile(10.0));
        tracker.assign(&[det(100.0, 100.0), det(300.0, 300.0)]);
        for i in 1..5 {
            let x = 100.0 + 4.0 * i as f32;
            tracker.assign(&[det(x, 100.0 + i as f32)]);
        }

        let removed = tracker.remove_phantoms(3, &mut NullObserver);
        assert_eq!(removed, 1);
        assert_eq!(tracker.objects().len(), 1);
        assert_eq!(tracker.objects()[0].found_frame_count(), 5);

        assert_eq!(tracker.remove_phantoms(3, &mut NullObserver), 0);
        assert_eq!(tracker.objects().len(), 1);
    }
}
