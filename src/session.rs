use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::detection::{Detection, FrameDetections};
use crate::error::Result;
use crate::motion::ObjectClass;
use crate::observer::{LogObserver, TrackObserver};
use crate::pairing::PairMerger;
use crate::tracker::Tracker;

/// Tracker of one class plus its optional pairing step.
struct ClassPipeline {
    merger: Option<PairMerger>,
    tracker: Tracker,
}

impl ClassPipeline {
    fn run(&mut self, detections: &[Detection], observer: &mut dyn TrackObserver) {
        match &self.merger {
            Some(merger) => {
                let merged = merger.merge(detections);
                self.tracker.assign_with(&merged, observer);
            }
            None => self.tracker.assign_with(detections, observer),
        }
    }
}

/// Counts of one class after phantom cleanup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassReport {
    /// Distinct items counted
    pub tracked: usize,
    pub visible: usize,
    pub retired: usize,
}

/// End-of-stream summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingReport {
    pub frames_processed: u64,
    pub classes: BTreeMap<ObjectClass, ClassReport>,
}

impl TrackingReport {
    pub fn total(&self) -> usize {
        self.classes.values().map(|c| c.tracked).sum()
    }

    /// Write as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl fmt::Display for TrackingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analyzed frames: {}", self.frames_processed)?;
        for (class, counts) in &self.classes {
            writeln!(
                f,
                "  {:<13} {:>4} ({} visible, {} retired)",
                class, counts.tracked, counts.visible, counts.retired
            )?;
        }
        write!(f, "  {:<13} {:>4}", "total", self.total())
    }
}

/// Runs one tracker per configured class over a stream of frames.
pub struct TrackingSession {
    pipelines: BTreeMap<ObjectClass, ClassPipeline>,
    min_found_frames: u32,
    frame_count: u64,
    observer: Box<dyn TrackObserver + Send>,
}

impl TrackingSession {
    /// Build a session from a validated config; events go to the log.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let pipelines = config
            .classes
            .iter()
            .map(|(&class, profile)| {
                let pipeline = ClassPipeline {
                    merger: profile.pairing_distance_threshold.map(PairMerger::new),
                    tracker: Tracker::new(class, profile.clone()),
                };
                (class, pipeline)
            })
            .collect();

        Ok(TrackingSession {
            pipelines,
            min_found_frames: config.min_found_frames,
            frame_count: 0,
            observer: Box::new(LogObserver),
        })
    }

    /// Replace the lifecycle observer.
    pub fn with_observer<O: TrackObserver + Send + 'static>(mut self, observer: O) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn classes(&self) -> impl Iterator<Item = ObjectClass> + '_ {
        self.pipelines.keys().copied()
    }

    pub fn tracker(&self, class: ObjectClass) -> Option<&Tracker> {
        self.pipelines.get(&class).map(|p| &p.tracker)
    }

    pub fn trackers(&self) -> impl Iterator<Item = &Tracker> + '_ {
        self.pipelines.values().map(|p| &p.tracker)
    }

    /// Feed one frame. Every configured class is assigned, seen or not, so
    /// that unobserved objects keep accumulating missing frames.
    pub fn process_frame(&mut self, frame: &FrameDetections) {
        self.frame_count += 1;

        for class in frame.detections.keys() {
            if !self.pipelines.contains_key(class) {
                warn!(
                    "frame {}: dropping {} detections of unconfigured class {}",
                    frame.frame_id,
                    frame.of(*class).len(),
                    class
                );
            }
        }

        for (class, pipeline) in self.pipelines.iter_mut() {
            pipeline.run(frame.of(*class), self.observer.as_mut());
        }
    }

    /// Drop phantom objects and summarize what is left.
    ///
    /// Meant for end of stream; calling it again yields the same report.
    pub fn report(&mut self) -> TrackingReport {
        let mut classes = BTreeMap::new();
        for (class, pipeline) in self.pipelines.iter_mut() {
            let tracker = &mut pipeline.tracker;
            tracker.remove_phantoms(self.min_found_frames, self.observer.as_mut());
            let visible = tracker.visible_count();
            classes.insert(
                *class,
                ClassReport {
                    tracked: tracker.objects().len(),
                    visible,
                    retired: tracker.objects().len() - visible,
                },
            );
        }

        TrackingReport {
            frames_processed: self.frame_count,
            classes,
        }
    }
}
