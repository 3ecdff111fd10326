pub mod config;
pub mod detection;
pub mod error;
pub mod motion;
pub mod observer;
pub mod pairing;
pub mod session;
pub mod track;
pub mod tracker;
#[cfg(feature = "vision")]
pub mod vision;
#[cfg(feature = "vision")]
pub mod visualization;

// Re-export main types
pub use crate::config::Config;
pub use crate::detection::{load_recording, Detection, FrameDetections};
pub use crate::error::{Result, TrackError};
pub use crate::motion::{MotionProfile, ObjectClass};
pub use crate::observer::{LogObserver, NullObserver, TrackEvent, TrackObserver};
pub use crate::pairing::PairMerger;
pub use crate::session::{ClassReport, TrackingReport, TrackingSession};
pub use crate::track::TrackedObject;
pub use crate::tracker::Tracker;
