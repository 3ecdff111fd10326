use log::info;

use crate::detection::Detection;
use crate::motion::ObjectClass;

/// Lifecycle transitions worth reporting to the outside world.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEvent {
    /// A detection could not be matched and started a new object.
    Created {
        class: ObjectClass,
        index: usize,
        seed: Detection,
    },
    /// An object left the belt's visible zone.
    Retired {
        class: ObjectClass,
        index: usize,
        found_frames: u32,
        last: Detection,
    },
    /// End-of-stream cleanup dropped an object seen on too few frames.
    PhantomRemoved {
        class: ObjectClass,
        found_frames: u32,
        last: Detection,
    },
}

/// Receives lifecycle events from trackers.
pub trait TrackObserver {
    fn on_event(&mut self, event: &TrackEvent);
}

/// Default observer: forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TrackObserver for LogObserver {
    fn on_event(&mut self, event: &TrackEvent) {
        match event {
            TrackEvent::Created { class, index, seed } => {
                info!("new {} #{} found at ({:.1}, {:.1})", class, index, seed.x, seed.y);
            }
            TrackEvent::Retired {
                class,
                index,
                found_frames,
                last,
            } => {
                info!(
                    "{} #{} marked as invisible after {} frames, last seen at ({:.1}, {:.1})",
                    class, index, found_frames, last.x, last.y
                );
            }
            TrackEvent::PhantomRemoved {
                class,
                found_frames,
                last,
            } => {
                info!(
                    "removed phantom {} found on {} frames near ({:.1}, {:.1})",
                    class, found_frames, last.x, last.y
                );
            }
        }
    }
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl TrackObserver for NullObserver {
    fn on_event(&mut self, _event: &TrackEvent) {}
}

impl<F> TrackObserver for F
where
    F: FnMut(&TrackEvent),
{
    fn on_event(&mut self, event: &TrackEvent) {
        self(event)
    }
}
