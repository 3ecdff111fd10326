use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Result, TrackError};
use crate::motion::{MotionProfile, ObjectClass};

fn default_min_found_frames() -> u32 {
    10
}

fn default_classes() -> BTreeMap<ObjectClass, MotionProfile> {
    ObjectClass::ALL
        .into_iter()
        .map(|class| (class, MotionProfile::for_class(class)))
        .collect()
}

/// Tracking session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Objects found on fewer frames are dropped as phantoms at end of stream
    #[serde(default = "default_min_found_frames")]
    pub min_found_frames: u32,
    /// One tracker is run for every class listed here
    #[serde(default = "default_classes")]
    pub classes: BTreeMap<ObjectClass, MotionProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_found_frames: default_min_found_frames(),
            classes: default_classes(),
        }
    }
}

impl Config {
    /// Load from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: Config = serde_json::from_str(&data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(TrackError::NoClasses);
        }
        for (class, profile) in &self.classes {
            profile.validate(*class)?;
        }
        Ok(())
    }
}
