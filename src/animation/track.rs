//! Animation track descriptors.

use serde::{Deserialize, Serialize};

/// One animation clip: name, free-form tag and duration in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationTrackInfo {
    pub name: String,
    /// Importer-defined data (glTF extras and the like).
    #[serde(default)]
    pub tag: serde_json::Value,
    pub duration: f32,
}

impl AnimationTrackInfo {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            tag: serde_json::Value::Null,
            duration,
        }
    }

    pub fn with_tag(mut self, tag: serde_json::Value) -> Self {
        self.tag = tag;
        self
    }

    /// Wrap `time` into `[0, duration)` when looping a track with positive duration.
    #[inline]
    pub fn wrap_time(&self, time: f32, looped: bool) -> f32 {
        if looped && self.duration > 0.0 {
            time.rem_euclid(self.duration)
        } else {
            time
        }
    }
}
