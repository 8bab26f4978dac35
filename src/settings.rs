//! Runtime settings

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::util::Result;

/// Tunables for animation playback, batching and draw ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Logging
    pub log_filter: String,

    // Playback
    pub loop_animations: bool,

    // Batching
    pub parallel_threshold: usize, // instances before updates go parallel

    // Draw order
    pub sort_opaque_front_to_back: bool,
    pub sort_translucent_back_to_front: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: "modelgraph=info".to_string(),
            loop_animations: true,
            parallel_threshold: 64,
            sort_opaque_front_to_back: true,
            sort_translucent_back_to_front: true,
        }
    }
}

impl Settings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        Ok(settings.validated())
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Clamp out-of-range values
    pub fn validated(mut self) -> Self {
        if self.parallel_threshold == 0 {
            self.parallel_threshold = 1;
        }
        self
    }
}
