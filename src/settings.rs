//! Tunable scoring settings, serializable so hosts can persist or ship
//! overrides as JSON

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Flat score for clearing a level
    pub base_clear_score: u64,
    /// Bonus per full second finished under par
    pub time_bonus_per_sec: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_clear_score: 100,
            time_bonus_per_sec: 10.0,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
