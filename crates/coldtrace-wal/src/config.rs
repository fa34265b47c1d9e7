use garde::Validate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WalConfig {
    /// Path of the JSON-lines journal file. Parent directories and the file
    /// itself are created on first open.
    #[garde(length(min = 1))]
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "data/readings.jsonl".to_string()
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}
