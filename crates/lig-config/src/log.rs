//! Logging configuration.

use serde::{Deserialize, Serialize};

fn default_filter() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `LIGATURE_LOG`
    /// is not set.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}
