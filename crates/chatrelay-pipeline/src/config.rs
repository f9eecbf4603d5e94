//! Pipeline timing and rendering settings.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by every tenant pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding snapshots and rendered-audio artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Period between drain attempts, in milliseconds.
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,

    /// Upper bound a reset waits for running tasks before aborting them.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Longest utterance handed to the renderer, in characters.
    #[serde(default = "default_max_render_chars")]
    pub max_render_chars: usize,

    /// Spoken before each message, e.g. "Message from".
    #[serde(default = "default_announce_prefix")]
    pub announce_prefix: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_drain_interval_ms() -> u64 {
    5_000
}

fn default_settle_delay_ms() -> u64 {
    1_000
}

fn default_max_render_chars() -> usize {
    200
}

fn default_announce_prefix() -> String {
    "Pesan dari".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            drain_interval_ms: default_drain_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            max_render_chars: default_max_render_chars(),
            announce_prefix: default_announce_prefix(),
        }
    }
}

impl PipelineConfig {
    /// Drain period; never zero, since a timer cannot tick at a zero period.
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms.max(1))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
