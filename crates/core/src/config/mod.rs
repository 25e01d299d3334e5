use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub timer: TimerConfig,
    pub ranking: RankingConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections fall back to their
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}

/// Where the competitor and record collections live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".cupstack"),
        }
    }
}

/// Timing screen behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Display refresh cadence.
    pub frame_interval_ms: u64,
    /// Stop requests earlier than this after the start are ignored.
    pub min_run_ms: u64,
    /// Pause between committing a run and showing its result.
    pub result_delay_ms: u64,
}

impl TimerConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn result_delay(&self) -> Duration {
        Duration::from_millis(self.result_delay_ms)
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            min_run_ms: 1_000,
            result_delay_ms: 1_500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Entries shown per event leaderboard.
    pub top: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { top: 5 }
    }
}
