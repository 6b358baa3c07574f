use crate::StreamError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Streaming configuration: resident radius, queue sizing and per-tick budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Rings of sectors kept resident around the tracked sector. 1 gives 3x3.
    pub view_radius: u32,
    /// Capacity of each of the bake and destroy queues.
    pub queue_capacity: usize,
    /// Maximum chunk bakes performed per frame tick.
    pub bakes_per_tick: usize,
    /// Maximum chunk destroys performed per frame tick.
    pub destroys_per_tick: usize,
    /// How often a blocked producer or idle worker rechecks for cancellation.
    pub poll_interval_ms: u64,
    /// Directory for sector files. `None` keeps the world in memory only.
    pub save_dir: Option<PathBuf>,
    /// Save every resident sector when streaming stops.
    pub save_on_shutdown: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            view_radius: 1,
            queue_capacity: 4608,
            bakes_per_tick: 64,
            destroys_per_tick: 128,
            poll_interval_ms: 50,
            save_dir: None,
            save_on_shutdown: true,
        }
    }
}

impl StreamConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        let fail = |msg: &str| Err(StreamError::InvalidConfig(msg.to_string()));
        if self.queue_capacity == 0 {
            return fail("queue_capacity must be at least 1");
        }
        if self.bakes_per_tick == 0 || self.destroys_per_tick == 0 {
            return fail("per-tick budgets must be at least 1");
        }
        if self.poll_interval_ms == 0 {
            return fail("poll_interval_ms must be at least 1");
        }
        if self.view_radius > 16 {
            return fail("view_radius above 16 is not supported");
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, StreamError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let config: Self = serde_json::from_reader(std::fs::File::open(path)?)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_config_defaults() {
        let config = StreamConfig::default();
        assert_eq!(config.view_radius, 1);
        assert_eq!(config.queue_capacity, 4608);
        assert!(config.save_dir.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn json_overrides_selected_fields() {
        let config =
            StreamConfig::from_json_str(r#"{"view_radius": 2, "save_dir": "/tmp/w"}"#).unwrap();
        assert_eq!(config.view_radius, 2);
        assert_eq!(config.save_dir, Some(PathBuf::from("/tmp/w")));
        assert_eq!(config.bakes_per_tick, 64);
    }

    #[test]
    fn zero_budgets_rejected() {
        let err = StreamConfig::from_json_str(r#"{"bakes_per_tick": 0}"#).unwrap_err();
        assert!(matches!(err, StreamError::InvalidConfig(_)));
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("stream.json");
        std::fs::write(&path, r#"{"queue_capacity": 32}"#).unwrap();
        assert_eq!(StreamConfig::load(&path).unwrap().queue_capacity, 32);
    }
}
