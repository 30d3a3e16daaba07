use crate::autosave::DEFAULT_AUTOSAVE_DELAY;
use crate::dnd::DEFAULT_ACTIVATION_DISTANCE;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "article-editor.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Snapshots kept for undo/redo
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Quiet period before an autosave, in milliseconds
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,

    /// Pointer travel (px) before a press becomes a drag
    #[serde(default = "default_drag_activation_distance")]
    pub drag_activation_distance: f64,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_autosave_delay_ms() -> u64 {
    DEFAULT_AUTOSAVE_DELAY.as_millis() as u64
}

fn default_drag_activation_distance() -> f64 {
    DEFAULT_ACTIVATION_DISTANCE
}

impl EditorConfig {
    /// Load config from a directory, or defaults if it has none
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if !path.exists() {
            return Ok(EditorConfig::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            autosave_delay_ms: default_autosave_delay_ms(),
            drag_activation_distance: default_drag_activation_distance(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "historyCapacity": 10,
            "autosaveDelayMs": 500
        }"#;

        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.autosave_delay(), Duration::from_millis(500));
        assert_eq!(config.drag_activation_distance, 8.0);
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.autosave_delay_ms, 2000);
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap(), EditorConfig::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{"historyCapacity": 5}"#).unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap().history_capacity, 5);

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "nope").unwrap();
        assert!(matches!(
            EditorConfig::load(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
