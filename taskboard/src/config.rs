//! Configuration loaded with figment.
//!
//! Sources, later overriding earlier:
//! 1. Built-in defaults
//! 2. `taskboard.toml`, `taskboard.yaml`, `taskboard.json` in the working directory
//! 3. An explicit file (`--config`), format picked by extension
//! 4. `TASKBOARD_`-prefixed environment variables; `__` separates nested keys,
//!    e.g. `TASKBOARD_DRAG__ACTIVATION_DISTANCE=8`

use crate::drag::DEFAULT_ACTIVATION_DISTANCE;
use crate::error::{BoardError, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TASKBOARD_";

/// Base name of discovered config files
const CONFIG_STEM: &str = "taskboard";

/// Drag gesture tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Pixels the pointer must travel before a press becomes a drag
    pub activation_distance: f64,
    /// Restore the pre-gesture board when persisting a drop fails
    pub revert_on_failure: bool,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            activation_distance: DEFAULT_ACTIVATION_DISTANCE,
            revert_on_failure: false,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskboardConfig {
    /// Storage root
    pub data_dir: PathBuf,
    /// Default acting user
    pub actor: Option<String>,
    pub drag: DragConfig,
    /// `EnvFilter` directive used when no verbosity flag is given
    pub log_filter: Option<String>,
}

impl Default for TaskboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".taskboard"),
            actor: None,
            drag: DragConfig::default(),
            log_filter: None,
        }
    }
}

impl TaskboardConfig {
    /// Load from the working directory, an optional explicit file and the environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::load_from(&cwd, explicit)
    }

    /// Load with config file discovery rooted at `dir`
    pub fn load_from(dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(dir, explicit)?)
    }

    /// Extract from an already built figment
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        debug!(data_dir = %config.data_dir.display(), "configuration loaded");
        Ok(config)
    }

    /// Build the layered figment
    pub fn figment(dir: &Path, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join(format!("{CONFIG_STEM}.toml"))))
            .merge(Yaml::file(dir.join(format!("{CONFIG_STEM}.yaml"))))
            .merge(Json::file(dir.join(format!("{CONFIG_STEM}.json"))));

        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(BoardError::invalid_value(
                    "config",
                    format!("{} is not a file", path.display()),
                ));
            }
            debug!(path = %path.display(), "loading explicit config file");
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let temp = TempDir::new().unwrap();
        let config = TaskboardConfig::load_from(temp.path(), None).unwrap();
        assert_eq!(config.data_dir, PathBuf::from(".taskboard"));
        assert_eq!(config.drag.activation_distance, 5.0);
        assert!(!config.drag.revert_on_failure);
        assert!(config.actor.is_none());
    }

    #[test]
    fn test_discovered_toml() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("taskboard.toml"),
            "actor = \"alice\"\n[drag]\nrevert_on_failure = true\n",
        )
        .unwrap();

        let config = TaskboardConfig::load_from(temp.path(), None).unwrap();
        assert_eq!(config.actor.as_deref(), Some("alice"));
        assert!(config.drag.revert_on_failure);
        // Unset nested keys keep their defaults
        assert_eq!(config.drag.activation_distance, 5.0);
    }

    #[test]
    fn test_explicit_file_overrides_discovered() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("taskboard.toml"), "actor = \"alice\"\n").unwrap();
        let explicit = temp.path().join("custom.yaml");
        std::fs::write(&explicit, "actor: bob\ndrag:\n  activation_distance: 0\n").unwrap();

        let config = TaskboardConfig::load_from(temp.path(), Some(&explicit)).unwrap();
        assert_eq!(config.actor.as_deref(), Some("bob"));
        assert_eq!(config.drag.activation_distance, 0.0);
    }

    #[test]
    fn test_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let err = TaskboardConfig::load_from(temp.path(), Some(&temp.path().join("nope.toml")))
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidValue { .. }));
    }

    #[test]
    fn test_malformed_value_is_config_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("taskboard.json"),
            r#"{"drag": {"activation_distance": "far"}}"#,
        )
        .unwrap();
        let err = TaskboardConfig::load_from(temp.path(), None).unwrap_err();
        assert!(matches!(err, BoardError::Config(_)));
    }
}
