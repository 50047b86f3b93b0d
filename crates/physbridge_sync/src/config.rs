//! Scene configuration.
//!
//! Loaded from TOML, every field optional:
//!
//! ```toml
//! fixed_time_step = 0.016666668
//! rate_limit = true
//! engine_script = "ammo.js"
//! event_backlog_warning = 1024
//! zero_copy = true
//!
//! [gravity]
//! x = 0.0
//! y = -9.8
//! z = 0.0
//! ```

use crate::error::{SyncError, SyncResult};
use physbridge_shared::command::InitParams;
use physbridge_shared::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default solver step, seconds.
pub const DEFAULT_FIXED_TIME_STEP: f32 = 1.0 / 60.0;

/// Default pending-event count above which the scene warns.
pub const DEFAULT_EVENT_BACKLOG_WARNING: usize = 1024;

/// Configuration for a [`crate::Scene`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Fixed internal step of the worker's solver.
    pub fixed_time_step: f32,
    /// Whether the worker rate-limits its own stepping.
    pub rate_limit: bool,
    /// Engine script the worker loads.
    pub engine_script: String,
    /// Gravity to set after init. Worker default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gravity: Option<Vec3>,
    /// Pending events above which a backlog warning is logged. Events
    /// are never dropped.
    pub event_backlog_warning: usize,
    /// Move report buffers instead of copying them, when the transport allows.
    pub zero_copy: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            fixed_time_step: DEFAULT_FIXED_TIME_STEP,
            rate_limit: true,
            engine_script: String::from("ammo.js"),
            gravity: None,
            event_backlog_warning: DEFAULT_EVENT_BACKLOG_WARNING,
            zero_copy: true,
        }
    }
}

impl SceneConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if the document does not parse or a
    /// value is out of range.
    pub fn from_toml_str(source: &str) -> SyncResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] naming the first bad field.
    pub fn validate(&self) -> SyncResult<()> {
        if !self.fixed_time_step.is_finite() || self.fixed_time_step <= 0.0 {
            return Err(SyncError::Config(format!(
                "fixed_time_step must be positive, got {}",
                self.fixed_time_step
            )));
        }
        if self.event_backlog_warning == 0 {
            return Err(SyncError::Config("event_backlog_warning must be at least 1".into()));
        }
        Ok(())
    }

    /// Payload of the `init` command.
    #[must_use]
    pub fn init_params(&self) -> InitParams {
        InitParams {
            fixed_time_step: self.fixed_time_step,
            rate_limit: self.rate_limit,
            engine_script: self.engine_script.clone(),
            gravity: self.gravity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = SceneConfig::from_toml_str("").unwrap();
        assert_eq!(config, SceneConfig::default());
        assert!((config.fixed_time_step - 1.0 / 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_document() {
        let config = SceneConfig::from_toml_str(
            r#"
            rate_limit = false
            engine_script = "engine/bullet.js"

            [gravity]
            x = 0.0
            y = -9.8
            z = 0.0
            "#,
        )
        .unwrap();
        assert!(!config.rate_limit);
        assert_eq!(config.engine_script, "engine/bullet.js");
        assert_eq!(config.gravity, Some(Vec3::new(0.0, -9.8, 0.0)));
        assert_eq!(config.event_backlog_warning, DEFAULT_EVENT_BACKLOG_WARNING);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            SceneConfig::from_toml_str("fixed_time_step = 0.0"),
            Err(SyncError::Config(_))
        ));
        assert!(matches!(
            SceneConfig::from_toml_str("event_backlog_warning = 0"),
            Err(SyncError::Config(_))
        ));
        assert!(matches!(SceneConfig::from_toml_str("rate_limit = 3"), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = SceneConfig::from_file("/nonexistent/physbridge.toml").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
