//! Capture configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::gesture::GestureCatalog;
use crate::recorder::layout::DEFAULT_EXTENSION;
use crate::recorder::session::DEFAULT_BUFFER_BYTES;
use crate::utils::error::{CaptureError, CaptureResult};

/// Environment variable overriding `dataRoot`
pub const DATA_ROOT_ENV: &str = "COPYCAT_DATA_ROOT";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureConfig {
    /// Directory under which `<phrase>/<session>/` trees are written
    pub data_root: PathBuf,

    /// Session file extension, without the dot
    pub file_extension: String,

    /// Body slots reported by the sensor
    pub body_count: usize,

    /// Session writer buffer size in bytes
    pub writer_buffer_bytes: usize,

    /// Completing the start gesture chain arms recording
    pub auto_start_on_gesture: bool,

    /// Pacing for polled sensor sources; 0 replays as fast as possible
    pub tick_interval_ms: u64,

    pub gestures: GestureCatalog,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("PhraseData"),
            file_extension: DEFAULT_EXTENSION.to_string(),
            body_count: 6,
            writer_buffer_bytes: DEFAULT_BUFFER_BYTES,
            auto_start_on_gesture: false,
            tick_interval_ms: 33,
            gestures: GestureCatalog::default(),
        }
    }
}

impl CaptureConfig {
    /// Read a JSON config file and validate it
    pub fn load(path: &Path) -> CaptureResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: CaptureConfig = serde_json::from_str(&content)
            .map_err(|e| CaptureError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        tracing::debug!("Loaded capture config from {:?}", path);
        Ok(config)
    }

    /// Apply `COPYCAT_DATA_ROOT` if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(root) = std::env::var_os(DATA_ROOT_ENV) {
            if !root.is_empty() {
                self.data_root = PathBuf::from(root);
            }
        }
        self
    }

    pub fn validate(&self) -> CaptureResult<()> {
        if self.body_count == 0 {
            return Err(CaptureError::Config("bodyCount must be at least 1".into()));
        }
        if self.writer_buffer_bytes == 0 {
            return Err(CaptureError::Config(
                "writerBufferBytes must be at least 1".into(),
            ));
        }
        let ext = &self.file_extension;
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            return Err(CaptureError::Config(format!(
                "fileExtension {:?} must be a bare extension",
                ext
            )));
        }
        self.gestures.validate().map_err(CaptureError::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::GestureStage;
    use tempfile::tempdir;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config: CaptureConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.body_count, 6);
        assert_eq!(config.file_extension, "txt");
        assert_eq!(config.writer_buffer_bytes, 25_000);
        assert!(!config.auto_start_on_gesture);
        assert_eq!(config.gestures, GestureCatalog::default());
    }

    #[test]
    fn test_load_overrides_thresholds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.json");
        fs::write(
            &path,
            r#"{
                "dataRoot": "/tmp/phrases",
                "bodyCount": 2,
                "gestures": [
                    {"name": "sw1", "database": "sw1.gbd", "stage": "confirmFirst",
                     "threshold": {"value": 0.4, "inclusive": false}},
                    {"name": "sw2", "database": "sw2.gbd", "stage": "confirmSecond",
                     "threshold": {"value": 0.3, "inclusive": true}}
                ]
            }"#,
        )
        .unwrap();

        let config = CaptureConfig::load(&path).unwrap();
        assert_eq!(config.data_root, PathBuf::from("/tmp/phrases"));
        assert_eq!(config.body_count, 2);
        assert_eq!(config.gestures.specs().len(), 2);
        let sw2 = config.gestures.find("sw2").unwrap();
        assert_eq!(sw2.stage, GestureStage::ConfirmSecond);
        assert!(sw2.threshold.passes(0.3));
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("capture.json");

        fs::write(&path, r#"{"bodyCount": 0}"#).unwrap();
        assert!(matches!(CaptureConfig::load(&path), Err(CaptureError::Config(_))));

        fs::write(&path, r#"{"fileExtension": ".txt"}"#).unwrap();
        assert!(matches!(CaptureConfig::load(&path), Err(CaptureError::Config(_))));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(CaptureConfig::load(&path), Err(CaptureError::Config(_))));
    }
}
