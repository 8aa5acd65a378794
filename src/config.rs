//! Configuration types for media-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the harvesting pipeline
///
/// Loaded from a flat JSON file (`config.json` by convention). Every field
/// has a default, so an empty object `{}` is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Root directory that per-identity folders are created under (default: "./")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Minimum payload size in bytes for an asset to be kept (default: 10000)
    ///
    /// Responses below this threshold are treated as placeholder/error bodies
    /// rather than real media and are skipped after fetching.
    #[serde(default = "default_file_size_threshold")]
    pub file_size_threshold: u64,

    /// URL substring that activates the configurable slug-derived rule
    #[serde(default)]
    pub wordninja_trigger: Option<String>,

    /// URL prefix combined with the segmented slug by the trigger rule (default: empty)
    #[serde(default)]
    pub wordninja_download_url: String,

    /// Word-frequency dictionary for slug segmentation (one word per line,
    /// most frequent first). When unset, slugs are kept as a single token.
    #[serde(default)]
    pub word_model_path: Option<PathBuf>,

    /// Emit per-post and per-asset diagnostics
    #[serde(default)]
    pub verbose: bool,

    /// Platform API client id (opaque to the pipeline, consumed by adapters)
    #[serde(default)]
    pub client_id: Option<String>,

    /// Platform API client secret (opaque to the pipeline)
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Platform account username (opaque to the pipeline)
    #[serde(default)]
    pub username: Option<String>,

    /// Platform account password (opaque to the pipeline)
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            file_size_threshold: default_file_size_threshold(),
            wordninja_trigger: None,
            wordninja_download_url: String::new(),
            word_model_path: None,
            verbose: false,
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.wordninja_trigger.as_deref() == Some("") {
            return Err(Error::Config {
                message: "wordninja_trigger must not be an empty string".to_string(),
                key: Some("wordninja_trigger".to_string()),
            });
        }
        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./")
}

fn default_file_size_threshold() -> u64 {
    10_000
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.download_dir, PathBuf::from("./"));
        assert_eq!(config.file_size_threshold, 10_000);
        assert!(config.wordninja_trigger.is_none());
        assert_eq!(config.wordninja_download_url, "");
        assert!(!config.verbose);
    }

    #[test]
    fn recognized_keys_round_trip() {
        let raw = r#"{
            "download_dir": "/data/media",
            "file_size_threshold": 4096,
            "wordninja_trigger": "clips.example.com",
            "wordninja_download_url": "https://cdn.example.com/",
            "verbose": true,
            "client_id": "abc",
            "client_secret": "def"
        }"#;
        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.download_dir, PathBuf::from("/data/media"));
        assert_eq!(config.file_size_threshold, 4096);
        assert_eq!(config.wordninja_trigger.as_deref(), Some("clips.example.com"));
        assert_eq!(config.wordninja_download_url, "https://cdn.example.com/");
        assert!(config.verbose);
        assert_eq!(config.client_id.as_deref(), Some("abc"));
    }

    #[test]
    fn empty_trigger_is_rejected() {
        let config = Config {
            wordninja_trigger: Some(String::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"file_size_threshold": 1}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.file_size_threshold, 1);
    }

    #[test]
    fn from_file_missing_is_config_error() {
        let result = Config::from_file(Path::new("/nonexistent/config.json"));
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
