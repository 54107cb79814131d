//! Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the transcription engine.
///
/// All fields default to platform-appropriate values; embedders and the
/// CLI override what they need. A JSON rendition of this struct is read
/// from the platform config directory when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory for cached model files. None uses the platform cache dir.
    pub model_dir: Option<PathBuf>,
    /// Explicit path to the inference module shared library. None walks
    /// the default search paths.
    pub module_path: Option<PathBuf>,
    /// Model to provision, by name or file path. None tries the built-in
    /// candidate list, most capable first.
    pub model: Option<String>,
    /// Ceiling on the number of samples handed to a single foreign call.
    /// Longer inputs are truncated, not rejected.
    pub max_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            module_path: None,
            model: None,
            max_samples: crate::engine::invoker::MAX_INVOCATION_SAMPLES,
        }
    }
}

/// Default config file location under the platform config directory.
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "sotto")
        .map(|dirs| dirs.config_dir().join("config.json"))
        .unwrap_or_else(|| PathBuf::from("sotto.json"))
}

impl EngineConfig {
    /// Load the configuration from the default location, falling back to
    /// defaults when the file is absent. An unreadable file is reported
    /// and ignored rather than failing startup.
    pub fn load_default() -> Self {
        let path = default_config_path();
        match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(config) => {
                    tracing::debug!("loaded engine config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "invalid config at {} ({}); using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_yields_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert!(config.model.is_none());
        assert!(config.module_path.is_none());
        assert_eq!(
            config.max_samples,
            crate::engine::invoker::MAX_INVOCATION_SAMPLES
        );
    }

    #[test]
    fn test_partial_json_overrides_one_field() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"model": "ggml-tiny.en.bin"}"#).unwrap();
        assert_eq!(config.model.as_deref(), Some("ggml-tiny.en.bin"));
        assert!(config.model_dir.is_none());
    }

    #[test]
    fn test_config_survives_serialization() {
        let config = EngineConfig {
            model: Some("custom.bin".into()),
            max_samples: 1000,
            ..Default::default()
        };
        let text = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.model.as_deref(), Some("custom.bin"));
        assert_eq!(back.max_samples, 1000);
    }
}
