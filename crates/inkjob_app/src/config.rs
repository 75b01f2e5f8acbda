//! Client configuration, read from an optional RON file.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```ron
//! (
//!     server_url: "http://ink.local:8000",
//!     max_job_secs: Some(600),
//! )
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use inkjob_engine::{
    AdmissionPolicy, EngineConfig, PollSettings, ResizeSettings, ServiceSettings,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_OUTPUT: &str = "inked_image.png";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub max_bytes: u64,
    pub max_width: u32,
    pub max_height: u32,
    pub jpeg_quality: f32,
    pub auto_resize: bool,
    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub max_job_secs: Option<u64>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_download_bytes: u64,
    /// Where a downloaded result is written when no path is given.
    pub output: PathBuf,
    /// Directory for downloaded artifacts; the system temp dir when unset.
    pub artifact_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let policy = AdmissionPolicy::default();
        let resize = ResizeSettings::default();
        let service = ServiceSettings::default();
        let poll = PollSettings::default();
        Self {
            server_url: service.base_url,
            max_bytes: policy.max_bytes,
            max_width: policy.max_width,
            max_height: policy.max_height,
            jpeg_quality: resize.quality,
            auto_resize: resize.enabled,
            poll_interval_ms: poll.interval.as_millis() as u64,
            settle_delay_ms: poll.settle_delay.as_millis() as u64,
            max_job_secs: None,
            connect_timeout_secs: service.connect_timeout.as_secs(),
            request_timeout_secs: service.request_timeout.as_secs(),
            max_download_bytes: service.max_download_bytes,
            output: PathBuf::from(DEFAULT_OUTPUT),
            artifact_dir: None,
        }
    }
}

impl ClientConfig {
    /// Reads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_ron(&text).map_err(|err| match err {
                    ConfigError::Parse { message, .. } => ConfigError::Parse {
                        path: path.to_path_buf(),
                        message,
                    },
                    other => other,
                })?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text).map_err(|err| ConfigError::Parse {
            path: PathBuf::new(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(ConfigError::Invalid {
                field: "max_width/max_height",
                reason: "must be positive".to_string(),
            });
        }
        if !(self.jpeg_quality > 0.0 && self.jpeg_quality <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "jpeg_quality",
                reason: format!("{} is outside (0, 1]", self.jpeg_quality),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            policy: AdmissionPolicy {
                max_bytes: self.max_bytes,
                max_width: self.max_width,
                max_height: self.max_height,
                ..AdmissionPolicy::default()
            },
            resize: ResizeSettings {
                enabled: self.auto_resize,
                quality: self.jpeg_quality,
                ..ResizeSettings::default()
            },
            service: ServiceSettings {
                base_url: self.server_url.clone(),
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                max_download_bytes: self.max_download_bytes,
            },
            poll: PollSettings {
                interval: Duration::from_millis(self.poll_interval_ms),
                settle_delay: Duration::from_millis(self.settle_delay_ms),
                max_duration: self.max_job_secs.map(Duration::from_secs),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_service_contract() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, "http://127.0.0.1:8000");
        assert_eq!(config.max_bytes, 10_000_000);
        assert_eq!((config.max_width, config.max_height), (3840, 2160));
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.settle_delay_ms, 500);
        assert_eq!(config.max_job_secs, None);
        assert_eq!(config.output, PathBuf::from("inked_image.png"));

        let engine = config.to_engine_config();
        assert_eq!(engine.poll, PollSettings::default());
        assert_eq!(engine.policy, AdmissionPolicy::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = ClientConfig::from_ron(
            r#"(server_url: "http://ink.local:9000", max_job_secs: Some(60), auto_resize: false)"#,
        )
        .unwrap();
        assert_eq!(config.server_url, "http://ink.local:9000");
        assert!(!config.auto_resize);
        assert_eq!(config.max_width, 3840);

        let engine = config.to_engine_config();
        assert_eq!(engine.poll.max_duration, Some(Duration::from_secs(60)));
        assert!(!engine.resize.enabled);
        assert_eq!(engine.service.base_url, "http://ink.local:9000");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = ClientConfig::from_ron("(poll_interval_ms: 0)").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "poll_interval_ms",
                ..
            }
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inkjob.ron");
        fs::write(&path, "(server_url: ").unwrap();
        let err = ClientConfig::load(Some(&path)).unwrap_err();
        match err {
            ConfigError::Parse { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_path_means_defaults() {
        assert_eq!(ClientConfig::load(None).unwrap(), ClientConfig::default());
    }
}
