use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use telemed_core::{clamp_research_results, Language, SessionSettings, DEFAULT_RESEARCH_RESULTS};
use telemed_engine::{ApiSettings, DEFAULT_BASE_URL};
use thiserror::Error;
use url::Url;

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "telemed.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: ron::error::SpannedError,
    },
    #[error("invalid base_url {value:?}: {source}")]
    BaseUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("unsupported default_language {0:?} (expected \"en\" or \"fr\")")]
    Language(String),
}

/// Settings read from the RON configuration file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub health_timeout_secs: u64,
    pub notice_ttl_secs: u64,
    pub default_language: String,
    pub default_result_count: u32,
    pub log_level: String,
    pub log_destination: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        let api = ApiSettings::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: api.connect_timeout.as_secs(),
            request_timeout_secs: api.request_timeout.as_secs(),
            health_timeout_secs: api.health_timeout.as_secs(),
            notice_ttl_secs: 5,
            default_language: Language::En.code().to_string(),
            default_result_count: u32::from(DEFAULT_RESEARCH_RESULTS),
            log_level: "info".to_string(),
            log_destination: LogDestination::File,
        }
    }
}

impl AppConfig {
    pub fn api_settings(&self) -> Result<ApiSettings, ConfigError> {
        let base_url = Url::parse(&self.base_url).map_err(|source| ConfigError::BaseUrl {
            value: self.base_url.clone(),
            source,
        })?;
        Ok(ApiSettings {
            base_url,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            health_timeout: Duration::from_secs(self.health_timeout_secs),
            ..ApiSettings::default()
        })
    }

    pub fn language(&self) -> Result<Language, ConfigError> {
        Language::from_code(&self.default_language)
            .ok_or_else(|| ConfigError::Language(self.default_language.clone()))
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            notice_ttl: Duration::from_secs(self.notice_ttl_secs),
            language: self.language().unwrap_or_default(),
            research_results: clamp_research_results(self.default_result_count),
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        self.api_settings()?;
        self.language()?;
        Ok(self)
    }
}

/// Loads the configuration at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };

    let config: AppConfig = ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    config.validate()
}
