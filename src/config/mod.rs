//! Configuration models for .followctl/config.json.
//!
//! Every field has a default, so a missing file or a partial file both load
//! cleanly.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file path.
pub const CONFIG_FILE: &str = ".followctl/config.json";
/// Default tokens file path.
pub const TOKENS_FILE: &str = ".followctl/tokens.txt";

/// Maximum number of channels a Twitch account may follow.
pub const DEFAULT_FOLLOW_LIMIT: u64 = 2000;

/// Twitch API endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// OAuth token validation endpoint.
    #[serde(default = "default_validate_url")]
    pub validate_url: String,
    /// Base URL of the Helix API.
    #[serde(default = "default_helix_url")]
    pub helix_url: String,
    /// Base URL of the legacy Kraken API.
    #[serde(default = "default_kraken_url")]
    pub kraken_url: String,
    /// Accept header pinning the Kraken API version.
    #[serde(default = "default_kraken_accept")]
    pub kraken_accept: String,
    /// Page size requested from the follows listing. Server default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

fn default_validate_url() -> String {
    "https://id.twitch.tv/oauth2/validate".to_string()
}

fn default_helix_url() -> String {
    "https://api.twitch.tv/helix".to_string()
}

fn default_kraken_url() -> String {
    "https://api.twitch.tv/kraken".to_string()
}

fn default_kraken_accept() -> String {
    "application/vnd.twitchtv.v5+json".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            validate_url: default_validate_url(),
            helix_url: default_helix_url(),
            kraken_url: default_kraken_url(),
            kraken_accept: default_kraken_accept(),
            page_size: None,
        }
    }
}

/// Limits enforced before mutating follows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LimitsConfig {
    /// Accounts following this many channels or more may not follow another.
    #[serde(default = "default_follow_limit")]
    pub follow_limit: u64,
}

fn default_follow_limit() -> u64 {
    DEFAULT_FOLLOW_LIMIT
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            follow_limit: default_follow_limit(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds. Client default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("followctl/{}", crate::VERSION)
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Main configuration for followctl.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Twitch API endpoints.
    #[serde(default)]
    pub api: ApiConfig,
    /// Follow limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
    /// Path of the file holding one OAuth token per line.
    #[serde(default = "default_tokens_file")]
    pub tokens_file: String,
}

fn default_tokens_file() -> String {
    TOKENS_FILE.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            limits: LimitsConfig::default(),
            http: HttpConfig::default(),
            tokens_file: default_tokens_file(),
        }
    }
}

/// Error type for config operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Error reading the config file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Error parsing the config file JSON.
    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),
    /// A value was present but unusable.
    #[error("Invalid value for {key}: expected {expected}")]
    InvalidValue {
        /// Dotted key of the offending field.
        key: String,
        /// Description of what was expected.
        expected: String,
    },
}

impl AppConfig {
    /// Load configuration from a file, or return defaults if file doesn't exist.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to config file. Defaults to `.followctl/config.json` if None.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        let config: AppConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that loaded values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, url) in [
            ("api.validate_url", &self.api.validate_url),
            ("api.helix_url", &self.api.helix_url),
            ("api.kraken_url", &self.api.kraken_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    expected: "an http:// or https:// URL".into(),
                });
            }
        }
        if self.limits.follow_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "limits.follow_limit".into(),
                expected: "positive integer".into(),
            });
        }
        if self.api.page_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "api.page_size".into(),
                expected: "positive integer".into(),
            });
        }
        Ok(())
    }

    /// Path of the tokens file.
    pub fn tokens_path(&self) -> PathBuf {
        PathBuf::from(&self.tokens_file)
    }
}
