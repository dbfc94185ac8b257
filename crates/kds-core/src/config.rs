//! Console configuration
//!
//! Loaded from TOML, with a couple of environment overrides for
//! deployment. Example:
//!
//! ```toml
//! business_id = "bistro-42"
//! performance_window_hours = 12
//!
//! [api]
//! base_url = "https://api.example.com/v1"
//! timeout_secs = 10
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 200
//! max_delay_ms = 5000
//! ```

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use crate::types::BusinessId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding `api.base_url`
pub const ENV_API_URL: &str = "KDS_API_URL";
/// Environment variable overriding `business_id`
pub const ENV_BUSINESS_ID: &str = "KDS_BUSINESS_ID";

/// KDS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdsConfig {
    /// Tenant every store instance is bound to
    pub business_id: String,
    /// Remote API settings
    pub api: ApiConfig,
    /// Caller-level retry policy
    pub retry: RetryPolicy,
    /// Trailing window used for the performance snapshot on refresh
    pub performance_window_hours: u32,
}

/// Remote API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for KdsConfig {
    fn default() -> Self {
        Self {
            business_id: String::new(),
            api: ApiConfig::default(),
            retry: RetryPolicy::default(),
            performance_window_hours: 24,
        }
    }
}

impl KdsConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_business_id(mut self, id: impl Into<String>) -> Self {
        self.business_id = id.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file without validating it
    ///
    /// For callers that apply further overrides before `validate`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `KDS_API_URL` / `KDS_BUSINESS_ID` when set
    #[must_use]
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(
            std::env::var(ENV_API_URL).ok(),
            std::env::var(ENV_BUSINESS_ID).ok(),
        )
    }

    fn apply_overrides(mut self, api_url: Option<String>, business_id: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(id) = business_id.filter(|id| !id.trim().is_empty()) {
            self.business_id = id;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.business_id()?;
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("api.base_url", "must not be empty"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts", "must be at least 1"));
        }
        if self.performance_window_hours == 0 {
            return Err(ConfigError::invalid(
                "performance_window_hours",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// The configured tenant, validated
    pub fn business_id(&self) -> Result<BusinessId, ConfigError> {
        BusinessId::new(self.business_id.clone())
            .map_err(|_| ConfigError::invalid("business_id", "must not be empty"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_file() {
        let config = KdsConfig::from_toml_str(
            r#"
            business_id = "bistro-42"
            performance_window_hours = 12

            [api]
            base_url = "https://api.example.com/v1"
            timeout_secs = 5

            [retry]
            max_attempts = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.business_id().unwrap().as_str(), "bistro-42");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.base_delay_ms, 200);
        assert_eq!(config.performance_window_hours, 12);
    }

    #[test]
    fn minimal_file_uses_defaults() {
        let config = KdsConfig::from_toml_str("business_id = \"diner\"").unwrap();
        assert_eq!(config, KdsConfig::new().with_business_id("diner"));
    }

    #[test]
    fn business_id_is_required() {
        let err = KdsConfig::from_toml_str("").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "business_id", .. }));
    }

    #[test]
    fn rejects_invalid_values() {
        let err = KdsConfig::from_toml_str("business_id = \"a\"\n[retry]\nmax_attempts = 0")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "retry.max_attempts", .. }));

        let err = KdsConfig::from_toml_str("business_id = \"a\"\nperformance_window_hours = 0")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "performance_window_hours", .. }));

        assert!(matches!(
            KdsConfig::from_toml_str("business_id = ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn overrides_replace_non_blank_values() {
        let config = KdsConfig::new()
            .with_business_id("a")
            .apply_overrides(Some("http://kds.internal".to_string()), Some(" ".to_string()));
        assert_eq!(config.api.base_url, "http://kds.internal");
        assert_eq!(config.business_id, "a");
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "business_id = \"diner\"").unwrap();
        let config = KdsConfig::load(file.path()).unwrap();
        assert_eq!(config.business_id, "diner");

        let missing = KdsConfig::load("/definitely/not/here.toml");
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut partial = tempfile::NamedTempFile::new().unwrap();
        writeln!(partial, "performance_window_hours = 6").unwrap();
        assert!(KdsConfig::load(partial.path()).is_err());
        assert_eq!(KdsConfig::read(partial.path()).unwrap().performance_window_hours, 6);
    }
}
