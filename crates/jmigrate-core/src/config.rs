//! Run configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then environment
//! overrides, then whatever the caller applies with the `with_*` builders.

use crate::error::ConfigError;
use jmigrate_gateway::{ServiceEndpoints, TransformEngine, TransportPolicy, GEMINI_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the Gemini API key
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
/// Environment variable selecting the transformation engine
pub const ENV_ENGINE: &str = "JMIGRATE_ENGINE";

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Collaborator service locations
    pub services: ServiceEndpoints,
    /// Timeout and retry policy for collaborator calls
    pub transport: TransportSettings,
    /// Reasoning advisory provider
    pub advisor: AdvisorSettings,
    /// Pipeline behaviour
    pub migration: MigrationSettings,
}

impl MigrationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TOML file; missing tables and keys keep their defaults
    ///
    /// # Errors
    /// [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults or `path`, then environment-style overrides from `lookup`,
    /// then validation
    ///
    /// # Errors
    /// Any [`ConfigError`].
    pub fn load<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] for an unknown engine name.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|key| !key.trim().is_empty()) {
            self.advisor.api_key = Some(key);
        }
        if let Some(engine) = lookup(ENV_ENGINE) {
            self.migration.engine = engine.parse().map_err(ConfigError::Invalid)?;
        }
        Ok(self)
    }

    /// With transformation engine
    #[inline]
    #[must_use]
    pub fn with_engine(mut self, engine: TransformEngine) -> Self {
        self.migration.engine = engine;
        self
    }

    /// With dry-run preview on or off
    #[inline]
    #[must_use]
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.migration.preview_changes = preview;
        self
    }

    /// With an explicit log directory
    #[inline]
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migration.log_dir = Some(dir.into());
        self
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let services = [
            ("services.file_explorer", &self.services.file_explorer),
            ("services.file_parser", &self.services.file_parser),
            ("services.migration_tools", &self.services.migration_tools),
            ("services.maven", &self.services.maven),
        ];
        for (name, endpoint) in services {
            if endpoint.port == 0 {
                return Err(ConfigError::Invalid(format!("{name}.port must be non-zero")));
            }
            if endpoint.host.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name}.host must not be empty")));
            }
        }
        if self.transport.timeout_secs == 0 {
            return Err(ConfigError::Invalid("transport.timeout_secs must be non-zero".into()));
        }
        if self.advisor.timeout_secs == 0 {
            return Err(ConfigError::Invalid("advisor.timeout_secs must be non-zero".into()));
        }
        if self.migration.file_types.is_empty() {
            return Err(ConfigError::Invalid("migration.file_types must not be empty".into()));
        }
        if self.migration.descriptor_type.trim().is_empty() {
            return Err(ConfigError::Invalid("migration.descriptor_type must not be empty".into()));
        }
        Ok(())
    }
}

/// Collaborator call policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Budget per attempt (builds can take minutes)
    pub timeout_secs: u64,
    /// Extra attempts after the first
    pub max_retries: u32,
    /// First retry delay
    pub initial_backoff_ms: u64,
    /// Retry delay ceiling
    pub max_backoff_ms: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 5000,
        }
    }
}

impl TransportSettings {
    /// As a transport policy
    #[must_use]
    pub fn policy(&self) -> TransportPolicy {
        TransportPolicy {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// Advisory provider selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisorProvider {
    /// Google Gemini
    #[default]
    Gemini,
    /// Deterministic local summaries
    Offline,
}

/// Reasoning advisory settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorSettings {
    /// Provider
    pub provider: AdvisorProvider,
    /// Model name
    pub model: String,
    /// API root
    pub base_url: String,
    /// API key; `GEMINI_API_KEY` overrides
    pub api_key: Option<String>,
    /// Budget per call
    pub timeout_secs: u64,
}

impl Default for AdvisorSettings {
    fn default() -> Self {
        Self {
            provider: AdvisorProvider::Gemini,
            model: "gemini-pro".to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl AdvisorSettings {
    /// Advisory calls are retried once at most; the advisory is optional
    #[must_use]
    pub fn policy(&self) -> TransportPolicy {
        TransportPolicy {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: 1,
            ..TransportPolicy::default()
        }
    }

    /// Key to use with the Gemini provider, if any
    #[must_use]
    pub fn gemini_key(&self) -> Option<&str> {
        match self.provider {
            AdvisorProvider::Gemini => self.api_key.as_deref().filter(|key| !key.is_empty()),
            AdvisorProvider::Offline => None,
        }
    }
}

/// Pipeline behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Transformation engine
    pub engine: TransformEngine,
    /// File-name suffixes passed to discovery
    pub file_types: Vec<String>,
    /// Type tag identifying build descriptors among discovered files
    pub descriptor_type: String,
    /// Dry-run the transformation before asking for approval
    pub preview_changes: bool,
    /// Skip tests during the final clean install
    pub skip_tests_on_build: bool,
    /// Log, report and checkpoint directory; `<project>/migration_logs` when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            engine: TransformEngine::OpenRewrite,
            file_types: vec!["pom.xml".to_string(), "java".to_string()],
            descriptor_type: "xml".to_string(),
            preview_changes: true,
            skip_tests_on_build: false,
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_service_layout() {
        let config = MigrationConfig::new();
        assert_eq!(config.services.maven.base_url(), "http://localhost:8005");
        assert_eq!(config.transport.policy(), TransportPolicy::default());
        assert_eq!(config.migration.file_types, vec!["pom.xml", "java"]);
        assert_eq!(config.migration.descriptor_type, "xml");
        assert!(config.migration.preview_changes);
        config.validate().unwrap();
    }

    #[test]
    fn load_applies_overrides_over_file_then_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jmigrate.toml");
        std::fs::write(&path, "[migration]\nengine = \"openrewrite\"\n").unwrap();

        let config = MigrationConfig::load(Some(&path), |key| {
            (key == ENV_ENGINE).then(|| "moderne".to_string())
        })
        .unwrap();
        assert_eq!(config.migration.engine, TransformEngine::Moderne);

        std::fs::write(&path, "[migration]\nfile_types = []\n").unwrap();
        assert!(matches!(
            MigrationConfig::load(Some(&path), |_| None),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jmigrate.toml");
        std::fs::write(
            &path,
            r#"
[services.maven]
host = "build.internal"
port = 9005

[transport]
timeout_secs = 900

[migration]
engine = "moderne"
skip_tests_on_build = true
"#,
        )
        .unwrap();

        let config = MigrationConfig::from_file(&path).unwrap();
        assert_eq!(config.services.maven.base_url(), "http://build.internal:9005");
        assert_eq!(config.services.file_parser.port, 8002);
        assert_eq!(config.transport.timeout_secs, 900);
        assert_eq!(config.transport.max_retries, 2);
        assert_eq!(config.migration.engine, TransformEngine::Moderne);
        assert!(config.migration.skip_tests_on_build);
        assert_eq!(config.advisor.model, "gemini-pro");
    }

    #[test]
    fn environment_overrides_file_values() {
        let config = MigrationConfig::new()
            .apply_overrides(|key| match key {
                ENV_API_KEY => Some("secret".to_string()),
                ENV_ENGINE => Some("Moderne".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.advisor.gemini_key(), Some("secret"));
        assert_eq!(config.migration.engine, TransformEngine::Moderne);

        let err = MigrationConfig::new()
            .apply_overrides(|key| (key == ENV_ENGINE).then(|| "gradle".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn offline_provider_ignores_key() {
        let mut settings = AdvisorSettings {
            api_key: Some("secret".to_string()),
            ..AdvisorSettings::default()
        };
        settings.provider = AdvisorProvider::Offline;
        assert_eq!(settings.gemini_key(), None);
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut config = MigrationConfig::new();
        config.services.file_explorer.port = 0;
        assert!(config.validate().unwrap_err().to_string().contains("services.file_explorer.port"));

        let mut config = MigrationConfig::new();
        config.transport.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = MigrationConfig::new();
        config.migration.file_types.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[transport]\ntimeout_secs = \"soon\"\n").unwrap();
        assert!(matches!(
            MigrationConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            MigrationConfig::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
