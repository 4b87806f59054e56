//! Configuration loaded from `harvest.toml`.
//!
//! Every field has a default, so the file is optional. Relative paths in
//! the file are resolved against the file's own directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::AuthConfig;
use crate::browser::BrowserEngineConfig;
use crate::collector::CollectionConfig;
use crate::navigator::RetryPolicy;
use crate::pacing::PacingConfig;

/// Name `prefer` discovers in its standard locations (`./harvest.toml`,
/// the user config directory, ...) when no path is given.
pub const CONFIG_NAME: &str = "harvest";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie jar written after a successful login.
    pub path: String,
    /// Saved sessions older than this are discarded.
    pub max_age_hours: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: "cookies_twitter.json".to_string(),
            max_age_hours: 8,
        }
    }
}

impl SessionConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours * 60 * 60)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Archive that is seeded from and rewritten by `collect`.
    pub archive: String,
    /// Query targets file.
    pub targets: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            archive: "tweets.json".to_string(),
            targets: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Abort images, stylesheets and fonts while logging in.
    pub block_resources: bool,
    pub paths: PathsConfig,
    pub session: SessionConfig,
    pub navigation: RetryPolicy,
    pub auth: AuthConfig,
    pub collection: CollectionConfig,
    pub pacing: PacingConfig,
    pub browser: BrowserEngineConfig,
    /// File this configuration was read from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_resources: true,
            paths: PathsConfig::default(),
            session: SessionConfig::default(),
            navigation: RetryPolicy::default(),
            auth: AuthConfig::default(),
            collection: CollectionConfig::default(),
            pacing: PacingConfig::default(),
            browser: BrowserEngineConfig::default(),
            source_path: None,
        }
    }
}

impl Config {
    /// Load from `explicit` if given, else from a file `prefer` discovers,
    /// else defaults.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::load_from_path(path)?,
            None => match Self::discover().await {
                Some(path) => Self::load_from_path(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Use prefer for file discovery only; parsing stays with serde.
    async fn discover() -> Option<PathBuf> {
        match prefer::load(CONFIG_NAME).await {
            Ok(found) => found.source_path().map(|p| p.to_path_buf()),
            Err(e) => {
                debug!("Config discovery found nothing: {}", e);
                None
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.source_path = Some(path.to_path_buf());
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pacing.validate().map_err(ConfigError::Invalid)?;
        if self.navigation.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "navigation.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.auth.login_urls.is_empty() {
            return Err(ConfigError::Invalid(
                "auth.login_urls must list at least one endpoint".to_string(),
            ));
        }
        if self.session.max_age_hours == 0 {
            return Err(ConfigError::Invalid(
                "session.max_age_hours must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory relative paths are resolved against: the config file's
    /// directory, or the working directory.
    pub fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Expand `~` and resolve relative paths against [`Config::base_dir`].
    pub fn resolve_path(&self, path_str: &str) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    pub fn session_path(&self) -> PathBuf {
        self.resolve_path(&self.session.path)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.resolve_path(&self.paths.archive)
    }

    pub fn targets_path(&self) -> Option<PathBuf> {
        self.paths.targets.as_deref().map(|p| self.resolve_path(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.max_age(), Duration::from_secs(8 * 3600));
        assert_eq!(config.navigation.max_attempts, 3);
        assert_eq!(config.collection.stall_limit, 3);
        assert_eq!(config.auth.login_urls.len(), 4);
        assert!(config.block_resources);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            block_resources = false

            [collection]
            time_budget = 600

            [pacing]
            delay_min_ms = 1000
            delay_max_ms = 2000
            "#,
        )
        .unwrap();

        assert!(!config.block_resources);
        assert_eq!(config.collection.time_budget, Duration::from_secs(600));
        assert_eq!(config.collection.content_wait, Duration::from_secs(15));
        assert_eq!(config.pacing.delay_min_ms, 1000);
        assert_eq!(config.pacing.scroll_min, 500);
        assert_eq!(config.session.path, "cookies_twitter.json");
    }

    #[test]
    fn test_rejects_fixed_delay() {
        let config = Config::parse("[pacing]\ndelay_min_ms = 5000\ndelay_max_ms = 5000").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_inverted_scroll() {
        let config = Config::parse("[pacing]\nscroll_min = 900\nscroll_max = 100").unwrap();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_paths_resolve_against_config_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("harvest.toml");
        std::fs::write(
            &path,
            "[paths]\narchive = \"out/tweets_2024.json\"\ntargets = \"/etc/targets.toml\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).await.unwrap();

        assert_eq!(config.archive_path(), dir.path().join("out/tweets_2024.json"));
        assert_eq!(config.targets_path(), Some(PathBuf::from("/etc/targets.toml")));
        assert_eq!(config.session_path(), dir.path().join("cookies_twitter.json"));
    }

    #[test]
    fn test_custom_indicators() {
        let config = Config::parse(
            r#"
            [[auth.indicators]]
            name = "timeline"
            selector = "[aria-label='Timeline']"
            "#,
        )
        .unwrap();
        assert_eq!(config.auth.indicators.len(), 1);
        assert_eq!(config.auth.indicators[0].name, "timeline");
    }

    #[test]
    fn test_sample_config_parses() {
        let config = Config::parse(include_str!("../demos/harvest.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.paths.targets.as_deref(), Some("targets.toml"));

        let targets =
            crate::models::parse_targets(include_str!("../demos/targets.toml"), "targets.toml")
                .unwrap();
        assert_eq!(targets.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_error() {
        let dir = tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn test_explicit_file_is_validated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[navigation]\nmax_attempts = 0\n").unwrap();

        let err = Config::load(Some(&path)).await.unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
