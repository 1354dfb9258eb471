//! Bridge configuration
//!
//! Settings come from three layers, highest precedence first:
//!
//! 1. Environment variables (`OPEN_SPRINKLER_URL`, `MQTT_URL`, `MQTT_PREFIX`, ...)
//! 2. An optional TOML file, named by `OPENSPRINKLER2MQTT_CONFIG` or found at
//!    `<config dir>/opensprinkler2mqtt/config.toml`
//! 3. Built-in defaults
//!
//! Empty strings and zero durations count as "not set" on every layer. Values are
//! not validated beyond that; a malformed URL is only reported when it is used.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_OPENSPRINKLER_URL: &str = "http://localhost:8080";
pub const DEFAULT_MQTT_URL: &str = "tcp://localhost:1883";
pub const DEFAULT_MQTT_PREFIX: &str = "opensprinkler";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MQTT_CLIENT_ID: &str = "opensprinkler2mqtt";

pub const ENV_OPENSPRINKLER_URL: &str = "OPEN_SPRINKLER_URL";
pub const ENV_MQTT_URL: &str = "MQTT_URL";
pub const ENV_MQTT_PREFIX: &str = "MQTT_PREFIX";
pub const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL";
pub const ENV_MQTT_CLIENT_ID: &str = "MQTT_CLIENT_ID";
pub const ENV_PASSWORD_HASH: &str = "OPEN_SPRINKLER_PASSWORD";
pub const ENV_HTTP_TIMEOUT: &str = "HTTP_TIMEOUT";
pub const ENV_CONFIG_PATH: &str = "OPENSPRINKLER2MQTT_CONFIG";

const CONFIG_DIR: &str = "opensprinkler2mqtt";
const CONFIG_FILE: &str = "config.toml";

/// Errors raised while assembling the configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// One layer of possibly-missing settings.
///
/// Deserialized from the TOML file and built from the environment; layers are
/// combined with [`RawConfig::merge`] and turned into a [`BridgeConfig`] by
/// [`BridgeConfig::resolve`].
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub opensprinkler_url: Option<String>,
    pub mqtt_url: Option<String>,
    pub mqtt_prefix: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub mqtt_client_id: Option<String>,
    pub password_hash: Option<String>,
    pub http_timeout_secs: Option<u64>,
}

impl RawConfig {
    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading config file {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds a layer from an environment-style lookup. Empty values are treated
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            opensprinkler_url: get(ENV_OPENSPRINKLER_URL),
            mqtt_url: get(ENV_MQTT_URL),
            mqtt_prefix: get(ENV_MQTT_PREFIX),
            poll_interval_secs: parse_secs(ENV_POLL_INTERVAL, get(ENV_POLL_INTERVAL))?,
            mqtt_client_id: get(ENV_MQTT_CLIENT_ID),
            password_hash: get(ENV_PASSWORD_HASH),
            http_timeout_secs: parse_secs(ENV_HTTP_TIMEOUT, get(ENV_HTTP_TIMEOUT))?,
        })
    }

    /// Overlays `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: RawConfig) -> RawConfig {
        RawConfig {
            opensprinkler_url: overrides.opensprinkler_url.or(self.opensprinkler_url),
            mqtt_url: overrides.mqtt_url.or(self.mqtt_url),
            mqtt_prefix: overrides.mqtt_prefix.or(self.mqtt_prefix),
            poll_interval_secs: overrides.poll_interval_secs.or(self.poll_interval_secs),
            mqtt_client_id: overrides.mqtt_client_id.or(self.mqtt_client_id),
            password_hash: overrides.password_hash.or(self.password_hash),
            http_timeout_secs: overrides.http_timeout_secs.or(self.http_timeout_secs),
        }
    }
}

fn parse_secs(key: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    value
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue { key, value: v })
        })
        .transpose()
}

/// Fully resolved bridge settings, immutable after construction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Base URL of the OpenSprinkler controller
    pub opensprinkler_url: String,
    /// MQTT broker URL (`tcp://host:port`)
    pub mqtt_url: String,
    /// Topic prefix for every published and subscribed topic
    pub mqtt_prefix: String,
    /// Period between two status polls
    pub poll_interval: Duration,
    pub mqtt_client_id: String,
    /// Controller password, already MD5-hashed the way the controller expects it
    pub password_hash: Option<String>,
    /// Per-request timeout for controller calls; `None` waits indefinitely
    pub http_timeout: Option<Duration>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::resolve(RawConfig::default())
    }
}

impl BridgeConfig {
    /// Fills every missing or empty field with its default.
    pub fn resolve(raw: RawConfig) -> Self {
        fn or_default(value: Option<String>, default: &str) -> String {
            value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        }

        Self {
            opensprinkler_url: or_default(raw.opensprinkler_url, DEFAULT_OPENSPRINKLER_URL),
            mqtt_url: or_default(raw.mqtt_url, DEFAULT_MQTT_URL),
            mqtt_prefix: or_default(raw.mqtt_prefix, DEFAULT_MQTT_PREFIX),
            poll_interval: raw
                .poll_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
            mqtt_client_id: or_default(raw.mqtt_client_id, DEFAULT_MQTT_CLIENT_ID),
            password_hash: raw.password_hash.filter(|v| !v.trim().is_empty()),
            http_timeout: raw
                .http_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// Loads the configuration from the process environment and the config file.
    pub async fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok(), default_config_path()).await
    }

    /// Same as [`BridgeConfig::load`] with an injectable environment and
    /// fallback file location.
    ///
    /// A file named through `OPENSPRINKLER2MQTT_CONFIG` must exist; the fallback
    /// file is only read when present.
    pub async fn load_with<F>(lookup: F, fallback_file: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = lookup(ENV_CONFIG_PATH)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let file_layer = match explicit {
            Some(path) => {
                info!("Using config file {}", path.display());
                RawConfig::from_file(&path).await?
            }
            None => match fallback_file {
                Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
                    info!("Using config file {}", path.display());
                    RawConfig::from_file(&path).await?
                }
                _ => {
                    debug!("No config file found, using environment and defaults");
                    RawConfig::default()
                }
            },
        };

        let env_layer = RawConfig::from_lookup(lookup)?;
        Ok(Self::resolve(file_layer.merge(env_layer)))
    }
}

/// `<user config dir>/opensprinkler2mqtt/config.toml`, if the platform has one
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_input_resolves_to_defaults() {
        let config = BridgeConfig::resolve(RawConfig::default());

        assert_eq!(config.opensprinkler_url, "http://localhost:8080");
        assert_eq!(config.mqtt_url, "tcp://localhost:1883");
        assert_eq!(config.mqtt_prefix, "opensprinkler");
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.mqtt_client_id, "opensprinkler2mqtt");
        assert_eq!(config.password_hash, None);
        assert_eq!(config.http_timeout, None);
    }

    #[test]
    fn empty_strings_and_zero_durations_count_as_unset() {
        let config = BridgeConfig::resolve(RawConfig {
            opensprinkler_url: Some(String::new()),
            mqtt_prefix: Some("  ".into()),
            poll_interval_secs: Some(0),
            http_timeout_secs: Some(0),
            ..RawConfig::default()
        });

        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn environment_values_are_used() {
        let raw = RawConfig::from_lookup(env(&[
            ("OPEN_SPRINKLER_URL", "http://sprinkler.lan"),
            ("MQTT_URL", "tcp://broker:1884"),
            ("MQTT_PREFIX", "garden"),
            ("POLL_INTERVAL", "30"),
            ("HTTP_TIMEOUT", "5"),
        ]))
        .unwrap();
        let config = BridgeConfig::resolve(raw);

        assert_eq!(config.opensprinkler_url, "http://sprinkler.lan");
        assert_eq!(config.mqtt_url, "tcp://broker:1884");
        assert_eq!(config.mqtt_prefix, "garden");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.http_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn non_numeric_poll_interval_is_rejected() {
        let err = RawConfig::from_lookup(env(&[("POLL_INTERVAL", "soon")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "POLL_INTERVAL",
                ..
            }
        ));
    }

    #[test]
    fn environment_overrides_file() {
        let file = RawConfig {
            mqtt_prefix: Some("from-file".into()),
            mqtt_url: Some("tcp://file-broker:1883".into()),
            ..RawConfig::default()
        };
        let env_layer = RawConfig {
            mqtt_prefix: Some("from-env".into()),
            ..RawConfig::default()
        };

        let merged = file.merge(env_layer);
        assert_eq!(merged.mqtt_prefix.as_deref(), Some("from-env"));
        assert_eq!(merged.mqtt_url.as_deref(), Some("tcp://file-broker:1883"));
    }

    #[tokio::test]
    async fn explicit_config_file_is_loaded_and_overridden() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        tokio::fs::write(
            &path,
            "opensprinkler_url = \"http://10.0.0.5\"\nmqtt_prefix = \"yard\"\npoll_interval_secs = 3\n",
        )
        .await
        .unwrap();

        let path_str = path.to_string_lossy().to_string();
        let config = BridgeConfig::load_with(
            env(&[
                ("OPENSPRINKLER2MQTT_CONFIG", path_str.as_str()),
                ("MQTT_PREFIX", "override"),
            ]),
            None,
        )
        .await
        .unwrap();

        assert_eq!(config.opensprinkler_url, "http://10.0.0.5");
        assert_eq!(config.mqtt_prefix, "override");
        assert_eq!(config.poll_interval, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn missing_explicit_file_is_an_error() {
        let err = BridgeConfig::load_with(
            env(&[("OPENSPRINKLER2MQTT_CONFIG", "/nonexistent/bridge.toml")]),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn missing_fallback_file_is_skipped() {
        let config = BridgeConfig::load_with(
            env(&[]),
            Some(PathBuf::from("/nonexistent/opensprinkler2mqtt/config.toml")),
        )
        .await
        .unwrap();

        assert_eq!(config, BridgeConfig::default());
    }

    #[tokio::test]
    async fn unknown_keys_in_file_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        tokio::fs::write(&path, "mqtt_prefx = \"typo\"\n").await.unwrap();

        let err = RawConfig::from_file(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
