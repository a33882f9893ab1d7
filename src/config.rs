//! kubeguide configuration
//!
//! Read from `~/.config/kubeguide/config.toml`, then overridden by
//! `KUBEGUIDE_*` environment variables. A missing default file means defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use kubeguide_k8s::{DEFAULT_CACHE_TTL, DEFAULT_REQUEST_TIMEOUT, UnmappedPolicy};

pub const ENV_CACHE_TTL: &str = "KUBEGUIDE_CACHE_TTL_SECS";
pub const ENV_REQUEST_TIMEOUT: &str = "KUBEGUIDE_REQUEST_TIMEOUT_SECS";
pub const ENV_NAMESPACE: &str = "KUBEGUIDE_NAMESPACE";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub requests: RequestConfig,
    pub access: AccessConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// How long a discovery pass stays fresh
    pub cache_ttl_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequestConfig {
    /// Per-request timeout for every cluster call
    pub timeout_secs: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessConfig {
    /// Typed requests for built-in kinds without a registered type
    pub unmapped_builtins: UnmappedPolicy,
    /// Namespace used when a command is given none
    pub default_namespace: Option<String>,
}

impl Config {
    /// Get the default config path (~/.config/kubeguide/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".config").join("kubeguide").join("config.toml"))
    }

    /// Load the file at `path`, or the default file when it exists, then apply
    /// environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from `lookup`, normally the process environment
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CACHE_TTL) {
            self.discovery.cache_ttl_secs = parse_secs(ENV_CACHE_TTL, &value)?;
        }
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT) {
            self.requests.timeout_secs = parse_secs(ENV_REQUEST_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_NAMESPACE) {
            let value = value.trim();
            self.access.default_namespace = (!value.is_empty()).then(|| value.to_string());
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.discovery.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.requests.timeout_secs)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a whole number of seconds, got {:?}", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.access.unmapped_builtins, UnmappedPolicy::Reject);
        assert!(config.access.default_namespace.is_none());
    }

    #[test]
    fn test_parse_full_file() {
        let config = Config::from_toml(
            r#"
[discovery]
cache_ttl_secs = 60

[requests]
timeout_secs = 5

[access]
unmapped_builtins = "generic"
default_namespace = "team-a"
"#,
        )
        .unwrap();
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.access.unmapped_builtins, UnmappedPolicy::Generic);
        assert_eq!(config.access.default_namespace.as_deref(), Some("team-a"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml("[requests]\ntimeout_secs = 10\n").unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.cache_ttl(), DEFAULT_CACHE_TTL);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Config::from_toml("[discovery]\nttl = 5\n").is_err());
        assert!(Config::from_toml("[access]\nunmapped_builtins = \"maybe\"\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_CACHE_TTL, "120"),
            (ENV_REQUEST_TIMEOUT, " 15 "),
            (ENV_NAMESPACE, "team-b"),
        ]);
        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.cache_ttl(), Duration::from_secs(120));
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.access.default_namespace.as_deref(), Some("team-b"));
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = Config::default();
        let err = config
            .apply_env(|key| (key == ENV_CACHE_TTL).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_CACHE_TTL));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join("kubeguide-missing-config.toml");
        assert!(Config::load_from(&path).is_err());
    }
}
