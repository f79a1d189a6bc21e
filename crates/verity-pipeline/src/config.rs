//! # Pipeline Configuration
//!
//! Loaded from YAML, then overridden from `VERITY_*` environment variables,
//! then validated. Every section has defaults, so an empty file is a valid
//! local configuration.
//!
//! Environment overrides:
//! - `VERITY_REGISTRY_HOST`, `VERITY_REGISTRY_PORT`
//! - `VERITY_RESOLVER_HOST`, `VERITY_RESOLVER_PORT`
//! - `VERITY_CACHE_TTL_SECS`
//! - `VERITY_VERIFICATION_BASE_URL`
//! - `VERITY_STORAGE_ROOT` (also selects the filesystem backend)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use verity_claim::{ClaimIdScheme, DEFAULT_CONTEXT, DEFAULT_TYPES};
use verity_core::DidMethodRegistry;

/// Host and port of a collaborating service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceEndpointConfig {
    /// Hostname or address.
    pub host: String,
    /// TCP port; must be non-zero.
    pub port: u16,
}

impl Default for ServiceEndpointConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Resolver endpoint, cache and accepted DID methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Hostname or address.
    pub host: String,
    /// TCP port; must be non-zero.
    pub port: u16,
    /// Cache lifetime in seconds; 0 disables caching.
    pub cache_ttl_secs: u64,
    /// DID methods the resolver accepts.
    pub known_methods: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cache_ttl_secs: 300,
            known_methods: DidMethodRegistry::DEFAULT_METHODS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl ResolverConfig {
    /// Cache lifetime as a [`Duration`].
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Method registry built from `known_methods`.
    pub fn method_registry(&self) -> DidMethodRegistry {
        DidMethodRegistry::new(self.known_methods.iter().cloned())
    }
}

/// Claim construction defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimConfig {
    /// Claims are published at `{verification_base_url}/{claim_id}`.
    pub verification_base_url: String,
    /// Prefix of generated claim ids.
    pub id_prefix: String,
    /// Hex digits after the prefix, 8 to 64.
    pub id_hex_len: usize,
    /// JSON-LD context placed first in every claim.
    pub default_context: String,
    /// Types placed first in every claim.
    pub default_types: Vec<String>,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            verification_base_url: "http://127.0.0.1:8000/verify/claim".to_string(),
            id_prefix: "claim_".to_string(),
            id_hex_len: 16,
            default_context: DEFAULT_CONTEXT.to_string(),
            default_types: DEFAULT_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl ClaimConfig {
    /// Claim id scheme from `id_prefix` and `id_hex_len`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if `id_hex_len` is out of range.
    pub fn id_scheme(&self) -> Result<ClaimIdScheme, ConfigError> {
        ClaimIdScheme::new(self.id_prefix.clone(), self.id_hex_len)
            .map_err(|e| ConfigError::Invalid(format!("claims.id_hex_len: {e}")))
    }
}

/// Where CAS blobs live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// In-process map; contents are lost on exit.
    #[default]
    Memory,
    /// One file per blob under `root`.
    Filesystem,
}

/// CAS backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which backend to use.
    pub backend: StorageKind,
    /// Required for the filesystem backend.
    pub root: Option<PathBuf>,
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerityConfig {
    /// Registry endpoint.
    pub registry: ServiceEndpointConfig,
    /// Resolver endpoint and cache.
    pub resolver: ResolverConfig,
    /// Claim defaults.
    pub claims: ClaimConfig,
    /// CAS backend.
    pub storage: StorageConfig,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("config file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The YAML did not parse into a configuration.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// An environment override did not parse.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// Rejected value.
        value: String,
    },
    /// A value or combination of values is not allowed.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl VerityConfig {
    /// Parse YAML. Does not apply overrides or validate.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file. Does not apply overrides or validate.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load a file, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `VERITY_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply `VERITY_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("VERITY_REGISTRY_HOST") {
            self.registry.host = host;
        }
        if let Some(port) = parsed(&lookup, "VERITY_REGISTRY_PORT")? {
            self.registry.port = port;
        }
        if let Some(host) = lookup("VERITY_RESOLVER_HOST") {
            self.resolver.host = host;
        }
        if let Some(port) = parsed(&lookup, "VERITY_RESOLVER_PORT")? {
            self.resolver.port = port;
        }
        if let Some(ttl) = parsed(&lookup, "VERITY_CACHE_TTL_SECS")? {
            self.resolver.cache_ttl_secs = ttl;
        }
        if let Some(url) = lookup("VERITY_VERIFICATION_BASE_URL") {
            self.claims.verification_base_url = url;
        }
        if let Some(root) = lookup("VERITY_STORAGE_ROOT") {
            self.storage.backend = StorageKind::Filesystem;
            self.storage.root = Some(PathBuf::from(root));
        }
        Ok(())
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, endpoint_host, port) in [
            ("registry", &self.registry.host, self.registry.port),
            ("resolver", &self.resolver.host, self.resolver.port),
        ] {
            if endpoint_host.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name}.host is empty")));
            }
            if port == 0 {
                return Err(ConfigError::Invalid(format!("{name}.port must be non-zero")));
            }
        }
        if self.resolver.known_methods.is_empty() {
            return Err(ConfigError::Invalid("resolver.known_methods is empty".into()));
        }
        self.claims.id_scheme()?;
        if self.claims.verification_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("claims.verification_base_url is empty".into()));
        }
        if self.storage.backend == StorageKind::Filesystem && self.storage.root.is_none() {
            return Err(ConfigError::Invalid(
                "storage.root is required for the filesystem backend".into(),
            ));
        }
        Ok(())
    }
}

fn parsed<F, T>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::InvalidEnv {
            var: var.to_string(),
            value,
        }),
    }
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
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = VerityConfig::default();
        config.validate().unwrap();
        assert_eq!(config.registry.port, 8080);
        assert_eq!(config.resolver.port, 8000);
        assert_eq!(config.resolver.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.claims.id_hex_len, 16);
        assert_eq!(config.storage.backend, StorageKind::Memory);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config = VerityConfig::from_yaml_str(
            "resolver:\n  cache_ttl_secs: 0\n  known_methods: [verity]\nclaims:\n  id_prefix: vc_\n",
        )
        .unwrap();
        assert_eq!(config.resolver.cache_ttl_secs, 0);
        assert_eq!(config.resolver.port, 8000);
        assert!(config.resolver.method_registry().contains("verity"));
        assert!(!config.resolver.method_registry().contains("web"));
        assert_eq!(config.claims.id_prefix, "vc_");
        assert_eq!(config.claims.id_hex_len, 16);
        assert_eq!(VerityConfig::from_yaml_str("").unwrap(), VerityConfig::default());
    }

    #[test]
    fn env_overrides_win() {
        let mut config = VerityConfig::default();
        config
            .apply_overrides(env(&[
                ("VERITY_REGISTRY_PORT", "9090"),
                ("VERITY_RESOLVER_HOST", "resolver.internal"),
                ("VERITY_CACHE_TTL_SECS", "30"),
                ("VERITY_STORAGE_ROOT", "/var/lib/verity"),
            ]))
            .unwrap();
        assert_eq!(config.registry.port, 9090);
        assert_eq!(config.resolver.host, "resolver.internal");
        assert_eq!(config.resolver.cache_ttl_secs, 30);
        assert_eq!(config.storage.backend, StorageKind::Filesystem);
        config.validate().unwrap();
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut config = VerityConfig::default();
        let err = config
            .apply_overrides(env(&[("VERITY_RESOLVER_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "VERITY_RESOLVER_PORT"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut c = VerityConfig::default();
        c.registry.port = 0;
        assert!(c.validate().is_err());

        let mut c = VerityConfig::default();
        c.resolver.host = " ".into();
        assert!(c.validate().is_err());

        let mut c = VerityConfig::default();
        c.resolver.known_methods.clear();
        assert!(c.validate().is_err());

        let mut c = VerityConfig::default();
        c.claims.id_hex_len = 65;
        assert!(c.validate().is_err());

        let mut c = VerityConfig::default();
        c.storage.backend = StorageKind::Filesystem;
        assert!(c.validate().is_err());
    }

    #[test]
    fn file_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("verity.yaml");
        std::fs::write(&path, "registry:\n  host: registry.internal\n").unwrap();
        let config = VerityConfig::from_file(&path).unwrap();
        assert_eq!(config.registry.host, "registry.internal");
        assert!(matches!(
            VerityConfig::from_file(&dir.path().join("missing.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
