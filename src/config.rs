//! Configuration management

use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::gateway::CredentialSet;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before resolving `env:` key references.
    /// A leading `~/` expands to the home directory. Loaded in order, later files override earlier.
    pub env_files: Vec<String>,
    /// Server configuration
    pub server: ServerConfig,
    /// Authorization configuration
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to (name or address)
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Authorization configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Accepted keys. Empty = open mode (every request allowed).
    /// Each entry is a literal or `env:VAR_NAME`.
    pub keys: Vec<String>,
}

impl AuthConfig {
    /// Resolve `env:` references and drop empty entries
    #[must_use]
    pub fn resolve_keys(&self) -> Vec<String> {
        self.keys
            .iter()
            .filter_map(|key| {
                let resolved = match key.strip_prefix("env:") {
                    Some(var_name) => env::var(var_name).unwrap_or_else(|_| key.clone()),
                    None => key.clone(),
                };
                if resolved.is_empty() {
                    tracing::warn!("Ignoring empty authorization key in configuration");
                    None
                } else {
                    Some(resolved)
                }
            })
            .collect()
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (MCP_AUTHGATE_ prefix)
        figment = figment.merge(Env::prefixed("MCP_AUTHGATE_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Env files must be in place before `env:` keys are resolved
        let applied = config.load_env_files();
        if applied > 0 {
            tracing::info!(applied, listed = config.env_files.len(), "Env files loaded");
        }

        Ok(config)
    }

    /// Apply `env_files` to the process environment, in order.
    ///
    /// Returns the number of files applied. Missing files are skipped and
    /// variables already set in the environment are left alone.
    fn load_env_files(&self) -> usize {
        let mut applied = 0;
        for entry in &self.env_files {
            let path = expand_home(entry);
            if !path.is_file() {
                tracing::debug!(path = %path.display(), "Env file not found, skipping");
                continue;
            }
            match dotenvy::from_path(&path) {
                Ok(()) => applied += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable env file");
                }
            }
        }
        applied
    }

    /// Materialize the immutable credential set
    #[must_use]
    pub fn credential_set(&self) -> CredentialSet {
        CredentialSet::new(self.auth.resolve_keys())
    }

    /// `host:port` string for logging
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Expand a leading `~/` to the user's home directory
fn expand_home(entry: &str) -> PathBuf {
    match (entry.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(entry),
    }
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        // "ms" must be checked before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(serde::de::Error::custom)
        } else {
            // Assume seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}
