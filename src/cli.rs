//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

/// MCP server with header and URL parameter authorization fallback
#[derive(Parser, Debug)]
#[command(name = "mcp-authgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "MCP_AUTHGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "MCP_AUTHGATE_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "MCP_AUTHGATE_HOST")]
    pub host: Option<String>,

    /// Authorized API keys (space or comma separated). If none are configured, all requests are allowed.
    #[arg(
        short,
        long,
        num_args = 0..,
        value_delimiter = ',',
        env = "MCP_AUTHGATE_KEYS"
    )]
    pub keys: Option<Vec<String>>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_AUTHGATE_LOG_LEVEL")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "MCP_AUTHGATE_LOG_FORMAT")]
    pub log_format: Option<String>,
}

impl Cli {
    /// Effective log level; `--verbose` raises it to debug
    #[must_use]
    pub fn effective_log_level(&self) -> &str {
        if self.verbose { "debug" } else { &self.log_level }
    }

    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref host) = self.host {
            config.server.host.clone_from(host);
        }
        if let Some(ref keys) = self.keys {
            config.auth.keys.clone_from(keys);
        }
    }
}
