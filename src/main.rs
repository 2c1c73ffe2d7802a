//! MCP Authgate - MCP server with authorization fallback
//!
//! Accepts credentials in the `Authorization` header, falling back to the
//! `key` and `auth` URL parameters for clients that cannot set headers.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use mcp_authgate::{cli::Cli, config::Config, gateway::Gateway, setup_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(cli.effective_log_level(), cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            cli.apply_overrides(&mut config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.bind_address(),
        "Starting MCP Authgate"
    );

    if let Err(e) = Gateway::new(config).run().await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}
