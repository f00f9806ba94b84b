//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── server: ServerConfig          # Host, port, shutdown
//! ├── middleware: MiddlewareConfig  # CORS, request timeout
//! ├── service: ServiceConfig        # Extension map source, deployer
//! └── telemetry: TelemetryConfig    # Log format
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.

mod middleware;
mod server;
mod telemetry;

use std::process;

use anyhow::Context;
use clap::Parser;
use machinist_server::service::ServiceConfig;
use serde::{Deserialize, Serialize};

pub use self::middleware::MiddlewareConfig;
pub use self::server::ServerConfig;
pub use self::telemetry::TelemetryConfig;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "machinist")]
#[command(about = "ComfyUI workflow dependency resolver and machine deployment server")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// HTTP middleware configuration (CORS, timeouts).
    #[clap(flatten)]
    pub middleware: MiddlewareConfig,

    /// Extension map and deployer configuration.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// Log output configuration.
    #[clap(flatten)]
    pub telemetry: TelemetryConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is read first so clap's `env` lookups see its values.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Installs the global tracing subscriber.
    pub fn init_tracing(&self) {
        self.telemetry.init_tracing();
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.service
            .validate()
            .context("invalid service configuration")?;
        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        self.server.log();
        self.middleware.log();

        let extension_map = &self.service.extension_map;
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            url = %extension_map.url,
            timeout_secs = extension_map.timeout_secs,
            offline = extension_map.offline,
            core_extension = %extension_map.core_extension,
            "Extension map configuration"
        );

        let deployer = &self.service.deployer;
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            template_dir = %deployer.template_dir.display(),
            builds_dir = %deployer.builds_dir.display(),
            program = %deployer.program,
            idle_timeout_secs = deployer.idle_timeout,
            "Deployer configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
