//! Application configuration loaded from environment variables.
//!
//! Every variable carries the `PROBES_` prefix, e.g. `PROBES_ADDR`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::api::routes::{
    ProbePaths, DEFAULT_HEALTH_PATH, DEFAULT_READY_PATH, DEFAULT_STARTUP_PATH,
};
use crate::error::{Error, Result};
use crate::probes::{ProbeOpts, Probes};
use crate::server::ServerOpts;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PROBES_";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// Listen address for the probe server.
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Health probe path.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Readiness probe path.
    #[serde(default = "default_ready_path")]
    pub ready_path: String,

    /// Startup probe path.
    #[serde(default = "default_startup_path")]
    pub startup_path: String,

    /// Seconds in-flight requests get to finish on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    // === Subject Defaults ===
    /// Initial state of startup subjects.
    #[serde(default)]
    pub default_startup: Option<bool>,

    /// Initial state of readiness subjects.
    #[serde(default)]
    pub default_ready: Option<bool>,

    /// Initial state of health subjects.
    #[serde(default)]
    pub default_healthy: Option<bool>,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

fn default_ready_path() -> String {
    DEFAULT_READY_PATH.to_string()
}

fn default_startup_path() -> String {
    DEFAULT_STARTUP_PATH.to_string()
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            health_path: default_health_path(),
            ready_path: default_ready_path(),
            startup_path: default_startup_path(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            default_startup: None,
            default_ready: None,
            default_healthy: None,
            rust_log: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(envy::prefixed(ENV_PREFIX).from_env()?)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        self.probe_paths().validate()?;

        if self.shutdown_timeout_secs == 0 {
            return Err(Error::InvalidConfig(format!(
                "{ENV_PREFIX}SHUTDOWN_TIMEOUT_SECS must be positive"
            )));
        }

        Ok(())
    }

    /// Parsed listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.addr.parse().map_err(|e| {
            Error::InvalidConfig(format!(
                "{ENV_PREFIX}ADDR {:?} is not a socket address: {}",
                self.addr, e
            ))
        })
    }

    /// Configured probe paths.
    pub fn probe_paths(&self) -> ProbePaths {
        ProbePaths {
            health: self.health_path.clone(),
            ready: self.ready_path.clone(),
            startup: self.startup_path.clone(),
        }
    }

    /// Shutdown drain deadline.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Tracker options.
    pub fn probe_opts(&self) -> ProbeOpts {
        ProbeOpts {
            default_startup: self.default_startup,
            default_ready: self.default_ready,
            default_healthy: self.default_healthy,
        }
    }

    /// Server options for `probes`.
    pub fn server_opts(&self, probes: Arc<Probes>) -> Result<ServerOpts> {
        Ok(ServerOpts {
            addr: self.socket_addr()?,
            probes,
            health_path: Some(self.health_path.clone()),
            ready_path: Some(self.ready_path.clone()),
            startup_path: Some(self.startup_path.clone()),
        })
    }
}
