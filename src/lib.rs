//! Startup, readiness and health probes for a running process.
//!
//! Application code declares named subjects per probe dimension and moves
//! them through their lifecycle; an orchestrator polls the HTTP probe server
//! which answers 200 when every subject in a dimension holds and 503
//! otherwise.
//!
//! ```text
//! GET /startedz   every startup subject has started
//! GET /readyz     every readiness subject is ready
//! GET /healthz    every health subject is healthy
//! ```
//!
//! # Modules
//!
//! - [`probes`]: Subject registries and aggregate queries
//! - [`api`]: Probe routes and probe client
//! - [`server`]: Probe server lifecycle
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod probes;
pub mod server;
pub mod utils;

pub use config::Config;
pub use error::{Error, ProbeError, Result, ServerError};
pub use probes::{Dimension, ProbeOpts, Probes, Subject};
pub use server::{ProbeServer, ServerOpts};
