//! HTTP surface for startup, readiness and health probes.

pub mod client;
pub mod handlers;
pub mod routes;

pub use client::ProbeClient;
pub use routes::{create_router, ProbePaths};
