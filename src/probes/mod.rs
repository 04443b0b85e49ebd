//! Probe state tracking.
//!
//! This module handles:
//! - Subject and dimension types
//! - Per-dimension registries of subject state
//! - Aggregate startup/readiness/health queries

pub mod tracker;
pub mod types;

pub use tracker::{ProbeOpts, Probes};
pub use types::{Dimension, Subject};
