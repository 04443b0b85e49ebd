//! Probe route definitions.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{routing::any, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{healthz, readyz, startedz};
use crate::error::ServerError;
use crate::probes::Probes;

/// Default health probe path.
pub const DEFAULT_HEALTH_PATH: &str = "/healthz";
/// Default readiness probe path.
pub const DEFAULT_READY_PATH: &str = "/readyz";
/// Default startup probe path.
pub const DEFAULT_STARTUP_PATH: &str = "/startedz";

/// Characters the router reads as captures or wildcards instead of literals.
const ROUTE_SYNTAX: [char; 4] = [':', '*', '{', '}'];

/// URL paths the three probes are served on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePaths {
    /// Health probe path.
    pub health: String,
    /// Readiness probe path.
    pub ready: String,
    /// Startup probe path.
    pub startup: String,
}

impl ProbePaths {
    /// Resolve optional overrides against the defaults.
    pub fn resolve(
        health: Option<String>,
        ready: Option<String>,
        startup: Option<String>,
    ) -> Self {
        Self {
            health: health.unwrap_or_else(|| DEFAULT_HEALTH_PATH.to_string()),
            ready: ready.unwrap_or_else(|| DEFAULT_READY_PATH.to_string()),
            startup: startup.unwrap_or_else(|| DEFAULT_STARTUP_PATH.to_string()),
        }
    }

    /// Reject paths the router cannot register.
    pub fn validate(&self) -> Result<(), ServerError> {
        let mut seen = HashSet::new();
        for path in [&self.health, &self.ready, &self.startup] {
            if !path.starts_with('/') {
                return Err(ServerError::InvalidPath {
                    path: path.clone(),
                    reason: "must start with '/'",
                });
            }
            if path.contains(ROUTE_SYNTAX) {
                return Err(ServerError::InvalidPath {
                    path: path.clone(),
                    reason: "may not contain ':', '*', '{' or '}'",
                });
            }
            if !seen.insert(path.as_str()) {
                return Err(ServerError::InvalidPath {
                    path: path.clone(),
                    reason: "used by more than one probe",
                });
            }
        }
        Ok(())
    }
}

impl Default for ProbePaths {
    fn default() -> Self {
        Self::resolve(None, None, None)
    }
}

/// Create the probe router.
///
/// `paths` must have passed [`ProbePaths::validate`].
pub fn create_router(probes: Arc<Probes>, paths: &ProbePaths) -> Router {
    Router::new()
        .route(&paths.health, any(healthz))
        .route(&paths.ready, any(readyz))
        .route(&paths.startup, any(startedz))
        .layer(TraceLayer::new_for_http())
        .with_state(probes)
}
