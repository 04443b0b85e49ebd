//! Probe handlers.
//!
//! Each handler runs one aggregate query and answers with a bare status:
//! 200 when the aggregate holds, 503 otherwise. Method and body are ignored.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode};

use crate::probes::Probes;

fn status(ok: bool) -> StatusCode {
    if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Health probe - 200 if every health subject is healthy, 503 otherwise.
pub async fn healthz(State(probes): State<Arc<Probes>>) -> StatusCode {
    status(probes.is_healthy())
}

/// Readiness probe - 200 if every readiness subject is ready, 503 otherwise.
pub async fn readyz(State(probes): State<Arc<Probes>>) -> StatusCode {
    status(probes.is_ready())
}

/// Startup probe - 200 if every startup subject has started, 503 otherwise.
pub async fn startedz(State(probes): State<Arc<Probes>>) -> StatusCode {
    status(probes.is_started())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn healthz_follows_health_aggregate() {
        let probes = Arc::new(Probes::default());
        probes.declare_healthies(["demo"]);
        assert_eq!(healthz(State(probes.clone())).await, StatusCode::OK);

        probes.mark_unhealthy("demo").unwrap();
        assert_eq!(
            healthz(State(probes)).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn empty_tracker_answers_ok_everywhere() {
        let probes = Arc::new(Probes::default());
        assert_eq!(healthz(State(probes.clone())).await, StatusCode::OK);
        assert_eq!(readyz(State(probes.clone())).await, StatusCode::OK);
        assert_eq!(startedz(State(probes)).await, StatusCode::OK);
    }
}
