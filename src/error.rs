//! Unified error types for probe tracking and the probe server.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::probes::{Dimension, Subject};

/// Unified error type for the probes crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration validation error.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Subject state transition error.
    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Probe server lifecycle error.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised when mutating a subject that was never declared.
///
/// These indicate a mismatch between declaration and usage sites and are
/// never recovered internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Subject was not declared for startup.
    #[error("unknown startup subject: {0}")]
    UnknownStartup(Subject),

    /// Subject was not declared for readiness.
    #[error("unknown ready subject: {0}")]
    UnknownReadiness(Subject),

    /// Subject was not declared for health.
    #[error("unknown health subject: {0}")]
    UnknownHealth(Subject),
}

impl ProbeError {
    /// Build the unknown-subject error for a dimension.
    pub fn unknown(dimension: Dimension, subject: impl Into<Subject>) -> Self {
        let subject = subject.into();
        match dimension {
            Dimension::Startup => Self::UnknownStartup(subject),
            Dimension::Readiness => Self::UnknownReadiness(subject),
            Dimension::Health => Self::UnknownHealth(subject),
        }
    }

    /// The dimension the failed mutation targeted.
    pub fn dimension(&self) -> Dimension {
        match self {
            Self::UnknownStartup(_) => Dimension::Startup,
            Self::UnknownReadiness(_) => Dimension::Readiness,
            Self::UnknownHealth(_) => Dimension::Health,
        }
    }

    /// The offending subject.
    pub fn subject(&self) -> &Subject {
        match self {
            Self::UnknownStartup(s) | Self::UnknownReadiness(s) | Self::UnknownHealth(s) => s,
        }
    }
}

/// Probe server lifecycle errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind the listen address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Probe path rejected at construction.
    #[error("invalid probe path {path:?}: {reason}")]
    InvalidPath {
        /// The rejected path.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Server was asked to serve after shutdown was requested.
    #[error("server closed")]
    Closed,

    /// Accept loop failed.
    #[error("serve failed: {0}")]
    Serve(#[source] std::io::Error),

    /// In-flight requests did not drain before the deadline.
    #[error("shutdown deadline of {0:?} exceeded")]
    ShutdownTimeout(Duration),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_subject_messages_carry_subject() {
        let err = ProbeError::unknown(Dimension::Readiness, "demo");
        assert_eq!(err.to_string(), "unknown ready subject: demo");

        let err = ProbeError::unknown(Dimension::Startup, "demo");
        assert_eq!(err.to_string(), "unknown startup subject: demo");

        let err = ProbeError::unknown(Dimension::Health, "demo");
        assert_eq!(err.to_string(), "unknown health subject: demo");
    }

    #[test]
    fn unknown_subject_accessors() {
        let err = ProbeError::unknown(Dimension::Health, "cache-warmup");
        assert_eq!(err.dimension(), Dimension::Health);
        assert_eq!(err.subject().as_str(), "cache-warmup");
    }

    #[test]
    fn server_error_converts_into_unified_error() {
        let err: Error = ServerError::Closed.into();
        assert_eq!(err.to_string(), "server error: server closed");
    }

    #[test]
    fn probe_error_converts_into_unified_error() {
        let err: Error = ProbeError::unknown(Dimension::Startup, "db").into();
        assert!(matches!(err, Error::Probe(ProbeError::UnknownStartup(_))));
    }
}
