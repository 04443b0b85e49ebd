//! Concurrent startup/readiness/health tracker.
//!
//! Each dimension keeps its own registry mapping [`Subject`] to a boolean.
//! Presence in a registry means the subject takes part in that probe; a
//! subject that was never declared cannot be transitioned. The aggregate for
//! a dimension is the AND over its registry and is vacuously true when the
//! registry is empty.
//!
//! ```
//! use probes::{ProbeOpts, Probes};
//!
//! let probes = Probes::new(ProbeOpts::default());
//! probes.declare_readies(["database"]);
//! assert!(!probes.is_ready());
//!
//! probes.mark_ready("database").unwrap();
//! assert!(probes.is_ready());
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::types::{Dimension, Subject};
use crate::error::ProbeError;

const DEFAULT_STARTUP: bool = false;
const DEFAULT_READY: bool = false;
const DEFAULT_HEALTHY: bool = true;

/// Optional overrides for the state a freshly declared subject starts in.
///
/// `None` means the built-in default: not started, not ready, healthy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeOpts {
    /// Initial value of startup subjects (default: false).
    pub default_startup: Option<bool>,
    /// Initial value of readiness subjects (default: false).
    pub default_ready: Option<bool>,
    /// Initial value of health subjects (default: true).
    pub default_healthy: Option<bool>,
}

/// Resolved per-dimension defaults.
#[derive(Debug, Clone, Copy)]
struct Defaults {
    startup: bool,
    ready: bool,
    healthy: bool,
}

impl From<ProbeOpts> for Defaults {
    fn from(opts: ProbeOpts) -> Self {
        Self {
            startup: opts.default_startup.unwrap_or(DEFAULT_STARTUP),
            ready: opts.default_ready.unwrap_or(DEFAULT_READY),
            healthy: opts.default_healthy.unwrap_or(DEFAULT_HEALTHY),
        }
    }
}

/// Subject state for a single dimension.
#[derive(Debug, Default)]
struct Registry {
    states: HashMap<Subject, bool>,
}

impl Registry {
    fn declare(&mut self, subject: Subject, value: bool) {
        self.states.insert(subject, value);
    }

    /// Overwrite an existing entry. Returns false if the subject is absent.
    fn set(&mut self, subject: &str, value: bool) -> bool {
        match self.states.get_mut(subject) {
            Some(state) => {
                *state = value;
                true
            }
            None => false,
        }
    }

    fn all(&self) -> bool {
        self.states.values().all(|v| *v)
    }
}

#[derive(Debug, Default)]
struct Registries {
    startup: Registry,
    readiness: Registry,
    health: Registry,
}

impl Registries {
    fn get(&self, dimension: Dimension) -> &Registry {
        match dimension {
            Dimension::Startup => &self.startup,
            Dimension::Readiness => &self.readiness,
            Dimension::Health => &self.health,
        }
    }

    fn get_mut(&mut self, dimension: Dimension) -> &mut Registry {
        match dimension {
            Dimension::Startup => &mut self.startup,
            Dimension::Readiness => &mut self.readiness,
            Dimension::Health => &mut self.health,
        }
    }
}

/// Thread-safe tracker of subject startup, readiness and health.
///
/// Share it behind an `Arc`; every operation takes the single internal lock
/// for the duration of its registry access only.
#[derive(Debug)]
pub struct Probes {
    registries: Mutex<Registries>,
    defaults: Defaults,
}

impl Probes {
    /// Create a tracker with no declared subjects.
    pub fn new(opts: ProbeOpts) -> Self {
        Self {
            registries: Mutex::new(Registries::default()),
            defaults: opts.into(),
        }
    }

    /// The state a subject takes when declared in `dimension`.
    pub fn default_for(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Startup => self.defaults.startup,
            Dimension::Readiness => self.defaults.ready,
            Dimension::Health => self.defaults.healthy,
        }
    }

    // === Declaration ===

    /// Declare startup subjects, resetting each to the startup default.
    pub fn declare_startups<I>(&self, subjects: I) -> &Self
    where
        I: IntoIterator,
        I::Item: Into<Subject>,
    {
        self.declare(Dimension::Startup, subjects)
    }

    /// Declare readiness subjects, resetting each to the readiness default.
    pub fn declare_readies<I>(&self, subjects: I) -> &Self
    where
        I: IntoIterator,
        I::Item: Into<Subject>,
    {
        self.declare(Dimension::Readiness, subjects)
    }

    /// Declare health subjects, resetting each to the health default.
    pub fn declare_healthies<I>(&self, subjects: I) -> &Self
    where
        I: IntoIterator,
        I::Item: Into<Subject>,
    {
        self.declare(Dimension::Health, subjects)
    }

    fn declare<I>(&self, dimension: Dimension, subjects: I) -> &Self
    where
        I: IntoIterator,
        I::Item: Into<Subject>,
    {
        let value = self.default_for(dimension);
        let subjects: Vec<Subject> = subjects.into_iter().map(Into::into).collect();
        {
            let mut registries = self.lock();
            let registry = registries.get_mut(dimension);
            for subject in &subjects {
                registry.declare(subject.clone(), value);
            }
        }
        for subject in &subjects {
            debug!(%dimension, %subject, value, "Declared subject");
        }
        self
    }

    // === Transitions ===

    /// Mark a startup subject as started.
    ///
    /// Startup is monotonic: there is no way to un-start a subject.
    pub fn mark_started(&self, subject: impl AsRef<str>) -> Result<(), ProbeError> {
        self.set(Dimension::Startup, subject.as_ref(), true)
    }

    /// Mark a readiness subject as ready.
    pub fn mark_ready(&self, subject: impl AsRef<str>) -> Result<(), ProbeError> {
        self.set(Dimension::Readiness, subject.as_ref(), true)
    }

    /// Mark a readiness subject as not ready.
    pub fn mark_not_ready(&self, subject: impl AsRef<str>) -> Result<(), ProbeError> {
        self.set(Dimension::Readiness, subject.as_ref(), false)
    }

    /// Mark a health subject as healthy.
    pub fn mark_healthy(&self, subject: impl AsRef<str>) -> Result<(), ProbeError> {
        self.set(Dimension::Health, subject.as_ref(), true)
    }

    /// Mark a health subject as unhealthy.
    pub fn mark_unhealthy(&self, subject: impl AsRef<str>) -> Result<(), ProbeError> {
        self.set(Dimension::Health, subject.as_ref(), false)
    }

    fn set(&self, dimension: Dimension, subject: &str, value: bool) -> Result<(), ProbeError> {
        let updated = self.lock().get_mut(dimension).set(subject, value);
        if !updated {
            warn!(%dimension, subject, "Transition on undeclared subject");
            return Err(ProbeError::unknown(dimension, subject));
        }
        debug!(%dimension, subject, value, "Subject transitioned");
        Ok(())
    }

    // === Aggregates ===

    /// True when every startup subject has started, or none are declared.
    pub fn is_started(&self) -> bool {
        self.all(Dimension::Startup)
    }

    /// True when every readiness subject is ready, or none are declared.
    pub fn is_ready(&self) -> bool {
        self.all(Dimension::Readiness)
    }

    /// True when every health subject is healthy, or none are declared.
    pub fn is_healthy(&self) -> bool {
        self.all(Dimension::Health)
    }

    /// Aggregate for an arbitrary dimension.
    pub fn all(&self, dimension: Dimension) -> bool {
        self.lock().get(dimension).all()
    }

    fn lock(&self) -> MutexGuard<'_, Registries> {
        // Registry updates are single inserts/overwrites, so a poisoned guard
        // never exposes a half-applied change.
        self.registries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Probes {
    fn default() -> Self {
        Self::new(ProbeOpts::default())
    }
}
