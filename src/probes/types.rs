//! Subject and dimension types.

use std::borrow::Borrow;
use std::fmt;

use strum::{Display, EnumIter};

/// Name of a component whose lifecycle state participates in probing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subject(String);

impl Subject {
    /// Create a subject from a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The subject name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Subject {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for Subject {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&Subject> for Subject {
    fn from(subject: &Subject) -> Self {
        subject.clone()
    }
}

impl AsRef<str> for Subject {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Subject {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One of the three probe axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Dimension {
    /// Has the subject finished starting up.
    Startup,
    /// Is the subject able to take traffic.
    Readiness,
    /// Is the subject alive and well.
    Health,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use strum::IntoEnumIterator;

    #[test]
    fn dimension_display_is_lowercase() {
        let names: Vec<String> = Dimension::iter().map(|d| d.to_string()).collect();
        assert_eq!(names, vec!["startup", "readiness", "health"]);
    }

    #[test]
    fn subject_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(Subject::from("database-connection"), true);
        assert_eq!(map.get("database-connection"), Some(&true));
        assert_eq!(map.get("cache-warmup"), None);
    }
}
