use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque repository-history pointer.
///
/// Git revisions are commit hashes, Subversion revisions are decimal
/// numbers; the orchestrator treats both as tokens and only the
/// Subversion source interprets them numerically. YAML scalars that
/// happen to look like numbers (`revision: 42`) are accepted and kept as
/// their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value for sources with monotonically numbered history.
    pub fn as_number(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Revision {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl From<String> for Revision {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<u64> for Revision {
    fn from(number: u64) -> Self {
        Self(number.to_string())
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TokenVisitor;

        impl<'de> serde::de::Visitor<'de> for TokenVisitor {
            type Value = Revision;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a revision token (string or number)")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Revision, E> {
                Ok(Revision::new(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Revision, E> {
                Ok(Revision::from(v))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Revision, E> {
                Ok(Revision::new(v.to_string()))
            }
        }

        deserializer.deserialize_any(TokenVisitor)
    }
}
