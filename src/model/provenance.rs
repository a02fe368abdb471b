//! Provenance flags attached to resolution results.

use serde::{Deserialize, Serialize};

/// How a lookup produced its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Found through the authoritative signal (relationship graph, outline level, role style set)
    Resolved,
    /// Found by matching candidate style names
    FallbackByName,
    /// Decided by a documented heuristic
    Heuristic,
    /// Nothing matched; a synthetic or conventional default was used
    FallbackDefault,
}

impl Provenance {
    /// Serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::FallbackByName => "fallback_by_name",
            Self::Heuristic => "heuristic",
            Self::FallbackDefault => "fallback_default",
        }
    }

    /// Whether a fallback path produced the value.
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::Resolved)
    }
}

/// A value together with the path that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// How it was found
    pub provenance: Provenance,
}

impl<T> Resolved<T> {
    /// Wrap a value with its provenance.
    pub fn new(value: T, provenance: Provenance) -> Self {
        Self { value, provenance }
    }

    /// Value found through the authoritative signal.
    pub fn resolved(value: T) -> Self {
        Self::new(value, Provenance::Resolved)
    }
}
