//! Namespace-qualified names.

use std::fmt;

/// A namespace-qualified identifier.
///
/// The namespace is an opaque token; `None` means the name was never
/// qualified. Two names are equal only if both namespace and local part
/// match, so callers comparing paths must resolve unqualified names first
/// (see [`crate::Namespaces::resolve`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    /// A name qualified with a namespace token.
    pub fn qualified(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// A bare, namespace-less name.
    pub fn unqualified(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.namespace.is_some()
    }

    /// True if the local parts match, ignoring namespaces.
    ///
    /// Used only where the distinction genuinely does not matter (diagnostic
    /// output); structural comparison always goes through full equality.
    pub fn matches_local(&self, other: &QName) -> bool {
        self.local == other.local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}:{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}
