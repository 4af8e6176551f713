//! Explicit namespace-resolution context.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::qname::QName;

/// A name could not be resolved against the current namespace context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnresolvableName {
    #[error("no namespace bound to prefix '{0}'")]
    UnknownPrefix(String),
    #[error("unqualified name '{0}' and no default namespace is set")]
    NoDefaultNamespace(String),
    #[error("empty name")]
    Empty,
}

/// Prefix table plus optional default namespace.
///
/// Threaded explicitly through every resolution call; there is no global
/// default-namespace state anywhere in this workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    default_ns: Option<String>,
    prefixes: BTreeMap<String, String>,
}

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, ns: impl Into<String>) -> Self {
        self.default_ns = Some(ns.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>, ns: impl Into<String>) -> Self {
        self.prefixes.insert(prefix.into(), ns.into());
        self
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.default_ns.as_deref()
    }

    /// Resolve textual `prefix:local` or bare `local` into a [`QName`].
    ///
    /// A bare name resolves against the default namespace; a prefixed name
    /// resolves through the prefix table. Failure is an error value, never a
    /// panic.
    pub fn resolve(&self, text: &str) -> Result<QName, UnresolvableName> {
        if text.is_empty() {
            return Err(UnresolvableName::Empty);
        }
        match text.split_once(':') {
            Some((prefix, local)) => {
                if local.is_empty() {
                    return Err(UnresolvableName::Empty);
                }
                let ns = self
                    .prefixes
                    .get(prefix)
                    .ok_or_else(|| UnresolvableName::UnknownPrefix(prefix.to_string()))?;
                Ok(QName::qualified(ns.clone(), local))
            }
            None => {
                let ns = self
                    .default_ns
                    .as_ref()
                    .ok_or_else(|| UnresolvableName::NoDefaultNamespace(text.to_string()))?;
                Ok(QName::qualified(ns.clone(), text))
            }
        }
    }

    /// Resolve a [`QName`] that may still be unqualified.
    pub fn resolve_qname(&self, name: &QName) -> Result<QName, UnresolvableName> {
        if name.is_qualified() {
            return Ok(name.clone());
        }
        let ns = self
            .default_ns
            .as_ref()
            .ok_or_else(|| UnresolvableName::NoDefaultNamespace(name.local.clone()))?;
        Ok(QName::qualified(ns.clone(), name.local.clone()))
    }

    /// Resolve every unqualified name segment of a path.
    ///
    /// Paths compared by equality must be fully qualified first; this is
    /// the one entry point callers need before handing a path to the diff
    /// or patch engine.
    pub fn resolve_path(&self, path: &crate::path::ItemPath) -> Result<crate::path::ItemPath, UnresolvableName> {
        let mut segments = Vec::with_capacity(path.len());
        for segment in path.segments() {
            segments.push(match segment {
                crate::path::PathSegment::Name(name) => {
                    crate::path::PathSegment::Name(self.resolve_qname(name)?)
                }
                id @ crate::path::PathSegment::Id(_) => id.clone(),
            });
        }
        Ok(crate::path::ItemPath::new(segments))
    }
}
