//! Wire representation of object deltas.
//!
//! The wire model is a flat record: a change kind, an object id, an optional
//! full-object payload (creation), and an ordered list of item
//! modifications whose values are self-describing typed payloads. Encoding
//! never needs a definition; decoding is two-phase — structural first
//! (always succeeds on well-formed wire data, scalar payloads staying raw),
//! then definition-guided typing once a registry resolves. Callers without
//! a registry keep the raw payloads and retry typing later.

pub mod json;

pub use json::{decode, encode, resolve_definitions};

use thiserror::Error;

use object_delta_path::{ItemPath, PathParseError};

use crate::delta::ChangeKind;
use crate::item::ItemKind;

/// One wire entry: a path, a modification kind, and the affected values.
///
/// A single item delta fans out into up to two entries (add and delete) or
/// exactly one (replace); decode groups entries sharing a path back into
/// one delta.
#[derive(Debug, Clone, PartialEq)]
pub struct WireItemModification {
    pub path: String,
    pub modification_kind: WireModificationKind,
    pub values: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireModificationKind {
    Add,
    Replace,
    Delete,
}

impl WireModificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireModificationKind::Add => "ADD",
            WireModificationKind::Replace => "REPLACE",
            WireModificationKind::Delete => "DELETE",
        }
    }
}

/// The external representation of an [`crate::ObjectDelta`].
#[derive(Debug, Clone, PartialEq)]
pub struct WireObjectDelta {
    pub change_kind: ChangeKind,
    /// Present for MODIFY and DELETE.
    pub object_id: Option<String>,
    /// Serialized object type name (`ns:local`).
    pub object_type: Option<String>,
    /// Full serialized object; present for ADD only.
    pub object_payload: Option<serde_json::Value>,
    pub item_modifications: Vec<WireItemModification>,
}

/// A raw payload could not be typed against the supplied definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("value at '{path}' declares type '{found}', definition requires '{declared}'")]
    TypeMismatch {
        path: ItemPath,
        declared: String,
        found: String,
    },
    #[error("delta at '{path}' is a {found} delta, definition requires {expected}")]
    KindMismatch {
        path: ItemPath,
        expected: ItemKind,
        found: ItemKind,
    },
    #[error("raw payload at '{path}' cannot be typed: {reason}")]
    UntypeableRaw { path: ItemPath, reason: String },
}

/// Malformed wire data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("malformed wire delta: {0}")]
    Malformed(String),
    #[error(transparent)]
    Path(#[from] PathParseError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}
