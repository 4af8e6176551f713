//! One generic builder over all item-delta kinds.
//!
//! Replaces a combinatorial family of per-kind factory constructors: the
//! kind is a parameter, and the construction-time invariants (kind purity,
//! replace exclusivity) are checked once in [`ItemDeltaBuilder::build`].

use object_delta_path::ItemPath;

use crate::check::ConsistencyError;
use crate::delta::ItemDelta;
use crate::item::ItemKind;
use crate::value::Value;

/// Accumulates add/replace/delete sets for one item delta.
#[derive(Debug, Clone)]
pub struct ItemDeltaBuilder {
    path: ItemPath,
    kind: ItemKind,
    to_add: Vec<Value>,
    to_replace: Option<Vec<Value>>,
    to_delete: Vec<Value>,
}

impl ItemDeltaBuilder {
    pub fn new(path: ItemPath, kind: ItemKind) -> Self {
        Self {
            path,
            kind,
            to_add: Vec::new(),
            to_replace: None,
            to_delete: Vec::new(),
        }
    }

    pub fn add(mut self, value: Value) -> Self {
        self.to_add.push(value);
        self
    }

    pub fn add_all(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.to_add.extend(values);
        self
    }

    pub fn delete(mut self, value: Value) -> Self {
        self.to_delete.push(value);
        self
    }

    pub fn delete_all(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.to_delete.extend(values);
        self
    }

    /// Set the replacement value set. `replace(vec![])` clears the item.
    pub fn replace(mut self, values: Vec<Value>) -> Self {
        self.to_replace = Some(values);
        self
    }

    pub fn build(self) -> Result<ItemDelta, ConsistencyError> {
        if self.to_replace.is_some() && (!self.to_add.is_empty() || !self.to_delete.is_empty()) {
            return Err(ConsistencyError::ReplaceConflict { path: self.path });
        }
        let mismatch = self
            .to_add
            .iter()
            .chain(self.to_delete.iter())
            .chain(self.to_replace.iter().flatten())
            .find(|v| v.kind() != self.kind);
        if let Some(value) = mismatch {
            return Err(ConsistencyError::MixedKindItem {
                path: self.path,
                expected: self.kind,
                found: value.kind(),
            });
        }
        Ok(ItemDelta {
            path: self.path,
            kind: self.kind,
            to_add: self.to_add,
            to_replace: self.to_replace,
            to_delete: self.to_delete,
        })
    }
}
