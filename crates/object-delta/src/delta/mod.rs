//! Delta representation: per-item value-set changes and whole-object deltas.

pub mod builder;

pub use builder::ItemDeltaBuilder;

use indexmap::IndexMap;

use object_delta_path::{ItemPath, QName};

use crate::check::ConsistencyError;
use crate::item::ItemKind;
use crate::object::ObjectSnapshot;
use crate::value::Value;

/// The change kind of an [`ObjectDelta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Modify,
    Delete,
}

/// A change to one item, addressed by path.
///
/// Three disjoint-purpose sets over the item's values. Once `to_replace` is
/// set, the item's final value set *is* exactly that set, and `to_add` /
/// `to_delete` must be empty — [`ItemDeltaBuilder`] enforces this at
/// construction and the consistency checker re-validates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDelta {
    pub path: ItemPath,
    pub kind: ItemKind,
    pub to_add: Vec<Value>,
    pub to_replace: Option<Vec<Value>>,
    pub to_delete: Vec<Value>,
}

impl ItemDelta {
    /// True if applying this delta can never change anything.
    ///
    /// `to_replace = Some(vec![])` is *not* empty: it clears the item.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_delete.is_empty() && self.to_replace.is_none()
    }

    pub fn is_replace(&self) -> bool {
        self.to_replace.is_some()
    }

    /// Drop the parts of this delta that would be no-ops against `current`
    /// (the item's present values, or `None` if the item is absent).
    /// Returns `None` when nothing would remain.
    pub fn narrow(&self, current: Option<&[Value]>) -> Option<ItemDelta> {
        if let Some(replacement) = &self.to_replace {
            let same = match current {
                Some(values) => {
                    values.len() == replacement.len()
                        && replacement.iter().all(|v| values.contains(v))
                }
                None => replacement.is_empty(),
            };
            return if same { None } else { Some(self.clone()) };
        }
        let present = |v: &Value| current.is_some_and(|values| values.contains(v));
        let narrowed = ItemDelta {
            path: self.path.clone(),
            kind: self.kind,
            to_add: self
                .to_add
                .iter()
                .filter(|v| !present(v))
                .cloned()
                .collect(),
            to_replace: None,
            to_delete: self
                .to_delete
                .iter()
                .filter(|v| present(v))
                .cloned()
                .collect(),
        };
        if narrowed.is_empty() {
            None
        } else {
            Some(narrowed)
        }
    }
}

/// A whole-object change: creation, modification, or deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectDelta {
    /// Create the object from a full snapshot.
    Add { object: ObjectSnapshot },
    /// Modify an existing object through a set of item deltas keyed by path.
    Modify {
        oid: Option<String>,
        object_type: QName,
        modifications: IndexMap<ItemPath, ItemDelta>,
    },
    /// Delete the object identified by `oid`.
    Delete { oid: String, object_type: QName },
}

impl ObjectDelta {
    pub fn modify(oid: Option<String>, object_type: QName) -> Self {
        ObjectDelta::Modify {
            oid,
            object_type,
            modifications: IndexMap::new(),
        }
    }

    pub fn change_kind(&self) -> ChangeKind {
        match self {
            ObjectDelta::Add { .. } => ChangeKind::Add,
            ObjectDelta::Modify { .. } => ChangeKind::Modify,
            ObjectDelta::Delete { .. } => ChangeKind::Delete,
        }
    }

    pub fn object_type(&self) -> &QName {
        match self {
            ObjectDelta::Add { object } => &object.object_type,
            ObjectDelta::Modify { object_type, .. } => object_type,
            ObjectDelta::Delete { object_type, .. } => object_type,
        }
    }

    pub fn oid(&self) -> Option<&str> {
        match self {
            ObjectDelta::Add { object } => object.oid.as_deref(),
            ObjectDelta::Modify { oid, .. } => oid.as_deref(),
            ObjectDelta::Delete { oid, .. } => Some(oid),
        }
    }

    /// True only for a `Modify` delta with no effective modifications.
    pub fn is_empty(&self) -> bool {
        match self {
            ObjectDelta::Modify { modifications, .. } => {
                modifications.values().all(ItemDelta::is_empty)
            }
            _ => false,
        }
    }

    /// Additive modification before execution: queue one more item delta.
    ///
    /// Paths are unique keys; a second delta for an already-queued path is
    /// rejected rather than merged, which keeps application
    /// order-independent per path.
    pub fn add_modification(&mut self, delta: ItemDelta) -> Result<(), ConsistencyError> {
        let ObjectDelta::Modify { modifications, .. } = self else {
            return Err(ConsistencyError::NotAModifyDelta);
        };
        if modifications.contains_key(&delta.path) {
            return Err(ConsistencyError::DuplicateDeltaPath {
                path: delta.path.clone(),
            });
        }
        modifications.insert(delta.path.clone(), delta);
        Ok(())
    }

    pub fn modifications(&self) -> impl Iterator<Item = &ItemDelta> {
        match self {
            ObjectDelta::Modify { modifications, .. } => {
                Some(modifications.values()).into_iter().flatten()
            }
            _ => None.into_iter().flatten(),
        }
    }

    /// Narrow a `Modify` delta against a current snapshot, dropping every
    /// component that `apply` would treat as a no-op. Other kinds are
    /// returned unchanged.
    pub fn narrow(&self, target: &ObjectSnapshot) -> ObjectDelta {
        let ObjectDelta::Modify {
            oid,
            object_type,
            modifications,
        } = self
        else {
            return self.clone();
        };
        let mut narrowed = IndexMap::new();
        for (path, delta) in modifications {
            let current = target.find_item(path).map(|item| item.values.as_slice());
            if let Some(kept) = delta.narrow(current) {
                narrowed.insert(path.clone(), kept);
            }
        }
        ObjectDelta::Modify {
            oid: oid.clone(),
            object_type: object_type.clone(),
            modifications: narrowed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(local: &str) -> QName {
        QName::qualified("c", local)
    }

    fn add_delta(local: &str, value: Value) -> ItemDelta {
        ItemDeltaBuilder::new(ItemPath::of_name(name(local)), ItemKind::Property)
            .add(value)
            .build()
            .unwrap()
    }

    #[test]
    fn duplicate_path_rejected() {
        let mut delta = ObjectDelta::modify(Some("u-1".into()), name("UserType"));
        delta.add_modification(add_delta("mail", Value::scalar("a@x"))).unwrap();
        let err = delta
            .add_modification(add_delta("mail", Value::scalar("b@x")))
            .unwrap_err();
        assert!(matches!(err, ConsistencyError::DuplicateDeltaPath { .. }));
    }

    #[test]
    fn empty_modify_is_empty() {
        let delta = ObjectDelta::modify(Some("u-1".into()), name("UserType"));
        assert!(delta.is_empty());
        assert!(!ObjectDelta::Delete {
            oid: "u-1".into(),
            object_type: name("UserType")
        }
        .is_empty());
    }

    #[test]
    fn replace_with_empty_set_is_not_empty() {
        let delta = ItemDeltaBuilder::new(ItemPath::of_name(name("mail")), ItemKind::Property)
            .replace(vec![])
            .build()
            .unwrap();
        assert!(!delta.is_empty());
    }

    #[test]
    fn narrow_drops_present_adds_and_absent_deletes() {
        let delta = ItemDeltaBuilder::new(ItemPath::of_name(name("mail")), ItemKind::Property)
            .add(Value::scalar("a@x"))
            .add(Value::scalar("b@x"))
            .delete(Value::scalar("c@x"))
            .build()
            .unwrap();
        let current = vec![Value::scalar("a@x")];
        let narrowed = delta.narrow(Some(&current)).unwrap();
        assert_eq!(narrowed.to_add, vec![Value::scalar("b@x")]);
        assert!(narrowed.to_delete.is_empty());
    }

    #[test]
    fn narrow_drops_equal_replace() {
        let delta = ItemDeltaBuilder::new(ItemPath::of_name(name("mail")), ItemKind::Property)
            .replace(vec![Value::scalar("a@x")])
            .build()
            .unwrap();
        let current = vec![Value::scalar("a@x")];
        assert!(delta.narrow(Some(&current)).is_none());
        assert!(delta.narrow(None).is_some());
    }
}
