//! Applying object deltas to snapshots.
//!
//! Application is deterministic and idempotent: replace sets the item's
//! value set outright, add suppresses structural duplicates, delete of an
//! absent value is a no-op. Application is not transactional across item
//! deltas: when the n-th delta fails, earlier deltas stay applied and the
//! caller decides (copy-on-apply for all-or-nothing semantics).

use thiserror::Error;
use tracing::debug;

use object_delta_path::{ItemPath, PathSegment, QName};

use crate::delta::{ItemDelta, ObjectDelta};
use crate::item::{Item, ItemKind};
use crate::object::ObjectSnapshot;
use crate::registry::{DefinitionRegistry, Occurs};
use crate::value::{ContainerValue, Value};

/// A delta could not be applied to the target snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    #[error("cannot apply an add delta to a non-empty target")]
    TargetNotEmpty,
    #[error("delta oid '{expected}' does not match target oid {found:?}")]
    OidMismatch {
        expected: String,
        found: Option<String>,
    },
    #[error("no container value with id {id:?} at '{path}'")]
    DanglingContainerId { path: ItemPath, id: Option<i64> },
    #[error("path '{path}' does not address an item")]
    BadItemPath { path: ItemPath },
    #[error("intermediate container at '{path}' is multi-valued; an id segment is required")]
    AmbiguousIntermediate { path: ItemPath },
    #[error("item at '{path}' is a {found}, expected {expected}")]
    KindMismatch {
        path: ItemPath,
        expected: ItemKind,
        found: ItemKind,
    },
    #[error("item at '{path}' has {count} values, outside [{min}, {max:?}]")]
    CardinalityViolation {
        path: ItemPath,
        count: usize,
        min: u32,
        max: Occurs,
    },
}

/// Apply `delta` to `target`, mutating it in place.
///
/// Not safe to call concurrently on one target; callers serialize per
/// object identifier.
pub fn apply(
    delta: &ObjectDelta,
    target: &mut ObjectSnapshot,
    defs: &dyn DefinitionRegistry,
) -> Result<(), ApplyError> {
    match delta {
        ObjectDelta::Add { object } => {
            if !target.is_empty() {
                return Err(ApplyError::TargetNotEmpty);
            }
            *target = object.clone();
            Ok(())
        }
        ObjectDelta::Delete { oid, .. } => {
            if target.oid.as_deref() != Some(oid.as_str()) {
                return Err(ApplyError::OidMismatch {
                    expected: oid.clone(),
                    found: target.oid.clone(),
                });
            }
            // Physical removal is the store's job; the engine only marks.
            target.tombstoned = true;
            Ok(())
        }
        ObjectDelta::Modify {
            oid, modifications, ..
        } => {
            if let (Some(expected), Some(found)) = (oid.as_deref(), target.oid.as_deref()) {
                if expected != found {
                    return Err(ApplyError::OidMismatch {
                        expected: expected.to_string(),
                        found: Some(found.to_string()),
                    });
                }
            }
            let object_type = target.object_type.clone();
            debug!(
                oid = ?target.oid,
                modifications = modifications.len(),
                "applying modify delta"
            );
            for delta in modifications.values() {
                apply_item_delta(delta, &mut target.root, &object_type, defs)?;
            }
            Ok(())
        }
    }
}

/// Apply one item delta to a container tree.
pub fn apply_item_delta(
    delta: &ItemDelta,
    root: &mut ContainerValue,
    object_type: &QName,
    defs: &dyn DefinitionRegistry,
) -> Result<(), ApplyError> {
    let item = resolve_item_mut(root, delta.path.segments(), delta.kind, &delta.path)?;
    if item.kind != delta.kind && !item.is_empty() {
        return Err(ApplyError::KindMismatch {
            path: delta.path.clone(),
            expected: delta.kind,
            found: item.kind,
        });
    }
    item.kind = delta.kind;
    match &delta.to_replace {
        Some(replacement) => {
            // Replace is total: the final value set is exactly the
            // replacement, duplicates collapsed. Re-application changes
            // nothing.
            let mut values = Vec::with_capacity(replacement.len());
            for value in replacement {
                if !values.contains(value) {
                    values.push(value.clone());
                }
            }
            item.replace_values(values);
        }
        None => {
            for value in &delta.to_delete {
                item.remove_value(value);
            }
            for value in &delta.to_add {
                item.add_value(value.clone());
            }
        }
    }
    if let Some(def) = defs.item_definition(object_type, &delta.path) {
        let count = item.len();
        if !def.max_occurs.admits(count) || count < def.min_occurs as usize {
            return Err(ApplyError::CardinalityViolation {
                path: delta.path.clone(),
                count,
                min: def.min_occurs,
                max: def.max_occurs,
            });
        }
    }
    Ok(())
}

/// Navigate to the addressed item, creating intermediate single-valued
/// containers for `Name` segments on demand. An `Id` segment never
/// fabricates a value: a miss is [`ApplyError::DanglingContainerId`].
fn resolve_item_mut<'a>(
    container: &'a mut ContainerValue,
    segments: &[PathSegment],
    kind: ItemKind,
    full_path: &ItemPath,
) -> Result<&'a mut Item, ApplyError> {
    let bad_path = || ApplyError::BadItemPath {
        path: full_path.clone(),
    };
    match segments {
        [] | [PathSegment::Id(_), ..] => Err(bad_path()),
        [PathSegment::Name(name)] => Ok(container.ensure_item(name, kind)),
        [PathSegment::Name(name), PathSegment::Id(id), rest @ ..] => {
            // The id lookup comes first: a miss is a dangling id even when
            // the path ends right here.
            let item = container.item_mut(name).ok_or(ApplyError::DanglingContainerId {
                path: full_path.clone(),
                id: *id,
            })?;
            let value = item
                .values
                .iter_mut()
                .find(|v| v.container_id() == *id)
                .ok_or(ApplyError::DanglingContainerId {
                    path: full_path.clone(),
                    id: *id,
                })?;
            if rest.is_empty() {
                // The id resolved, but an id-terminated path addresses a
                // value, not an item.
                return Err(bad_path());
            }
            let found = value.kind();
            let child = value
                .as_container_mut()
                .ok_or(ApplyError::KindMismatch {
                    path: full_path.clone(),
                    expected: ItemKind::Container,
                    found,
                })?;
            resolve_item_mut(child, rest, kind, full_path)
        }
        [PathSegment::Name(name), rest @ ..] => {
            let item = container.ensure_item(name, ItemKind::Container);
            if item.values.is_empty() {
                item.values.push(Value::Container(ContainerValue::new(None)));
            }
            if item.values.len() > 1 {
                return Err(ApplyError::AmbiguousIntermediate {
                    path: full_path.clone(),
                });
            }
            let found = item.values[0].kind();
            let child = item.values[0]
                .as_container_mut()
                .ok_or(ApplyError::KindMismatch {
                    path: full_path.clone(),
                    expected: ItemKind::Container,
                    found,
                })?;
            resolve_item_mut(child, rest, kind, full_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::ItemDeltaBuilder;
    use crate::registry::{ItemDefinition, NoDefinitions, ScalarType, StaticRegistry};

    fn name(local: &str) -> QName {
        QName::qualified("c", local)
    }

    fn user() -> ObjectSnapshot {
        ObjectSnapshot::new(name("UserType")).with_oid("u-1")
    }

    fn modify_with(delta: ItemDelta) -> ObjectDelta {
        let mut od = ObjectDelta::modify(Some("u-1".into()), name("UserType"));
        od.add_modification(delta).unwrap();
        od
    }

    #[test]
    fn add_onto_empty_target() {
        let mut snapshot = user();
        snapshot
            .root
            .ensure_item(&name("givenName"), ItemKind::Property)
            .add_value(Value::scalar("Jack"));
        let mut target = ObjectSnapshot::new(name("UserType"));
        apply(
            &ObjectDelta::Add {
                object: snapshot.clone(),
            },
            &mut target,
            &NoDefinitions,
        )
        .unwrap();
        assert_eq!(target, snapshot);
    }

    #[test]
    fn add_onto_populated_target_fails() {
        let mut target = user();
        target
            .root
            .ensure_item(&name("givenName"), ItemKind::Property)
            .add_value(Value::scalar("Jack"));
        let err = apply(
            &ObjectDelta::Add {
                object: user(),
            },
            &mut target,
            &NoDefinitions,
        )
        .unwrap_err();
        assert_eq!(err, ApplyError::TargetNotEmpty);
    }

    #[test]
    fn delete_marks_tombstone_after_oid_check() {
        let mut target = user();
        apply(
            &ObjectDelta::Delete {
                oid: "u-1".into(),
                object_type: name("UserType"),
            },
            &mut target,
            &NoDefinitions,
        )
        .unwrap();
        assert!(target.tombstoned);

        let err = apply(
            &ObjectDelta::Delete {
                oid: "u-2".into(),
                object_type: name("UserType"),
            },
            &mut target,
            &NoDefinitions,
        )
        .unwrap_err();
        assert!(matches!(err, ApplyError::OidMismatch { .. }));
    }

    #[test]
    fn replace_is_idempotent() {
        let mut target = user();
        target
            .root
            .ensure_item(&name("givenName"), ItemKind::Property)
            .add_value(Value::scalar("Jack"));
        let delta = modify_with(
            ItemDeltaBuilder::new(ItemPath::of_name(name("givenName")), ItemKind::Property)
                .replace(vec![Value::scalar("Captain Jack")])
                .build()
                .unwrap(),
        );
        apply(&delta, &mut target, &NoDefinitions).unwrap();
        let once = target.clone();
        apply(&delta, &mut target, &NoDefinitions).unwrap();
        assert_eq!(target, once);
        assert_eq!(
            target.find_item(&ItemPath::of_name(name("givenName"))).unwrap().values,
            vec![Value::scalar("Captain Jack")]
        );
    }

    #[test]
    fn duplicate_add_is_suppressed() {
        let mut target = user();
        target
            .root
            .ensure_item(&name("mail"), ItemKind::Property)
            .add_value(Value::scalar("a@x"));
        let delta = modify_with(
            ItemDeltaBuilder::new(ItemPath::of_name(name("mail")), ItemKind::Property)
                .add(Value::scalar("a@x"))
                .add(Value::scalar("b@x"))
                .build()
                .unwrap(),
        );
        apply(&delta, &mut target, &NoDefinitions).unwrap();
        let item = target.find_item(&ItemPath::of_name(name("mail"))).unwrap();
        assert_eq!(item.values, vec![Value::scalar("a@x"), Value::scalar("b@x")]);
    }

    #[test]
    fn delete_of_absent_value_is_noop() {
        let mut target = user();
        let delta = modify_with(
            ItemDeltaBuilder::new(ItemPath::of_name(name("mail")), ItemKind::Property)
                .delete(Value::scalar("ghost@x"))
                .build()
                .unwrap(),
        );
        apply(&delta, &mut target, &NoDefinitions).unwrap();
        assert!(target
            .find_item(&ItemPath::of_name(name("mail")))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn intermediate_containers_created_for_name_segments() {
        let mut target = user();
        let path = ItemPath::of_name(name("activation")).append_name(name("status"));
        let delta = modify_with(
            ItemDeltaBuilder::new(path.clone(), ItemKind::Property)
                .replace(vec![Value::scalar("enabled")])
                .build()
                .unwrap(),
        );
        apply(&delta, &mut target, &NoDefinitions).unwrap();
        assert_eq!(
            target.find_item(&path).unwrap().values,
            vec![Value::scalar("enabled")]
        );
    }

    #[test]
    fn dangling_id_segment_fails_without_fabrication() {
        let mut target = user();
        target
            .root
            .ensure_item(&name("assignment"), ItemKind::Container)
            .add_value(Value::Container(ContainerValue::new(Some(1))));
        let path = ItemPath::of_name(name("assignment"))
            .append_id(Some(99))
            .append_name(name("description"));
        let delta = modify_with(
            ItemDeltaBuilder::new(path, ItemKind::Property)
                .add(Value::scalar("x"))
                .build()
                .unwrap(),
        );
        let before = target.clone();
        let err = apply(&delta, &mut target, &NoDefinitions).unwrap_err();
        assert!(matches!(err, ApplyError::DanglingContainerId { id: Some(99), .. }));
        assert_eq!(target, before);
    }

    #[test]
    fn id_terminated_path_with_missing_id_is_dangling() {
        let mut target = user();
        target
            .root
            .ensure_item(&name("assignment"), ItemKind::Container)
            .add_value(Value::Container(ContainerValue::new(Some(1))));
        let delta = modify_with(
            ItemDeltaBuilder::new(
                ItemPath::of_name(name("assignment")).append_id(Some(99)),
                ItemKind::Container,
            )
            .delete(Value::Container(ContainerValue::new(Some(99))))
            .build()
            .unwrap(),
        );
        let err = apply(&delta, &mut target, &NoDefinitions).unwrap_err();
        assert!(matches!(err, ApplyError::DanglingContainerId { id: Some(99), .. }));

        // A resolvable id still does not make the path address an item.
        let delta = modify_with(
            ItemDeltaBuilder::new(
                ItemPath::of_name(name("assignment")).append_id(Some(1)),
                ItemKind::Container,
            )
            .delete(Value::Container(ContainerValue::new(Some(1))))
            .build()
            .unwrap(),
        );
        let err = apply(&delta, &mut target, &NoDefinitions).unwrap_err();
        assert!(matches!(err, ApplyError::BadItemPath { .. }));
    }

    #[test]
    fn earlier_deltas_stay_applied_on_failure() {
        let mut target = user();
        let mut od = ObjectDelta::modify(Some("u-1".into()), name("UserType"));
        od.add_modification(
            ItemDeltaBuilder::new(ItemPath::of_name(name("mail")), ItemKind::Property)
                .add(Value::scalar("a@x"))
                .build()
                .unwrap(),
        )
        .unwrap();
        od.add_modification(
            ItemDeltaBuilder::new(
                ItemPath::of_name(name("assignment"))
                    .append_id(Some(5))
                    .append_name(name("description")),
                ItemKind::Property,
            )
            .add(Value::scalar("x"))
            .build()
            .unwrap(),
        )
        .unwrap();
        assert!(apply(&od, &mut target, &NoDefinitions).is_err());
        // The first item delta is already in; no rollback.
        assert!(!target
            .find_item(&ItemPath::of_name(name("mail")))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn cardinality_enforced_when_definition_resolves() {
        let registry = StaticRegistry::new().with_definition(
            name("UserType"),
            &ItemPath::of_name(name("givenName")),
            ItemDefinition::new(name("givenName"), ItemKind::Property)
                .single_valued()
                .typed(ScalarType::String),
        );
        let mut target = user();
        let delta = modify_with(
            ItemDeltaBuilder::new(ItemPath::of_name(name("givenName")), ItemKind::Property)
                .add(Value::scalar("Jack"))
                .add(Value::scalar("Joe"))
                .build()
                .unwrap(),
        );
        let err = apply(&delta, &mut target, &registry).unwrap_err();
        assert!(matches!(
            err,
            ApplyError::CardinalityViolation { count: 2, .. }
        ));
    }

    #[test]
    fn oid_mismatch_on_modify() {
        let mut target = user();
        let od = ObjectDelta::modify(Some("someone-else".into()), name("UserType"));
        let err = apply(&od, &mut target, &NoDefinitions).unwrap_err();
        assert!(matches!(err, ApplyError::OidMismatch { .. }));
    }
}
