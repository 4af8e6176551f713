//! Structural invariant validation for snapshots and deltas.
//!
//! The checker accumulates every violation it finds instead of stopping at
//! the first: its main consumers are pre-flight validation and debug
//! tooling, which need the complete report.

use thiserror::Error;

use object_delta_path::{ItemPath, PathSegment};

use crate::delta::{ItemDelta, ObjectDelta};
use crate::item::{Item, ItemKind};
use crate::object::ObjectSnapshot;
use crate::registry::{DefinitionRegistry, Occurs};
use crate::value::{ContainerValue, Value};

/// A structural invariant violation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsistencyError {
    #[error("item at '{path}' mixes value kinds: expected {expected}, found {found}")]
    MixedKindItem {
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
    #[error("delta at '{path}' sets to_replace together with to_add/to_delete")]
    ReplaceConflict { path: ItemPath },
    #[error("container value id {id} is not unique among siblings at '{path}'")]
    DuplicateContainerId { path: ItemPath, id: i64 },
    #[error("path '{path}' starts with an id segment")]
    IdSegmentFirst { path: ItemPath },
    #[error("path '{path}' holds two consecutive id segments")]
    ConsecutiveIdSegments { path: ItemPath },
    #[error("two item deltas share the path '{path}'")]
    DuplicateDeltaPath { path: ItemPath },
    #[error("modification keyed '{key}' carries a delta for path '{path}'")]
    PathKeyMismatch { key: ItemPath, path: ItemPath },
    #[error("modifications can only be added to a modify delta")]
    NotAModifyDelta,
}

/// Validate a snapshot. Returns every violation found.
pub fn check_object(
    snapshot: &ObjectSnapshot,
    defs: &dyn DefinitionRegistry,
) -> Result<(), Vec<ConsistencyError>> {
    let mut errors = Vec::new();
    check_container(
        &ItemPath::empty(),
        &snapshot.root,
        &snapshot.object_type,
        defs,
        &mut errors,
    );
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a delta. Returns every violation found.
pub fn check_delta(
    delta: &ObjectDelta,
    defs: &dyn DefinitionRegistry,
) -> Result<(), Vec<ConsistencyError>> {
    let mut errors = Vec::new();
    match delta {
        ObjectDelta::Add { object } => {
            check_container(
                &ItemPath::empty(),
                &object.root,
                &object.object_type,
                defs,
                &mut errors,
            );
        }
        ObjectDelta::Delete { .. } => {}
        ObjectDelta::Modify {
            object_type,
            modifications,
            ..
        } => {
            for (path, item_delta) in modifications {
                if path != &item_delta.path {
                    errors.push(ConsistencyError::PathKeyMismatch {
                        key: path.clone(),
                        path: item_delta.path.clone(),
                    });
                }
                check_item_delta(item_delta, object_type, defs, &mut errors);
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_item_delta(
    delta: &ItemDelta,
    object_type: &object_delta_path::QName,
    defs: &dyn DefinitionRegistry,
    errors: &mut Vec<ConsistencyError>,
) {
    check_path_shape(&delta.path, errors);
    if delta.to_replace.is_some() && (!delta.to_add.is_empty() || !delta.to_delete.is_empty()) {
        errors.push(ConsistencyError::ReplaceConflict {
            path: delta.path.clone(),
        });
    }
    for value in delta
        .to_add
        .iter()
        .chain(delta.to_delete.iter())
        .chain(delta.to_replace.iter().flatten())
    {
        if value.kind() != delta.kind {
            errors.push(ConsistencyError::MixedKindItem {
                path: delta.path.clone(),
                expected: delta.kind,
                found: value.kind(),
            });
        }
        if let Value::Container(cv) = value {
            check_container(&delta.path, cv, object_type, defs, errors);
        }
    }
    check_sibling_ids(&delta.path, delta.to_add.iter(), errors);
    if let Some(replacement) = &delta.to_replace {
        check_sibling_ids(&delta.path, replacement.iter(), errors);
        if let Some(def) = defs.item_definition(object_type, &delta.path) {
            let count = replacement.len();
            if !def.max_occurs.admits(count) || count < def.min_occurs as usize {
                errors.push(ConsistencyError::CardinalityViolation {
                    path: delta.path.clone(),
                    count,
                    min: def.min_occurs,
                    max: def.max_occurs,
                });
            }
        }
    }
}

fn check_path_shape(path: &ItemPath, errors: &mut Vec<ConsistencyError>) {
    let segments = path.segments();
    if matches!(segments.first(), Some(PathSegment::Id(_))) {
        errors.push(ConsistencyError::IdSegmentFirst { path: path.clone() });
    }
    for pair in segments.windows(2) {
        if matches!(pair, [PathSegment::Id(_), PathSegment::Id(_)]) {
            errors.push(ConsistencyError::ConsecutiveIdSegments { path: path.clone() });
        }
    }
}

fn check_container(
    path: &ItemPath,
    container: &ContainerValue,
    object_type: &object_delta_path::QName,
    defs: &dyn DefinitionRegistry,
    errors: &mut Vec<ConsistencyError>,
) {
    for (name, item) in &container.items {
        let item_path = path.append_name(name.clone());
        check_item(&item_path, item, object_type, defs, errors);
    }
}

fn check_item(
    path: &ItemPath,
    item: &Item,
    object_type: &object_delta_path::QName,
    defs: &dyn DefinitionRegistry,
    errors: &mut Vec<ConsistencyError>,
) {
    for value in &item.values {
        if value.kind() != item.kind {
            errors.push(ConsistencyError::MixedKindItem {
                path: path.clone(),
                expected: item.kind,
                found: value.kind(),
            });
        }
    }
    if let Some(def) = defs.item_definition(object_type, path) {
        if def.kind != item.kind {
            errors.push(ConsistencyError::MixedKindItem {
                path: path.clone(),
                expected: def.kind,
                found: item.kind,
            });
        }
        let count = item.len();
        if !def.max_occurs.admits(count) || count < def.min_occurs as usize {
            errors.push(ConsistencyError::CardinalityViolation {
                path: path.clone(),
                count,
                min: def.min_occurs,
                max: def.max_occurs,
            });
        }
    }
    check_sibling_ids(path, item.values.iter(), errors);
    for value in &item.values {
        if let Value::Container(cv) = value {
            check_container(&path.append_id(cv.id), cv, object_type, defs, errors);
        }
    }
}

/// Every assigned container id must be unique among its siblings.
fn check_sibling_ids<'a>(
    path: &ItemPath,
    values: impl Iterator<Item = &'a Value>,
    errors: &mut Vec<ConsistencyError>,
) {
    let mut seen = Vec::new();
    for value in values {
        let Some(id) = value.container_id() else {
            continue;
        };
        if seen.contains(&id) {
            errors.push(ConsistencyError::DuplicateContainerId {
                path: path.clone(),
                id,
            });
        } else {
            seen.push(id);
        }
    }
}
