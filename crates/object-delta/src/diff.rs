//! Structural diff between two object snapshots.
//!
//! `diff` walks matching item slots of two container trees and emits the
//! minimal set of [`ItemDelta`]s that transforms `before` into `after`.
//! Inputs are never mutated; the result is empty iff the snapshots are
//! equivalent.

use indexmap::IndexMap;
use tracing::debug;

use object_delta_path::{ItemPath, QName};

use crate::delta::{ItemDelta, ObjectDelta};
use crate::item::{Item, ItemKind};
use crate::object::ObjectSnapshot;
use crate::value::{ContainerValue, Value};

/// Diff policy knobs.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Pair id-less container values by whole-value structural equality.
    /// When `false`, every id-less value is treated as a whole-value delete
    /// plus add, even if an identical value exists on the other side.
    pub match_idless_by_equality: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            match_idless_by_equality: true,
        }
    }
}

/// Diff two snapshots into a `Modify` delta.
///
/// The caller guarantees both snapshots describe the same logical object;
/// the oid and object type are taken from `before`, falling back to `after`
/// for the oid.
pub fn diff(before: &ObjectSnapshot, after: &ObjectSnapshot, opts: &DiffOptions) -> ObjectDelta {
    let mut out = Vec::new();
    diff_container_items(&ItemPath::empty(), &before.root, &after.root, opts, &mut out);
    debug!(
        object_type = %before.object_type,
        modifications = out.len(),
        "computed object diff"
    );
    let mut modifications = IndexMap::new();
    for delta in out {
        modifications.insert(delta.path.clone(), delta);
    }
    ObjectDelta::Modify {
        oid: before.oid.clone().or_else(|| after.oid.clone()),
        object_type: before.object_type.clone(),
        modifications,
    }
}

/// Diff where either side may be absent: creation and deletion fall out as
/// `Add` and `Delete` deltas.
pub fn diff_optional(
    before: Option<&ObjectSnapshot>,
    after: Option<&ObjectSnapshot>,
    opts: &DiffOptions,
) -> Option<ObjectDelta> {
    match (before, after) {
        (None, None) => None,
        (None, Some(after)) => Some(ObjectDelta::Add {
            object: after.clone(),
        }),
        (Some(before), None) => Some(ObjectDelta::Delete {
            oid: before.oid.clone().unwrap_or_default(),
            object_type: before.object_type.clone(),
        }),
        (Some(before), Some(after)) => Some(diff(before, after, opts)),
    }
}

/// True iff `diff(a, b)` would be empty.
pub fn is_equivalent(a: &ObjectSnapshot, b: &ObjectSnapshot) -> bool {
    diff(a, b, &DiffOptions::default()).is_empty()
}

/// Diff one item slot. `path` addresses the item itself; resulting deltas
/// (including nested container recursion) are pushed onto `out`.
pub fn diff_item(
    path: &ItemPath,
    before: Option<&Item>,
    after: Option<&Item>,
    opts: &DiffOptions,
    out: &mut Vec<ItemDelta>,
) {
    let kind = match (before, after) {
        (None, None) => return,
        (Some(b), Some(a)) if b.kind != a.kind => {
            // Kind changed under the same name: the only faithful rendition
            // is a total replace with the after values.
            out.push(ItemDelta {
                path: path.clone(),
                kind: a.kind,
                to_add: Vec::new(),
                to_replace: Some(a.values.clone()),
                to_delete: Vec::new(),
            });
            return;
        }
        (Some(b), _) => b.kind,
        (None, Some(a)) => a.kind,
    };
    let empty: &[Value] = &[];
    let before_values = before.map_or(empty, |i| i.values.as_slice());
    let after_values = after.map_or(empty, |i| i.values.as_slice());
    match kind {
        ItemKind::Property | ItemKind::Reference => {
            diff_flat_item(path, kind, before, after, before_values, after_values, out)
        }
        ItemKind::Container => {
            diff_container_item(path, before_values, after_values, opts, out)
        }
    }
}

/// Scalar and reference items: value-equality comparison.
///
/// A single-valued item that changed becomes a replace; everything else is
/// a set difference rendered as add/delete only, so multi-valued deltas
/// stay minimal and order-insensitive.
fn diff_flat_item(
    path: &ItemPath,
    kind: ItemKind,
    before: Option<&Item>,
    after: Option<&Item>,
    before_values: &[Value],
    after_values: &[Value],
    out: &mut Vec<ItemDelta>,
) {
    let single_valued = before.is_some()
        && after.is_some()
        && before_values.len() == 1
        && after_values.len() == 1;
    if single_valued {
        if before_values[0] != after_values[0] {
            out.push(ItemDelta {
                path: path.clone(),
                kind,
                to_add: Vec::new(),
                to_replace: Some(after_values.to_vec()),
                to_delete: Vec::new(),
            });
        }
        return;
    }
    let to_add: Vec<Value> = after_values
        .iter()
        .filter(|v| !before_values.contains(v))
        .cloned()
        .collect();
    let to_delete: Vec<Value> = before_values
        .iter()
        .filter(|v| !after_values.contains(v))
        .cloned()
        .collect();
    if to_add.is_empty() && to_delete.is_empty() {
        return;
    }
    out.push(ItemDelta {
        path: path.clone(),
        kind,
        to_add,
        to_replace: None,
        to_delete,
    });
}

/// Container items: match values by id, then pair id-less values by strict
/// structural equality, then render leftovers as whole-value add/delete.
fn diff_container_item(
    path: &ItemPath,
    before_values: &[Value],
    after_values: &[Value],
    opts: &DiffOptions,
    out: &mut Vec<ItemDelta>,
) {
    let mut before_matched = vec![false; before_values.len()];
    let mut after_matched = vec![false; after_values.len()];

    // Pass 1: equal assigned ids are authoritative pairs.
    for (bi, bv) in before_values.iter().enumerate() {
        let Some(id) = bv.container_id() else {
            continue;
        };
        let Some(ai) = after_values
            .iter()
            .position(|av| av.container_id() == Some(id))
        else {
            continue;
        };
        before_matched[bi] = true;
        after_matched[ai] = true;
        if bv != &after_values[ai] {
            let (Some(bcv), Some(acv)) = (bv.as_container(), after_values[ai].as_container())
            else {
                continue;
            };
            diff_container_items(&path.append_id(Some(id)), bcv, acv, opts, out);
        }
    }

    // Pass 2: id-less values pair only on whole-value structural equality.
    // Ties break deterministically: first unmatched before-value pairs with
    // the first unmatched equal after-value, in insertion order.
    if opts.match_idless_by_equality {
        for (bi, bv) in before_values.iter().enumerate() {
            if before_matched[bi] || bv.container_id().is_some() {
                continue;
            }
            let found = after_values.iter().enumerate().position(|(ai, av)| {
                !after_matched[ai] && av.container_id().is_none() && av == bv
            });
            if let Some(ai) = found {
                before_matched[bi] = true;
                after_matched[ai] = true;
            }
        }
    }

    let to_delete: Vec<Value> = before_values
        .iter()
        .zip(&before_matched)
        .filter(|(_, matched)| !**matched)
        .map(|(v, _)| v.clone())
        .collect();
    let to_add: Vec<Value> = after_values
        .iter()
        .zip(&after_matched)
        .filter(|(_, matched)| !**matched)
        .map(|(v, _)| v.clone())
        .collect();
    if to_add.is_empty() && to_delete.is_empty() {
        return;
    }
    out.push(ItemDelta {
        path: path.clone(),
        kind: ItemKind::Container,
        to_add,
        to_replace: None,
        to_delete,
    });
}

/// Recurse over the union of item names of two container values.
fn diff_container_items(
    parent: &ItemPath,
    before: &ContainerValue,
    after: &ContainerValue,
    opts: &DiffOptions,
    out: &mut Vec<ItemDelta>,
) {
    let mut names: Vec<&QName> = before.items.keys().collect();
    for name in after.items.keys() {
        if !before.items.contains_key(name) {
            names.push(name);
        }
    }
    for name in names {
        diff_item(
            &parent.append_name(name.clone()),
            before.item(name),
            after.item(name),
            opts,
            out,
        );
    }
}
