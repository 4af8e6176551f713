//! Object snapshots: a root container plus identity.

use object_delta_path::{ItemPath, PathSegment, QName};

use crate::item::Item;
use crate::value::{ContainerValue, Value};

/// A full snapshot of one object.
///
/// The `oid` is assigned on creation by the owning store and immutable
/// thereafter; the engine never invents one. `tombstoned` is set by applying
/// a delete delta; physical removal is the store's responsibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSnapshot {
    pub oid: Option<String>,
    pub object_type: QName,
    pub root: ContainerValue,
    pub tombstoned: bool,
}

impl ObjectSnapshot {
    /// A new, empty snapshot of the given type.
    pub fn new(object_type: QName) -> Self {
        Self {
            oid: None,
            object_type,
            root: ContainerValue::new(None),
            tombstoned: false,
        }
    }

    pub fn with_oid(mut self, oid: impl Into<String>) -> Self {
        self.oid = Some(oid.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Read-only navigation to the item addressed by `path`.
    ///
    /// `Name` segments descend into child items; an `Id` segment selects one
    /// container value of the preceding item, so it must be followed by
    /// another `Name` segment (or end the path, in which case there is no
    /// *item* to return). Returns `None` whenever any step does not resolve.
    pub fn find_item(&self, path: &ItemPath) -> Option<&Item> {
        let mut container = &self.root;
        let mut segments = path.segments().iter().peekable();
        while let Some(segment) = segments.next() {
            let PathSegment::Name(name) = segment else {
                return None;
            };
            let item = container.item(name)?;
            match segments.peek() {
                None => return Some(item),
                Some(PathSegment::Name(_)) => {
                    // Descending through a single-valued container item.
                    container = item.single_value()?.as_container()?;
                }
                Some(PathSegment::Id(id)) => {
                    segments.next();
                    let value = item
                        .values
                        .iter()
                        .find(|v| v.container_id() == *id)?
                        .as_container()?;
                    if segments.peek().is_none() {
                        return None;
                    }
                    container = value;
                }
            }
        }
        None
    }

    /// Read-only navigation to the single container value addressed by a
    /// path ending in an `Id` segment.
    pub fn find_container_value(&self, path: &ItemPath) -> Option<&ContainerValue> {
        let (last, init) = path.segments().split_last()?;
        let PathSegment::Id(id) = last else {
            return None;
        };
        let item = self.find_item(&ItemPath::new(init.to_vec()))?;
        item.values
            .iter()
            .find(|v| v.container_id() == *id)
            .and_then(Value::as_container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemKind;
    use crate::value::Value;

    fn name(local: &str) -> QName {
        QName::qualified("c", local)
    }

    fn sample() -> ObjectSnapshot {
        let mut user = ObjectSnapshot::new(name("UserType")).with_oid("u-1");
        user.root
            .ensure_item(&name("givenName"), ItemKind::Property)
            .add_value(Value::scalar("Jack"));
        let mut assignment = ContainerValue::new(Some(7));
        assignment
            .ensure_item(&name("description"), ItemKind::Property)
            .add_value(Value::scalar("pirate"));
        user.root
            .ensure_item(&name("assignment"), ItemKind::Container)
            .add_value(Value::Container(assignment));
        user
    }

    #[test]
    fn find_top_level_item() {
        let user = sample();
        let item = user.find_item(&ItemPath::of_name(name("givenName"))).unwrap();
        assert_eq!(item.values, vec![Value::scalar("Jack")]);
    }

    #[test]
    fn find_item_inside_identified_container() {
        let user = sample();
        let path = ItemPath::of_name(name("assignment"))
            .append_id(Some(7))
            .append_name(name("description"));
        let item = user.find_item(&path).unwrap();
        assert_eq!(item.values, vec![Value::scalar("pirate")]);
    }

    #[test]
    fn find_container_value_by_id() {
        let user = sample();
        let path = ItemPath::of_name(name("assignment")).append_id(Some(7));
        let cv = user.find_container_value(&path).unwrap();
        assert_eq!(cv.id, Some(7));
    }

    #[test]
    fn missing_id_resolves_to_none() {
        let user = sample();
        let path = ItemPath::of_name(name("assignment"))
            .append_id(Some(99))
            .append_name(name("description"));
        assert!(user.find_item(&path).is_none());
    }
}
