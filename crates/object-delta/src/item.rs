//! Items: named, multiplicity-bound collections of same-kind values.

use std::fmt;

use object_delta_path::QName;

use crate::value::Value;

/// The three item kinds. Every value of one item shares its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Property,
    Container,
    Reference,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemKind::Property => "property",
            ItemKind::Container => "container",
            ItemKind::Reference => "reference",
        };
        write!(f, "{s}")
    }
}

/// A named item holding an ordered set of values.
///
/// Value order is preserved for display and for the diff tie-break rule, but
/// membership is by structural equality: the mutating APIs suppress
/// duplicates, and item equality ignores order.
#[derive(Debug, Clone)]
pub struct Item {
    pub name: QName,
    pub kind: ItemKind,
    pub values: Vec<Value>,
}

impl Item {
    pub fn new(name: QName, kind: ItemKind) -> Self {
        Self {
            name,
            kind,
            values: Vec::new(),
        }
    }

    pub fn with_values(name: QName, kind: ItemKind, values: Vec<Value>) -> Self {
        Self { name, kind, values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn single_value(&self) -> Option<&Value> {
        match self.values.as_slice() {
            [v] => Some(v),
            _ => None,
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// Add a value unless an equal one is already present. Returns whether
    /// the item changed.
    pub fn add_value(&mut self, value: Value) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.values.push(value);
        true
    }

    /// Remove every value equal to `value`. Absent values are a no-op.
    /// Returns whether the item changed.
    pub fn remove_value(&mut self, value: &Value) -> bool {
        let before = self.values.len();
        self.values.retain(|v| v != value);
        self.values.len() != before
    }

    /// Replace the whole value set.
    pub fn replace_values(&mut self, values: Vec<Value>) {
        self.values = values;
    }
}

impl PartialEq for Item {
    /// Order-insensitive: same name, kind, and value multiset. Duplicates
    /// can enter through the public `values` field, so occurrences are
    /// counted per distinct value rather than tested for membership.
    fn eq(&self, other: &Self) -> bool {
        let occurrences = |values: &[Value], v: &Value| values.iter().filter(|w| *w == v).count();
        self.name == other.name
            && self.kind == other.kind
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .all(|v| occurrences(&self.values, v) == occurrences(&other.values, v))
    }
}

impl Eq for Item {}
