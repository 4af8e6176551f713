//! The value model: scalar, container, and reference values.

use indexmap::IndexMap;

use object_delta_path::QName;

use crate::item::{Item, ItemKind};
use crate::object::ObjectSnapshot;

/// Self-describing scalar payload.
///
/// A payload is either a concrete typed primitive or a [`TypedPayload::Raw`]
/// tree: an owned, immutable intermediate produced by structural wire decode
/// and converted to a typed variant only once a definition resolves. Raw
/// trees are never aliased back to any live parse structure.
#[derive(Debug, Clone)]
pub enum TypedPayload {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Raw(serde_json::Value),
}

impl TypedPayload {
    /// The wire type tag for this payload.
    pub fn type_tag(&self) -> &'static str {
        match self {
            TypedPayload::Bool(_) => "bool",
            TypedPayload::Int(_) => "int",
            TypedPayload::Double(_) => "double",
            TypedPayload::String(_) => "string",
            TypedPayload::Bytes(_) => "bytes",
            TypedPayload::Raw(_) => "raw",
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, TypedPayload::Raw(_))
    }
}

impl PartialEq for TypedPayload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypedPayload::Bool(a), TypedPayload::Bool(b)) => a == b,
            (TypedPayload::Int(a), TypedPayload::Int(b)) => a == b,
            // Bit-pattern comparison so payload sets behave as sets even
            // around NaN.
            (TypedPayload::Double(a), TypedPayload::Double(b)) => a.to_bits() == b.to_bits(),
            (TypedPayload::String(a), TypedPayload::String(b)) => a == b,
            (TypedPayload::Bytes(a), TypedPayload::Bytes(b)) => a == b,
            (TypedPayload::Raw(a), TypedPayload::Raw(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TypedPayload {}

impl From<&str> for TypedPayload {
    fn from(s: &str) -> Self {
        TypedPayload::String(s.to_string())
    }
}

impl From<i64> for TypedPayload {
    fn from(i: i64) -> Self {
        TypedPayload::Int(i)
    }
}

impl From<bool> for TypedPayload {
    fn from(b: bool) -> Self {
        TypedPayload::Bool(b)
    }
}

/// A property value: one typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarValue {
    pub payload: TypedPayload,
}

impl ScalarValue {
    pub fn new(payload: impl Into<TypedPayload>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

/// A container value: an optional store-assigned id plus nested child items.
///
/// The id is owned by the persistence layer; `None` means identity has not
/// been established and the value is compared by full structural
/// equivalence instead.
#[derive(Debug, Clone, Default)]
pub struct ContainerValue {
    pub id: Option<i64>,
    pub items: IndexMap<QName, Item>,
}

impl ContainerValue {
    pub fn new(id: Option<i64>) -> Self {
        Self {
            id,
            items: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, name: &QName) -> Option<&Item> {
        self.items.get(name)
    }

    pub fn item_mut(&mut self, name: &QName) -> Option<&mut Item> {
        self.items.get_mut(name)
    }

    /// Child item of `name`, created empty with `kind` if absent.
    pub fn ensure_item(&mut self, name: &QName, kind: ItemKind) -> &mut Item {
        self.items
            .entry(name.clone())
            .or_insert_with(|| Item::new(name.clone(), kind))
    }

    pub fn put_item(&mut self, item: Item) {
        self.items.insert(item.name.clone(), item);
    }

    pub fn remove_item(&mut self, name: &QName) -> Option<Item> {
        self.items.shift_remove(name)
    }

    /// Child container value with the given id, if any.
    pub fn value_by_id(&self, name: &QName, id: i64) -> Option<&ContainerValue> {
        self.item(name)?.values.iter().find_map(|v| match v {
            Value::Container(cv) if cv.id == Some(id) => Some(cv),
            _ => None,
        })
    }
}

impl PartialEq for ContainerValue {
    /// Structural equivalence: ids must match and child items must hold the
    /// same values, ignoring item order and value order.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .all(|(name, item)| other.items.get(name) == Some(item))
    }
}

impl Eq for ContainerValue {}

/// A reference value: a pointer to another object.
#[derive(Debug, Clone)]
pub struct ReferenceValue {
    pub target_id: String,
    pub target_type: Option<QName>,
    /// Optional embedded snapshot of the target. Carried for callers'
    /// convenience; never diffed and never part of equality.
    pub embedded: Option<Box<ObjectSnapshot>>,
}

impl ReferenceValue {
    pub fn new(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            target_type: None,
            embedded: None,
        }
    }

    pub fn with_target_type(mut self, target_type: QName) -> Self {
        self.target_type = Some(target_type);
        self
    }

    pub fn with_embedded(mut self, snapshot: ObjectSnapshot) -> Self {
        self.embedded = Some(Box::new(snapshot));
        self
    }
}

impl PartialEq for ReferenceValue {
    /// References compare by target id only.
    fn eq(&self, other: &Self) -> bool {
        self.target_id == other.target_id
    }
}

impl Eq for ReferenceValue {}

/// Any value that can occupy an item slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(ScalarValue),
    Container(ContainerValue),
    Reference(ReferenceValue),
}

impl Value {
    /// Shorthand for a scalar value.
    pub fn scalar(payload: impl Into<TypedPayload>) -> Self {
        Value::Scalar(ScalarValue::new(payload))
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Value::Scalar(_) => ItemKind::Property,
            Value::Container(_) => ItemKind::Container,
            Value::Reference(_) => ItemKind::Reference,
        }
    }

    pub fn as_container(&self) -> Option<&ContainerValue> {
        match self {
            Value::Container(cv) => Some(cv),
            _ => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut ContainerValue> {
        match self {
            Value::Container(cv) => Some(cv),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            Value::Scalar(sv) => Some(sv),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ReferenceValue> {
        match self {
            Value::Reference(rv) => Some(rv),
            _ => None,
        }
    }

    /// Container id, if this is a container value with one assigned.
    pub fn container_id(&self) -> Option<i64> {
        match self {
            Value::Container(cv) => cv.id,
            _ => None,
        }
    }
}

impl From<ScalarValue> for Value {
    fn from(v: ScalarValue) -> Self {
        Value::Scalar(v)
    }
}

impl From<ContainerValue> for Value {
    fn from(v: ContainerValue) -> Self {
        Value::Container(v)
    }
}

impl From<ReferenceValue> for Value {
    fn from(v: ReferenceValue) -> Self {
        Value::Reference(v)
    }
}
