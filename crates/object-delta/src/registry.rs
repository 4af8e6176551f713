//! Definition lookup: an explicit handle, not reflection.
//!
//! The engine never discovers definitions on its own. Wherever typing or
//! multiplicity matters, callers pass a [`DefinitionRegistry`] reference;
//! items the registry does not know are treated as dynamic and accepted
//! without a definition.

use std::collections::HashMap;

use object_delta_path::{ItemPath, PathSegment, QName};

use crate::item::ItemKind;

/// Upper multiplicity bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurs {
    Bounded(u32),
    Unbounded,
}

impl Occurs {
    pub fn admits(&self, count: usize) -> bool {
        match self {
            Occurs::Bounded(max) => count <= *max as usize,
            Occurs::Unbounded => true,
        }
    }
}

/// Declared scalar type of a property item's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Bool,
    Int,
    Double,
    String,
    Bytes,
}

impl ScalarType {
    pub fn type_tag(&self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Double => "double",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
        }
    }
}

/// Definition of one item: kind, multiplicity, and (for properties) the
/// declared value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDefinition {
    pub name: QName,
    pub kind: ItemKind,
    pub min_occurs: u32,
    pub max_occurs: Occurs,
    pub value_type: Option<ScalarType>,
}

impl ItemDefinition {
    pub fn new(name: QName, kind: ItemKind) -> Self {
        Self {
            name,
            kind,
            min_occurs: 0,
            max_occurs: Occurs::Unbounded,
            value_type: None,
        }
    }

    pub fn single_valued(mut self) -> Self {
        self.max_occurs = Occurs::Bounded(1);
        self
    }

    pub fn required(mut self) -> Self {
        self.min_occurs = 1;
        self
    }

    pub fn typed(mut self, value_type: ScalarType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    pub fn is_multi_valued(&self) -> bool {
        !matches!(self.max_occurs, Occurs::Bounded(n) if n <= 1)
    }
}

/// Supplies item definitions by object type and path.
///
/// `None` means the item is dynamic (schema-less) and is accepted without
/// multiplicity or typing constraints.
pub trait DefinitionRegistry {
    fn item_definition(&self, object_type: &QName, path: &ItemPath) -> Option<ItemDefinition>;
}

/// Registry that knows nothing: every item is dynamic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefinitions;

impl DefinitionRegistry for NoDefinitions {
    fn item_definition(&self, _object_type: &QName, _path: &ItemPath) -> Option<ItemDefinition> {
        None
    }
}

/// In-memory registry keyed by object type and name-only path.
///
/// Lookup ignores `Id` segments, so `assignment[42].activation.status`
/// resolves the same definition as `assignment.activation.status`.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    definitions: HashMap<(QName, Vec<QName>), ItemDefinition>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(
        mut self,
        object_type: QName,
        path: &ItemPath,
        definition: ItemDefinition,
    ) -> Self {
        self.definitions
            .insert((object_type, name_key(path)), definition);
        self
    }
}

impl DefinitionRegistry for StaticRegistry {
    fn item_definition(&self, object_type: &QName, path: &ItemPath) -> Option<ItemDefinition> {
        self.definitions
            .get(&(object_type.clone(), name_key(path)))
            .cloned()
    }
}

fn name_key(path: &ItemPath) -> Vec<QName> {
    path.segments()
        .iter()
        .filter_map(|segment| match segment {
            PathSegment::Name(name) => Some(name.clone()),
            PathSegment::Id(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(local: &str) -> QName {
        QName::qualified("c", local)
    }

    #[test]
    fn static_registry_ignores_id_segments() {
        let def = ItemDefinition::new(name("status"), ItemKind::Property)
            .single_valued()
            .typed(ScalarType::String);
        let registry = StaticRegistry::new().with_definition(
            name("UserType"),
            &ItemPath::of_name(name("assignment")).append_name(name("status")),
            def.clone(),
        );
        let with_id = ItemPath::of_name(name("assignment"))
            .append_id(Some(42))
            .append_name(name("status"));
        assert_eq!(
            registry.item_definition(&name("UserType"), &with_id),
            Some(def)
        );
    }

    #[test]
    fn unknown_item_is_dynamic() {
        let registry = StaticRegistry::new();
        assert_eq!(
            registry.item_definition(&name("UserType"), &ItemPath::of_name(name("loot"))),
            None
        );
    }

    #[test]
    fn occurs_admits() {
        assert!(Occurs::Bounded(1).admits(1));
        assert!(!Occurs::Bounded(1).admits(2));
        assert!(Occurs::Unbounded.admits(1000));
    }
}
