//! Schema-typed object model and delta engine.
//!
//! A generic model for semi-structured business objects (users, roles,
//! resources, tasks): hierarchical, multi-valued items holding scalar,
//! container, or reference values, addressed by [`ItemPath`]s. On top of it,
//! the delta engine computes minimal structural diffs between snapshots,
//! applies them idempotently, validates structural invariants, and
//! round-trips changes through a self-describing wire representation with
//! deferred typing.
//!
//! Everything here is synchronous and reentrant: no threads, no I/O, no
//! shared mutable state. Callers serialize [`apply`] per target object and
//! use copy-on-apply when they need all-or-nothing semantics.

pub mod apply;
pub mod check;
pub mod codec;
pub mod delta;
pub mod diff;
pub mod item;
pub mod object;
pub mod registry;
pub mod value;

pub use object_delta_path::{
    format_path, parse_path, ItemPath, Namespaces, PathParseError, PathSegment, QName,
    UnresolvableName,
};

pub use apply::{apply, ApplyError};
pub use check::{check_delta, check_object, ConsistencyError};
pub use codec::{
    decode, encode, resolve_definitions, DecodeError, SchemaError, WireItemModification,
    WireModificationKind, WireObjectDelta,
};
pub use delta::{ChangeKind, ItemDelta, ItemDeltaBuilder, ObjectDelta};
pub use diff::{diff, diff_item, diff_optional, is_equivalent, DiffOptions};
pub use item::{Item, ItemKind};
pub use object::ObjectSnapshot;
pub use registry::{
    DefinitionRegistry, ItemDefinition, NoDefinitions, Occurs, ScalarType, StaticRegistry,
};
pub use value::{ContainerValue, ReferenceValue, ScalarValue, TypedPayload, Value};
