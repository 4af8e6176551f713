//! Path addressing for hierarchical, multi-valued objects.
//!
//! An [`ItemPath`] locates an item (or a single value of a multi-valued
//! container) inside a structured object: an ordered sequence of
//! [`PathSegment`]s, each either a namespace-qualified name or an optional
//! 64-bit value id. The empty path addresses the whole object.
//!
//! Namespace resolution is explicit: callers thread a [`Namespaces`] context
//! through [`Namespaces::resolve`] instead of relying on process-wide
//! defaults.

pub mod namespaces;
pub mod parse;
pub mod path;
pub mod qname;

pub use namespaces::{Namespaces, UnresolvableName};
pub use parse::{format_path, parse_path, PathParseError};
pub use path::{ItemPath, PathSegment};
pub use qname::QName;
