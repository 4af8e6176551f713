//! Item paths: ordered sequences of name and value-id segments.

use std::fmt;

use crate::qname::QName;

/// One step of an [`ItemPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Descend into the item with this qualified name.
    Name(QName),
    /// Select one value of a multi-valued container by its id.
    ///
    /// `None` addresses a value whose identity has not been established by
    /// the owning store yet.
    Id(Option<i64>),
}

/// An ordered path into a structured object.
///
/// The empty path denotes the whole object. An `Id` segment always
/// qualifies the container named by the preceding `Name` segment and is
/// therefore never the first segment of a well-formed path; that shape is
/// validated by the consistency checker, not at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemPath(Vec<PathSegment>);

impl ItemPath {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Single-segment path for a named item.
    pub fn of_name(name: QName) -> Self {
        Self(vec![PathSegment::Name(name)])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// New path with `segment` appended; `self` is not modified.
    pub fn append(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    pub fn append_name(&self, name: QName) -> Self {
        self.append(PathSegment::Name(name))
    }

    pub fn append_id(&self, id: Option<i64>) -> Self {
        self.append(PathSegment::Id(id))
    }

    /// True if `self` begins with every segment of `prefix`, in order.
    pub fn starts_with(&self, prefix: &ItemPath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    /// The remainder of `self` after `prefix`, or `None` if `prefix` does
    /// not lead this path.
    pub fn rest_after(&self, prefix: &ItemPath) -> Option<ItemPath> {
        if !self.starts_with(prefix) {
            return None;
        }
        Some(Self(self.0[prefix.0.len()..].to_vec()))
    }

    /// The leading name segment, if the path starts with one.
    pub fn first_name(&self) -> Option<&QName> {
        match self.0.first() {
            Some(PathSegment::Name(name)) => Some(name),
            _ => None,
        }
    }

    /// The leading id segment, if the path starts with one.
    ///
    /// The outer `Option` is presence of the segment; the inner one is the
    /// id itself, which may be unestablished.
    pub fn first_id(&self) -> Option<Option<i64>> {
        match self.0.first() {
            Some(PathSegment::Id(id)) => Some(*id),
            _ => None,
        }
    }

    /// Path without its first segment. Empty stays empty.
    pub fn rest(&self) -> ItemPath {
        if self.0.is_empty() {
            return ItemPath::empty();
        }
        Self(self.0[1..].to_vec())
    }

    /// The trailing name segment, if the path ends with one.
    pub fn last_name(&self) -> Option<&QName> {
        match self.0.last() {
            Some(PathSegment::Name(name)) => Some(name),
            _ => None,
        }
    }
}

impl From<Vec<PathSegment>> for ItemPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::parse::format_path(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(local: &str) -> QName {
        QName::qualified("c", local)
    }

    #[test]
    fn append_does_not_mutate() {
        let base = ItemPath::of_name(name("assignment"));
        let longer = base.append_id(Some(3));
        assert_eq!(base.len(), 1);
        assert_eq!(longer.len(), 2);
    }

    #[test]
    fn starts_with_and_rest_after() {
        let prefix = ItemPath::of_name(name("assignment")).append_id(Some(3));
        let full = prefix.append_name(name("activation"));
        assert!(full.starts_with(&prefix));
        assert_eq!(
            full.rest_after(&prefix).unwrap(),
            ItemPath::of_name(name("activation"))
        );
        assert!(full.rest_after(&ItemPath::of_name(name("other"))).is_none());
    }

    #[test]
    fn empty_path_is_prefix_of_everything() {
        let p = ItemPath::of_name(name("x"));
        assert!(p.starts_with(&ItemPath::empty()));
        assert_eq!(p.rest_after(&ItemPath::empty()).unwrap(), p);
    }

    #[test]
    fn first_name_and_first_id() {
        let p = ItemPath::of_name(name("assignment")).append_id(None);
        assert_eq!(p.first_name(), Some(&name("assignment")));
        assert_eq!(p.first_id(), None);
        assert_eq!(p.rest().first_id(), Some(None));
    }
}
