//! Textual path grammar used on the wire and in diagnostics.
//!
//! Name segments are rendered `ns:local` (or bare `local`) and joined with
//! `.`; an id segment renders as a bracket group appended to its container
//! segment: `[42]`, or `[]` for an unestablished id. Example:
//!
//! ```text
//! c:assignment[42].c:activation.c:status
//! ```
//!
//! The grammar relies on namespace tokens and local names not containing
//! `.`, `:`, `[` or `]`; the parser rejects anything ambiguous.

use thiserror::Error;

use crate::path::{ItemPath, PathSegment};
use crate::qname::QName;

/// Malformed textual path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    #[error("path starts with an id segment: '{0}'")]
    IdFirst(String),
    #[error("empty path segment in '{0}'")]
    EmptySegment(String),
    #[error("malformed id '{0}'")]
    BadId(String),
    #[error("unbalanced bracket in '{0}'")]
    UnbalancedBracket(String),
}

/// Render a path in the textual grammar. Empty path renders as `""`.
pub fn format_path(path: &ItemPath) -> String {
    let mut out = String::new();
    for segment in path.segments() {
        match segment {
            PathSegment::Name(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                match &name.namespace {
                    Some(ns) => {
                        out.push_str(ns);
                        out.push(':');
                    }
                    None => {}
                }
                out.push_str(&name.local);
            }
            PathSegment::Id(id) => {
                out.push('[');
                if let Some(id) = id {
                    out.push_str(&id.to_string());
                }
                out.push(']');
            }
        }
    }
    out
}

/// Parse the textual grammar back into an [`ItemPath`].
pub fn parse_path(text: &str) -> Result<ItemPath, PathParseError> {
    if text.is_empty() {
        return Ok(ItemPath::empty());
    }
    let mut segments = Vec::new();
    for chunk in text.split('.') {
        let (name_text, brackets) = split_brackets(chunk, text)?;
        if name_text.is_empty() {
            if segments.is_empty() {
                return Err(PathParseError::IdFirst(text.to_string()));
            }
            if brackets.is_empty() {
                return Err(PathParseError::EmptySegment(text.to_string()));
            }
            // A chunk like `[3]` with no name is only legal at the very
            // start, which is already rejected above; mid-path it would
            // have to follow a `.`, which the printer never emits.
            return Err(PathParseError::EmptySegment(text.to_string()));
        }
        segments.push(PathSegment::Name(parse_name(&name_text)?));
        for bracket in brackets {
            segments.push(PathSegment::Id(parse_id(&bracket)?));
        }
    }
    Ok(ItemPath::new(segments))
}

fn parse_name(text: &str) -> Result<QName, PathParseError> {
    match text.split_once(':') {
        Some((ns, local)) => {
            if ns.is_empty() || local.is_empty() || local.contains(':') {
                return Err(PathParseError::EmptySegment(text.to_string()));
            }
            Ok(QName::qualified(ns, local))
        }
        None => Ok(QName::unqualified(text)),
    }
}

fn parse_id(text: &str) -> Result<Option<i64>, PathParseError> {
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<i64>()
        .map(Some)
        .map_err(|_| PathParseError::BadId(text.to_string()))
}

/// Split `chunk` into leading name text and the contents of each trailing
/// bracket group.
fn split_brackets(chunk: &str, whole: &str) -> Result<(String, Vec<String>), PathParseError> {
    let mut name = String::new();
    let mut brackets = Vec::new();
    let mut current: Option<String> = None;
    for ch in chunk.chars() {
        match (ch, &mut current) {
            ('[', None) => current = Some(String::new()),
            ('[', Some(_)) => return Err(PathParseError::UnbalancedBracket(whole.to_string())),
            (']', Some(inner)) => {
                brackets.push(std::mem::take(inner));
                current = None;
            }
            (']', None) => return Err(PathParseError::UnbalancedBracket(whole.to_string())),
            (c, Some(inner)) => inner.push(c),
            (c, None) => {
                if !brackets.is_empty() {
                    // Name text after a bracket group, e.g. `a[1]b`.
                    return Err(PathParseError::UnbalancedBracket(whole.to_string()));
                }
                name.push(c);
            }
        }
    }
    if current.is_some() {
        return Err(PathParseError::UnbalancedBracket(whole.to_string()));
    }
    Ok((name, brackets))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(local: &str) -> QName {
        QName::qualified("c", local)
    }

    #[test]
    fn round_trip_simple() {
        let p = ItemPath::of_name(name("givenName"));
        assert_eq!(parse_path(&format_path(&p)).unwrap(), p);
        assert_eq!(format_path(&p), "c:givenName");
    }

    #[test]
    fn round_trip_with_ids() {
        let p = ItemPath::of_name(name("assignment"))
            .append_id(Some(42))
            .append_name(name("activation"))
            .append_name(name("status"));
        let text = format_path(&p);
        assert_eq!(text, "c:assignment[42].c:activation.c:status");
        assert_eq!(parse_path(&text).unwrap(), p);
    }

    #[test]
    fn round_trip_unestablished_id() {
        let p = ItemPath::of_name(name("assignment")).append_id(None);
        let text = format_path(&p);
        assert_eq!(text, "c:assignment[]");
        assert_eq!(parse_path(&text).unwrap(), p);
    }

    #[test]
    fn round_trip_unqualified() {
        let p = ItemPath::of_name(QName::unqualified("loot"));
        assert_eq!(format_path(&p), "loot");
        assert_eq!(parse_path("loot").unwrap(), p);
    }

    #[test]
    fn empty_text_is_empty_path() {
        assert_eq!(parse_path("").unwrap(), ItemPath::empty());
        assert_eq!(format_path(&ItemPath::empty()), "");
    }

    #[test]
    fn id_first_rejected() {
        assert!(matches!(
            parse_path("[3].c:x"),
            Err(PathParseError::IdFirst(_))
        ));
    }

    #[test]
    fn bad_id_rejected() {
        assert!(matches!(
            parse_path("c:a[x]"),
            Err(PathParseError::BadId(_))
        ));
    }

    #[test]
    fn unbalanced_bracket_rejected() {
        assert!(matches!(
            parse_path("c:a[3"),
            Err(PathParseError::UnbalancedBracket(_))
        ));
        assert!(matches!(
            parse_path("c:a]3["),
            Err(PathParseError::UnbalancedBracket(_))
        ));
    }

    #[test]
    fn empty_segment_rejected() {
        assert!(matches!(
            parse_path("c:a..c:b"),
            Err(PathParseError::EmptySegment(_))
        ));
    }
}
