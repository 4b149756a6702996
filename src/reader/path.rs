//! Structural paths of the values being parsed
//!
//! A path starts as the empty string for the root value; every object member appends
//! `.name` and every array item appends `[]`. Array indices are deliberately not part of the
//! path, so that a single [type hint](crate::Codec::add_type_hint) such as `.rows[].value`
//! applies to all items.

use crate::bean::{TargetType, TypeHint};

/// Step from a container to one of its values
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Segment<'n> {
    /// Member of a JSON object with the given name
    Member(&'n str),
    /// Item of a JSON array
    Element,
}

/// Context of the JSON object or array which is currently being parsed
///
/// Contexts are created once per nesting step and never modified afterwards; each
/// context refers to the context of the enclosing container.
#[derive(Debug)]
pub struct PathContext<'p> {
    parent: Option<&'p PathContext<'p>>,
    path: String,
    container: TargetType,
    member_hint: Option<TypeHint>,
    depth: u32,
}

impl PathContext<'static> {
    /// Creates the context for the root value
    pub fn root(container: TargetType, member_hint: Option<TypeHint>) -> Self {
        PathContext {
            parent: None,
            path: String::new(),
            container,
            member_hint,
            depth: 1,
        }
    }
}

impl<'p> PathContext<'p> {
    /// Creates the context of a nested container
    ///
    /// `path` should have been obtained from [`child_path`](Self::child_path).
    pub fn push(
        &self,
        path: String,
        container: TargetType,
        member_hint: Option<TypeHint>,
    ) -> PathContext<'_> {
        PathContext {
            parent: Some(self),
            path,
            container,
            member_hint,
            depth: self.depth + 1,
        }
    }

    /// Gets the path of a value within this container
    pub fn child_path(&self, segment: Segment<'_>) -> String {
        match segment {
            Segment::Member(name) => format!("{}.{name}", self.path),
            Segment::Element => format!("{}[]", self.path),
        }
    }

    /// Gets the path of this container
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Gets the context of the enclosing container, `None` for the root
    pub fn parent(&self) -> Option<&PathContext<'p>> {
        self.parent
    }

    /// Gets the type which was instantiated for this container
    pub fn container(&self) -> TargetType {
        self.container
    }

    /// Gets the type hint for the values of this container
    ///
    /// For arrays this is the declared item type, for maps the declared member value type.
    pub fn member_hint(&self) -> Option<&TypeHint> {
        self.member_hint.as_ref()
    }

    /// Nesting depth, 1 for the root
    pub fn depth(&self) -> u32 {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths() {
        let root = PathContext::root(TargetType::Map, None);
        assert_eq!("", root.path());
        assert_eq!(".rows", root.child_path(Segment::Member("rows")));

        let rows = root.push(
            root.child_path(Segment::Member("rows")),
            TargetType::Sequence,
            Some(TypeHint::new(TargetType::Map)),
        );
        assert_eq!(".rows[]", rows.child_path(Segment::Element));

        let row = rows.push(rows.child_path(Segment::Element), TargetType::Map, None);
        assert_eq!(".rows[].value", row.child_path(Segment::Member("value")));
        assert_eq!(3, row.depth());
        assert_eq!(Some(TargetType::Map), rows.member_hint().map(TypeHint::target));

        let parent = row.parent().map(PathContext::path);
        assert_eq!(Some(".rows"), parent);
        assert!(root.parent().is_none());
    }

    #[test]
    fn root_array() {
        let root = PathContext::root(TargetType::Sequence, None);
        let nested = root.push(root.child_path(Segment::Element), TargetType::Sequence, None);
        assert_eq!("[][]", nested.child_path(Segment::Element));
        assert_eq!(TargetType::Sequence, nested.container());
    }
}
