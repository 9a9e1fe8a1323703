//! Common items for locating language elements in source code.
use core::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Location of a language element instance in source code.
///
/// The optional parent location attributes elements that were pulled in
/// through an include to the including line.
#[derive(Debug, Clone)]
pub struct SourceLocation {
    /// Path of the file the element was read from.
    pub file: Arc<str>,
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column number.
    pub column: u32,
    pub parent: Option<Box<SourceLocation>>,
}

impl SourceLocation {
    pub fn new(file: &str, line: u32, column: u32) -> Self {
        Self {
            file: Arc::from(file),
            line,
            column,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: SourceLocation) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Line number used in diagnostics and machine-code line attribution.
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        SourceLocation::new("", 0, 0)
    }
}

impl PartialEq for SourceLocation {
    fn eq(&self, _other: &Self) -> bool {
        // Two language elements rarely differ by where they were declared.
        // Treating all locations as equal lets tree nodes derive equality.
        true
    }
}
impl Eq for SourceLocation {}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Defines an element that has a location in source code.
pub trait Located {
    /// Get the source code position of the element.
    fn location(&self) -> &SourceLocation;
}

/// A name attached to the location where it was written.
///
/// Identifiers compare and hash by name only so that containers keyed by
/// identifier behave as name lookups.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub location: SourceLocation,
}

impl Identifier {
    pub fn from(name: &str) -> Self {
        Self {
            name: String::from(name),
            location: SourceLocation::default(),
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Located for Identifier {
    fn location(&self) -> &SourceLocation {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_when_same_name_different_location_then_equal() {
        let a = Identifier::from("x");
        let b = Identifier::from("x").with_location(SourceLocation::new("m.hbt", 4, 2));
        assert_eq!(a, b);
    }

    #[test]
    fn identifier_when_different_name_then_not_equal() {
        assert_ne!(Identifier::from("x"), Identifier::from("y"));
    }

    #[test]
    fn source_location_when_display_then_file_line_column() {
        let loc = SourceLocation::new("machine.hbt", 12, 3);
        assert_eq!(format!("{loc}"), "machine.hbt:12:3");
    }

    #[test]
    fn source_location_when_included_then_parent_retained() {
        let outer = SourceLocation::new("main.hbt", 1, 1);
        let inner = SourceLocation::new("common.hbt", 7, 9).with_parent(outer);
        assert_eq!(inner.parent.as_ref().map(|p| p.line), Some(1));
    }
}
