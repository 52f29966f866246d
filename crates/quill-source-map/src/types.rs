//! Core types for source mapping

use serde::{Deserialize, Serialize};

/// A unique identifier for a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub usize);

/// A position in an original file, in the 1-based convention compilers and
/// build tools use when reporting.
///
/// `line == 0` means the line is unknown; `column == 0` means the column is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Path of the file as the user refers to it
    pub path: String,
    /// Line number (1-indexed, 0 when unknown)
    pub line: usize,
    /// Column number (1-indexed, 0 when unknown)
    pub column: usize,
}

impl SourceLocation {
    pub fn new(path: impl Into<String>, line: usize, column: usize) -> Self {
        SourceLocation {
            path: path.into(),
            line,
            column,
        }
    }

    /// A location that only names a file.
    pub fn file(path: impl Into<String>) -> Self {
        Self::new(path, 0, 0)
    }

    pub fn has_line(&self) -> bool {
        self.line > 0
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_line() {
            write!(f, "{}:{}:{}", self.path, self.line, self.column.max(1))
        } else {
            write!(f, "{}", self.path)
        }
    }
}
