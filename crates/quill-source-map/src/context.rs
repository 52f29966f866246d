//! Source context for managing files

use crate::file_info::FileInformation;
use crate::types::{FileId, SourceLocation};
use serde::{Deserialize, Serialize};

/// The files that contributed text to one generated unit
///
/// File ids are dense indexes in registration order; the first file added is
/// conventionally the primary template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceContext {
    files: Vec<SourceFile>,
}

/// A source file with content and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// File path as the user refers to it
    pub path: String,
    /// File content, when it was kept in memory
    ///
    /// When None, content is read from disk using the path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Line index, when content was available at registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInformation>,
}

impl SourceContext {
    /// Create a new empty source context
    pub fn new() -> Self {
        SourceContext { files: Vec::new() }
    }

    /// Add a file to the context and return its ID
    ///
    /// - If content is Some: the content is stored and indexed.
    /// - If content is None: the file is disk-backed; it is indexed now if
    ///   it can be read, and read again on demand for rendering.
    pub fn add_file(&mut self, path: String, content: Option<String>) -> FileId {
        let id = FileId(self.files.len());

        let file_info = match &content {
            Some(c) => Some(FileInformation::new(c)),
            None => std::fs::read_to_string(&path)
                .ok()
                .map(|c| FileInformation::new(&c)),
        };

        self.files.push(SourceFile {
            path,
            content,
            file_info,
        });
        id
    }

    /// Get a file by ID
    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0)
    }

    /// Find the most recently registered file with the given path
    pub fn find_by_path(&self, path: &str) -> Option<FileId> {
        self.files
            .iter()
            .rposition(|f| f.path == path)
            .map(FileId)
    }

    /// Path of a registered file
    pub fn path(&self, id: FileId) -> Option<&str> {
        self.get_file(id).map(|f| f.path.as_str())
    }

    /// All registered files, in id order
    pub fn files(&self) -> impl Iterator<Item = (FileId, &SourceFile)> {
        self.files.iter().enumerate().map(|(i, f)| (FileId(i), f))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Resolve a reported location to `(file, byte offset)` within that file.
    ///
    /// Columns past the end of their line clamp to the line end. Returns None
    /// for unknown files, unknown lines, or files without an index.
    pub fn offset_of(&self, location: &SourceLocation) -> Option<(FileId, usize)> {
        if !location.has_line() {
            return None;
        }
        let id = self.find_by_path(&location.path)?;
        let info = self.get_file(id)?.file_info.as_ref()?;
        let row = location.line - 1;
        let start = info.line_start(row)?;
        let end = info.line_end(row)?;
        let offset = (start + location.column.saturating_sub(1)).min(end);
        Some((id, offset))
    }

    /// Content of a file, from memory or disk
    pub fn content(&self, id: FileId) -> Option<String> {
        let file = self.get_file(id)?;
        match &file.content {
            Some(c) => Some(c.clone()),
            None => std::fs::read_to_string(&file.path).ok(),
        }
    }
}
