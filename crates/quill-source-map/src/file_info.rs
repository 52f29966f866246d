//! Line index for fast position lookups

use serde::{Deserialize, Serialize};

/// Line-break index of a file's content
///
/// Stores the offset of every newline so that line bounds are found without
/// rescanning the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInformation {
    /// Byte offsets of each newline character in the file
    line_breaks: Vec<usize>,

    /// Total length of the file in bytes
    total_length: usize,
}

impl FileInformation {
    /// Create file information by analyzing content
    ///
    /// # Example
    ///
    /// ```
    /// use quill_source_map::FileInformation;
    ///
    /// let info = FileInformation::new("line 1\nline 2\nline 3");
    /// assert_eq!(info.line_count(), 3);
    /// ```
    pub fn new(content: &str) -> Self {
        let line_breaks: Vec<usize> = content
            .char_indices()
            .filter_map(|(idx, ch)| if ch == '\n' { Some(idx) } else { None })
            .collect();

        FileInformation {
            line_breaks,
            total_length: content.len(),
        }
    }

    /// Byte offset of the first character of `row` (0-indexed)
    pub fn line_start(&self, row: usize) -> Option<usize> {
        match row {
            0 => Some(0),
            _ => self.line_breaks.get(row - 1).map(|brk| brk + 1),
        }
    }

    /// Byte offset one past the last character of `row`, excluding the newline
    pub fn line_end(&self, row: usize) -> Option<usize> {
        if row >= self.line_count() {
            return None;
        }
        Some(
            self.line_breaks
                .get(row)
                .copied()
                .unwrap_or(self.total_length),
        )
    }

    /// Get the total length of the file in bytes
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    /// Get the number of lines in the file
    pub fn line_count(&self) -> usize {
        self.line_breaks.len() + 1
    }
}
