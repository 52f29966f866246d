//! Line spans mapping a generated unit back to its origin files

use crate::types::FileId;
use serde::{Deserialize, Serialize};

/// A run of consecutive unit lines that came from one origin file.
///
/// Lines `range_start..range_end` of the unit body correspond to lines
/// `origin_start..` of `file_id`. All values are 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub range_start: usize,
    pub range_end: usize,
    pub file_id: FileId,
    pub origin_start: usize,
}

impl LineSpan {
    pub fn new(range_start: usize, range_end: usize, file_id: FileId, origin_start: usize) -> Self {
        LineSpan {
            range_start,
            range_end,
            file_id,
            origin_start,
        }
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.range_start && line < self.range_end
    }

    pub fn is_empty(&self) -> bool {
        self.range_end <= self.range_start
    }
}

/// A line mapped back to its origin (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedLine {
    pub file_id: FileId,
    pub line: usize,
}

/// Ordered, non-overlapping line spans covering a unit body.
///
/// Lines that fall outside every span (the synthesized prefix and suffix)
/// resolve to the primary file unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    primary: FileId,
    spans: Vec<LineSpan>,
}

impl SourceMap {
    /// An empty map for a unit whose primary file is `primary`
    pub fn new(primary: FileId) -> Self {
        SourceMap {
            primary,
            spans: Vec::new(),
        }
    }

    /// A map where every line is the same line of `primary`
    pub fn identity(primary: FileId) -> Self {
        let mut map = Self::new(primary);
        map.push(LineSpan::new(0, usize::MAX, primary, 0));
        map
    }

    pub fn primary(&self) -> FileId {
        self.primary
    }

    pub fn spans(&self) -> &[LineSpan] {
        &self.spans
    }

    /// Append a span. Empty spans are dropped.
    pub fn push(&mut self, span: LineSpan) {
        if span.is_empty() {
            return;
        }
        debug_assert!(
            self.spans
                .last()
                .is_none_or(|last| last.range_end <= span.range_start),
            "spans must be pushed in order without overlap"
        );
        self.spans.push(span);
    }

    /// Move every span down by `lines`.
    ///
    /// Used when lines that preceded the body in the original file were
    /// removed before the spans were computed: the primary file's origin
    /// lines move with the ranges, included files keep theirs.
    pub fn shift(&mut self, lines: usize) {
        let primary = self.primary;
        for span in &mut self.spans {
            span.range_start = span.range_start.saturating_add(lines);
            span.range_end = span.range_end.saturating_add(lines);
            if span.file_id == primary {
                span.origin_start += lines;
            }
        }
    }

    /// True when spans leave no gap between the first and the last.
    pub fn is_contiguous(&self) -> bool {
        self.spans
            .windows(2)
            .all(|pair| pair[0].range_end == pair[1].range_start)
    }

    /// Resolve a body line to its origin.
    ///
    /// Negative lines (synthesized prefix lines) clamp to line 0 of the
    /// primary file.
    pub fn resolve(&self, line: i64) -> MappedLine {
        let Ok(line) = usize::try_from(line) else {
            return MappedLine {
                file_id: self.primary,
                line: 0,
            };
        };

        let idx = self.spans.partition_point(|s| s.range_end <= line);
        match self.spans.get(idx) {
            Some(span) if span.contains(line) => MappedLine {
                file_id: span.file_id,
                line: span.origin_start + (line - span.range_start),
            },
            _ => MappedLine {
                file_id: self.primary,
                line,
            },
        }
    }
}
