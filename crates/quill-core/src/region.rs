/*
 * region.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Discovery and regeneration of template regions in host files.
 */

//! In-place template regions.
//!
//! A host file marks a region with a conditional block:
//!
//! ```text
//! #if QUILL_TEMPLATE
//! ...markup...
//! #else
//! #region Quill Generated
//! ...generated text...
//! #endregion
//! #endif
//! ```
//!
//! The first branch is the template and is kept as written. Everything after
//! its `#else` is replaced on every run, so regenerating an unchanged file
//! reproduces it byte for byte. `#if QUILL_TEMPLATE_LIBRARY` (optionally
//! `#if QUILL_TEMPLATE_LIBRARY_<writer>`) marks code that is translated into
//! writer calls instead of being run.

use std::ops::Range;

use tracing::trace;

/// Marker of a template region.
pub const TEMPLATE_REGION_MARKER: &str = "#if QUILL_TEMPLATE";

/// Marker of a template-library region.
pub const LIBRARY_REGION_MARKER: &str = "#if QUILL_TEMPLATE_LIBRARY";

/// Writer variable of library regions that do not name one.
pub const DEFAULT_WRITER: &str = "writer";

pub const GENERATED_REGION_START: &str = "#region Quill Generated";
pub const GENERATED_REGION_END: &str = "#endregion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionKind {
    Template,
    TemplateLibrary { writer: String },
}

impl RegionKind {
    /// Classify a line; `None` when it is not a region marker.
    pub fn from_marker(line: &str) -> Option<RegionKind> {
        let trimmed = line.trim();
        if trimmed == TEMPLATE_REGION_MARKER {
            return Some(RegionKind::Template);
        }
        if trimmed == LIBRARY_REGION_MARKER {
            return Some(RegionKind::TemplateLibrary {
                writer: DEFAULT_WRITER.to_string(),
            });
        }
        trimmed
            .strip_prefix(LIBRARY_REGION_MARKER)
            .and_then(|rest| rest.strip_prefix('_'))
            .map(|writer| RegionKind::TemplateLibrary {
                writer: writer.to_string(),
            })
    }
}

/// A region found in a host file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    /// 0-based line of the marker
    pub marker_line: usize,
    /// Lines of the first branch
    pub body: Range<usize>,
    /// 0-based line of the closing `#endif`
    pub end_line: usize,
    /// The first branch, each line followed by the file's line ending
    pub text: String,
}

impl Region {
    /// 0-based line of the first line of the template text.
    pub fn first_line(&self) -> usize {
        self.marker_line + 1
    }
}

/// Splits a host file into lines and finds its regions.
#[derive(Debug)]
pub struct RegionScanner<'a> {
    lines: Vec<&'a str>,
    eol: &'static str,
}

/// Regions of a host file.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub regions: Vec<Region>,
    /// Marker line of a region that is never closed
    pub unterminated: Option<usize>,
}

impl<'a> RegionScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        let eol = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let body = text.strip_suffix('\n').unwrap_or(text);
        let lines = if text.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line))
                .collect()
        };
        RegionScanner { lines, eol }
    }

    /// The file's line terminator.
    pub fn line_ending(&self) -> &'static str {
        self.eol
    }

    pub fn lines(&self) -> &[&'a str] {
        &self.lines
    }

    /// Find every region.
    ///
    /// Conditional blocks nested inside a region are part of it; the region
    /// ends where nesting returns to zero. An `#else` at the region's own
    /// level ends the template text.
    pub fn scan(&self) -> ScanResult {
        let mut result = ScanResult::default();
        let mut index = 0;

        while index < self.lines.len() {
            let Some(kind) = RegionKind::from_marker(self.lines[index]) else {
                index += 1;
                continue;
            };

            let marker_line = index;
            let mut depth = 1;
            let mut body_end = None;
            let mut cursor = index + 1;

            while cursor < self.lines.len() {
                let trimmed = self.lines[cursor].trim_start();
                if trimmed.starts_with("#if") {
                    depth += 1;
                } else if trimmed.starts_with("#endif") {
                    depth -= 1;
                } else if trimmed.starts_with("#else") && depth == 1 && body_end.is_none() {
                    body_end = Some(cursor);
                }
                if depth == 0 {
                    break;
                }
                cursor += 1;
            }

            if depth > 0 {
                result.unterminated = Some(marker_line);
                break;
            }

            let body = marker_line + 1..body_end.unwrap_or(cursor);
            let text = self.lines[body.clone()]
                .iter()
                .flat_map(|line| [*line, self.eol])
                .collect();
            trace!(marker_line, end_line = cursor, ?kind, "region");
            result.regions.push(Region {
                kind,
                marker_line,
                body,
                end_line: cursor,
                text,
            });
            index = cursor + 1;
        }

        result
    }
}

/// A host file after regeneration.
#[derive(Debug)]
pub struct RegionRewrite {
    pub text: String,
    pub regions: usize,
    pub unterminated: Option<usize>,
}

/// Regenerate every region of `text`.
///
/// `generate` produces the generated block of one region. Library regions
/// get a line break after their code; template output gets one only when it
/// does not already end with one. If `generate` fails, the whole rewrite
/// fails and the caller keeps the file as it was.
pub fn rewrite<E, F>(text: &str, mut generate: F) -> Result<RegionRewrite, E>
where
    F: FnMut(&Region) -> Result<String, E>,
{
    let scanner = RegionScanner::new(text);
    let eol = scanner.line_ending();
    let lines = scanner.lines();
    let scan = scanner.scan();

    let mut out = String::with_capacity(text.len());
    let push_line = |out: &mut String, line: &str| {
        out.push_str(line);
        out.push_str(eol);
    };

    let mut next = 0;
    for region in &scan.regions {
        for line in &lines[next..region.body.end] {
            push_line(&mut out, line);
        }

        let generated = generate(region)?;
        push_line(&mut out, "#else");
        push_line(&mut out, GENERATED_REGION_START);
        if !generated.is_empty() {
            let generated = with_line_ending(&generated, eol);
            out.push_str(&generated);
            if matches!(region.kind, RegionKind::TemplateLibrary { .. }) || !generated.ends_with('\n') {
                out.push_str(eol);
            }
        }
        push_line(&mut out, GENERATED_REGION_END);
        push_line(&mut out, "#endif");
        next = region.end_line + 1;
    }
    for line in &lines[next..] {
        push_line(&mut out, line);
    }

    Ok(RegionRewrite {
        text: out,
        regions: scan.regions.len(),
        unterminated: scan.unterminated,
    })
}

/// Convert every line break in `text` to `eol`.
fn with_line_ending(text: &str, eol: &str) -> String {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect::<Vec<_>>()
        .join(eol)
}
