/*
 * directive.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Extraction of <%@ ... %> directives from template bodies.
 */

//! Extraction of `<%@ ... %>` directives.
//!
//! Directives are removed from the body before translation. Each match
//! includes the whitespace around it, so removing a directive on its own line
//! also removes that line; the number of removed line breaks is tracked so
//! that compiler diagnostics can be mapped back to the unmodified file.
//!
//! `Include` directives are handled separately by [`expand_includes`]: the
//! included text replaces the directive in place and the whitespace around
//! the directive is kept.

use std::path::PathBuf;
use std::sync::LazyLock;

use quill_source_map::{FileId, LineSpan, SourceContext, SourceMap, count_newlines};
use regex::{Captures, Regex};

use crate::error::DirectiveError;

/// Header directives, in one pattern so that a single scan finds them in
/// document order:
///
/// - `<%@ Assembly Name="X" %>`
/// - `<%@ Import Namespace="X" %>`
/// - `<%@ EntryPoint Statement="X" %>`
/// - `<%@ CodeTemplate Language="C#" TargetLanguage="..." %>`
static HEADER_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?P<lead>\s*)<%@\s*(?:"#,
        r#"Assembly\s+Name="(?P<assembly>[^"]+)""#,
        r#"|Import\s+Namespace="(?P<import>[^"]+)""#,
        r#"|EntryPoint\s+Statement="(?P<entry>[^"]+)""#,
        r#"|(?P<codetemplate>CodeTemplate\s*Language="C#"\s+TargetLanguage="(?:[^"]+)")"#,
        r#")\s*%>(?P<trail>\s*)"#,
    ))
    .expect("Invalid regex pattern for header directives")
});

/// `<%@ Include Path="X" %>` with its surrounding whitespace.
static INCLUDE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\s*)<%@\s*Include\s+Path="([^"]+)"\s*%>(\s*)"#)
        .expect("Invalid regex pattern for include directives")
});

/// A directive found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    AssemblyRef(String),
    Import(String),
    Include(PathBuf),
    EntryPoint(String),
    CodeTemplateDecl,
}

/// The kinds of directive, for selecting which ones a pass handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    AssemblyRef,
    Import,
    Include,
    EntryPoint,
    CodeTemplateDecl,
}

impl Directive {
    pub fn kind(&self) -> DirectiveKind {
        match self {
            Directive::AssemblyRef(_) => DirectiveKind::AssemblyRef,
            Directive::Import(_) => DirectiveKind::Import,
            Directive::Include(_) => DirectiveKind::Include,
            Directive::EntryPoint(_) => DirectiveKind::EntryPoint,
            Directive::CodeTemplateDecl => DirectiveKind::CodeTemplateDecl,
        }
    }
}

/// Directive kinds stripped from a whole template file.
pub const TEMPLATE_FILE_DIRECTIVES: &[DirectiveKind] = &[
    DirectiveKind::EntryPoint,
    DirectiveKind::AssemblyRef,
    DirectiveKind::Import,
    DirectiveKind::CodeTemplateDecl,
];

/// Directive kinds stripped from an in-place template region.
pub const REGION_DIRECTIVES: &[DirectiveKind] = &[
    DirectiveKind::AssemblyRef,
    DirectiveKind::Import,
    DirectiveKind::CodeTemplateDecl,
];

/// A directive with the line it was written on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveMatch {
    pub directive: Directive,
    /// 0-based line of the `<%@` in the scanned text
    pub line: usize,
}

/// A body with its header directives removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDirectives {
    pub body: String,
    pub directives: Vec<DirectiveMatch>,
    /// Line breaks removed together with the directives
    pub consumed_lines: usize,
}

impl ExtractedDirectives {
    /// Assembly names with the line they were requested on.
    pub fn assembly_refs(&self) -> impl Iterator<Item = (&str, usize)> {
        self.directives.iter().filter_map(|m| match &m.directive {
            Directive::AssemblyRef(name) => Some((name.as_str(), m.line)),
            _ => None,
        })
    }

    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.directives.iter().filter_map(|m| match &m.directive {
            Directive::Import(namespace) => Some(namespace.as_str()),
            _ => None,
        })
    }

    /// The single entry statement of a whole template file.
    pub fn entry_point(&self) -> Result<&str, DirectiveError> {
        let mut statements = self.directives.iter().filter_map(|m| match &m.directive {
            Directive::EntryPoint(statement) => Some(statement.as_str()),
            _ => None,
        });
        let first = statements.next().ok_or(DirectiveError::MissingEntryPoint)?;
        let extra = statements.count();
        if extra > 0 {
            return Err(DirectiveError::DuplicateEntryPoint { count: extra + 1 });
        }
        Ok(first)
    }

    /// Lines the body moved up relative to the scanned text, minus one per
    /// import line that will be inserted ahead of it.
    pub fn line_delta(&self) -> i64 {
        self.consumed_lines as i64 - self.imports().count() as i64
    }
}

/// Remove every directive of the requested kinds from `text`.
///
/// Directives of other kinds are left in the body untouched.
pub fn extract(text: &str, kinds: &[DirectiveKind]) -> ExtractedDirectives {
    let mut body = String::with_capacity(text.len());
    let mut directives = Vec::new();
    let mut consumed_lines = 0;
    let mut last = 0;

    for caps in HEADER_DIRECTIVE.captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always participates");
        let directive = header_directive(&caps);
        if !kinds.contains(&directive.kind()) {
            continue;
        }

        let lead = caps.name("lead").map_or("", |m| m.as_str());
        let line = count_newlines(&text[..whole.start()]) + count_newlines(lead);

        body.push_str(&text[last..whole.start()]);
        last = whole.end();
        consumed_lines += count_newlines(whole.as_str());
        directives.push(DirectiveMatch { directive, line });
    }
    body.push_str(&text[last..]);

    ExtractedDirectives {
        body,
        directives,
        consumed_lines,
    }
}

fn header_directive(caps: &Captures<'_>) -> Directive {
    if let Some(name) = caps.name("assembly") {
        Directive::AssemblyRef(name.as_str().to_string())
    } else if let Some(namespace) = caps.name("import") {
        Directive::Import(namespace.as_str().to_string())
    } else if let Some(statement) = caps.name("entry") {
        Directive::EntryPoint(statement.as_str().to_string())
    } else {
        Directive::CodeTemplateDecl
    }
}

/// Text of an included file.
#[derive(Debug, Clone)]
pub struct IncludedFile {
    /// Path as it should appear in diagnostics
    pub path: String,
    pub content: String,
}

/// Paths named by `Include` directives, in order.
pub fn include_paths(text: &str) -> Vec<PathBuf> {
    INCLUDE_DIRECTIVE
        .captures_iter(text)
        .map(|caps| PathBuf::from(&caps[2]))
        .collect()
}

/// Replace every `Include` directive with the content of the named file.
///
/// `load` resolves and reads a path as written in the directive. Included
/// files are registered in `ctx`, and the returned map covers the whole
/// expanded body in body coordinates: lines from the primary file map to
/// their line in `body`, lines from an included file to their line in it.
/// Directives inside included content are not expanded.
pub fn expand_includes<F>(
    body: &str,
    primary: FileId,
    ctx: &mut SourceContext,
    mut load: F,
) -> Result<(String, SourceMap), DirectiveError>
where
    F: FnMut(&str) -> Result<IncludedFile, DirectiveError>,
{
    let mut map = SourceMap::new(primary);
    let mut out = String::with_capacity(body.len());
    let mut out_lines = 0;
    let mut body_lines = 0;
    let mut span_start = 0;
    let mut span_origin = 0;
    let mut last = 0;

    for caps in INCLUDE_DIRECTIVE.captures_iter(body) {
        let whole = caps.get(0).expect("group 0 always participates");
        let lead = &caps[1];
        let trail = &caps[3];

        let before = &body[last..whole.start()];
        out.push_str(before);
        out.push_str(lead);
        out_lines += count_newlines(before) + count_newlines(lead);
        body_lines += count_newlines(before) + count_newlines(lead);

        let included = load(&caps[2])?;
        let included_lines = count_newlines(&included.content);
        let file_id = ctx.add_file(included.path, Some(included.content.clone()));

        map.push(LineSpan::new(span_start, out_lines, primary, span_origin));
        map.push(LineSpan::new(
            out_lines,
            out_lines + included_lines + 1,
            file_id,
            0,
        ));

        out.push_str(&included.content);
        out.push_str(trail);

        let directive_text = &body[whole.start() + lead.len()..whole.end() - trail.len()];
        body_lines += count_newlines(directive_text);

        span_start = out_lines + included_lines + 1;
        span_origin = body_lines + 1;

        out_lines += included_lines + count_newlines(trail);
        body_lines += count_newlines(trail);
        last = whole.end();
    }

    out.push_str(&body[last..]);
    map.push(LineSpan::new(span_start, usize::MAX, primary, span_origin));

    Ok((out, map))
}
