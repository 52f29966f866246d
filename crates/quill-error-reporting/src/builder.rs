//! Builder API for diagnostic messages.

use crate::diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
use quill_source_map::SourceLocation;

/// Builder for [`DiagnosticMessage`] following tidyverse guidelines:
/// a title, then what went wrong (`problem`), the specifics (`add_detail`,
/// `add_info`, `add_note`), and optional hints.
///
/// ```
/// use quill_error_reporting::DiagnosticMessageBuilder;
///
/// let msg = DiagnosticMessageBuilder::error("Include File Unreadable")
///     .with_code("QL-1-2")
///     .problem("Could not read `header.csi`")
///     .add_detail("No such file or directory")
///     .add_hint("Is the path relative to the template's directory?")
///     .build();
///
/// assert_eq!(msg.details.len(), 1);
/// assert_eq!(msg.hints.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DiagnosticMessageBuilder {
    message: DiagnosticMessage,
}

impl DiagnosticMessageBuilder {
    fn with_kind(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        DiagnosticMessageBuilder {
            message: DiagnosticMessage::new(kind, title),
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::with_kind(DiagnosticKind::Error, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::with_kind(DiagnosticKind::Warning, title)
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::with_kind(DiagnosticKind::Info, title)
    }

    /// Start from a catalogued code, using the catalog title.
    ///
    /// Unknown codes fall back to the code itself as the title.
    pub fn from_code(kind: DiagnosticKind, code: &str) -> Self {
        let title = crate::catalog::get_title(code).unwrap_or(code);
        Self::with_kind(kind, title).with_code(code)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.message.code = Some(code.into());
        self
    }

    pub fn problem(mut self, problem: impl Into<MessageContent>) -> Self {
        self.message.problem = Some(problem.into());
        self
    }

    fn detail(mut self, kind: DetailKind, content: impl Into<MessageContent>) -> Self {
        self.message.details.push(DetailItem {
            kind,
            content: content.into(),
            location: None,
        });
        self
    }

    pub fn add_detail(self, content: impl Into<MessageContent>) -> Self {
        self.detail(DetailKind::Error, content)
    }

    pub fn add_info(self, content: impl Into<MessageContent>) -> Self {
        self.detail(DetailKind::Info, content)
    }

    pub fn add_note(self, content: impl Into<MessageContent>) -> Self {
        self.detail(DetailKind::Note, content)
    }

    pub fn add_hint(mut self, hint: impl Into<MessageContent>) -> Self {
        self.message.hints.push(hint.into());
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.message.location = Some(location);
        self
    }

    /// Attach a location when one is known.
    pub fn with_optional_location(mut self, location: Option<SourceLocation>) -> Self {
        self.message.location = location;
        self
    }

    pub fn build(self) -> DiagnosticMessage {
        self.message
    }
}
