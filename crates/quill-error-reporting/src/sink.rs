//! The reporting channel between the translator and its host.

use crate::builder::DiagnosticMessageBuilder;
use crate::diagnostic::{DiagnosticKind, DiagnosticMessage};
use quill_source_map::SourceLocation;

/// Receives every user-visible outcome of a batch.
///
/// Implementations decide presentation; the batch only reports. The aggregate
/// success flag is false once any error has been reported. Warnings, infos
/// and plain messages never affect it.
pub trait DiagnosticSink {
    /// Report a warning or error.
    fn report(&mut self, diagnostic: DiagnosticMessage);

    /// Report a plain progress message.
    fn message(&mut self, text: &str);

    /// True while no error has been reported.
    fn success(&self) -> bool;

    /// Report an unexpected failure while processing `file` (or the batch
    /// itself when `file` is None).
    fn exception(&mut self, file: Option<&str>, error: &dyn std::error::Error) {
        let mut builder = DiagnosticMessageBuilder::from_code(DiagnosticKind::Error, "QL-0-1")
            .problem(error.to_string())
            .with_optional_location(file.map(SourceLocation::file));
        let mut source = error.source();
        while let Some(cause) = source {
            builder = builder.add_info(cause.to_string());
            source = cause.source();
        }
        self.report(builder.build());
    }
}

/// A sink that keeps everything in memory.
///
/// Used by library callers that render diagnostics themselves, and by tests.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<DiagnosticMessage>,
    messages: Vec<String>,
}

impl DiagnosticCollector {
    /// Create a new empty diagnostic collector.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[DiagnosticMessage] {
        &self.diagnostics
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Consume the collector and return all diagnostics.
    pub fn into_diagnostics(self) -> Vec<DiagnosticMessage> {
        self.diagnostics
    }
}

impl DiagnosticSink for DiagnosticCollector {
    fn report(&mut self, diagnostic: DiagnosticMessage) {
        self.diagnostics.push(diagnostic);
    }

    fn message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    fn success(&self) -> bool {
        !self.has_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "could not finish")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_warnings_keep_success() {
        let mut sink = DiagnosticCollector::new();
        sink.report(DiagnosticMessage::warning("careful"));
        sink.message("Processed file 'a.cs'.");

        assert!(sink.success());
        assert_eq!(sink.warnings().count(), 1);
        assert_eq!(sink.messages(), ["Processed file 'a.cs'."]);
    }

    #[test]
    fn test_errors_flip_success() {
        let mut sink = DiagnosticCollector::new();
        sink.report(
            DiagnosticMessageBuilder::error("Only one entry point can be defined per file.")
                .with_code("QL-2-2")
                .with_location(SourceLocation::file("t.cst"))
                .build(),
        );

        assert!(!sink.success());
        assert_eq!(sink.errors().count(), 1);
        assert_eq!(sink.into_diagnostics()[0].code.as_deref(), Some("QL-2-2"));
    }

    #[test]
    fn test_exception_reports_cause_chain() {
        let mut sink = DiagnosticCollector::new();
        let error = Outer(std::io::Error::other("disk on fire"));
        sink.exception(Some("t.cst"), &error);

        let diagnostic = &sink.diagnostics()[0];
        assert_eq!(diagnostic.code.as_deref(), Some("QL-0-1"));
        assert_eq!(diagnostic.message(), "could not finish");
        assert_eq!(diagnostic.details[0].content.as_str(), "disk on fire");
        assert_eq!(diagnostic.location.as_ref().unwrap().path, "t.cst");
        assert!(!sink.success());
    }
}
