/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for template processing.
 */

//! Error types for template processing.
//!
//! Every error is scoped to one file: the batch reports it through the
//! diagnostics sink and moves on to the next file.

use std::path::{Path, PathBuf};

use quill_error_reporting::{DiagnosticKind, DiagnosticMessage, DiagnosticMessageBuilder};
use quill_source_map::SourceLocation;
use thiserror::Error;

use crate::compiler::CompilerError;
use crate::config::ConfigError;
use crate::output::OutputError;

/// Problems with the `<%@ ... %>` directives of a template.
#[derive(Debug, Error)]
pub enum DirectiveError {
    #[error("The entry point must be specified by using <%@ EntryPoint Statement=\"...\" %>")]
    MissingEntryPoint,

    #[error("Only one entry point can be defined per file.")]
    DuplicateEntryPoint {
        /// How many entry points were found
        count: usize,
    },

    #[error("Could not find assembly '{name}'.")]
    UnresolvedAssembly { name: String },

    #[error("Could not read include file '{}': {source}", path.display())]
    IncludeUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DirectiveError {
    pub fn code(&self) -> &'static str {
        match self {
            DirectiveError::MissingEntryPoint => "QL-2-1",
            DirectiveError::DuplicateEntryPoint { .. } => "QL-2-2",
            DirectiveError::UnresolvedAssembly { .. } => "QL-2-3",
            DirectiveError::IncludeUnreadable { .. } => "QL-1-2",
        }
    }
}

/// Failures while running a compiled template.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The entry routine raised an exception.
    #[error("{message}")]
    Exception {
        message: String,
        /// Full exception text (stack trace and inner exceptions)
        detail: Option<String>,
    },

    /// The compiled program could not be started.
    #[error("Could not start '{}': {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compiled program produced output the host could not decode.
    #[error("Malformed output from generated program: {0}")]
    Protocol(String),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl ExecutionError {
    /// Create an exception error.
    pub fn exception(message: impl Into<String>, detail: Option<String>) -> Self {
        Self::Exception {
            message: message.into(),
            detail,
        }
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            ExecutionError::Output(err) => err.code(),
            _ => "QL-4-1",
        }
    }
}

/// Errors that abort processing of a single file.
#[derive(Debug, Error)]
pub enum QuillError {
    #[error("Could not read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Directive(#[from] DirectiveError),

    /// The compiler rejected the unit. The diagnostics have already been
    /// reported individually.
    #[error("Compilation failed with {errors} error(s)")]
    Compile { errors: usize },

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(
        "At least one template output must be specified by using Quill.SetOutput(string outputFile, Quill.OutputType outputType)"
    )]
    NoOutput,

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for template processing.
pub type QuillResult<T> = Result<T, QuillError>;

impl QuillError {
    /// Create a read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Catalog code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            QuillError::Read { .. } => "QL-1-1",
            QuillError::Directive(err) => err.code(),
            QuillError::Compile { .. } => "QL-3-2",
            QuillError::Execution(err) => err.code(),
            QuillError::NoOutput => "QL-5-1",
            QuillError::Output(err) => err.code(),
            QuillError::Compiler(_) => "QL-3-1",
            QuillError::Config(_) => "QL-6-1",
            QuillError::Io(_) => "QL-0-1",
        }
    }

    /// True when the error was already reported through the sink.
    pub fn is_reported(&self) -> bool {
        matches!(self, QuillError::Compile { .. })
    }

    /// Convert to a diagnostic attributed to `file`.
    pub fn to_diagnostic(&self, file: Option<&Path>) -> DiagnosticMessage {
        self.to_diagnostic_at(
            DiagnosticKind::Error,
            file.map(|f| SourceLocation::file(f.display().to_string())),
        )
    }

    /// Convert to a diagnostic of the given severity at a known location.
    pub fn to_diagnostic_at(&self, kind: DiagnosticKind, location: Option<SourceLocation>) -> DiagnosticMessage {
        let mut builder = DiagnosticMessageBuilder::from_code(kind, self.code())
            .problem(self.to_string())
            .with_optional_location(location);

        if let QuillError::Execution(ExecutionError::Exception {
            detail: Some(detail),
            ..
        }) = self
        {
            for line in detail.lines().filter(|l| !l.trim().is_empty()) {
                builder = builder.add_info(line.trim_end().to_string());
            }
        }

        if let QuillError::Directive(DirectiveError::IncludeUnreadable { .. }) = self {
            builder = builder.add_hint(
                "Relative include paths are resolved against the template's directory, then the working directory.",
            );
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_messages() {
        assert_eq!(
            DirectiveError::MissingEntryPoint.to_string(),
            "The entry point must be specified by using <%@ EntryPoint Statement=\"...\" %>"
        );
        assert_eq!(
            DirectiveError::DuplicateEntryPoint { count: 2 }.to_string(),
            "Only one entry point can be defined per file."
        );
        assert_eq!(
            DirectiveError::UnresolvedAssembly {
                name: "Acme.Data".into()
            }
            .to_string(),
            "Could not find assembly 'Acme.Data'."
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(QuillError::from(DirectiveError::MissingEntryPoint).code(), "QL-2-1");
        assert_eq!(QuillError::NoOutput.code(), "QL-5-1");
        assert_eq!(
            QuillError::read("a.cst", std::io::Error::other("x")).code(),
            "QL-1-1"
        );
        assert_eq!(
            QuillError::from(ExecutionError::exception("boom", None)).code(),
            "QL-4-1"
        );
    }

    #[test]
    fn test_to_diagnostic_carries_file_and_detail() {
        let error = QuillError::from(ExecutionError::exception(
            "Object reference not set to an instance of an object.",
            Some("System.NullReferenceException: Object reference...\n  at GeneratedClass_1.DumpOutput()\n".into()),
        ));
        let diagnostic = error.to_diagnostic(Some(Path::new("t.cst")));

        assert_eq!(diagnostic.kind, DiagnosticKind::Error);
        assert_eq!(diagnostic.code.as_deref(), Some("QL-4-1"));
        assert_eq!(diagnostic.title, "Template Execution Failed");
        assert_eq!(
            diagnostic.message(),
            "Object reference not set to an instance of an object."
        );
        assert_eq!(diagnostic.details.len(), 2);
        assert_eq!(diagnostic.location.unwrap().path, "t.cst");
    }

    #[test]
    fn test_warning_kind() {
        let error = QuillError::from(DirectiveError::UnresolvedAssembly { name: "X".into() });
        let diagnostic =
            error.to_diagnostic_at(DiagnosticKind::Warning, Some(SourceLocation::new("lib.cs", 7, 1)));
        assert_eq!(diagnostic.kind, DiagnosticKind::Warning);
        assert_eq!(diagnostic.to_build_line(), "lib.cs(7,1): warning QL-2-3: Could not find assembly 'X'.");
    }

    #[test]
    fn test_only_compile_errors_are_prereported() {
        assert!(QuillError::Compile { errors: 3 }.is_reported());
        assert!(!QuillError::NoOutput.is_reported());
    }
}
