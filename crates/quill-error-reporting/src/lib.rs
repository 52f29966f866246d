//! Error reporting and diagnostic messages for Quill.
//!
//! Every user-visible failure produced while translating, compiling or
//! running a template travels through this crate: the core builds
//! [`DiagnosticMessage`] values and hands them to a [`DiagnosticSink`], and
//! the front end decides how to render them.
//!
//! # Architecture
//!
//! - [`DiagnosticMessage`]: code, title, kind, problem, details, hints and
//!   an optional [`quill_source_map::SourceLocation`]
//! - [`DiagnosticMessageBuilder`]: tidyverse-style builder
//! - [`catalog`]: the `QL-<subsystem>-<n>` error code catalog
//! - [`DiagnosticSink`]: the reporting channel, with an aggregate success flag
//!
//! # Rendering
//!
//! - [`DiagnosticMessage::to_build_line`]: the `file(line,col): error CODE: message`
//!   form that build tools and IDEs parse
//! - [`DiagnosticMessage::to_text`]: tidyverse text, with an ariadne source
//!   snippet when the file is available
//! - [`DiagnosticMessage::to_json`]: machine-readable output
//!
//! # Example
//!
//! ```
//! use quill_error_reporting::{DiagnosticMessageBuilder, DiagnosticCollector, DiagnosticSink};
//! use quill_source_map::SourceLocation;
//!
//! let error = DiagnosticMessageBuilder::error("Missing Entry Point")
//!     .with_code("QL-2-1")
//!     .problem("The entry point must be specified by using <%@ EntryPoint Statement=\"...\" %>")
//!     .with_location(SourceLocation::file("Report.cst"))
//!     .build();
//!
//! let mut sink = DiagnosticCollector::new();
//! sink.report(error);
//! assert!(!sink.success());
//! ```

pub mod diagnostic;

// Error code catalog
pub mod catalog;

pub mod builder;

pub mod sink;

// Re-export main types for convenience
pub use builder::DiagnosticMessageBuilder;
pub use catalog::{ERROR_CATALOG, ErrorCodeInfo, get_error_info, get_subsystem};
pub use diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
pub use sink::{DiagnosticCollector, DiagnosticSink};
