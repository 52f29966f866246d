//! Template translation, compilation and output capture for Quill
//!
//! Quill turns templates (literal text mixed with `<% code %>`,
//! `<%= expression %>` and `<%@ directive %>` tags) into C# code, compiles
//! that code with an external compiler, runs it and captures what it writes.
//!
//! # Architecture
//!
//! - [`markup`] - the character-level translator from markup to writer calls
//! - [`directive`] - extraction of `<%@ ... %>` directives and include expansion
//! - [`region`] - template regions inside ordinary source files
//! - [`unit`] - assembly of complete compilation units
//! - [`compiler`] - the [`CompilerService`] capability and its subprocess backend
//! - [`pipeline`] - compile, run and capture one unit
//! - [`output`] - output selection and idempotent writes
//! - [`context`] - ownership of compiled units for one batch
//! - [`batch`] - the three-phase batch over library, in-place and template files
//!
//! # Example
//!
//! ```no_run
//! use quill_core::{BatchInputs, ProcessCompiler, QuillConfig, run_batch};
//! use quill_error_reporting::DiagnosticCollector;
//!
//! let config = QuillConfig::load(None, None)?;
//! let compiler = ProcessCompiler::from_config(&config.compiler)?;
//!
//! let mut inputs = BatchInputs::from_config(&config.batch);
//! inputs.template_files.push("Models.cst".into());
//!
//! let mut sink = DiagnosticCollector::new();
//! let outputs = run_batch(&compiler, &inputs, &mut sink);
//! for file in &outputs.compile_files {
//!     println!("{}", file.display());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod batch;
pub mod compiler;
pub mod config;
pub mod context;
pub mod directive;
pub mod error;
pub mod markup;
pub mod output;
pub mod pipeline;
pub mod reference;
pub mod region;
pub mod unit;

// Re-export commonly used types
pub use batch::{BatchInputs, BatchOutputs, Generator, run_batch};
pub use compiler::{
    CompileFailure, CompileRequest, CompiledModule, CompilerDiagnostic, CompilerError, CompilerService,
    DiagnosticOrigin, GeneratedUnit, LibraryOutcome, LibraryRequest, ProcessCompiler, Severity,
};
pub use config::{CliSettings, ConfigError, QuillConfig};
pub use context::ExecutionContext;
pub use error::{DirectiveError, ExecutionError, QuillError, QuillResult};
pub use markup::{MarkupTranslator, translate};
pub use output::{GeneratedArtifact, OutputBuffer, OutputError, OutputKind, WriterSink};
pub use pipeline::CompileExecutePipeline;
pub use unit::{TranslationUnit, TranslationUnitBuilder};
