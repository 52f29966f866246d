/*
 * compiler/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The compiler service capability and its subprocess backend.
 */

//! Compiler service.
//!
//! The pipeline never talks to a compiler directly. It hands a
//! [`CompileRequest`] to a [`CompilerService`] and gets back either a
//! [`GeneratedUnit`] it can run, or the compiler's diagnostics. The default
//! backend, [`ProcessCompiler`], drives an external C# compiler.

pub mod diagnostics;
pub mod process;
pub mod shim;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::ExecutionError;
use crate::output::WriterSink;
use crate::unit::TranslationUnit;

pub use diagnostics::parse_compiler_output;
pub use process::ProcessCompiler;

/// Severity as reported by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Which file a compiler diagnostic points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticOrigin {
    /// The generated unit; lines need remapping
    Unit,
    /// Some other file named by the compiler
    External(PathBuf),
    /// No file (command-line or global diagnostics)
    Unknown,
}

/// One diagnostic as the compiler reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerDiagnostic {
    pub origin: DiagnosticOrigin,
    /// 1-based, 0 when unknown
    pub line: usize,
    /// 1-based, 0 when unknown
    pub column: usize,
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

impl CompilerDiagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// A unit to compile into something runnable.
#[derive(Debug)]
pub struct CompileRequest<'a> {
    pub unit: &'a TranslationUnit,
    pub references: &'a [PathBuf],
    /// Preprocessor symbols, as written in the build (`A;B`)
    pub symbols: &'a str,
    pub debug: bool,
    /// Scratch directory owned by the execution context
    pub work_dir: &'a Path,
}

/// On-disk sources to compile into a reusable module.
#[derive(Debug)]
pub struct LibraryRequest<'a> {
    pub sources: &'a [PathBuf],
    pub output: &'a Path,
    pub references: &'a [PathBuf],
    pub symbols: &'a str,
    pub debug: bool,
}

/// Result of a library compilation.
#[derive(Debug, Default)]
pub struct LibraryOutcome {
    pub diagnostics: Vec<CompilerDiagnostic>,
    pub success: bool,
}

/// A compiled unit plus the warnings produced while compiling it.
pub struct CompiledModule {
    pub unit: Box<dyn GeneratedUnit>,
    pub warnings: Vec<CompilerDiagnostic>,
}

impl std::fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledModule")
            .field("entry_symbol", &self.unit.entry_symbol())
            .field("warnings", &self.warnings)
            .finish()
    }
}

/// Why a unit did not produce a module.
#[derive(Debug)]
pub enum CompileFailure {
    /// The compiler rejected the code; every diagnostic it produced
    Rejected(Vec<CompilerDiagnostic>),
    /// The compiler could not be run at all
    Backend(CompilerError),
}

impl From<CompilerError> for CompileFailure {
    fn from(err: CompilerError) -> Self {
        CompileFailure::Backend(err)
    }
}

#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("No C# compiler found (tried {})", tried.join(", "))]
    NotFound { tried: Vec<String> },

    #[error("Could not start compiler '{}': {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Compiler exited with {status} without reporting an error: {output}")]
    Failed { status: String, output: String },

    #[error("The template library did not compile and no error was reported")]
    LibraryFailed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A compiled template that can be run.
pub trait GeneratedUnit {
    /// The symbol the unit enters through, for logs
    fn entry_symbol(&self) -> &str;

    /// Run the entry routine, sending its output to `sink`.
    fn run(&self, sink: &mut dyn WriterSink) -> Result<(), ExecutionError>;
}

/// Something that turns translation units into runnable code.
pub trait CompilerService {
    /// Short name for logs
    fn name(&self) -> &str;

    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledModule, CompileFailure>;

    fn compile_library(&self, request: &LibraryRequest<'_>) -> Result<LibraryOutcome, CompilerError>;

    /// Locate a framework assembly by simple name.
    fn resolve_framework_reference(&self, _name: &str) -> Option<PathBuf> {
        None
    }
}

/// Split a preprocessor symbol string on `;`, `,` and whitespace.
pub fn split_symbols(symbols: &str) -> impl Iterator<Item = &str> {
    symbols
        .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
}
