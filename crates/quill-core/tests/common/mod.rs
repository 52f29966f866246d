/*
 * common/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * A scripted compiler service for batch tests.
 */

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use quill_core::batch::{BatchInputs, BatchOutputs, run_batch};
use quill_core::compiler::{
    CompileFailure, CompileRequest, CompiledModule, CompilerDiagnostic, CompilerError, CompilerService,
    DiagnosticOrigin, GeneratedUnit, LibraryOutcome, LibraryRequest, Severity,
};
use quill_core::error::ExecutionError;
use quill_core::output::{OutputKind, WriterSink};
use quill_error_reporting::DiagnosticCollector;
use regex::Regex;

/// Statements the scripted compiler knows how to "run", in source order.
static STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"\w+(?:\.\w+)*\.Write\(\s*(?:"(?P<text>(?:[^"\\]|\\.)*)"|(?P<number>-?\d+))\s*\);"#,
        r#"|Quill\.SetOutput\(\s*"(?P<path>(?:[^"\\]|\\.)*)"\s*,\s*Quill\.OutputType\.(?P<kind>\w+)\s*\);"#,
        r#"|throw\s+new\s+\w*Exception\(\s*"(?P<throw>[^"]*)"\s*\);"#,
    ))
    .expect("Invalid regex pattern for scripted statements")
});

/// Marks a line the scripted compiler rejects.
pub const COMPILE_ERROR: &str = "COMPILE_ERROR";

/// Marks a line the scripted compiler warns about.
pub const COMPILE_WARNING: &str = "COMPILE_WARNING";

/// Marks a library source the scripted compiler rejects.
pub const LIBRARY_ERROR: &str = "LIBRARY_ERROR";

/// Marks a library source the scripted compiler fails on without a diagnostic.
pub const LIBRARY_SILENT_FAILURE: &str = "LIBRARY_SILENT_FAILURE";

/// Marks a library source the scripted compiler crashes on.
pub const LIBRARY_CRASH: &str = "LIBRARY_CRASH";

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Write(String),
    SetOutput(PathBuf, OutputKind),
    Throw(String),
}

/// What the scripted compiler saw for one compile call.
#[derive(Debug, Clone)]
pub struct RecordedCompile {
    pub code: String,
    pub references: Vec<PathBuf>,
    pub symbols: String,
    pub debug: bool,
    pub work_dir: PathBuf,
}

/// A compiler that interprets literal writer calls instead of compiling C#.
///
/// Lines containing [`COMPILE_ERROR`] are rejected with a `CS0103`
/// diagnostic at that line; lines containing [`COMPILE_WARNING`] produce a
/// `CS0168` warning. Running a unit replays its `Write`, `SetOutput` and
/// `throw` statements in order.
#[derive(Debug, Default)]
pub struct ScriptedCompiler {
    compiles: RefCell<Vec<RecordedCompile>>,
    libraries: RefCell<Vec<Vec<PathBuf>>>,
    framework: Vec<(String, PathBuf)>,
}

impl ScriptedCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_framework_assembly(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.framework.push((name.to_string(), path.into()));
        self
    }

    pub fn compiles(&self) -> Vec<RecordedCompile> {
        self.compiles.borrow().clone()
    }

    pub fn compile_count(&self) -> usize {
        self.compiles.borrow().len()
    }

    /// Source lists of every library compile.
    pub fn libraries(&self) -> Vec<Vec<PathBuf>> {
        self.libraries.borrow().clone()
    }
}

impl CompilerService for ScriptedCompiler {
    fn name(&self) -> &str {
        "scripted"
    }

    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledModule, CompileFailure> {
        let code = request.unit.code.clone();
        self.compiles.borrow_mut().push(RecordedCompile {
            code: code.clone(),
            references: request.references.to_vec(),
            symbols: request.symbols.to_string(),
            debug: request.debug,
            work_dir: request.work_dir.to_path_buf(),
        });

        let errors = marked_lines(&code, COMPILE_ERROR, Severity::Error, "CS0103", DiagnosticOrigin::Unit);
        let warnings = marked_lines(&code, COMPILE_WARNING, Severity::Warning, "CS0168", DiagnosticOrigin::Unit);
        if !errors.is_empty() {
            let mut all = errors;
            all.extend(warnings);
            return Err(CompileFailure::Rejected(all));
        }

        Ok(CompiledModule {
            unit: Box::new(ScriptedUnit {
                entry: request.unit.entry_symbol(),
                ops: parse_ops(&code),
            }),
            warnings,
        })
    }

    fn compile_library(&self, request: &LibraryRequest<'_>) -> Result<LibraryOutcome, CompilerError> {
        self.libraries.borrow_mut().push(request.sources.to_vec());

        let mut diagnostics = Vec::new();
        for source in request.sources {
            let text = std::fs::read_to_string(source)?;
            if text.contains(LIBRARY_CRASH) {
                return Err(CompilerError::Failed {
                    status: "exit status: 3".to_string(),
                    output: "csc: internal crash".to_string(),
                });
            }
            if text.contains(LIBRARY_SILENT_FAILURE) {
                return Ok(LibraryOutcome::default());
            }
            diagnostics.extend(marked_lines(
                &text,
                LIBRARY_ERROR,
                Severity::Error,
                "CS0246",
                DiagnosticOrigin::External(source.clone()),
            ));
        }

        let success = diagnostics.iter().all(|d| !d.is_error());
        if success {
            std::fs::write(request.output, "scripted module")?;
        }
        Ok(LibraryOutcome { diagnostics, success })
    }

    fn resolve_framework_reference(&self, name: &str) -> Option<PathBuf> {
        self.framework
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, path)| path.clone())
    }
}

fn marked_lines(
    code: &str,
    marker: &str,
    severity: Severity,
    diagnostic_code: &str,
    origin: DiagnosticOrigin,
) -> Vec<CompilerDiagnostic> {
    code.lines()
        .enumerate()
        .filter_map(|(index, line)| {
            line.find(marker).map(|column| CompilerDiagnostic {
                origin: origin.clone(),
                line: index + 1,
                column: column + 1,
                severity,
                code: diagnostic_code.to_string(),
                message: format!("The name '{marker}' does not exist in the current context"),
            })
        })
        .collect()
}

fn parse_ops(code: &str) -> Vec<Op> {
    STATEMENT
        .captures_iter(code)
        .map(|caps| {
            if let Some(text) = caps.name("text") {
                Op::Write(unescape(text.as_str()))
            } else if let Some(number) = caps.name("number") {
                Op::Write(number.as_str().to_string())
            } else if let Some(path) = caps.name("path") {
                let kind = caps["kind"].parse().expect("known output type");
                Op::SetOutput(PathBuf::from(unescape(path.as_str())), kind)
            } else {
                Op::Throw(caps["throw"].to_string())
            }
        })
        .collect()
}

fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

struct ScriptedUnit {
    entry: String,
    ops: Vec<Op>,
}

impl GeneratedUnit for ScriptedUnit {
    fn entry_symbol(&self) -> &str {
        &self.entry
    }

    fn run(&self, sink: &mut dyn WriterSink) -> Result<(), ExecutionError> {
        for op in &self.ops {
            match op {
                Op::Write(text) => sink.write(text)?,
                Op::SetOutput(path, kind) => sink.set_output(path, *kind)?,
                Op::Throw(message) => {
                    return Err(ExecutionError::exception(
                        message.clone(),
                        Some(format!("System.Exception: {message}\n   at Generator.Run()")),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Inputs with nothing selected and isolation on.
pub fn inputs() -> BatchInputs {
    BatchInputs {
        isolate: true,
        ..BatchInputs::default()
    }
}

/// Run a batch against the scripted compiler and collect diagnostics.
pub fn run(compiler: &ScriptedCompiler, inputs: &BatchInputs) -> (BatchOutputs, DiagnosticCollector) {
    let mut sink = DiagnosticCollector::new();
    let outputs = run_batch(compiler, inputs, &mut sink);
    (outputs, sink)
}

pub fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(&path, content).expect("write test file");
    path
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).expect("read test file")
}

/// Every diagnostic rendered as a build line.
pub fn build_lines(sink: &DiagnosticCollector) -> Vec<String> {
    sink.diagnostics().iter().map(|d| d.to_build_line()).collect()
}
