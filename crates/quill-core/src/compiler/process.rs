/*
 * compiler/process.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Compiler service backed by an external C# compiler.
 */

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, trace};

use super::diagnostics::parse_compiler_output;
use super::shim::{self, PROTOCOL_PREFIX, SET_OUTPUT, WRITE};
use super::{
    CompileFailure, CompileRequest, CompiledModule, CompilerError, CompilerService, GeneratedUnit,
    LibraryOutcome, LibraryRequest, split_symbols,
};
use crate::config::CompilerConfig;
use crate::error::ExecutionError;
use crate::output::{OutputKind, WriterSink};

/// Environment variable naming the compiler to use.
pub const COMPILER_ENV: &str = "QUILL_CSC";

/// Compilers tried on `PATH`, in order.
const COMPILER_CANDIDATES: &[&str] = &["csc", "mcs"];

/// Drives `csc`/`mcs` as a subprocess and runs the executables it builds.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    program: PathBuf,
    runner: Option<PathBuf>,
    args: Vec<String>,
    framework_dirs: Vec<PathBuf>,
}

impl ProcessCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ProcessCompiler {
            program: program.into(),
            runner: None,
            args: Vec::new(),
            framework_dirs: Vec::new(),
        }
    }

    /// Build from configuration, locating the compiler if none is named.
    ///
    /// Without a configured runner, generated programs are started through
    /// `mono` when it is on `PATH` (except on Windows, where they run
    /// natively).
    pub fn from_config(config: &CompilerConfig) -> Result<Self, CompilerError> {
        let program = match &config.command {
            Some(command) => command.clone(),
            None => Self::locate()?,
        };
        let runner = config.runner.clone().or_else(|| {
            if cfg!(windows) {
                None
            } else {
                which::which("mono").ok()
            }
        });

        debug!(program = %program.display(), runner = ?runner, "using C# compiler");
        Ok(ProcessCompiler {
            program,
            runner,
            args: config.args.clone(),
            framework_dirs: config.framework_dirs.clone(),
        })
    }

    /// Find a compiler: `QUILL_CSC`, then `csc`, then `mcs` on `PATH`.
    pub fn locate() -> Result<PathBuf, CompilerError> {
        if let Some(program) = std::env::var_os(COMPILER_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(program));
        }
        for candidate in COMPILER_CANDIDATES {
            if let Ok(path) = which::which(candidate) {
                return Ok(path);
            }
        }
        let mut tried = vec![COMPILER_ENV.to_string()];
        tried.extend(COMPILER_CANDIDATES.iter().map(|c| c.to_string()));
        Err(CompilerError::NotFound { tried })
    }

    pub fn with_runner(mut self, runner: impl Into<PathBuf>) -> Self {
        self.runner = Some(runner.into());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_framework_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.framework_dirs = dirs;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run_compiler(&self, args: Vec<OsString>, cwd: Option<&Path>) -> Result<Output, CompilerError> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).args(args).stdin(Stdio::null());
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }
        trace!(?command, "starting compiler");
        command.output().map_err(|source| CompilerError::Launch {
            program: self.program.clone(),
            source,
        })
    }
}

/// Flags shared by executable and library builds.
fn common_args(
    target: &str,
    output: &Path,
    references: &[PathBuf],
    symbols: &str,
    debug: bool,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-nologo".into(),
        format!("-target:{target}").into(),
        prefixed("-out:", output),
    ];
    if debug {
        args.push("-debug".into());
    }
    let defines: Vec<&str> = split_symbols(symbols).collect();
    if !defines.is_empty() {
        args.push(format!("-define:{}", defines.join(";")).into());
    }
    args.extend(references.iter().map(|r| prefixed("-r:", r)));
    args
}

fn prefixed(flag: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(path.as_os_str());
    arg
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

impl CompilerService for ProcessCompiler {
    fn name(&self) -> &str {
        "csc"
    }

    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledModule, CompileFailure> {
        let unit = request.unit;
        let unit_path = request.work_dir.join(format!("{}.cs", unit.class_name));
        let host_path = request.work_dir.join(format!("{}.Host.cs", unit.class_name));
        let exe_path = request.work_dir.join(format!("{}.exe", unit.class_name));

        std::fs::write(&unit_path, &unit.code).map_err(CompilerError::from)?;
        std::fs::write(&host_path, shim::host_source(unit, request.references)).map_err(CompilerError::from)?;

        let mut args = common_args(
            "exe",
            &exe_path,
            request.references,
            request.symbols,
            request.debug,
        );
        args.push(unit_path.clone().into_os_string());
        args.push(host_path.into_os_string());

        let output = self.run_compiler(args, Some(request.work_dir))?;
        let text = combined_output(&output);
        let diagnostics = parse_compiler_output(&text, Some(&unit_path));

        if output.status.success() && exe_path.exists() {
            debug!(entry = %unit.entry_symbol(), "compiled unit");
            return Ok(CompiledModule {
                unit: Box::new(ProcessUnit {
                    program: exe_path,
                    runner: self.runner.clone(),
                    entry_symbol: unit.entry_symbol(),
                }),
                warnings: diagnostics,
            });
        }

        if diagnostics.iter().any(|d| d.is_error()) {
            Err(CompileFailure::Rejected(diagnostics))
        } else {
            Err(CompileFailure::Backend(CompilerError::Failed {
                status: output.status.to_string(),
                output: text.trim().to_string(),
            }))
        }
    }

    fn compile_library(&self, request: &LibraryRequest<'_>) -> Result<LibraryOutcome, CompilerError> {
        let mut args = common_args(
            "library",
            request.output,
            request.references,
            request.symbols,
            request.debug,
        );
        args.extend(request.sources.iter().map(|s| s.clone().into_os_string()));

        let output = self.run_compiler(args, None)?;
        let text = combined_output(&output);
        let diagnostics = parse_compiler_output(&text, None);
        let rejected = diagnostics.iter().any(|d| d.is_error());
        if !output.status.success() && !rejected {
            return Err(CompilerError::Failed {
                status: output.status.to_string(),
                output: text.trim().to_string(),
            });
        }
        let success = output.status.success() && !rejected;
        Ok(LibraryOutcome { diagnostics, success })
    }

    fn resolve_framework_reference(&self, name: &str) -> Option<PathBuf> {
        self.framework_dirs
            .iter()
            .map(|dir| dir.join(format!("{name}.dll")))
            .find(|candidate| candidate.is_file())
    }
}

/// A compiled executable wrapping one unit.
#[derive(Debug)]
struct ProcessUnit {
    program: PathBuf,
    runner: Option<PathBuf>,
    entry_symbol: String,
}

impl GeneratedUnit for ProcessUnit {
    fn entry_symbol(&self) -> &str {
        &self.entry_symbol
    }

    fn run(&self, sink: &mut dyn WriterSink) -> Result<(), ExecutionError> {
        let mut command = match &self.runner {
            Some(runner) => {
                let mut command = Command::new(runner);
                command.arg(&self.program);
                command
            }
            None => Command::new(&self.program),
        };
        let output = command
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExecutionError::Launch {
                program: self.program.clone(),
                source,
            })?;

        // A failed run keeps no output, so its protocol is not replayed.
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .find(|l| !l.trim().is_empty())
                .map(exception_message)
                .unwrap_or_else(|| format!("Generated program exited with {}", output.status));
            return Err(ExecutionError::exception(message, Some(stderr.into_owned())));
        }
        apply_protocol(&String::from_utf8_lossy(&output.stdout), sink)
    }
}

/// `System.InvalidOperationException: text` becomes `text`.
fn exception_message(line: &str) -> String {
    match line.split_once(": ") {
        Some((kind, message)) if kind.ends_with("Exception") && !kind.contains(' ') => {
            message.trim().to_string()
        }
        _ => line.trim().to_string(),
    }
}

/// Replay the shim's stdout protocol into `sink`.
pub fn apply_protocol(stdout: &str, sink: &mut dyn WriterSink) -> Result<(), ExecutionError> {
    for line in stdout.lines() {
        let Some(message) = line.strip_prefix(PROTOCOL_PREFIX) else {
            debug!(line, "ignoring console output of generated program");
            continue;
        };
        let (tag, payload) = message
            .rsplit_once(':')
            .ok_or_else(|| ExecutionError::protocol(line))?;
        let text = decode(payload)?;

        if tag == WRITE {
            sink.write(&text)?;
        } else if let Some(kind) = tag
            .strip_prefix(SET_OUTPUT)
            .and_then(|rest| rest.strip_prefix(':'))
        {
            let kind: OutputKind = kind.parse().map_err(ExecutionError::protocol)?;
            sink.set_output(Path::new(&text), kind)?;
        } else {
            return Err(ExecutionError::protocol(format!("unknown message '{tag}'")));
        }
    }
    Ok(())
}

fn decode(payload: &str) -> Result<String, ExecutionError> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| ExecutionError::protocol(format!("invalid payload: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ExecutionError::protocol(format!("invalid UTF-8: {e}")))
}
