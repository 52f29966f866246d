/*
 * generate.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Generate command implementation
 */

//! Generate command implementation.
//!
//! Runs one batch: template library files first, then in-place files, then
//! template files. The process exits with status 1 when any error was
//! reported.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use quill_core::output::write_if_changed;
use quill_core::{BatchInputs, BatchOutputs, CliSettings, ProcessCompiler, QuillConfig, run_batch};

use crate::console::{ConsoleSink, DiagnosticFormat};

/// File listing the generated files the build compiles.
pub const COMPILE_CACHE_FILE: &str = "Quill.CompileGeneratedFiles.cache";

/// File listing the generated files the build embeds as resources.
pub const EMBEDDED_RESOURCE_CACHE_FILE: &str = "Quill.EmbeddedResourceGeneratedFiles.cache";

/// Arguments for the generate command
#[derive(Debug)]
pub struct GenerateArgs {
    pub config: Option<PathBuf>,
    pub in_place: Vec<PathBuf>,
    pub templates: Vec<PathBuf>,
    pub libraries: Vec<PathBuf>,
    pub includes: Vec<PathBuf>,
    /// Command-line overrides of the configuration
    pub settings: CliSettings,
    pub format: DiagnosticFormat,
    pub keep_temp: bool,
    pub write_cache: Option<PathBuf>,
    pub quiet: bool,
}

/// Execute the generate command
pub fn execute(args: GenerateArgs) -> Result<ExitCode> {
    let config =
        QuillConfig::load(args.config.as_deref(), Some(&args.settings)).context("Failed to load configuration")?;
    let compiler = ProcessCompiler::from_config(&config.compiler).context("Failed to set up the C# compiler")?;
    debug!(compiler = %compiler.program().display(), "using compiler");

    let mut inputs = BatchInputs::from_config(&config.batch);
    inputs.in_place_files = args.in_place;
    inputs.template_files = args.templates;
    inputs.template_library_files = args.libraries;
    inputs.include_files = args.includes;
    inputs.keep_scratch = args.keep_temp;

    let mut sink = ConsoleSink::new(args.format, args.quiet);
    let outputs = run_batch(&compiler, &inputs, &mut sink);

    if let Some(dir) = &args.write_cache {
        write_cache(dir, &outputs)?;
    }
    if !args.keep_temp {
        remove_temporary_files(&outputs.files_to_delete);
    }
    sink.finish();

    Ok(if outputs.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Write the compile and embedded-resource lists, one path per line.
///
/// Unchanged lists are not rewritten, so builds that watch these files do
/// not see a change.
pub fn write_cache(dir: &Path, outputs: &BatchOutputs) -> Result<()> {
    let lists = [
        (COMPILE_CACHE_FILE, &outputs.compile_files),
        (EMBEDDED_RESOURCE_CACHE_FILE, &outputs.embedded_resource_files),
    ];
    for (name, files) in lists {
        let path = dir.join(name);
        let content: String = files.iter().map(|file| format!("{}\n", file.display())).collect();
        write_if_changed(&path, &content).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

fn remove_temporary_files(files: &[PathBuf]) {
    for file in files {
        match std::fs::remove_file(file) {
            Ok(()) => debug!(path = %file.display(), "removed temporary file"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %file.display(), error = %err, "could not remove temporary file"),
        }
    }
}
