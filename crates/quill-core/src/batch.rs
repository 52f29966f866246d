/*
 * batch.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Orchestration of one generation batch.
 */

//! Batch orchestration.
//!
//! A batch runs in three phases, in this order:
//!
//! 1. Template-library files: their regions are regenerated, then they are
//!    compiled into a temporary module that every later unit references.
//! 2. In-place files: their template regions are regenerated.
//! 3. Whole template files: compiled, run, and their outputs written.
//!
//! Failures are isolated per file. Every problem is reported through the
//! [`DiagnosticSink`] and the batch moves on; its success flag is the sink's.

use std::path::{Path, PathBuf};

use quill_error_reporting::{DiagnosticKind, DiagnosticMessageBuilder, DiagnosticSink};
use quill_source_map::SourceLocation;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::compiler::{CompilerError, CompilerService, DiagnosticOrigin, LibraryRequest, split_symbols};
use crate::config::BatchConfig;
use crate::context::ExecutionContext;
use crate::directive::IncludedFile;
use crate::error::{DirectiveError, QuillError, QuillResult};
use crate::output::{OutputError, OutputKind, write_if_changed};
use crate::pipeline::{CompileExecutePipeline, compiler_message};
use crate::reference::ReferenceResolver;
use crate::region::{self, RegionKind};
use crate::unit::{TranslationUnitBuilder, UnresolvedReference};

/// Token in a library file that is replaced by `true` before compiling.
pub const LIBRARY_FILE_MARKER: &str = "QUILL_FILE_IS_TEMPLATE_LIBRARY";

/// Suffix of the debug copies written next to templates.
pub const DEBUG_FILE_SUFFIX: &str = ".QuillDebug.cs";

/// Everything a batch works on.
#[derive(Debug, Clone, Default)]
pub struct BatchInputs {
    pub in_place_files: Vec<PathBuf>,
    pub template_files: Vec<PathBuf>,
    /// Files `Include` directives may name by file name alone
    pub include_files: Vec<PathBuf>,
    pub template_library_files: Vec<PathBuf>,
    pub dependency_paths: Vec<PathBuf>,
    pub define_constants: String,
    pub debug: bool,
    pub output_dir: Option<PathBuf>,
    /// Run the file phases in an execution context of their own
    pub isolate: bool,
    /// Leave scratch directories (generated programs) on disk
    pub keep_scratch: bool,
}

impl BatchInputs {
    /// Inputs with no files, taking the rest from configuration.
    pub fn from_config(config: &BatchConfig) -> Self {
        BatchInputs {
            dependency_paths: config.dependency_paths.clone(),
            define_constants: config.define.clone(),
            debug: config.debug,
            output_dir: config.output_dir.clone(),
            isolate: config.isolate,
            ..Self::default()
        }
    }

    /// Debug mode is on when asked for or when `DEBUG` is defined.
    pub fn debug_mode(&self) -> bool {
        self.debug || split_symbols(&self.define_constants).any(|symbol| symbol == "DEBUG")
    }
}

/// What a batch produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutputs {
    /// Files the build should compile
    pub compile_files: Vec<PathBuf>,
    /// Files the build should embed as resources
    pub embedded_resource_files: Vec<PathBuf>,
    /// Temporary files the caller should delete once the build is done
    pub files_to_delete: Vec<PathBuf>,
    /// Debug copies of generated units
    pub debug_files: Vec<PathBuf>,
    pub success: bool,
}

impl BatchOutputs {
    fn add_output(&mut self, path: PathBuf, kind: OutputKind) {
        let list = match kind {
            OutputKind::Compile => &mut self.compile_files,
            OutputKind::EmbeddedResource => &mut self.embedded_resource_files,
        };
        push_unique(list, path);
    }
}

fn push_unique(list: &mut Vec<PathBuf>, path: PathBuf) {
    if !list.contains(&path) {
        list.push(path);
    }
}

/// Run a batch with `compiler`.
pub fn run_batch(
    compiler: &dyn CompilerService,
    inputs: &BatchInputs,
    sink: &mut dyn DiagnosticSink,
) -> BatchOutputs {
    Generator::new(compiler, inputs).run(sink)
}

/// The state of one batch: the inputs and the growing reference list.
pub struct Generator<'a> {
    compiler: &'a dyn CompilerService,
    inputs: &'a BatchInputs,
    references: Vec<PathBuf>,
    debug: bool,
}

impl<'a> Generator<'a> {
    pub fn new(compiler: &'a dyn CompilerService, inputs: &'a BatchInputs) -> Self {
        Generator {
            compiler,
            inputs,
            references: Vec::new(),
            debug: inputs.debug_mode(),
        }
    }

    /// Modules every unit of the batch is compiled against.
    pub fn references(&self) -> &[PathBuf] {
        &self.references
    }

    pub fn run(mut self, sink: &mut dyn DiagnosticSink) -> BatchOutputs {
        let mut outputs = BatchOutputs::default();
        info!(
            compiler = self.compiler.name(),
            libraries = self.inputs.template_library_files.len(),
            in_place = self.inputs.in_place_files.len(),
            templates = self.inputs.template_files.len(),
            debug = self.debug,
            "starting batch"
        );

        let mut ctx = match ExecutionContext::new() {
            Ok(ctx) => ctx,
            Err(err) => {
                sink.exception(None, &err);
                outputs.success = false;
                return outputs;
            }
        };

        if !self.inputs.template_library_files.is_empty() {
            self.library_phase(&mut ctx, sink, &mut outputs);
        }

        if self.inputs.isolate {
            match ExecutionContext::new() {
                Ok(mut isolated) => {
                    self.file_phases(&mut isolated, sink, &mut outputs);
                    self.dispose(isolated);
                }
                Err(err) => sink.exception(None, &err),
            }
        } else {
            self.file_phases(&mut ctx, sink, &mut outputs);
        }
        self.dispose(ctx);

        for file in &outputs.compile_files {
            sink.message(&format!("File '{}' was added to compile list.", file.display()));
        }
        outputs.success = sink.success();
        info!(success = outputs.success, "batch finished");
        outputs
    }

    fn file_phases(&self, ctx: &mut ExecutionContext, sink: &mut dyn DiagnosticSink, outputs: &mut BatchOutputs) {
        for file in &self.inputs.in_place_files {
            if self.process_in_place(file, ctx, sink, DiagnosticKind::Error) {
                push_unique(&mut outputs.compile_files, file.clone());
                sink.message(&format!("Processed in-place file '{}'.", file.display()));
            }
        }

        for file in &self.inputs.template_files {
            if let Err(err) = self.process_template_file(file, ctx, sink, outputs) {
                if !err.is_reported() {
                    sink.report(err.to_diagnostic(Some(file)));
                }
            }
            sink.message(&format!("Processed template file '{}'.", file.display()));
        }
    }

    /// Regenerate library regions, then compile the library files into a
    /// module the rest of the batch references.
    fn library_phase(&mut self, ctx: &mut ExecutionContext, sink: &mut dyn DiagnosticSink, outputs: &mut BatchOutputs) {
        let inputs = self.inputs;
        for file in &inputs.template_library_files {
            self.process_in_place(file, ctx, sink, DiagnosticKind::Warning);
        }

        let mut sources = Vec::with_capacity(inputs.template_library_files.len());
        for file in &inputs.template_library_files {
            match self.prepare_library_source(file, sink) {
                Ok(source) => {
                    if source != *file {
                        outputs.debug_files.push(source.clone());
                    }
                    if self.debug {
                        push_unique(&mut outputs.compile_files, source.clone());
                    }
                    sources.push(source);
                }
                Err(err) => sink.report(err.to_diagnostic(Some(file))),
            }
        }

        if sources.len() == inputs.template_library_files.len() {
            let module = std::env::temp_dir().join(format!("quill-library-{}.dll", Uuid::new_v4().simple()));
            let request = LibraryRequest {
                sources: &sources,
                output: &module,
                references: &self.references,
                symbols: &inputs.define_constants,
                debug: self.debug,
            };

            match self.compiler.compile_library(&request) {
                Ok(outcome) => {
                    for diagnostic in &outcome.diagnostics {
                        let location = match &diagnostic.origin {
                            DiagnosticOrigin::External(path) => Some(SourceLocation::new(
                                path.display().to_string(),
                                diagnostic.line,
                                diagnostic.column,
                            )),
                            DiagnosticOrigin::Unit | DiagnosticOrigin::Unknown => None,
                        };
                        sink.report(compiler_message(diagnostic, location));
                    }
                    if outcome.success {
                        debug!(module = %module.display(), "template library compiled");
                        self.references.push(module.clone());
                        outputs.files_to_delete.push(module);
                    } else if !outcome.diagnostics.iter().any(|d| d.is_error()) {
                        sink.report(QuillError::from(CompilerError::LibraryFailed).to_diagnostic(None));
                    }
                }
                Err(err) => sink.report(QuillError::from(err).to_diagnostic(None)),
            }
        }

        for file in &inputs.template_library_files {
            sink.message(&format!("Processed template library file '{}'.", file.display()));
        }
    }

    /// The file to compile for a library file: the file itself, or a debug
    /// copy with the library marker switched on.
    fn prepare_library_source(&self, file: &Path, sink: &mut dyn DiagnosticSink) -> QuillResult<PathBuf> {
        let content = std::fs::read_to_string(file).map_err(|source| QuillError::read(file, source))?;
        if !content.contains(LIBRARY_FILE_MARKER) {
            return Ok(file.to_path_buf());
        }

        let debug_file = debug_path(file);
        write_debug_file(&debug_file, &content.replace(LIBRARY_FILE_MARKER, "true"))?;
        sink.message(&format!("Generated debug file '{}'.", debug_file.display()));
        Ok(debug_file)
    }

    /// Regenerate the regions of one host file.
    ///
    /// Returns false when the file could not be read. Unresolved assembly
    /// references are reported with `unresolved_kind`.
    fn process_in_place(
        &self,
        path: &Path,
        ctx: &mut ExecutionContext,
        sink: &mut dyn DiagnosticSink,
        unresolved_kind: DiagnosticKind,
    ) -> bool {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) => {
                sink.report(QuillError::read(path, source).to_diagnostic(Some(path)));
                return false;
            }
        };

        let builder = self.unit_builder();
        let pipeline = self.pipeline();
        let rewritten = region::rewrite(&text, |region| -> QuillResult<String> {
            match &region.kind {
                RegionKind::TemplateLibrary { writer } => Ok(builder.library_region(&region.text, writer)),
                RegionKind::Template => {
                    let built = builder.region(path, &text, &region.text, region.first_line());
                    report_unresolved(sink, &built.unresolved, unresolved_kind);
                    pipeline.run_region(&built.unit, ctx, sink)
                }
            }
        });

        match rewritten {
            Ok(rewrite) => {
                if let Some(line) = rewrite.unterminated {
                    sink.report(
                        DiagnosticMessageBuilder::from_code(DiagnosticKind::Warning, "QL-2-4")
                            .problem("This template region is never closed with #endif; it was left unchanged.")
                            .with_location(SourceLocation::new(path.display().to_string(), line + 1, 1))
                            .build(),
                    );
                }
                if rewrite.text != text {
                    if let Err(source) = write_if_changed(path, &rewrite.text) {
                        let err = QuillError::Output(OutputError::Write {
                            path: path.to_path_buf(),
                            source,
                        });
                        sink.report(err.to_diagnostic(Some(path)));
                    } else {
                        debug!(path = %path.display(), regions = rewrite.regions, "host file rewritten");
                    }
                }
            }
            Err(err) => {
                if !err.is_reported() {
                    sink.report(err.to_diagnostic(Some(path)));
                }
                warn!(path = %path.display(), "regions failed; file left unchanged");
            }
        }
        true
    }

    fn process_template_file(
        &self,
        path: &Path,
        ctx: &mut ExecutionContext,
        sink: &mut dyn DiagnosticSink,
        outputs: &mut BatchOutputs,
    ) -> QuillResult<()> {
        let text = std::fs::read_to_string(path).map_err(|source| QuillError::read(path, source))?;
        let template_dir = path.parent().unwrap_or(Path::new("")).to_path_buf();

        let builder = self.unit_builder();
        let built = builder.template_file(path, &text, |include| self.load_include(&template_dir, include))?;
        report_unresolved(sink, &built.unresolved, DiagnosticKind::Error);

        if self.debug {
            let debug_file = debug_path(path);
            write_debug_file(&debug_file, &built.unit.code)?;
            sink.message(&format!("Generated debug file '{}'.", debug_file.display()));
            outputs.debug_files.push(debug_file);
        }

        let artifacts = self.pipeline().run_template(&built.unit, ctx, sink, &template_dir)?;
        for artifact in artifacts {
            sink.message(&format!(
                "Generated file '{}' from template '{}'.",
                artifact.path.display(),
                path.display()
            ));
            outputs.add_output(artifact.path, artifact.kind);
        }
        Ok(())
    }

    /// Read the file named by an `Include` directive.
    ///
    /// Absolute paths are used as they are. Relative paths are tried against
    /// the template's directory, then the working directory, then matched by
    /// file name against the declared include files.
    fn load_include(&self, template_dir: &Path, requested: &str) -> Result<IncludedFile, DirectiveError> {
        let path = self.resolve_include(template_dir, Path::new(requested));
        let content = std::fs::read_to_string(&path).map_err(|source| DirectiveError::IncludeUnreadable {
            path: path.clone(),
            source,
        })?;
        Ok(IncludedFile {
            path: path.display().to_string(),
            content,
        })
    }

    fn resolve_include(&self, template_dir: &Path, requested: &Path) -> PathBuf {
        if requested.is_absolute() {
            return requested.to_path_buf();
        }
        let beside_template = template_dir.join(requested);
        if beside_template.is_file() {
            return beside_template;
        }
        if requested.is_file() {
            return requested.to_path_buf();
        }
        self.inputs
            .include_files
            .iter()
            .find(|declared| declared.file_name().is_some() && declared.file_name() == requested.file_name())
            .cloned()
            .unwrap_or(beside_template)
    }

    fn dispose(&self, ctx: ExecutionContext) {
        if self.inputs.keep_scratch {
            let dir = ctx.dispose_keeping_files();
            info!(dir = %dir.display(), "kept scratch directory");
        } else if let Err(err) = ctx.dispose() {
            warn!(error = %err, "could not remove scratch directory");
        }
    }

    fn unit_builder(&self) -> TranslationUnitBuilder<'_> {
        let resolver = ReferenceResolver::new(
            self.compiler,
            &self.inputs.dependency_paths,
            self.inputs.output_dir.as_deref(),
        );
        TranslationUnitBuilder::new(resolver, &self.references)
    }

    fn pipeline(&self) -> CompileExecutePipeline<'_> {
        CompileExecutePipeline::new(self.compiler, &self.inputs.define_constants, self.debug)
    }
}

fn report_unresolved(sink: &mut dyn DiagnosticSink, unresolved: &[UnresolvedReference], kind: DiagnosticKind) {
    for reference in unresolved {
        let err = QuillError::from(DirectiveError::UnresolvedAssembly {
            name: reference.name.clone(),
        });
        sink.report(err.to_diagnostic_at(kind, Some(reference.location.clone())));
    }
}

/// `<file>.QuillDebug.cs`
pub fn debug_path(file: &Path) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(DEBUG_FILE_SUFFIX);
    PathBuf::from(name)
}

fn write_debug_file(path: &Path, content: &str) -> QuillResult<()> {
    write_if_changed(path, content).map_err(|source| {
        QuillError::Output(OutputError::Write {
            path: path.to_path_buf(),
            source,
        })
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_mode_from_symbols() {
        let mut inputs = BatchInputs {
            define_constants: "TRACE;DEBUG".into(),
            ..BatchInputs::default()
        };
        assert!(inputs.debug_mode());
        inputs.define_constants = "TRACE;DEBUGGING".into();
        assert!(!inputs.debug_mode());
        inputs.debug = true;
        assert!(inputs.debug_mode());
    }

    #[test]
    fn test_debug_path() {
        assert_eq!(
            debug_path(Path::new("dir/Report.cst")),
            PathBuf::from("dir/Report.cst.QuillDebug.cs")
        );
    }

    #[test]
    fn test_outputs_deduplicate() {
        let mut outputs = BatchOutputs::default();
        outputs.add_output(PathBuf::from("A.cs"), OutputKind::Compile);
        outputs.add_output(PathBuf::from("A.cs"), OutputKind::Compile);
        outputs.add_output(PathBuf::from("A.resx"), OutputKind::EmbeddedResource);
        assert_eq!(outputs.compile_files, vec![PathBuf::from("A.cs")]);
        assert_eq!(outputs.embedded_resource_files, vec![PathBuf::from("A.resx")]);
    }

    #[test]
    fn test_from_config() {
        let config = BatchConfig {
            define: "DEBUG".into(),
            ..BatchConfig::default()
        };
        let inputs = BatchInputs::from_config(&config);
        assert!(inputs.isolate);
        assert!(inputs.debug_mode());
        assert!(inputs.template_files.is_empty());
    }
}
