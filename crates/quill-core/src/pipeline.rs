/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Compile, run and capture one translation unit.
 */

//! The compile-execute pipeline.
//!
//! One unit at a time: compile it through the [`CompilerService`], report
//! the compiler's diagnostics mapped back to the template's own lines, run
//! the result inside an [`ExecutionContext`] and capture what it wrote.
//! Output files are only written once the run finished without error, so a
//! failing template leaves its previous output untouched.

use std::path::Path;

use quill_error_reporting::{DiagnosticKind, DiagnosticMessage, DiagnosticMessageBuilder, DiagnosticSink};
use quill_source_map::SourceLocation;
use tracing::{debug, info};

use crate::compiler::{
    CompileFailure, CompileRequest, CompilerDiagnostic, CompilerService, DiagnosticOrigin, Severity,
};
use crate::context::{ExecutionContext, UnitHandle};
use crate::error::{QuillError, QuillResult};
use crate::output::{CommittedArtifact, OutputBuffer, RegionWriter, commit_artifacts};
use crate::unit::TranslationUnit;

pub struct CompileExecutePipeline<'a> {
    compiler: &'a dyn CompilerService,
    symbols: &'a str,
    debug: bool,
}

impl<'a> CompileExecutePipeline<'a> {
    pub fn new(compiler: &'a dyn CompilerService, symbols: &'a str, debug: bool) -> Self {
        CompileExecutePipeline {
            compiler,
            symbols,
            debug,
        }
    }

    /// Compile `unit` and hand the result to `ctx`.
    ///
    /// Every compiler diagnostic is reported through `sink`. When the
    /// compiler rejects the unit the error is [`QuillError::Compile`], which
    /// counts as already reported.
    pub fn compile(
        &self,
        unit: &TranslationUnit,
        ctx: &mut ExecutionContext,
        sink: &mut dyn DiagnosticSink,
    ) -> QuillResult<UnitHandle> {
        let request = CompileRequest {
            unit,
            references: &unit.references,
            symbols: self.symbols,
            debug: self.debug,
            work_dir: ctx.scratch_dir(),
        };
        debug!(entry = %unit.entry_symbol(), references = unit.references.len(), "compiling unit");

        match self.compiler.compile(&request) {
            Ok(module) => {
                for warning in &module.warnings {
                    sink.report(remap(unit, warning));
                }
                Ok(ctx.adopt(module.unit))
            }
            Err(CompileFailure::Rejected(diagnostics)) => {
                let errors = diagnostics.iter().filter(|d| d.is_error()).count();
                for diagnostic in &diagnostics {
                    sink.report(remap(unit, diagnostic));
                }
                info!(errors, "compilation failed");
                Err(QuillError::Compile { errors })
            }
            Err(CompileFailure::Backend(err)) => Err(err.into()),
        }
    }

    /// Compile and run an in-place region, returning the text it generated.
    pub fn run_region(
        &self,
        unit: &TranslationUnit,
        ctx: &mut ExecutionContext,
        sink: &mut dyn DiagnosticSink,
    ) -> QuillResult<String> {
        let handle = self.compile(unit, ctx, sink)?;
        let mut writer = RegionWriter::new();
        ctx.run(handle, &mut writer)?;
        Ok(writer.into_text())
    }

    /// Compile and run a whole template file, then write its outputs.
    ///
    /// Relative output paths are taken relative to `base_dir`. A run that
    /// selects no output at all is a usage error.
    pub fn run_template(
        &self,
        unit: &TranslationUnit,
        ctx: &mut ExecutionContext,
        sink: &mut dyn DiagnosticSink,
        base_dir: &Path,
    ) -> QuillResult<Vec<CommittedArtifact>> {
        let handle = self.compile(unit, ctx, sink)?;
        let mut buffer = OutputBuffer::relative_to(base_dir);
        ctx.run(handle, &mut buffer)?;

        let artifacts = buffer.finish();
        if artifacts.is_empty() {
            return Err(QuillError::NoOutput);
        }
        Ok(commit_artifacts(artifacts)?)
    }
}

/// Turn a compiler diagnostic into one attributed to the template.
///
/// Lines inside the unit are mapped through its source map; diagnostics in
/// other files keep the compiler's location; diagnostics without a location
/// are attributed to the unit's primary file.
pub fn remap(unit: &TranslationUnit, diagnostic: &CompilerDiagnostic) -> DiagnosticMessage {
    let location = match &diagnostic.origin {
        DiagnosticOrigin::Unit => unit
            .map_line(diagnostic.line, diagnostic.column)
            .or_else(|| unit.primary_path().map(SourceLocation::file)),
        DiagnosticOrigin::External(path) => Some(SourceLocation::new(
            path.display().to_string(),
            diagnostic.line,
            diagnostic.column,
        )),
        DiagnosticOrigin::Unknown => unit.primary_path().map(SourceLocation::file),
    };
    compiler_message(diagnostic, location)
}

/// A compiler diagnostic with an explicit location.
pub fn compiler_message(diagnostic: &CompilerDiagnostic, location: Option<SourceLocation>) -> DiagnosticMessage {
    let kind = match diagnostic.severity {
        Severity::Error => DiagnosticKind::Error,
        Severity::Warning => DiagnosticKind::Warning,
    };
    DiagnosticMessageBuilder::from_code(kind, "QL-3-2")
        .with_code(diagnostic.code.clone())
        .problem(diagnostic.message.clone())
        .with_optional_location(location)
        .build()
}
