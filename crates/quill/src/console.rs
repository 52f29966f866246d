/*
 * console.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Terminal rendering of batch diagnostics.
 */

use clap::ValueEnum;
use quill_error_reporting::{DiagnosticKind, DiagnosticMessage, DiagnosticSink};
use quill_source_map::SourceContext;

/// How diagnostics are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DiagnosticFormat {
    /// `file(line,col): error CODE: message`, one per line
    Build,
    /// Human-readable text with source snippets
    Text,
    /// One JSON object per line
    Json,
}

/// Prints diagnostics to stderr and progress messages to stdout.
pub struct ConsoleSink {
    format: DiagnosticFormat,
    quiet: bool,
    sources: SourceContext,
    errors: usize,
    warnings: usize,
}

impl ConsoleSink {
    pub fn new(format: DiagnosticFormat, quiet: bool) -> Self {
        ConsoleSink {
            format,
            quiet,
            sources: SourceContext::new(),
            errors: 0,
            warnings: 0,
        }
    }

    pub fn render(&mut self, diagnostic: &DiagnosticMessage) -> String {
        match self.format {
            DiagnosticFormat::Build => diagnostic.to_build_line(),
            DiagnosticFormat::Json => diagnostic.to_json().to_string(),
            DiagnosticFormat::Text => {
                self.load_source(diagnostic);
                diagnostic.to_text(Some(&self.sources))
            }
        }
    }

    /// One-line account of what was reported.
    pub fn summary(&self) -> String {
        match self.format {
            DiagnosticFormat::Json => serde_json::json!({
                "kind": "summary",
                "success": self.errors == 0,
                "errors": self.errors,
                "warnings": self.warnings,
            })
            .to_string(),
            DiagnosticFormat::Build | DiagnosticFormat::Text => {
                format!("{} error(s), {} warning(s)", self.errors, self.warnings)
            }
        }
    }

    /// Print the summary, unless there is nothing worth summarizing.
    pub fn finish(&self) {
        if self.format == DiagnosticFormat::Json || self.errors + self.warnings > 0 {
            eprintln!("{}", self.summary());
        }
    }

    /// Register the located file so text output can show a snippet. Files
    /// that cannot be read are registered without content.
    fn load_source(&mut self, diagnostic: &DiagnosticMessage) {
        let Some(location) = &diagnostic.location else {
            return;
        };
        if self.sources.find_by_path(&location.path).is_none() {
            let content = std::fs::read_to_string(&location.path).ok();
            self.sources.add_file(location.path.clone(), content);
        }
    }
}

impl DiagnosticSink for ConsoleSink {
    fn report(&mut self, diagnostic: DiagnosticMessage) {
        match diagnostic.kind {
            DiagnosticKind::Error => self.errors += 1,
            DiagnosticKind::Warning => self.warnings += 1,
            DiagnosticKind::Info | DiagnosticKind::Note => {}
        }
        let rendered = self.render(&diagnostic);
        eprintln!("{rendered}");
    }

    fn message(&mut self, text: &str) {
        if !self.quiet {
            println!("{text}");
        }
    }

    fn success(&self) -> bool {
        self.errors == 0
    }
}
