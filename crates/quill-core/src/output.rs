/*
 * output.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Output selection and idempotent writing of generated files.
 */

//! Output selection for whole template files.
//!
//! A template run selects files with `Quill.SetOutput(path, kind)` and writes
//! text to the current one. [`OutputBuffer`] tracks which file is open and
//! stages each finished file as a [`GeneratedArtifact`]. Nothing reaches the
//! disk until [`OutputBuffer::commit`], which the pipeline only calls after
//! the run finished without error, and which skips files whose content is
//! already up to date.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// How the build should consume a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputKind {
    Compile,
    EmbeddedResource,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Compile => write!(f, "Compile"),
            OutputKind::EmbeddedResource => write!(f, "EmbeddedResource"),
        }
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Compile" => Ok(OutputKind::Compile),
            "EmbeddedResource" => Ok(OutputKind::EmbeddedResource),
            other => Err(format!("unknown output type '{other}'")),
        }
    }
}

/// A finished output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub path: PathBuf,
    pub kind: OutputKind,
    pub content: String,
}

/// An artifact after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedArtifact {
    pub path: PathBuf,
    pub kind: OutputKind,
    /// False when the file already had this content
    pub written: bool,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Template text was written before an output file was selected with Quill.SetOutput")]
    NoOutputSelected,

    #[error("Output files cannot be selected from a template region ('{}')", path.display())]
    SelectionNotAllowed { path: PathBuf },

    #[error("Could not write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OutputError {
    pub fn code(&self) -> &'static str {
        match self {
            OutputError::NoOutputSelected | OutputError::SelectionNotAllowed { .. } => "QL-5-2",
            OutputError::Write { .. } => "QL-1-3",
        }
    }
}

/// Where a running template sends its output.
pub trait WriterSink {
    /// Select the file subsequent writes go to.
    fn set_output(&mut self, path: &Path, kind: OutputKind) -> Result<(), OutputError>;

    /// Append text to the current output.
    fn write(&mut self, text: &str) -> Result<(), OutputError>;
}

#[derive(Debug, Default)]
enum BufferState {
    #[default]
    Idle,
    Open {
        path: PathBuf,
        kind: OutputKind,
        buffer: String,
    },
}

/// The "current output file" of one template run.
///
/// At most one file is open at a time. Selecting a new file finishes the
/// previous one.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    state: BufferState,
    base_dir: Option<PathBuf>,
    staged: Vec<GeneratedArtifact>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative output paths against `dir` (the template's directory).
    pub fn relative_to(dir: impl Into<PathBuf>) -> Self {
        OutputBuffer {
            base_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, BufferState::Open { .. })
    }

    /// Finish the open file, if any, and return to idle.
    pub fn flush(&mut self) {
        if let BufferState::Open { path, kind, buffer } = std::mem::take(&mut self.state) {
            debug!(path = %path.display(), %kind, bytes = buffer.len(), "output finished");
            self.staged.push(GeneratedArtifact {
                path,
                kind,
                content: buffer,
            });
        }
    }

    /// Artifacts finished so far.
    pub fn artifacts(&self) -> &[GeneratedArtifact] {
        &self.staged
    }

    /// Flush and return the finished artifacts without touching the disk.
    pub fn finish(mut self) -> Vec<GeneratedArtifact> {
        self.flush();
        self.staged
    }

    /// Flush and write every artifact whose file content differs.
    pub fn commit(self) -> Result<Vec<CommittedArtifact>, OutputError> {
        commit_artifacts(self.finish())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl WriterSink for OutputBuffer {
    fn set_output(&mut self, path: &Path, kind: OutputKind) -> Result<(), OutputError> {
        self.flush();
        self.state = BufferState::Open {
            path: self.resolve(path),
            kind,
            buffer: String::new(),
        };
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<(), OutputError> {
        match &mut self.state {
            BufferState::Open { buffer, .. } => {
                buffer.push_str(text);
                Ok(())
            }
            BufferState::Idle => Err(OutputError::NoOutputSelected),
        }
    }
}

/// Collects the output of an in-place template region.
///
/// Regions produce exactly one block of text; selecting files is an error.
#[derive(Debug, Default)]
pub struct RegionWriter {
    text: String,
}

impl RegionWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

impl WriterSink for RegionWriter {
    fn set_output(&mut self, path: &Path, _kind: OutputKind) -> Result<(), OutputError> {
        Err(OutputError::SelectionNotAllowed {
            path: path.to_path_buf(),
        })
    }

    fn write(&mut self, text: &str) -> Result<(), OutputError> {
        self.text.push_str(text);
        Ok(())
    }
}

/// Write each artifact whose file content differs, in order.
///
/// Stops at the first file that cannot be written.
pub fn commit_artifacts(artifacts: Vec<GeneratedArtifact>) -> Result<Vec<CommittedArtifact>, OutputError> {
    artifacts
        .into_iter()
        .map(|artifact| {
            let written =
                write_if_changed(&artifact.path, &artifact.content).map_err(|source| OutputError::Write {
                    path: artifact.path.clone(),
                    source,
                })?;
            Ok(CommittedArtifact {
                path: artifact.path,
                kind: artifact.kind,
                written,
            })
        })
        .collect()
}

/// Write `content` to `path` unless the file already holds exactly that.
///
/// Returns whether the file was written. Missing parent directories are
/// created.
pub fn write_if_changed(path: &Path, content: &str) -> std::io::Result<bool> {
    match std::fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => {
            debug!(path = %path.display(), "unchanged, skipping write");
            return Ok(false);
        }
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(true)
}
