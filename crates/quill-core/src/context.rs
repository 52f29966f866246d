/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Ownership of compiled units for one batch.
 */

//! Execution contexts.
//!
//! Compiled units cannot be released one at a time. Everything a batch
//! compiles is adopted by an [`ExecutionContext`], together with the scratch
//! directory the compiler worked in, and released in one go when the
//! context is disposed.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::compiler::GeneratedUnit;
use crate::error::ExecutionError;
use crate::output::WriterSink;

/// Index of a unit adopted by an [`ExecutionContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitHandle(usize);

pub struct ExecutionContext {
    scratch: TempDir,
    units: Vec<Box<dyn GeneratedUnit>>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("scratch", &self.scratch.path())
            .field("units", &self.units.len())
            .finish()
    }
}

impl ExecutionContext {
    /// Create a context with a fresh scratch directory.
    pub fn new() -> std::io::Result<Self> {
        let scratch = tempfile::Builder::new().prefix("quill-").tempdir()?;
        debug!(scratch = %scratch.path().display(), "execution context created");
        Ok(ExecutionContext {
            scratch,
            units: Vec::new(),
        })
    }

    /// Directory for the compiler's intermediate files.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Take ownership of a compiled unit.
    pub fn adopt(&mut self, unit: Box<dyn GeneratedUnit>) -> UnitHandle {
        debug!(entry = unit.entry_symbol(), "unit adopted");
        self.units.push(unit);
        UnitHandle(self.units.len() - 1)
    }

    pub fn unit(&self, handle: UnitHandle) -> Option<&dyn GeneratedUnit> {
        self.units.get(handle.0).map(|unit| unit.as_ref())
    }

    /// Run an adopted unit.
    pub fn run(&self, handle: UnitHandle, sink: &mut dyn WriterSink) -> Result<(), ExecutionError> {
        let unit = self
            .unit(handle)
            .ok_or_else(|| ExecutionError::exception("Unknown generated unit", None))?;
        debug!(entry = unit.entry_symbol(), "running unit");
        unit.run(sink)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Release every unit and remove the scratch directory.
    pub fn dispose(self) -> std::io::Result<()> {
        debug!(units = self.units.len(), "disposing execution context");
        drop(self.units);
        self.scratch.close()
    }

    /// Release every unit but leave the scratch directory on disk.
    pub fn dispose_keeping_files(self) -> PathBuf {
        drop(self.units);
        self.scratch.keep()
    }
}
