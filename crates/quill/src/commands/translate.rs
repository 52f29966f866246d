/*
 * translate.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Translate command implementation
 */

//! Print the code the markup translator produces for one file, without
//! compiling it.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Arguments for the translate command
#[derive(Debug)]
pub struct TranslateArgs {
    pub input: PathBuf,
    /// Name of the writer variable in the generated calls
    pub writer: String,
    pub output: Option<PathBuf>,
}

/// Execute the translate command
pub fn execute(args: TranslateArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let code = quill_core::translate(&text, &args.writer);

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{code}\n")).with_context(|| format!("Failed to write {}", path.display()))?
        }
        None => println!("{code}"),
    }
    Ok(())
}
