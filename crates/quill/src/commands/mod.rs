//! Command implementations for the Quill CLI
//!
//! Each command module handles the CLI interface and delegates to
//! quill-core for the actual work.

pub mod check_config;
pub mod generate;
pub mod translate;
