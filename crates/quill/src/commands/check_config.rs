/*
 * check_config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Check-config command implementation
 */

//! Print the configuration a batch would run with.

use std::path::Path;

use anyhow::{Context, Result};

use quill_core::QuillConfig;

/// Execute the check-config command
pub fn execute(config_path: Option<&Path>) -> Result<()> {
    let config = QuillConfig::load(config_path, None).context("Failed to load configuration")?;
    print!("{}", render(&config)?);
    Ok(())
}

/// The effective configuration as TOML, headed by where it came from.
pub fn render(config: &QuillConfig) -> Result<String> {
    let source = match &config.config_path {
        Some(path) => format!("# {}\n", path.display()),
        None => "# defaults (no quill.toml found)\n".to_string(),
    };
    let body = config.to_toml().context("Failed to serialize configuration")?;
    Ok(format!("{source}{body}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_defaults() {
        let rendered = render(&QuillConfig::default()).unwrap();
        assert!(rendered.starts_with("# defaults"));
        assert!(rendered.contains("isolate = true"));
    }

    #[test]
    fn test_render_loaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quill.toml");
        std::fs::write(&path, "[batch]\ndefine = \"TRACE\"\n").unwrap();

        let config = QuillConfig::load(Some(path.as_path()), None).unwrap();
        let rendered = render(&config).unwrap();

        assert!(rendered.starts_with(&format!("# {}\n", path.display())));
        assert!(rendered.contains("define = \"TRACE\""));
    }
}
