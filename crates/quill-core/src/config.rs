/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * quill.toml loading and command-line overrides.
 */

//! Configuration.
//!
//! Settings live in a `quill.toml` found in the working directory or one of
//! its parents:
//!
//! ```toml
//! [compiler]
//! command = "/usr/bin/mcs"
//! runner = "mono"
//! args = ["-langversion:5"]
//! framework-dirs = ["/usr/lib/mono/4.5"]
//!
//! [batch]
//! define = "DEBUG;TRACE"
//! debug = false
//! isolate = true
//! output-dir = "bin"
//! dependency-paths = ["lib/Acme.Data.dll"]
//! ```
//!
//! Relative paths are resolved against the directory holding the file.
//! Command-line settings are applied on top via [`CliSettings`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "quill.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings from the command line. Only `Some` values override the file;
/// path lists are appended.
#[derive(Debug, Default)]
pub struct CliSettings {
    pub compiler: Option<PathBuf>,
    pub runner: Option<PathBuf>,
    pub define: Option<String>,
    pub debug: Option<bool>,
    pub isolate: Option<bool>,
    pub output_dir: Option<PathBuf>,
    pub dependency_paths: Vec<PathBuf>,
    pub framework_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct QuillConfig {
    pub compiler: CompilerConfig,
    pub batch: BatchConfig,

    /// The file this was loaded from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// The `[compiler]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct CompilerConfig {
    /// Compiler executable; located automatically when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<PathBuf>,
    /// Program that starts generated executables (e.g. `mono`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<PathBuf>,
    /// Extra compiler arguments
    pub args: Vec<String>,
    /// Directories searched for framework assemblies
    pub framework_dirs: Vec<PathBuf>,
}

/// The `[batch]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct BatchConfig {
    /// Preprocessor symbols
    pub define: String,
    pub debug: bool,
    /// Run each batch in its own execution context
    pub isolate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    pub dependency_paths: Vec<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            define: String::new(),
            debug: false,
            isolate: true,
            output_dir: None,
            dependency_paths: Vec::new(),
        }
    }
}

impl QuillConfig {
    /// Load from `config_path`, or from a discovered `quill.toml`, or use
    /// defaults; then apply `cli_settings`.
    pub fn load(config_path: Option<&Path>, cli_settings: Option<&CliSettings>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir().ok().and_then(|cwd| Self::discover(&cwd)) {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }
        Ok(config)
    }

    /// Search `start` and its parents for `quill.toml`.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.is_file())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = config_dir.join(&*path);
            }
        };
        self.compiler.framework_dirs.iter_mut().for_each(resolve);
        self.batch.dependency_paths.iter_mut().for_each(resolve);
        if let Some(dir) = &mut self.batch.output_dir {
            resolve(dir);
        }
        // A bare command name is looked up on PATH, not next to the file.
        if let Some(command) = self
            .compiler
            .command
            .as_mut()
            .filter(|command| command.components().count() > 1)
        {
            resolve(command);
        }
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(compiler) = &settings.compiler {
            self.compiler.command = Some(compiler.clone());
        }
        if let Some(runner) = &settings.runner {
            self.compiler.runner = Some(runner.clone());
        }
        if let Some(define) = &settings.define {
            self.batch.define.clone_from(define);
        }
        if let Some(debug) = settings.debug {
            self.batch.debug = debug;
        }
        if let Some(isolate) = settings.isolate {
            self.batch.isolate = isolate;
        }
        if let Some(output_dir) = &settings.output_dir {
            self.batch.output_dir = Some(output_dir.clone());
        }
        self.batch
            .dependency_paths
            .extend(settings.dependency_paths.iter().cloned());
        self.compiler
            .framework_dirs
            .extend(settings.framework_dirs.iter().cloned());
    }
}
