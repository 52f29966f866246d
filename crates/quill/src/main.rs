//! Quill CLI - Main entry point

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill_core::CliSettings;

mod commands;
mod console;

use console::DiagnosticFormat;

#[derive(Parser)]
#[command(name = "quill")]
#[command(version)]
#[command(about = "Quill template compiler", long_about = None)]
struct Cli {
    /// Configuration file (defaults to quill.toml in the working directory or a parent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors and warnings
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate template regions and run template files
    Generate {
        /// Source file whose template regions are regenerated in place
        #[arg(long = "in-place", value_name = "FILE")]
        in_place: Vec<PathBuf>,

        /// Template file to run
        #[arg(short = 't', long = "template", value_name = "FILE")]
        templates: Vec<PathBuf>,

        /// Template library file, compiled before everything else
        #[arg(short = 'l', long = "library", value_name = "FILE")]
        libraries: Vec<PathBuf>,

        /// File that Include directives may name by file name
        #[arg(long = "include", value_name = "FILE")]
        includes: Vec<PathBuf>,

        /// Assembly that Assembly directives may name
        #[arg(short = 'r', long = "reference", value_name = "FILE")]
        references: Vec<PathBuf>,

        /// Preprocessor symbols (A;B)
        #[arg(short = 'd', long)]
        define: Option<String>,

        /// Compile with debug information and write debug copies
        #[arg(long)]
        debug: bool,

        /// Share one execution context across the whole batch
        #[arg(long)]
        no_isolate: bool,

        /// Directory searched for referenced assemblies
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// C# compiler to run
        #[arg(long, value_name = "PROGRAM")]
        compiler: Option<PathBuf>,

        /// Program that runs compiled templates (for example mono)
        #[arg(long, value_name = "PROGRAM")]
        runner: Option<PathBuf>,

        /// Directory holding framework assemblies
        #[arg(long = "framework-dir", value_name = "DIR")]
        framework_dirs: Vec<PathBuf>,

        /// How diagnostics are printed
        #[arg(long, value_enum, default_value_t = DiagnosticFormat::Build)]
        format: DiagnosticFormat,

        /// Keep the compiled template library and scratch directories
        #[arg(long)]
        keep_temp: bool,

        /// Write the lists of generated files to DIR
        #[arg(long, value_name = "DIR")]
        write_cache: Option<PathBuf>,
    },

    /// Print the code generated for a markup file
    Translate {
        /// Markup file
        input: PathBuf,

        /// Name of the writer variable
        #[arg(short, long, default_value = quill_core::unit::REGION_WRITER)]
        writer: String,

        /// Write the code to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    CheckConfig,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.quiet {
        "quill=warn"
    } else {
        match cli.verbose {
            0 => "quill=info",
            1 => "quill=debug",
            _ => "quill=trace",
        }
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            in_place,
            templates,
            libraries,
            includes,
            references,
            define,
            debug,
            no_isolate,
            output_dir,
            compiler,
            runner,
            framework_dirs,
            format,
            keep_temp,
            write_cache,
        } => commands::generate::execute(commands::generate::GenerateArgs {
            config: cli.config,
            in_place,
            templates,
            libraries,
            includes,
            settings: CliSettings {
                compiler,
                runner,
                define,
                debug: debug.then_some(true),
                isolate: no_isolate.then_some(false),
                output_dir,
                dependency_paths: references,
                framework_dirs,
            },
            format,
            keep_temp,
            write_cache,
            quiet: cli.quiet,
        }),
        Commands::Translate { input, writer, output } => {
            commands::translate::execute(commands::translate::TranslateArgs { input, writer, output })?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckConfig => {
            commands::check_config::execute(cli.config.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
