/*
 * compiler/diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Parsing of C# compiler output.
 */

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use super::{CompilerDiagnostic, DiagnosticOrigin, Severity};

/// `file(line,col): error CS0103: message`, with the location optional.
static COMPILER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<file>.+?)\((?P<line>\d+),(?P<col>\d+)\):\s*)?(?P<severity>error|warning)\s+(?P<code>[A-Za-z]+\d+):\s*(?P<message>.*)$",
    )
    .expect("Invalid regex pattern for compiler output")
});

/// Parse every diagnostic line in `output`.
///
/// Lines naming `unit_path` are attributed to the unit; banner lines and
/// anything else that is not a diagnostic are ignored.
pub fn parse_compiler_output(output: &str, unit_path: Option<&Path>) -> Vec<CompilerDiagnostic> {
    output
        .lines()
        .filter_map(|line| parse_line(line.trim_end(), unit_path))
        .collect()
}

fn parse_line(line: &str, unit_path: Option<&Path>) -> Option<CompilerDiagnostic> {
    let caps = COMPILER_LINE.captures(line)?;

    let origin = match caps.name("file") {
        Some(file) => {
            let path = PathBuf::from(file.as_str().trim());
            if unit_path.is_some_and(|unit| same_file(unit, &path)) {
                DiagnosticOrigin::Unit
            } else {
                DiagnosticOrigin::External(path)
            }
        }
        None => DiagnosticOrigin::Unknown,
    };
    let number = |name: &str| {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .unwrap_or(0)
    };
    let severity = if &caps["severity"] == "error" {
        Severity::Error
    } else {
        Severity::Warning
    };

    Some(CompilerDiagnostic {
        origin,
        line: number("line"),
        column: number("col"),
        severity,
        code: caps["code"].to_string(),
        message: caps["message"].trim().to_string(),
    })
}

/// Compilers echo paths either as given or relative to their working
/// directory, so compare by suffix.
fn same_file(unit: &Path, reported: &Path) -> bool {
    unit == reported || unit.ends_with(reported) || reported.ends_with(unit)
}
