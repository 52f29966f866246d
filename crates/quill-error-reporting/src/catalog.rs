//! Error code catalog and lookup.
//!
//! Maps error codes (like "QL-2-1") to their metadata. Diagnostics relayed
//! from the compiler keep the compiler's own codes and are not in the catalog.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for an error code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorCodeInfo {
    /// Subsystem name (e.g., "directive", "compiler", "runtime")
    pub subsystem: String,

    /// Short title for the error
    pub title: String,

    /// Default message template (may include placeholders)
    pub message_template: String,

    /// URL to documentation (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,

    /// When this error was introduced (version)
    pub since_version: String,
}

/// Global error catalog, embedded at compile time from `error_catalog.json`.
///
/// # Panics
///
/// Panics on first access if the embedded JSON is invalid.
pub static ERROR_CATALOG: Lazy<HashMap<String, ErrorCodeInfo>> = Lazy::new(|| {
    let json_data = include_str!("../error_catalog.json");
    serde_json::from_str(json_data).expect("Invalid error catalog JSON - this is a bug in Quill")
});

/// Look up error code information.
///
/// # Example
///
/// ```
/// use quill_error_reporting::catalog::get_error_info;
///
/// let info = get_error_info("QL-2-2").unwrap();
/// assert_eq!(info.title, "Duplicate Entry Point");
/// ```
pub fn get_error_info(code: &str) -> Option<&ErrorCodeInfo> {
    ERROR_CATALOG.get(code)
}

/// Get the catalog title for a code, if the code is catalogued.
pub fn get_title(code: &str) -> Option<&str> {
    ERROR_CATALOG.get(code).map(|info| info.title.as_str())
}

/// Get the subsystem name for an error code.
///
/// ```
/// use quill_error_reporting::catalog::get_subsystem;
///
/// assert_eq!(get_subsystem("QL-0-1"), Some("internal"));
/// ```
pub fn get_subsystem(code: &str) -> Option<&str> {
    ERROR_CATALOG.get(code).map(|info| info.subsystem.as_str())
}
