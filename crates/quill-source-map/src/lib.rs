//! Source mapping for Quill
//!
//! Generated compilation units are assembled from a template file, the files
//! it includes, and a synthesized prefix and suffix. Compiler diagnostics are
//! reported against lines of that unit, and this crate maps them back to the
//! file and line a template author actually wrote.
//!
//! # Overview
//!
//! The core types are:
//! - [`SourceContext`]: Registry of the files that contributed to a unit
//! - [`SourceMap`]: Ordered line spans tying unit lines to origin files
//! - [`SourceLocation`]: A user-facing 1-based `(path, line, column)` triple
//!
//! # Example
//!
//! ```rust
//! use quill_source_map::*;
//!
//! let mut ctx = SourceContext::new();
//! let main = ctx.add_file("main.cst".into(), Some("<% a(); %>\n<% b(); %>".into()));
//! let header = ctx.add_file("header.csi".into(), Some("x\ny".into()));
//!
//! let mut map = SourceMap::new(main);
//! map.push(LineSpan::new(0, 3, main, 0));
//! map.push(LineSpan::new(3, 5, header, 0));
//! map.push(LineSpan::new(5, usize::MAX, main, 4));
//!
//! assert_eq!(map.resolve(4), MappedLine { file_id: header, line: 1 });
//! assert_eq!(map.resolve(6), MappedLine { file_id: main, line: 5 });
//! ```

pub mod context;
pub mod file_info;
pub mod line_map;
pub mod types;
pub mod utils;

// Re-export main types
pub use context::{SourceContext, SourceFile};
pub use file_info::FileInformation;
pub use line_map::{LineSpan, MappedLine, SourceMap};
pub use types::{FileId, SourceLocation};
pub use utils::count_newlines;
