//! Utility functions for working with source positions

/// Count `\n` characters in a string.
///
/// Line bookkeeping throughout the translator is expressed in newline
/// counts, so a CRLF pair counts once.
pub fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}
