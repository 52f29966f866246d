/*
 * markup.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Character-level translation of template markup into writer calls.
 */

//! Translation of template markup into code.
//!
//! Literal text becomes `writer.Write("...")` statements, `<% code %>` passes
//! through verbatim, and `<%= expr %>` becomes `writer.Write(expr);`. The
//! translator keeps one generated line per input line so that compiler
//! diagnostics can be mapped back by line delta alone.
//!
//! Indentation of generated statements follows `{`/`}` inside code tags.
//! It is plain brace counting and does not understand strings or comments.

/// One level of generated indentation.
pub const INDENT_UNIT: &str = "    ";

/// Translator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Literal text
    Text,
    /// Saw `<`, waiting to see whether a tag opens
    SawOpenTag,
    /// Saw `<%`, waiting to see whether this is an echo tag
    Tag,
    /// Inside `<% ... %>`
    CodeBody,
    /// Saw `%` inside a code tag
    CodeBodyPercent,
    /// Inside `<%= ... %>`
    EvalBody,
    /// Saw `%` inside an echo tag
    EvalBodyPercent,
}

/// Streaming markup translator.
///
/// Feed characters with [`push`](Self::push) or [`push_str`](Self::push_str)
/// and take the generated code with [`finish`](Self::finish).
#[derive(Debug)]
pub struct MarkupTranslator<'a> {
    writer: &'a str,
    state: State,
    indentation: String,
    pending: String,
    code: String,
}

impl<'a> MarkupTranslator<'a> {
    pub fn new(writer: &'a str) -> Self {
        MarkupTranslator {
            writer,
            state: State::Text,
            indentation: String::new(),
            pending: String::new(),
            code: String::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Current indentation string (a multiple of [`INDENT_UNIT`])
    pub fn indentation(&self) -> &str {
        &self.indentation
    }

    pub fn push_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.push(ch);
        }
    }

    pub fn push(&mut self, ch: char) {
        match self.state {
            State::Text => {
                if ch == '<' {
                    self.state = State::SawOpenTag;
                } else {
                    self.literal(ch);
                }
            }
            State::SawOpenTag => {
                if ch == '%' {
                    self.state = State::Tag;
                } else {
                    self.literal('<');
                    self.state = State::Text;
                    self.push(ch);
                }
            }
            State::Tag => {
                if ch == '=' {
                    self.flush();
                    self.state = State::EvalBody;
                } else {
                    self.code.push_str("  ");
                    if self.code.ends_with(self.indentation.as_str()) {
                        let keep = self.code.len() - self.indentation.len();
                        self.code.truncate(keep);
                    }
                    self.flush();
                    self.state = State::CodeBody;
                    self.push(ch);
                }
            }
            State::CodeBody => match ch {
                '%' => self.state = State::CodeBodyPercent,
                '{' => {
                    self.indentation.push_str(INDENT_UNIT);
                    self.pending.push(ch);
                }
                '}' => {
                    if self.indentation.len() >= INDENT_UNIT.len() {
                        let keep = self.indentation.len() - INDENT_UNIT.len();
                        self.indentation.truncate(keep);
                    }
                    self.pending.push(ch);
                }
                _ => self.pending.push(ch),
            },
            State::EvalBody => {
                if ch == '%' {
                    self.state = State::EvalBodyPercent;
                } else {
                    self.pending.push(ch);
                }
            }
            State::CodeBodyPercent | State::EvalBodyPercent => {
                let statement = self.state == State::CodeBodyPercent;
                if ch == '>' {
                    self.flush();
                    if statement {
                        self.code.push_str(&self.indentation);
                    }
                    self.state = State::Text;
                } else if ch == '%' {
                    // The earlier `%` was code; this one may still close the tag.
                    self.pending.push('%');
                } else {
                    self.pending.push('%');
                    self.state = if statement {
                        State::CodeBody
                    } else {
                        State::EvalBody
                    };
                    self.push(ch);
                }
            }
        }
    }

    /// Flush whatever is buffered in the current mode and return the code,
    /// with trailing whitespace removed.
    pub fn finish(mut self) -> String {
        match self.state {
            State::SawOpenTag => self.pending.push('<'),
            State::CodeBodyPercent | State::EvalBodyPercent => self.pending.push('%'),
            _ => {}
        }
        self.flush();
        let end = self.code.trim_end().len();
        self.code.truncate(end);
        self.code
    }

    fn literal(&mut self, ch: char) {
        match ch {
            '\\' => self.pending.push_str("\\\\"),
            '\r' => self.pending.push_str("\\r"),
            '\n' => self.pending.push_str("\\n"),
            '"' => self.pending.push_str("\\\""),
            '\t' => self.pending.push_str("\\t"),
            _ => self.pending.push(ch),
        }

        if ch == '\n' {
            self.flush();
            self.code.push('\n');
            self.code.push_str(&self.indentation);
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        match self.state {
            State::Text | State::SawOpenTag | State::Tag => {
                self.code.push_str(self.writer);
                self.code.push_str(".Write(\"");
                self.code.push_str(&self.pending);
                self.code.push_str("\");");
            }
            State::EvalBody | State::EvalBodyPercent => {
                self.code.push_str(self.writer);
                self.code.push_str(".Write(");
                self.code.push_str(&self.pending);
                self.code.push_str(");");
            }
            State::CodeBody | State::CodeBodyPercent => self.code.push_str(&self.pending),
        }
        self.pending.clear();
    }
}

/// Translate a complete markup text.
///
/// ```
/// use quill_core::markup::translate;
///
/// assert_eq!(translate("Hi <%= name %>!", "w"), "w.Write(\"Hi \");w.Write( name );w.Write(\"!\");");
/// ```
pub fn translate(text: &str, writer: &str) -> String {
    let mut translator = MarkupTranslator::new(writer);
    translator.push_str(text);
    translator.finish()
}
