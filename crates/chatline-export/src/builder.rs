//! Builder-style helper for assembling **Markdown documents**.
//!
//! Writing Markdown through `format!` chains is tedious and error-prone.
//! `MarkdownBuilder` offers a fluent API instead; every method returns
//! `self`:
//!
//! ```rust
//! use chatline_export::builder::MarkdownBuilder;
//!
//! let md = MarkdownBuilder::new()
//!     .add_section_h1("Chat Export")
//!     .add_blank_line()
//!     .add_key_value("Model", "gpt-5-mini")
//!     .add_delimiter()
//!     .finalize();
//!
//! assert!(md.starts_with("# Chat Export"));
//! ```
//!
//! The builder performs no escaping: content is emitted exactly as given.

use std::fmt::{Display, Write as _};

/// Fluent helper to produce markdown documents.
pub struct MarkdownBuilder {
    buffer: String,
}

impl Default for MarkdownBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownBuilder {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Add a level-1 (`#`) heading.
    pub fn add_section_h1(mut self, line: impl Display) -> Self {
        writeln!(self.buffer, "# {line}").expect("writing to a String cannot fail");
        self
    }

    /// Add a level-2 (`##`) heading.
    pub fn add_section_h2(mut self, line: impl Display) -> Self {
        writeln!(self.buffer, "## {line}").expect("writing to a String cannot fail");
        self
    }

    /// Add a plain line of text and a trailing newline.
    pub fn add_line(mut self, line: impl Display) -> Self {
        writeln!(self.buffer, "{line}").expect("writing to a String cannot fail");
        self
    }

    /// `Key: Value`
    pub fn add_key_value(mut self, key: impl Display, value: impl Display) -> Self {
        writeln!(self.buffer, "{key}: {value}").expect("writing to a String cannot fail");
        self
    }

    /// Embed an unlabelled fenced block.
    pub fn add_code_block(self, content: impl Display) -> Self {
        self.add_line("```").add_line(content).add_line("```")
    }

    /// Insert a single blank line.
    pub fn add_blank_line(mut self) -> Self {
        self.buffer.push('\n');
        self
    }

    /// Insert a "---" delimiter.
    pub fn add_delimiter(self) -> Self {
        self.add_line("---")
    }

    /// Retrieve the accumulated markdown and consume the builder.
    pub fn finalize(self) -> String {
        self.buffer
    }
}
