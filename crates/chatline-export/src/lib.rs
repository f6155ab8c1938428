//! Export helpers for **chatline** transcripts.
//!
//! * [`builder::MarkdownBuilder`] – fluent Markdown assembly.
//! * [`to_markdown`] / [`to_json`] – render a whole transcript for download.
pub mod builder;
mod transcript;

pub use transcript::{ExportFormat, ExportMeta, IMAGE_MARKER, file_name, to_json, to_markdown};
