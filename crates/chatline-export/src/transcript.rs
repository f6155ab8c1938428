use chatline_core::{
    message::{Content, ContentPart, Role, Transcript},
    model::{Effort, Model},
};
use chrono::{DateTime, Utc};

use crate::builder::MarkdownBuilder;

/// Placeholder written for an attached image.
pub const IMAGE_MARKER: &str = "[image]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
        }
    }
}

/// Context printed in the Markdown header.
#[derive(Debug, Clone)]
pub struct ExportMeta {
    pub model: Model,
    pub effort: Effort,
    pub exported_at: DateTime<Utc>,
}

/// Render `transcript` as a readable Markdown document.
///
/// The system prompt goes into the header as a fenced block; user and
/// assistant turns become `## User` / `## Assistant` sections in order.
pub fn to_markdown(transcript: &Transcript, meta: &ExportMeta) -> String {
    let mut md = MarkdownBuilder::new()
        .add_section_h1("Chatline Chat Export")
        .add_blank_line()
        .add_key_value("Date", meta.exported_at.format("%Y-%m-%d %H:%M:%S UTC"))
        .add_key_value("Model", &meta.model)
        .add_key_value("Reasoning Effort", meta.effort);

    if let Some(system) = transcript.first().filter(|m| m.role == Role::System) {
        md = md
            .add_blank_line()
            .add_line("System Prompt:")
            .add_blank_line()
            .add_code_block(render_content(&system.content));
    }

    md = md.add_blank_line().add_delimiter().add_blank_line();

    for message in transcript.iter() {
        let heading = match message.role {
            Role::System => continue,
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        md = md
            .add_section_h2(heading)
            .add_line(render_content(&message.content))
            .add_blank_line();
    }

    md.finalize()
}

/// Pretty-printed JSON of the raw transcript.
pub fn to_json(transcript: &Transcript) -> serde_json::Result<String> {
    serde_json::to_string_pretty(transcript)
}

/// Suggested file name, e.g. `chatline-chat-1735732800000.md`.
pub fn file_name(format: ExportFormat, at: DateTime<Utc>) -> String {
    format!("chatline-chat-{}.{}", at.timestamp_millis(), format.extension())
}

fn render_content(content: &Content) -> String {
    match content {
        Content::Text(text) => text.clone(),
        Content::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) if text.trim().is_empty() => None,
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::Image(_) => Some(IMAGE_MARKER),
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
