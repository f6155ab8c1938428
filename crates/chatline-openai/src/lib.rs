//! OpenAI chat-completions backend for **chatline**.
//!
//! [`StreamingClient`] implements
//! [`StreamingChatProvider`](chatline_core::provider::StreamingChatProvider):
//! it posts the transcript with `stream: true`, decodes the `data:` lines
//! into cumulative deltas, and retries once without streaming when the
//! stream fails before any text arrived.
mod adapter;
mod decoder;
mod model_map;
mod provider_impl_chat_stream;

pub use adapter::{StreamingClient, StreamingClientBuilder};
pub mod api_v1;
mod client;
pub mod error;
