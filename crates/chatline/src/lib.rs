//! # `chatline` – The umbrella crate
//!
//! A streaming conversational client for OpenAI-compatible chat-completion
//! endpoints. This crate wires the building blocks of the workspace into a
//! [`SessionState`] and forwards their public API:
//!
//! | Crate                  | What it provides                                                       |
//! |------------------------|------------------------------------------------------------------------|
//! | **`chatline-core`**    | Transcript, settings, the provider seam, reply events, history contract |
//! | **`chatline-openai`**  | `StreamingClient`: SSE decoding, cancellation, non-streaming fallback  |
//! | **`chatline-store`**   | SQLite, in-memory and disabled `ChatStore` backends                    |
//! | **`chatline-export`**  | Markdown and JSON export of a transcript                               |
//!
//! On top of these, this crate adds the [`session`], its on-disk
//! [`config`] and the slash [`command`] parser.
//!
//! ## Quick example
//!
//! ```rust,no_run
//! use chatline::{config::ChatlineConfig, session::TurnOutcome};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ChatlineConfig::load_default()?;
//!     let mut session = config.build_session()?;
//!
//!     let outcome = session
//!         .send("Hello!", vec![], |text| println!("{text}"))
//!         .await?;
//!
//!     if let TurnOutcome::Failed(failure) = outcome {
//!         eprintln!("{failure}");
//!     }
//!     Ok(())
//! }
//! ```
#![doc(html_root_url = "https://docs.rs/chatline/latest")]

pub mod command;
pub mod config;
pub mod session;

pub use chatline_core::*;
pub use chatline_export as export;
pub use chatline_openai as openai;
pub use chatline_store as store;

pub use session::{SessionAbort, SessionError, SessionState, TurnOutcome};
