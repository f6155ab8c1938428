//! Provider-agnostic building blocks for the **chatline** conversational
//! client.
//!
//! | Module       | What it provides                                                   |
//! |--------------|--------------------------------------------------------------------|
//! | [`message`]  | `Message`, `Role`, `Content`, and the invariant-keeping `Transcript` |
//! | [`model`]    | Model identifiers and the reasoning-effort knob                    |
//! | [`settings`] | The immutable per-request `Settings` value                         |
//! | [`provider`] | The streaming provider seam, reply events and cancellation         |
//! | [`history`]  | The append-only `ChatStore` contract and its record types          |
//!
//! Backend crates (`chatline-openai`, `chatline-store`) implement the traits
//! defined here; the `chatline` umbrella crate ties them together in a
//! session.
pub mod error;
pub mod history;
pub mod message;
pub mod model;
pub mod provider;
pub mod settings;
