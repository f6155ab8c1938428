use std::sync::Arc;

use crate::{
    message::{Role, Transcript},
    provider::{Failure, ReplyHandle},
    settings::Settings,
};

/// A **provider** turns a transcript into one cancellable request against a
/// concrete completion endpoint and decodes the answer incrementally.
///
/// The trait is intentionally minimal:
///
/// * **One method** – `start`, which validates the request synchronously and
///   hands back a [`ReplyHandle`]. No network I/O happens until the handle is
///   first polled.
/// * Precondition failures (missing key, malformed transcript) are returned
///   immediately as `Err`; everything that can go wrong on the wire arrives as
///   the handle's terminal [`crate::provider::ReplyEvent::Failed`] event.
pub trait StreamingChatProvider: Send + Sync {
    /// Start a streaming chat completion for `transcript`.
    ///
    /// `settings` is cloned into the request; later changes do not affect a
    /// reply that is already running.
    fn start(&self, transcript: &Transcript, settings: &Settings) -> Result<ReplyHandle, Failure>;
}

impl<P: StreamingChatProvider + ?Sized> StreamingChatProvider for Arc<P> {
    fn start(&self, transcript: &Transcript, settings: &Settings) -> Result<ReplyHandle, Failure> {
        (**self).start(transcript, settings)
    }
}

/// Shared precondition check for [`StreamingChatProvider::start`].
///
/// The key is checked first so a user without credentials always sees the
/// auth problem, whatever the transcript looks like.
pub fn check_preconditions(transcript: &Transcript, settings: &Settings) -> Result<(), Failure> {
    if !settings.has_api_key() {
        return Err(Failure::auth("missing API key"));
    }

    match transcript.last_role() {
        None => Err(Failure::invalid_request("transcript is empty")),
        Some(Role::User) => Ok(()),
        Some(other) => Err(Failure::invalid_request(format!(
            "last message must come from the user, found `{other}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{message::Message, provider::FailureKind};

    #[test]
    fn missing_key_wins_over_transcript_problems() {
        let failure = check_preconditions(&Transcript::new(), &Settings::new("")).unwrap_err();
        assert_eq!(failure.kind, FailureKind::Auth);
    }

    #[test]
    fn trailing_assistant_message_is_rejected() {
        let transcript =
            Transcript::from_messages(vec![Message::user("Hi"), Message::assistant("Hello")])
                .unwrap();
        let failure = check_preconditions(&transcript, &Settings::new("sk-1")).unwrap_err();
        assert_eq!(failure.kind, FailureKind::InvalidRequest);
    }

    #[test]
    fn trailing_user_message_passes() {
        let transcript = Transcript::from_messages(vec![Message::user("Hi")]).unwrap();
        assert!(check_preconditions(&transcript, &Settings::new("sk-1")).is_ok());
    }
}
