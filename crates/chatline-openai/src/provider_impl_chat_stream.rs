use std::sync::Arc;

use chatline_core::message::Transcript;
use chatline_core::provider::{
    CancelHandle, Failure, ReplyEvent, ReplyHandle, ReplyStream, StreamingChatProvider,
    check_preconditions,
};
use chatline_core::settings::Settings;
use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::{
    StreamingClient,
    api_v1::ChatCompletionRequest,
    client::{OpenAiClient, bearer},
    decoder::{EventDecoder, Frame},
    error::OpenAiError,
};

impl StreamingChatProvider for StreamingClient {
    fn start(&self, transcript: &Transcript, settings: &Settings) -> Result<ReplyHandle, Failure> {
        check_preconditions(transcript, settings)?;
        bearer(&settings.api_key).map_err(|err| err.into_failure(String::new()))?;

        let request = ChatCompletionRequest::for_transcript(transcript, settings).stream(true);
        let cancel = CancelHandle::new();
        let events = reply_stream(
            Arc::clone(&self.client),
            settings.api_key.clone(),
            request,
            cancel.clone(),
        );

        Ok(ReplyHandle::new(events, cancel))
    }
}

/// The decode loop behind a [`ReplyHandle`].
///
/// Cancellation is checked while waiting on the transport and again before
/// every yielded event, so once `cancel()` has returned no further delta is
/// produced and the stream settles to `Failed(Transport, "aborted")`.
fn reply_stream(
    client: Arc<OpenAiClient>,
    api_key: String,
    request: ChatCompletionRequest,
    cancel: CancelHandle,
) -> ReplyStream<'static> {
    Box::pin(async_stream::stream! {
        let mut text = String::new();
        let mut fragments = 0usize;
        let mut decoder = EventDecoder::new();

        debug!(model = %request.model, messages = request.messages.len(), "starting chat completion stream");

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = client.open_stream(&api_key, &request) => Some(opened),
        };
        let Some(opened) = opened else {
            debug!("chat completion cancelled before the stream opened");
            yield ReplyEvent::Failed(Failure::aborted(text));
            return;
        };

        let early_error = match opened {
            Err(err) => err,
            Ok(response) => {
                let mut body = response.bytes_stream();
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        next = body.next() => Some(next),
                    };
                    let Some(next) = next else {
                        debug!(fragments, "chat completion cancelled mid-stream");
                        yield ReplyEvent::Failed(Failure::aborted(text));
                        return;
                    };

                    let eof = next.is_none();
                    let frames = match next {
                        Some(Ok(chunk)) => decoder.feed(&chunk),
                        Some(Err(err)) if fragments == 0 => break OpenAiError::from(err),
                        Some(Err(err)) => {
                            warn!(error = %err, fragments, "chat completion stream interrupted");
                            yield ReplyEvent::Failed(OpenAiError::from(err).into_failure(text));
                            return;
                        }
                        None => decoder.finish(),
                    };

                    let mut done = eof;
                    for frame in frames {
                        if cancel.is_cancelled() {
                            debug!(fragments, "chat completion cancelled mid-stream");
                            yield ReplyEvent::Failed(Failure::aborted(text));
                            return;
                        }
                        match frame {
                            Frame::Fragment(fragment) => {
                                text.push_str(&fragment);
                                fragments += 1;
                                yield ReplyEvent::Delta(text.clone());
                            }
                            Frame::Done => {
                                done = true;
                                break;
                            }
                        }
                    }

                    if done {
                        if cancel.is_cancelled() {
                            yield ReplyEvent::Failed(Failure::aborted(text));
                            return;
                        }
                        debug!(fragments, skipped = decoder.skipped(), "chat completion stream finished");
                        yield ReplyEvent::Completed(text);
                        return;
                    }
                }
            }
        };

        warn!(error = %early_error, "stream failed before any text arrived, retrying without streaming");

        let fallback = request.non_streaming();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = client.chat_completion(&api_key, &fallback) => Some(result),
        };

        match result {
            None => yield ReplyEvent::Failed(Failure::aborted(text)),
            Some(Ok(response)) => {
                let usage = response.usage.unwrap_or_default();
                let full = response.into_text();
                debug!(
                    chars = full.len(),
                    total_tokens = usage.total_tokens,
                    "non-streaming fallback completed"
                );
                if !full.is_empty() {
                    yield ReplyEvent::Delta(full.clone());
                }
                if cancel.is_cancelled() {
                    yield ReplyEvent::Failed(Failure::aborted(full));
                } else {
                    yield ReplyEvent::Completed(full);
                }
            }
            Some(Err(err)) => {
                warn!(error = %err, "non-streaming fallback failed");
                yield ReplyEvent::Failed(err.into_failure(text));
            }
        }
    })
}
