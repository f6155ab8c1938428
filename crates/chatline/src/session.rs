//! The live conversation: transcript, settings and request sequencing.
//!
//! A [`SessionState`] owns one transcript and drives one
//! [`StreamingChatProvider`] call at a time. Finished exchanges are
//! snapshotted into a shared [`ChatStore`]; a store that cannot be written
//! never fails the turn itself.
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use chatline_core::{
    error::ChatlineError,
    history::{ChatRecord, ChatStore, NewChatRecord, RecordId, RecordSummary, StoreError},
    message::{Message, Role, Transcript},
    provider::{CancelHandle, Failure, ReplyEvent, StreamingChatProvider},
    settings::Settings,
};
use chatline_export::{ExportFormat, ExportMeta, file_name, to_json, to_markdown};
use chrono::Utc;
use futures_util::StreamExt;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    /// Neither text nor images were supplied.
    #[error("message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chatline(#[from] ChatlineError),

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// How a single turn ended.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The assistant answered and its message was appended. `saved` reports
    /// whether the history snapshot made it into the store.
    Completed {
        text: String,
        saved: Result<RecordId, StoreError>,
    },
    /// No assistant message was appended; the transcript ends with the user
    /// turn so the request can be retried.
    Failed(Failure),
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed { .. })
    }

    /// Final text, or the partial text that arrived before the failure.
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Completed { text, .. } => text,
            TurnOutcome::Failed(failure) => &failure.partial_text,
        }
    }
}

type InFlight = Arc<Mutex<Option<CancelHandle>>>;

/// Cloneable trigger for aborting whatever request a session is running.
///
/// Obtained from [`SessionState::abort_handle`] so another task (a key
/// handler, a signal listener) can stop a reply while `send` is awaited.
#[derive(Debug, Clone)]
pub struct SessionAbort {
    in_flight: InFlight,
}

impl SessionAbort {
    /// Cancel the running request. Returns `false` when nothing was running.
    pub fn abort(&self) -> bool {
        let slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }
}

/// One conversation bound to a provider and a history store.
///
/// All mutating operations take `&mut self`, so a session never runs two
/// requests against the same transcript. Dropping a `send` future abandons
/// its request; the next request cancels it if it is still registered.
pub struct SessionState<P> {
    provider: P,
    store: Arc<dyn ChatStore>,
    settings: Settings,
    system_prompt: String,
    system_prompt_injected: bool,
    transcript: Transcript,
    in_flight: InFlight,
}

impl<P: StreamingChatProvider> SessionState<P> {
    pub fn new(
        provider: P,
        store: Arc<dyn ChatStore>,
        settings: Settings,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            settings,
            system_prompt: system_prompt.into(),
            system_prompt_injected: false,
            transcript: Transcript::new(),
            in_flight: Arc::default(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings used by the *next* request.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn store(&self) -> &Arc<dyn ChatStore> {
        &self.store
    }

    pub fn abort_handle(&self) -> SessionAbort {
        SessionAbort {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Cancel the running request, if any.
    pub fn cancel(&self) -> bool {
        self.abort_handle().abort()
    }

    /// Insert the configured system prompt at index 0, once.
    ///
    /// Does nothing after the first call, when the transcript already starts
    /// with a system message (e.g. one loaded from history) or when the
    /// configured prompt is blank. Returns whether a message was inserted.
    pub fn ensure_system_prompt(&mut self) -> bool {
        if self.system_prompt_injected {
            return false;
        }
        self.system_prompt_injected = true;

        if self.system_prompt.trim().is_empty() {
            return false;
        }
        self.transcript.insert_system(self.system_prompt.clone())
    }

    /// Append a user turn built from `text` and attached `images`.
    ///
    /// # Errors
    ///
    /// [`SessionError::EmptyMessage`] when both are empty.
    pub fn append_user(&mut self, text: &str, images: Vec<String>) -> Result<(), SessionError> {
        if text.trim().is_empty() && images.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.transcript.push(Message::user_with_images(text, images))?;
        Ok(())
    }

    /// Send a user turn and stream the reply.
    ///
    /// `on_delta` receives the full assistant text accumulated so far, once
    /// per decoded fragment. A missing API key fails with
    /// [`chatline_core::provider::FailureKind::Auth`] before the transcript
    /// is touched.
    ///
    /// # Errors
    ///
    /// [`SessionError::EmptyMessage`] when there is nothing to send. Request
    /// failures are not errors; they come back as [`TurnOutcome::Failed`].
    pub async fn send(
        &mut self,
        text: &str,
        images: Vec<String>,
        on_delta: impl FnMut(&str),
    ) -> Result<TurnOutcome, SessionError> {
        if text.trim().is_empty() && images.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if !self.settings.has_api_key() {
            return Ok(TurnOutcome::Failed(Failure::auth("missing API key")));
        }

        self.ensure_system_prompt();
        self.append_user(text, images)?;
        Ok(self.run_turn(on_delta).await)
    }

    /// Drop the trailing assistant answer and ask again.
    ///
    /// Returns `Ok(None)` without touching the transcript or issuing a
    /// request when the transcript does not end with an assistant message.
    pub async fn retry_last(
        &mut self,
        on_delta: impl FnMut(&str),
    ) -> Result<Option<TurnOutcome>, SessionError> {
        if self.transcript.last_role() != Some(Role::Assistant) {
            debug!("nothing to retry");
            return Ok(None);
        }
        if !self.settings.has_api_key() {
            return Ok(Some(TurnOutcome::Failed(Failure::auth("missing API key"))));
        }

        self.transcript.pop_assistant();
        Ok(Some(self.run_turn(on_delta).await))
    }

    /// Start over with an empty transcript.
    pub fn reset(&mut self) {
        self.cancel();
        self.transcript = Transcript::new();
        self.system_prompt_injected = false;
    }

    /// Continue a conversation from history.
    ///
    /// A system message carried by the record counts as the injected prompt.
    pub fn load_from_record(&mut self, record: ChatRecord) {
        self.cancel();
        info!(id = %record.id, messages = record.messages.len(), "chat loaded");
        self.system_prompt_injected = record.messages.has_system();
        self.transcript = record.messages;
    }

    /// Fetch record `id` from the store and continue it.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for unknown ids, or
    /// [`StoreError::StorageUnavailable`].
    pub async fn load_from_store(&mut self, id: RecordId) -> Result<(), SessionError> {
        let record = self.store.get(id).await?;
        self.load_from_record(record);
        Ok(())
    }

    /// Most recent conversations first.
    pub async fn history(&self, limit: usize) -> Result<Vec<RecordSummary>, StoreError> {
        self.store.list(limit).await
    }

    /// The transcript as a Markdown document.
    pub fn export_markdown(&self) -> String {
        let meta = ExportMeta {
            model: self.settings.model.clone(),
            effort: self.settings.effort,
            exported_at: Utc::now(),
        };
        to_markdown(&self.transcript, &meta)
    }

    /// The transcript as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String, SessionError> {
        to_json(&self.transcript).map_err(|err| SessionError::Chatline(err.into()))
    }

    /// Write the JSON export into `dir` as `chatline-chat-<millis>.json` and
    /// return the file path.
    pub fn download_json(&self, dir: impl AsRef<Path>) -> Result<PathBuf, SessionError> {
        let path = dir
            .as_ref()
            .join(file_name(ExportFormat::Json, Utc::now()));
        std::fs::write(&path, self.export_json()?).map_err(|source| SessionError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "chat downloaded");
        Ok(path)
    }

    async fn run_turn(&mut self, mut on_delta: impl FnMut(&str)) -> TurnOutcome {
        let settings = self.settings.clone();

        // Holds the slot while the provider starts; an abort that hits it is
        // passed on to the real handle.
        let starting = CancelHandle::new();
        self.register(starting.clone());

        let mut handle = match self.provider.start(&self.transcript, &settings) {
            Ok(handle) => handle,
            Err(failure) => {
                self.unregister();
                warn!(%failure, "request not started");
                return TurnOutcome::Failed(failure);
            }
        };
        if self.hand_over(&starting, handle.cancel_handle()) {
            debug!("aborted while starting");
            handle.cancel();
        }

        let mut terminal = None;
        while let Some(event) = handle.next().await {
            match event {
                ReplyEvent::Delta(text) => on_delta(&text),
                event => terminal = Some(event),
            }
        }
        self.unregister();

        match terminal {
            Some(ReplyEvent::Completed(text)) => self.commit(text).await,
            Some(ReplyEvent::Failed(failure)) => {
                if failure.is_aborted() {
                    info!(chars = failure.partial_text.len(), "reply aborted");
                } else {
                    warn!(%failure, "reply failed");
                }
                TurnOutcome::Failed(failure)
            }
            _ => TurnOutcome::Failed(Failure::transport("reply ended without a result", "")),
        }
    }

    async fn commit(&mut self, text: String) -> TurnOutcome {
        if let Err(err) = self.transcript.push(Message::assistant(text.clone())) {
            return TurnOutcome::Failed(Failure::invalid_request(err.to_string()));
        }

        let snapshot = NewChatRecord::snapshot(self.settings.model.clone(), self.transcript.clone());
        let saved = self.store.append(snapshot).await;
        match &saved {
            Ok(id) => debug!(%id, "chat saved"),
            Err(err) => warn!(error = %err, "chat not saved"),
        }

        TurnOutcome::Completed { text, saved }
    }

    /// Track `cancel` as the running request, cancelling any stale one.
    fn register(&self, cancel: CancelHandle) {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(cancel) {
            debug!("cancelling previous request");
            previous.cancel();
        }
    }

    /// Replace the `starting` placeholder with the running request's
    /// handle. Returns whether the placeholder was aborted meanwhile.
    fn hand_over(&self, starting: &CancelHandle, running: CancelHandle) -> bool {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(running);
        starting.is_cancelled()
    }

    fn unregister(&self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
