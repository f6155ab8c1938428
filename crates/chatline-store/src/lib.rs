//! Chat history backends for **chatline**.
//!
//! | Backend                | Use                                                        |
//! |------------------------|------------------------------------------------------------|
//! | [`SqliteChatStore`]    | Durable history in a single SQLite file                    |
//! | [`MemoryChatStore`]    | Process-lifetime history, tests                            |
//! | [`DisabledChatStore`]  | Stand-in when no backend could be opened                   |
//!
//! All of them implement [`chatline_core::history::ChatStore`].
use std::{path::Path, sync::Arc};

use chatline_core::history::{ChatStore, StoreError};
use tracing::warn;

mod disabled;
mod memory;
mod sqlite;

pub use disabled::DisabledChatStore;
pub use memory::MemoryChatStore;
pub use sqlite::SqliteChatStore;

/// Open the SQLite history at `path`, or fall back to a
/// [`DisabledChatStore`] when that fails.
///
/// History is a convenience: a broken database must not stop anybody from
/// chatting, so the failure is logged and every later store call reports
/// [`StoreError::StorageUnavailable`].
pub fn open_or_disabled(path: impl AsRef<Path>) -> Arc<dyn ChatStore> {
    let path = path.as_ref();
    match SqliteChatStore::open(path) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "chat history disabled");
            Arc::new(DisabledChatStore::new(err.to_string()))
        }
    }
}

pub(crate) fn unavailable(err: impl std::fmt::Display) -> StoreError {
    StoreError::StorageUnavailable(err.to_string())
}
