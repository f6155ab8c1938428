use chatline_core::history::{ChatRecord, ChatStore, NewChatRecord, RecordId, RecordSummary, StoreError, StoreFuture};

/// A store that is never available.
#[derive(Debug, Clone)]
pub struct DisabledChatStore {
    reason: String,
}

impl DisabledChatStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> StoreError {
        StoreError::StorageUnavailable(self.reason.clone())
    }
}

impl Default for DisabledChatStore {
    fn default() -> Self {
        Self::new("history is disabled")
    }
}

impl ChatStore for DisabledChatStore {
    fn append(&self, _record: NewChatRecord) -> StoreFuture<'_, RecordId> {
        let err = self.error();
        Box::pin(async move { Err(err) })
    }

    fn list(&self, _limit: usize) -> StoreFuture<'_, Vec<RecordSummary>> {
        let err = self.error();
        Box::pin(async move { Err(err) })
    }

    fn get(&self, _id: RecordId) -> StoreFuture<'_, ChatRecord> {
        let err = self.error();
        Box::pin(async move { Err(err) })
    }
}
