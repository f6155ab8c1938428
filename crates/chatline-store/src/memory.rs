use std::sync::{Mutex, PoisonError};

use chatline_core::history::{
    ChatRecord, ChatStore, NewChatRecord, RecordId, RecordSummary, StoreError, StoreFuture,
};

use crate::unavailable;

/// History kept in memory for the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemoryChatStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    last_id: i64,
    records: Vec<ChatRecord>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append_now(&self, record: NewChatRecord) -> Result<RecordId, StoreError> {
        let mut state = self.state.lock().map_err(unavailable)?;
        state.last_id += 1;
        let id = RecordId(state.last_id);
        state.records.push(record.with_id(id));
        Ok(id)
    }

    fn list_now(&self, limit: usize) -> Result<Vec<RecordSummary>, StoreError> {
        let state = self.state.lock().map_err(unavailable)?;
        let mut records: Vec<&ChatRecord> = state.records.iter().collect();
        records.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        Ok(records.into_iter().take(limit).map(ChatRecord::summary).collect())
    }

    fn get_now(&self, id: RecordId) -> Result<ChatRecord, StoreError> {
        let state = self.state.lock().map_err(unavailable)?;
        state
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }
}

impl ChatStore for MemoryChatStore {
    fn append(&self, record: NewChatRecord) -> StoreFuture<'_, RecordId> {
        Box::pin(async move { self.append_now(record) })
    }

    fn list(&self, limit: usize) -> StoreFuture<'_, Vec<RecordSummary>> {
        Box::pin(async move { self.list_now(limit) })
    }

    fn get(&self, id: RecordId) -> StoreFuture<'_, ChatRecord> {
        Box::pin(async move { self.get_now(id) })
    }
}
