//! SQLite-backed chat history.
//!
//! One `chats` table, keyed by an `AUTOINCREMENT` rowid so ids are never
//! reused, with a secondary index on the timestamp for newest-first listing.
//! Timestamps are stored as fixed-width RFC 3339 strings with nanosecond
//! precision, which sort lexicographically and round-trip exactly.
use std::{path::Path, sync::Mutex};

use chatline_core::{
    history::{
        ChatRecord, ChatStore, NewChatRecord, RecordId, RecordSummary, StoreError, StoreFuture,
    },
    message::Transcript,
    model::Model,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::unavailable;

/// Parse a DateTime from a database RFC3339 string, converting errors to rusqlite errors
fn parse_datetime_from_db(
    timestamp: &str,
    column: usize,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// The column holds `Model::id()` verbatim; no trimming or validation.
fn parse_model_from_db(model: String) -> Model {
    Model::from_id(model)
}

fn parse_messages_from_db(
    messages: &str,
    column: usize,
) -> std::result::Result<Transcript, rusqlite::Error> {
    serde_json::from_str(messages).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn record_from_row(row: &Row<'_>) -> std::result::Result<ChatRecord, rusqlite::Error> {
    let timestamp: String = row.get(1)?;
    let messages: String = row.get(3)?;

    Ok(ChatRecord {
        id: RecordId(row.get(0)?),
        timestamp: parse_datetime_from_db(&timestamp, 1)?,
        model: parse_model_from_db(row.get(2)?),
        messages: parse_messages_from_db(&messages, 3)?,
    })
}

/// Chat history stored in a SQLite database file.
pub struct SqliteChatStore {
    conn: Mutex<Connection>,
}

impl SqliteChatStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(unavailable)?;
        let store = Self::with_connection(conn)?;
        info!(path = %path.display(), "chat history opened");
        Ok(store)
    }

    /// Store that lives only as long as the value, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory().map_err(unavailable)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn).map_err(unavailable)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn append_now(&self, record: NewChatRecord) -> Result<RecordId, StoreError> {
        let messages = serde_json::to_string(&record.messages).map_err(unavailable)?;
        let timestamp = record.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);

        let conn = self.conn.lock().map_err(unavailable)?;
        conn.execute(
            "INSERT INTO chats (timestamp, model, messages) VALUES (?1, ?2, ?3)",
            params![timestamp, record.model.id(), messages],
        )
        .map_err(unavailable)?;

        let id = RecordId(conn.last_insert_rowid());
        debug!(%id, messages = record.messages.len(), "chat record appended");
        Ok(id)
    }

    fn list_now(&self, limit: usize) -> Result<Vec<RecordSummary>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let conn = self.conn.lock().map_err(unavailable)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, model, messages FROM chats
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?1",
            )
            .map_err(unavailable)?;

        let rows = stmt
            .query_map(params![limit], record_from_row)
            .map_err(unavailable)?;

        let summaries = rows
            .map(|row| row.map(|record| record.summary()).map_err(unavailable))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    fn get_now(&self, id: RecordId) -> Result<ChatRecord, StoreError> {
        let conn = self.conn.lock().map_err(unavailable)?;
        conn.query_row(
            "SELECT id, timestamp, model, messages FROM chats WHERE id = ?1",
            params![id.0],
            record_from_row,
        )
        .optional()
        .map_err(unavailable)?
        .ok_or(StoreError::NotFound(id))
    }
}

/// Initialize database schema
fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS chats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            model TEXT NOT NULL,
            messages TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_chats_timestamp ON chats(timestamp)",
        [],
    )?;

    Ok(())
}

impl ChatStore for SqliteChatStore {
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

#[cfg(test)]
mod tests {
    use chatline_core::{
        message::Message,
        model::{Model, OpenAiModel},
    };
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    use super::*;

    fn conversation(text: &str) -> Transcript {
        Transcript::from_messages(vec![
            Message::system("Be brief."),
            Message::user_with_images(text, vec!["data:image/png;base64,AAA".into()]),
            Message::assistant("Sure."),
        ])
        .unwrap()
    }

    fn record_at(timestamp: DateTime<Utc>, text: &str) -> NewChatRecord {
        NewChatRecord {
            timestamp,
            model: Model::OpenAi(OpenAiModel::Gpt5),
            messages: conversation(text),
        }
    }

    #[tokio::test]
    async fn appended_record_reads_back_identically() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        let record = NewChatRecord::snapshot(Model::Custom("local-llm".into()), conversation("Hi"));

        let id = store.append(record.clone()).await.unwrap();
        let fetched = store.get(id).await.unwrap();

        assert_eq!(fetched, record.with_id(id));
    }

    #[tokio::test]
    async fn model_ids_read_back_unchanged() {
        let store = SqliteChatStore::open_in_memory().unwrap();

        for model in [
            Model::Custom("gpt-4".into()),
            Model::Custom("  padded-model ".into()),
            Model::Custom(String::new()),
        ] {
            let record = NewChatRecord::snapshot(model.clone(), conversation("Hi"));
            let id = store.append(record.clone()).await.unwrap();
            let fetched = store.get(id).await.unwrap();

            assert_eq!(fetched, record.with_id(id));
            assert_eq!(fetched.model.id(), model.id());
        }
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        assert!(matches!(
            store.get(RecordId(7)).await,
            Err(StoreError::NotFound(RecordId(7)))
        ));
    }

    #[tokio::test]
    async fn list_orders_by_timestamp_then_id_descending() {
        let store = SqliteChatStore::open_in_memory().unwrap();
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();

        let oldest = store.append(record_at(base, "oldest")).await.unwrap();
        let newest = store
            .append(record_at(base + Duration::milliseconds(1500), "newest"))
            .await
            .unwrap();
        let tie_low = store
            .append(record_at(base + Duration::seconds(1), "tie low"))
            .await
            .unwrap();
        let tie_high = store
            .append(record_at(base + Duration::seconds(1), "tie high"))
            .await
            .unwrap();

        let listed = store.list(10).await.unwrap();
        let ids: Vec<RecordId> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newest, tie_high, tie_low, oldest]);

        assert_eq!(listed[0].preview, "newest");
        assert_eq!(listed[0].message_count, 3);
        assert_eq!(listed[0].model, Model::OpenAi(OpenAiModel::Gpt5));

        assert_eq!(store.list(2).await.unwrap().len(), 2);
        assert!(store.list(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn records_survive_reopening_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chats.db");

        let id = {
            let store = SqliteChatStore::open(&path).unwrap();
            store.append(record_at(Utc::now(), "persisted")).await.unwrap()
        };

        let reopened = SqliteChatStore::open(&path).unwrap();
        let record = reopened.get(id).await.unwrap();
        assert_eq!(record.messages[1].content.first_text(), Some("persisted"));

        let next = reopened.append(record_at(Utc::now(), "again")).await.unwrap();
        assert!(next > id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_get_distinct_ids() {
        let store = std::sync::Arc::new(SqliteChatStore::open_in_memory().unwrap());

        let tasks: Vec<_> = (0..8)
            .map(|n| {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .append(record_at(Utc::now(), &format!("chat {n}")))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(store.list(100).await.unwrap().len(), 8);
    }
}
