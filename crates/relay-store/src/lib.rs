//! SQLite-backed [`RecordStore`] implementation.
//!
//! One handle is opened at startup and passed by `Arc` into every component.
//! Each call opens a connection on a blocking thread; SQLite's own locking
//! serializes concurrent access, so callers take no external lock.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use relay_core::{ChatId, MessageId, MessageKey, MessageRecord, RecordStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    db_path: PathBuf,
}

impl SqliteRecordStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Create the schema if it does not exist yet.
    pub async fn init(&self) -> StoreResult<()> {
        self.with_connection(|connection| {
            connection
                .execute_batch(
                    r#"
                    CREATE TABLE IF NOT EXISTS messages (
                        chat_id INTEGER NOT NULL,
                        message_id INTEGER NOT NULL,
                        from_bot INTEGER NOT NULL,
                        text TEXT NOT NULL,
                        reply_to INTEGER,
                        PRIMARY KEY (chat_id, message_id)
                    );

                    CREATE TABLE IF NOT EXISTS whitelist (
                        chat_id INTEGER PRIMARY KEY
                    );
                    "#,
                )
                .map_err(sqlite_error)?;
            Ok(())
        })
        .await
    }

    async fn with_connection<T, F>(&self, func: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let connection = open_connection(&db_path)?;
            func(&connection)
        })
        .await
        .map_err(|error| StoreError::Task(error.to_string()))?
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn put(&self, key: MessageKey, record: &MessageRecord) -> StoreResult<()> {
        let record = record.clone();
        self.with_connection(move |connection| {
            connection
                .execute(
                    r#"
                    INSERT OR REPLACE INTO messages (chat_id, message_id, from_bot, text, reply_to)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![
                        key.chat_id.0,
                        key.message_id.0,
                        record.from_bot,
                        record.text,
                        record.reply_to.map(|id| id.0),
                    ],
                )
                .map_err(sqlite_error)?;
            Ok(())
        })
        .await
    }

    async fn get(&self, key: MessageKey) -> StoreResult<Option<MessageRecord>> {
        self.with_connection(move |connection| {
            connection
                .query_row(
                    "SELECT from_bot, text, reply_to FROM messages WHERE chat_id = ?1 AND message_id = ?2",
                    params![key.chat_id.0, key.message_id.0],
                    |row| {
                        Ok(MessageRecord {
                            from_bot: row.get(0)?,
                            text: row.get(1)?,
                            reply_to: row.get::<_, Option<i64>>(2)?.map(MessageId),
                        })
                    },
                )
                .optional()
                .map_err(sqlite_error)
        })
        .await
    }

    async fn is_authorized(&self, chat_id: ChatId) -> StoreResult<bool> {
        self.with_connection(move |connection| {
            connection
                .query_row(
                    "SELECT 1 FROM whitelist WHERE chat_id = ?1",
                    params![chat_id.0],
                    |_| Ok(()),
                )
                .optional()
                .map(|found| found.is_some())
                .map_err(sqlite_error)
        })
        .await
    }

    async fn authorize(&self, chat_id: ChatId) -> StoreResult<()> {
        self.with_connection(move |connection| {
            connection
                .execute(
                    "INSERT OR IGNORE INTO whitelist (chat_id) VALUES (?1)",
                    params![chat_id.0],
                )
                .map_err(sqlite_error)?;
            Ok(())
        })
        .await
    }

    async fn revoke(&self, chat_id: ChatId) -> StoreResult<()> {
        self.with_connection(move |connection| {
            connection
                .execute(
                    "DELETE FROM whitelist WHERE chat_id = ?1",
                    params![chat_id.0],
                )
                .map_err(sqlite_error)?;
            Ok(())
        })
        .await
    }

    async fn authorized_chats(&self) -> StoreResult<Vec<ChatId>> {
        self.with_connection(|connection| {
            let mut statement = connection
                .prepare("SELECT chat_id FROM whitelist ORDER BY chat_id")
                .map_err(sqlite_error)?;
            let chats = statement
                .query_map([], |row| row.get::<_, i64>(0))
                .map_err(sqlite_error)?
                .collect::<Result<Vec<i64>, _>>()
                .map_err(sqlite_error)?;
            Ok(chats.into_iter().map(ChatId).collect())
        })
        .await
    }
}

fn open_connection(path: &Path) -> StoreResult<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let connection = Connection::open(path).map_err(sqlite_error)?;
    connection
        .execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )
        .map_err(sqlite_error)?;
    Ok(connection)
}

fn sqlite_error(error: rusqlite::Error) -> StoreError {
    StoreError::Backend(error.to_string())
}
