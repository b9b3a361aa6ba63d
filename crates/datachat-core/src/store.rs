//! Durable transcript storage.
//!
//! One record per chat id holding the compressed JSON array of its messages.
//! Every write replaces the whole record, so a failed write leaves the
//! previous value in place. A missing or undecodable record reads as `None`.

use crate::codec::TranscriptCodec;
use crate::{DataChatError, Result};
use chrono::Utc;
use datachat_types::Message;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Key-value durable storage for chat transcripts.
pub trait TranscriptStore: Send + Sync {
    /// Overwrite the stored transcript for `chat_id`.
    fn write(&self, chat_id: &str, messages: &[Message]) -> Result<()>;

    /// Read the stored transcript. `None` means no usable record exists.
    fn read(&self, chat_id: &str) -> Result<Option<Vec<Message>>>;

    /// Remove the record for `chat_id`. Erasing a missing record is not an error.
    fn erase(&self, chat_id: &str) -> Result<()>;
}

/// Storage usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub record_count: u64,
    pub total_original_size: u64,
    pub total_compressed_size: u64,
}

impl StoreStats {
    /// Calculate compression ratio.
    pub fn compression_ratio(&self) -> f64 {
        if self.total_compressed_size == 0 {
            1.0
        } else {
            self.total_original_size as f64 / self.total_compressed_size as f64
        }
    }
}

/// Decode a stored blob, mapping corruption to "no record".
fn decode_or_discard(codec: &TranscriptCodec, chat_id: &str, blob: &[u8]) -> Result<Option<Vec<Message>>> {
    match codec.decode_messages(blob) {
        Ok(messages) => Ok(Some(messages)),
        Err(DataChatError::Corruption(reason)) => {
            warn!(target: "datachat::store", "Discarding corrupted transcript for chat {}: {}", chat_id, reason);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// SQLite-backed transcript store.
pub struct SqliteTranscriptStore {
    conn: Mutex<Connection>,
    codec: TranscriptCodec,
}

impl SqliteTranscriptStore {
    /// Open or create the database at the given path.
    pub fn open(path: &Path, codec: TranscriptCodec) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn, codec)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(codec: TranscriptCodec) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, codec)
    }

    /// Create a store from an existing connection.
    pub fn from_connection(conn: Connection, codec: TranscriptCodec) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            codec,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS transcripts (
                chat_id TEXT PRIMARY KEY,
                payload BLOB NOT NULL,
                message_count INTEGER NOT NULL DEFAULT 0,
                original_size INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Storage usage across all chats.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn();
        let stats = conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(original_size), 0),
                COALESCE(SUM(length(payload)), 0)
            FROM transcripts
            "#,
            [],
            |row| {
                Ok(StoreStats {
                    record_count: row.get::<_, i64>(0)? as u64,
                    total_original_size: row.get::<_, i64>(1)? as u64,
                    total_compressed_size: row.get::<_, i64>(2)? as u64,
                })
            },
        )?;
        Ok(stats)
    }
}

impl TranscriptStore for SqliteTranscriptStore {
    fn write(&self, chat_id: &str, messages: &[Message]) -> Result<()> {
        let json = serde_json::to_string(messages)?;
        let payload = self.codec.compress(&json)?;

        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO transcripts (chat_id, payload, message_count, original_size, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(chat_id) DO UPDATE SET
                payload = excluded.payload,
                message_count = excluded.message_count,
                original_size = excluded.original_size,
                updated_at = excluded.updated_at
            "#,
            params![
                chat_id,
                payload,
                messages.len() as i64,
                json.len() as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        debug!(
            target: "datachat::store",
            "Wrote {} messages for chat {} ({} -> {} bytes)",
            messages.len(),
            chat_id,
            json.len(),
            payload.len()
        );
        Ok(())
    }

    fn read(&self, chat_id: &str) -> Result<Option<Vec<Message>>> {
        let blob: Option<Vec<u8>> = {
            let conn = self.conn();
            conn.query_row(
                "SELECT payload FROM transcripts WHERE chat_id = ?1",
                params![chat_id],
                |row| row.get(0),
            )
            .optional()?
        };

        match blob {
            Some(blob) => decode_or_discard(&self.codec, chat_id, &blob),
            None => Ok(None),
        }
    }

    fn erase(&self, chat_id: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM transcripts WHERE chat_id = ?1", params![chat_id])?;
        Ok(())
    }
}

/// Process-local store keeping compressed blobs in a map.
///
/// Used for ephemeral runs where nothing should touch disk.
#[derive(Default)]
pub struct MemoryTranscriptStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    codec: TranscriptCodec,
}

impl MemoryTranscriptStore {
    pub fn new(codec: TranscriptCodec) -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            codec,
        }
    }

    fn blobs(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.blobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.blobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, chat_id: &str, blob: Vec<u8>) {
        self.blobs().insert(chat_id.to_string(), blob);
    }
}

impl TranscriptStore for MemoryTranscriptStore {
    fn write(&self, chat_id: &str, messages: &[Message]) -> Result<()> {
        let blob = self.codec.encode_messages(messages)?;
        self.blobs().insert(chat_id.to_string(), blob);
        Ok(())
    }

    fn read(&self, chat_id: &str) -> Result<Option<Vec<Message>>> {
        let blob = self.blobs().get(chat_id).cloned();
        match blob {
            Some(blob) => decode_or_discard(&self.codec, chat_id, &blob),
            None => Ok(None),
        }
    }

    fn erase(&self, chat_id: &str) -> Result<()> {
        self.blobs().remove(chat_id);
        Ok(())
    }
}
