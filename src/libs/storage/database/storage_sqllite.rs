use crate::libs::core::models::{ChannelId, ParticipantId};
use crate::libs::storage::database::database::db_migration;
use crate::libs::storage::records::{
    new_document_id, DocumentRef, FeedbackRecord, MessageRecord, UserRecord, WriteBatch,
};
use crate::libs::storage::storage_traits::{
    FeedbackStore, LocalStore, MessageStore, ObjectStore, StoreError, Transactional, UserStore,
};
use crate::libs::storage::subscriptions::{ListenerRegistration, ListenerRegistry, SnapshotListener};
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, ErrorCode, OptionalExtension, Row, Transaction};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_BLOB_URL_PREFIX: &str = "blob://";
const POOL_SIZE: u32 = 4;

pub struct SqliteTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> SqliteTransaction<'conn> {
    pub fn new(
        conn: &'conn mut PooledConnection<SqliteConnectionManager>,
    ) -> Result<Self, StoreError> {
        let trans = conn.transaction()?;
        Ok(Self { tx: trans })
    }

    pub fn inner(&self) -> &Transaction<'conn> {
        &self.tx
    }
}

impl<'conn> Transactional for SqliteTransaction<'conn> {
    fn commit(self) -> Result<(), StoreError> {
        Ok(self.tx.commit()?)
    }

    fn rollback(self) -> Result<(), StoreError> {
        Ok(self.tx.rollback()?)
    }
}

/// SQLite backed stand-in for the hosted document database, its object
/// storage, or the device-local key-value store. Writes to a channel are
/// pushed to that channel's live listeners after commit.
pub struct SqliteStore {
    path: String,
    conn_pool: Pool<SqliteConnectionManager>,
    listeners: Arc<ListenerRegistry>,
    blob_url_prefix: String,
}

impl SqliteStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = db_path.as_ref().display().to_string();
        let manager = SqliteConnectionManager::file(db_path.as_ref()).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });
        let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;

        let store = Self {
            path,
            conn_pool: pool,
            listeners: ListenerRegistry::new(),
            blob_url_prefix: DEFAULT_BLOB_URL_PREFIX.to_string(),
        };
        db_migration(&store)?;
        Ok(store)
    }

    pub fn with_blob_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.blob_url_prefix = prefix.into();
        self
    }

    pub fn new_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.conn_pool.get()?)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of live message listeners across all channels.
    pub fn listener_count(&self) -> usize {
        self.listeners.listener_count()
    }

    fn with_transaction<T>(
        &self,
        work: impl FnOnce(&SqliteTransaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut connection = self.new_connection()?;
        let sqlite_transaction = SqliteTransaction::new(&mut connection)?;
        let value = work(&sqlite_transaction)?;
        sqlite_transaction.commit()?;
        Ok(value)
    }

    fn notify(&self, channel: &ChannelId) {
        if self.listeners.has_listeners(channel) {
            self.listeners.dispatch(channel, self.query_messages(channel));
        }
    }
}

fn from_micros(column: usize, micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Integer,
            format!("timestamp out of range: {micros}").into(),
        )
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

const USER_COLUMNS: &str = "user_id, name, email, mobile, password_hash, image_uri, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        user_id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        mobile: row.get(3)?,
        password_hash: row.get(4)?,
        image_uri: row.get(5)?,
        created_at: from_micros(6, row.get(6)?)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        message_id: Some(row.get(0)?),
        client_key: row.get(1)?,
        sender_id: row.get(2)?,
        recipient_id: row.get(3)?,
        content: row.get(4)?,
        created_at: from_micros(5, row.get(5)?)?,
        sender_name: row.get(6)?,
        sender_avatar: row.get(7)?,
    })
}

impl UserStore for SqliteStore {
    fn create_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.with_transaction(|tx| {
            tx.inner()
                .execute(
                    "INSERT INTO users (user_id, name, email, mobile, password_hash, image_uri, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        record.user_id,
                        record.name,
                        record.email,
                        record.mobile,
                        record.password_hash,
                        record.image_uri,
                        record.created_at.timestamp_micros(),
                    ],
                )
                .map_err(|e| {
                    if is_constraint_violation(&e) {
                        StoreError::AlreadyExists(format!("user {}", record.email))
                    } else {
                        StoreError::Sqlite(e)
                    }
                })?;
            Ok(())
        })
    }

    fn load_user(&self, user_id: &ParticipantId) -> Result<Option<UserRecord>, StoreError> {
        self.with_transaction(|tx| {
            Ok(tx
                .inner()
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
                    params![user_id],
                    user_from_row,
                )
                .optional()?)
        })
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.with_transaction(|tx| {
            Ok(tx
                .inner()
                .query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                    params![email],
                    user_from_row,
                )
                .optional()?)
        })
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.with_transaction(|tx| {
            let mut stmt = tx.inner().prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, user_id"
            ))?;
            let users = stmt
                .query_map([], user_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(users)
        })
    }

    fn update_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.with_transaction(|tx| {
            let updated = tx.inner().execute(
                "UPDATE users SET name = ?2, email = ?3, mobile = ?4, password_hash = ?5, image_uri = ?6
                 WHERE user_id = ?1",
                params![
                    record.user_id,
                    record.name,
                    record.email,
                    record.mobile,
                    record.password_hash,
                    record.image_uri,
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(format!("users/{}", record.user_id)));
            }
            Ok(())
        })
    }
}

impl MessageStore for SqliteStore {
    fn add_message(
        &self,
        channel: &ChannelId,
        message: &MessageRecord,
    ) -> Result<DocumentRef, StoreError> {
        let message_id = new_document_id();
        self.with_transaction(|tx| {
            tx.inner().execute(
                "INSERT INTO messages
                 (message_id, channel_id, client_key, sender_id, recipient_id, content, created_at, sender_name, sender_avatar)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    message_id,
                    channel,
                    message.client_key,
                    message.sender_id,
                    message.recipient_id,
                    message.content,
                    message.created_at.timestamp_micros(),
                    message.sender_name,
                    message.sender_avatar,
                ],
            )?;
            Ok(())
        })?;
        debug!("message {message_id} appended to {channel}");

        self.notify(channel);
        Ok(DocumentRef::Message {
            channel: channel.clone(),
            message_id,
        })
    }

    fn query_messages(&self, channel: &ChannelId) -> Result<Vec<MessageRecord>, StoreError> {
        self.with_transaction(|tx| {
            let mut stmt = tx.inner().prepare(
                "SELECT message_id, client_key, sender_id, recipient_id, content, created_at, sender_name, sender_avatar
                 FROM messages
                 WHERE channel_id = ?1
                 ORDER BY created_at DESC, seq DESC",
            )?;
            let messages = stmt
                .query_map(params![channel], message_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
    }

    fn subscribe_messages(
        &self,
        channel: &ChannelId,
        listener: SnapshotListener,
    ) -> Result<ListenerRegistration, StoreError> {
        let registration = self.listeners.register(channel, listener);
        self.listeners
            .deliver_to(&registration, self.query_messages(channel));
        Ok(registration)
    }

    fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut touched: HashSet<ChannelId> = HashSet::new();
        self.with_transaction(|tx| {
            for document in batch.deletes() {
                match document {
                    DocumentRef::Message {
                        channel,
                        message_id,
                    } => {
                        tx.inner().execute(
                            "DELETE FROM messages WHERE channel_id = ?1 AND message_id = ?2",
                            params![channel, message_id],
                        )?;
                        touched.insert(channel.clone());
                    }
                    DocumentRef::Feedback(feedback_id) => {
                        tx.inner().execute(
                            "DELETE FROM feedback WHERE feedback_id = ?1",
                            params![feedback_id],
                        )?;
                    }
                }
            }
            Ok(())
        })?;
        info!("batch of {} deletes committed", batch.len());

        for channel in &touched {
            self.notify(channel);
        }
        Ok(())
    }
}

impl FeedbackStore for SqliteStore {
    fn add_feedback(&self, record: &FeedbackRecord) -> Result<DocumentRef, StoreError> {
        let feedback_id = new_document_id();
        self.with_transaction(|tx| {
            tx.inner().execute(
                "INSERT INTO feedback (feedback_id, name, message, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    feedback_id,
                    record.name,
                    record.message,
                    record.created_at.timestamp_micros(),
                ],
            )?;
            Ok(())
        })?;
        Ok(DocumentRef::Feedback(feedback_id))
    }
}

impl ObjectStore for SqliteStore {
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let digest: String = Sha256::digest(bytes)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();

        self.with_transaction(|tx| {
            tx.inner().execute(
                "INSERT OR REPLACE INTO blobs (path, content, digest) VALUES (?1, ?2, ?3)",
                params![path, bytes, digest],
            )?;
            Ok(())
        })?;

        Ok(format!("{}{}?token={}", self.blob_url_prefix, path, digest))
    }

    fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_transaction(|tx| {
            Ok(tx
                .inner()
                .query_row(
                    "SELECT content FROM blobs WHERE path = ?1",
                    params![path],
                    |row| row.get::<usize, Vec<u8>>(0),
                )
                .optional()?)
        })
    }
}

impl LocalStore for SqliteStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_transaction(|tx| {
            Ok(tx
                .inner()
                .query_row(
                    "SELECT value FROM app_settings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_transaction(|tx| {
            tx.inner().execute(
                "INSERT INTO app_settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = strftime('%s', 'now')",
                params![key, value],
            )?;
            Ok(())
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.with_transaction(|tx| {
            tx.inner()
                .execute("DELETE FROM app_settings WHERE key = ?1", params![key])?;
            Ok(())
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.with_transaction(|tx| {
            tx.inner().execute("DELETE FROM app_settings", [])?;
            Ok(())
        })
    }
}
