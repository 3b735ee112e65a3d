use crate::libs::storage::database::storage_sqllite::{SqliteStore, SqliteTransaction};
use crate::libs::storage::storage_traits::{StoreError, Transactional};
use tracing::info;

/// Creates the collections of the backend and the device-local settings
/// table. Safe to run on every start.
pub fn db_migration(store: &SqliteStore) -> Result<(), StoreError> {
    let mut connection = store.new_connection()?;
    let sqlite_transaction = SqliteTransaction::new(&mut connection)?;

    sqlite_transaction.inner().execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            mobile TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            image_uri TEXT,
            created_at INTEGER NOT NULL
        );",
    )?;

    // seq keeps insertion order for messages sharing a timestamp
    sqlite_transaction.inner().execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id TEXT NOT NULL UNIQUE,
            channel_id TEXT NOT NULL,
            client_key TEXT NOT NULL,
            sender_id TEXT NOT NULL,
            recipient_id TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            sender_name TEXT,
            sender_avatar TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_messages_channel_created_at
            ON messages(channel_id, created_at);",
    )?;

    sqlite_transaction.inner().execute_batch(
        "CREATE TABLE IF NOT EXISTS feedback (
            feedback_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );",
    )?;

    sqlite_transaction.inner().execute_batch(
        "CREATE TABLE IF NOT EXISTS blobs (
            path TEXT PRIMARY KEY,
            content BLOB NOT NULL,
            digest TEXT NOT NULL,
            uploaded_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )?;

    sqlite_transaction.inner().execute_batch(
        "CREATE TABLE IF NOT EXISTS app_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )?;

    sqlite_transaction
        .commit()
        .map_err(|err| StoreError::Initialization(format!("Could not commit initial db: {err}")))?;

    info!("database schema ready at {}", store.path());
    Ok(())
}
