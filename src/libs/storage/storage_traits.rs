use crate::libs::core::models::{ChannelId, ParticipantId};
use crate::libs::storage::records::{DocumentRef, FeedbackRecord, MessageRecord, UserRecord, WriteBatch};
use crate::libs::storage::subscriptions::{ListenerRegistration, SnapshotListener};
use thiserror::Error;

pub trait Transactional {
    fn commit(self) -> Result<(), StoreError>;
    fn rollback(self) -> Result<(), StoreError>;
}

/// The `users` collection.
pub trait UserStore {
    fn create_user(&self, record: &UserRecord) -> Result<(), StoreError>;
    fn load_user(&self, user_id: &ParticipantId) -> Result<Option<UserRecord>, StoreError>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;
    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;
    fn update_user(&self, record: &UserRecord) -> Result<(), StoreError>;
}

/// The per-channel message logs under `chats/{channel}/messages`.
pub trait MessageStore {
    /// Appends a message and returns the reference of the new document.
    fn add_message(
        &self,
        channel: &ChannelId,
        message: &MessageRecord,
    ) -> Result<DocumentRef, StoreError>;

    /// Every message of the channel, newest first. Equal timestamps keep the
    /// later insertion first.
    fn query_messages(&self, channel: &ChannelId) -> Result<Vec<MessageRecord>, StoreError>;

    /// Live query over [`MessageStore::query_messages`]. The listener receives
    /// the current result set right away and again after every committed
    /// change to the channel, until the registration is dropped.
    fn subscribe_messages(
        &self,
        channel: &ChannelId,
        listener: SnapshotListener,
    ) -> Result<ListenerRegistration, StoreError>;

    fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

pub trait FeedbackStore {
    fn add_feedback(&self, record: &FeedbackRecord) -> Result<DocumentRef, StoreError>;
}

/// The hosted document database as seen by the client.
pub trait DocumentStore: UserStore + MessageStore + FeedbackStore + Send + Sync {}

impl<T> DocumentStore for T where T: UserStore + MessageStore + FeedbackStore + Send + Sync {}

/// Blob storage for profile images.
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `path` and returns its download URL.
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<String, StoreError>;
    fn fetch(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

/// Device-local key-value persistence.
pub trait LocalStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Sqlite Error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("ConnectionPool Error: {0}")]
    ConnectionPool(#[from] r2d2::Error),
    #[error("Already Exists: {0}")]
    AlreadyExists(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Permission Denied: {0}")]
    PermissionDenied(String),
    #[error("Unavailable: {0}")]
    Unavailable(String),
    #[error("Conversion Error: {0}")]
    Conversion(String),
    #[error("Subscription Error: {0}")]
    Subscription(String),
    #[error("Initialization Error: {0}")]
    Initialization(String),
}
