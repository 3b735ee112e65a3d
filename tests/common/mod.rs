#![allow(dead_code)]

use duo_chat_lib::libs::config::ClientConfig;
use duo_chat_lib::libs::core::account::SignUpForm;
use duo_chat_lib::libs::core::models::{ChannelId, ParticipantId};
use duo_chat_lib::libs::storage::database::storage_sqllite::SqliteStore;
use duo_chat_lib::libs::storage::records::{
    DocumentRef, FeedbackRecord, MessageRecord, UserRecord, WriteBatch,
};
use duo_chat_lib::libs::storage::storage_traits::{
    FeedbackStore, MessageStore, StoreError, UserStore,
};
use duo_chat_lib::libs::storage::subscriptions::{
    ListenerRegistration, ListenerRegistry, SnapshotListener,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const PASSWORD: &str = "Passw0rd!";

/// Backend and device databases in a throwaway directory. Keep the value
/// alive for the duration of the test.
pub struct TestEnv {
    pub dir: TempDir,
    pub config: ClientConfig,
    pub backend: Arc<SqliteStore>,
    pub device: Arc<SqliteStore>,
}

pub fn test_env() -> TestEnv {
    let dir = tempfile::tempdir().expect("Failed to create test directory");
    let config = test_config(&dir);
    let backend = Arc::new(
        SqliteStore::open(&config.backend_path).expect("Failed to open backend database"),
    );
    let device =
        Arc::new(SqliteStore::open(&config.device_path).expect("Failed to open device database"));

    TestEnv {
        dir,
        config,
        backend,
        device,
    }
}

pub fn test_config(dir: &TempDir) -> ClientConfig {
    ClientConfig {
        // lowest cost bcrypt accepts, keeps the suite fast
        bcrypt_cost: 4,
        ..ClientConfig::with_base_dir(dir.path())
    }
}

pub fn sign_up_form(name: &str, email: &str) -> SignUpForm {
    SignUpForm {
        name: name.to_string(),
        email: email.to_string(),
        mobile: "0400000000".to_string(),
        password: PASSWORD.to_string(),
        confirm_password: PASSWORD.to_string(),
        image: None,
    }
}

/// Inserts a user directly, skipping password hashing.
pub fn seed_user(store: &SqliteStore, id: &str, name: &str) -> ParticipantId {
    let user_id = ParticipantId::from(id);
    let record = UserRecord::new(
        user_id.clone(),
        name.to_string(),
        format!("{id}@example.com"),
        "0400000000".to_string(),
        "not-a-hash".to_string(),
        None,
    );
    store.create_user(&record).expect("Failed to seed user");
    user_id
}

/// Document store wrapper that can fail writes, break the live stream and
/// report how many writes reached the database.
pub struct ScriptedStore {
    inner: Arc<SqliteStore>,
    listeners: Arc<ListenerRegistry>,
    fail_writes: AtomicBool,
    fail_subscribe: AtomicBool,
    fail_initial_snapshot: AtomicBool,
    persisted_writes: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(inner: Arc<SqliteStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            listeners: ListenerRegistry::new(),
            fail_writes: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            fail_initial_snapshot: AtomicBool::new(false),
            persisted_writes: AtomicUsize::new(0),
        })
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Subscriptions succeed but their first snapshot is an error.
    pub fn fail_initial_snapshot(&self, fail: bool) {
        self.fail_initial_snapshot.store(fail, Ordering::SeqCst);
    }

    pub fn persisted_writes(&self) -> usize {
        self.persisted_writes.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.listener_count()
    }

    /// Pushes a stream error to every listener of `channel`.
    pub fn break_stream(&self, channel: &ChannelId) {
        self.listeners.dispatch(
            channel,
            Err(StoreError::Unavailable("connection lost".to_string())),
        );
    }

    /// Writes straight into the database without notifying listeners, as
    /// if another device wrote while this one was offline.
    pub fn insert_silently(&self, channel: &ChannelId, record: &MessageRecord) {
        self.inner
            .add_message(channel, record)
            .expect("Failed to insert message");
    }

    fn publish(&self, channel: &ChannelId) {
        self.listeners
            .dispatch(channel, self.inner.query_messages(channel));
    }
}

impl UserStore for ScriptedStore {
    fn create_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.inner.create_user(record)
    }

    fn load_user(&self, user_id: &ParticipantId) -> Result<Option<UserRecord>, StoreError> {
        self.inner.load_user(user_id)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.inner.find_user_by_email(email)
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.inner.list_users()
    }

    fn update_user(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.inner.update_user(record)
    }
}

impl MessageStore for ScriptedStore {
    fn add_message(
        &self,
        channel: &ChannelId,
        message: &MessageRecord,
    ) -> Result<DocumentRef, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied("chats".to_string()));
        }
        let document = self.inner.add_message(channel, message)?;
        self.persisted_writes.fetch_add(1, Ordering::SeqCst);
        self.publish(channel);
        Ok(document)
    }

    fn query_messages(&self, channel: &ChannelId) -> Result<Vec<MessageRecord>, StoreError> {
        self.inner.query_messages(channel)
    }

    fn subscribe_messages(
        &self,
        channel: &ChannelId,
        listener: SnapshotListener,
    ) -> Result<ListenerRegistration, StoreError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied("chats".to_string()));
        }
        let registration = self.listeners.register(channel, listener);
        let snapshot = if self.fail_initial_snapshot.load(Ordering::SeqCst) {
            Err(StoreError::Subscription("permission denied".to_string()))
        } else {
            self.inner.query_messages(channel)
        };
        self.listeners.deliver_to(&registration, snapshot);
        Ok(registration)
    }

    fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("batch rejected".to_string()));
        }
        let channels: Vec<ChannelId> = batch
            .deletes()
            .iter()
            .filter_map(|document| match document {
                DocumentRef::Message { channel, .. } => Some(channel.clone()),
                _ => None,
            })
            .collect();
        self.inner.commit_batch(batch)?;
        if let Some(channel) = channels.first() {
            self.publish(channel);
        }
        Ok(())
    }
}

impl FeedbackStore for ScriptedStore {
    fn add_feedback(&self, record: &FeedbackRecord) -> Result<DocumentRef, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("feedback".to_string()));
        }
        self.inner.add_feedback(record)
    }
}
