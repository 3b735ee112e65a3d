use crate::libs::core::models::{ChannelId, ClientKey, ParticipantId};
use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

/// One document of the `users` collection.
#[derive(Clone, Debug, PartialEq)]
pub struct UserRecord {
    pub user_id: ParticipantId,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password_hash: String,
    pub image_uri: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(
        user_id: ParticipantId,
        name: String,
        email: String,
        mobile: String,
        password_hash: String,
        image_uri: Option<String>,
    ) -> Self {
        Self {
            user_id,
            name,
            email,
            mobile,
            password_hash,
            image_uri,
            created_at: now(),
        }
    }
}

/// One document of `chats/{channel}/messages`. `message_id` is assigned by
/// the store and stays `None` until the write is acknowledged.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageRecord {
    pub message_id: Option<String>,
    pub client_key: ClientKey,
    pub sender_id: ParticipantId,
    pub recipient_id: ParticipantId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sender_name: Option<String>,
    pub sender_avatar: Option<String>,
}

impl MessageRecord {
    pub fn new(
        sender_id: ParticipantId,
        recipient_id: ParticipantId,
        content: String,
        sender_name: Option<String>,
        sender_avatar: Option<String>,
    ) -> Self {
        Self {
            message_id: None,
            client_key: ClientKey::generate(),
            sender_id,
            recipient_id,
            content,
            created_at: now(),
            sender_name,
            sender_avatar,
        }
    }

    pub fn document_ref(&self, channel: &ChannelId) -> Option<DocumentRef> {
        self.message_id.as_ref().map(|id| DocumentRef::Message {
            channel: channel.clone(),
            message_id: id.clone(),
        })
    }
}

/// One document of the `feedback` collection.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackRecord {
    pub name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(name: String, message: String) -> Self {
        Self {
            name,
            message,
            created_at: now(),
        }
    }
}

/// Address of a single document in the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DocumentRef {
    Message {
        channel: ChannelId,
        message_id: String,
    },
    Feedback(String),
}

impl DocumentRef {
    pub fn path(&self) -> String {
        match self {
            DocumentRef::Message {
                channel,
                message_id,
            } => format!("chats/{channel}/messages/{message_id}"),
            DocumentRef::Feedback(id) => format!("feedback/{id}"),
        }
    }
}

/// All-or-nothing group of writes, committed with
/// [`crate::libs::storage::storage_traits::MessageStore::commit_batch`].
#[derive(Debug, Default)]
pub struct WriteBatch {
    deletes: Vec<DocumentRef>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(&mut self, document: DocumentRef) -> &mut Self {
        self.deletes.push(document);
        self
    }

    pub fn deletes(&self) -> &[DocumentRef] {
        &self.deletes
    }

    pub fn len(&self) -> usize {
        self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty()
    }
}

/// Current time cut to the microseconds the store keeps, so a record reads
/// back with the timestamp it was written with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn new_document_id() -> String {
    Uuid::now_v7().simple().to_string()
}
