// Records handed across the FFI boundary to the front-end

use crate::libs::core::chat_session::MessageRow;
use crate::libs::core::models::{CurrentUser, DeliveryState, ParticipantId};

#[derive(Clone, Hash, Eq, PartialEq, uniffi::Record, Debug)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

impl From<CurrentUser> for User {
    fn from(user: CurrentUser) -> Self {
        Self {
            user_id: user.user_id.to_string(),
            email: user.email,
            name: user.name,
        }
    }
}

#[derive(Clone, Eq, PartialEq, uniffi::Record, Debug)]
pub struct Message {
    pub message_id: String,
    pub client_key: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_avatar: String,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub is_from_user: bool,
    pub delivery: DeliveryState,
}

impl Message {
    pub fn from_row(row: MessageRow, me: &ParticipantId) -> Self {
        Self {
            is_from_user: &row.sender.id == me,
            message_id: row.id,
            client_key: row.client_key.uuid.to_string(),
            sender_id: row.sender.id.to_string(),
            sender_name: row.sender.name,
            sender_avatar: row.sender.avatar,
            content: row.content,
            created_at: row.created_at.timestamp_millis(),
            delivery: row.delivery,
        }
    }

    pub fn from_rows(rows: &[MessageRow], me: &ParticipantId) -> Vec<Self> {
        rows.iter()
            .cloned()
            .map(|row| Message::from_row(row, me))
            .collect()
    }
}
