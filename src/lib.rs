pub mod libs;

use crate::libs::config::ConfigError;
use crate::libs::core::channel_identity::ChannelError;
use crate::libs::core::models::ParticipantId;
use crate::libs::storage::storage_traits::StoreError;
use thiserror::Error;

pub use crate::libs::config::ClientConfig;
pub use crate::libs::core::channel_identity::channel_id;
pub use crate::libs::uniffi::client::{ChatClient, ChatHandle, MessageListener};

uniffi::setup_scaffolding!();

/// Errors surfaced to the front-end. The `Display` text is what the user
/// sees in an alert.
#[derive(Error, Debug, uniffi::Error)]
#[uniffi(flat_error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Email already exists. Please use a different email.")]
    EmailAlreadyExists,
    #[error("No user is signed in.")]
    NotSignedIn,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("This chat has been closed.")]
    SessionClosed,
    #[error("{0}")]
    Channel(#[from] ChannelError),
    #[error("An error occurred: {0}")]
    Storage(#[from] StoreError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("An error occurred: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

impl ChatError {
    pub(crate) fn validation(message: &str) -> Self {
        ChatError::Validation(message.to_string())
    }
}

#[uniffi::export]
pub fn init_logging(filter: String) {
    libs::logging::init_logging(&filter)
}

/// Channel id of the conversation between `a` and `b`.
#[uniffi::export]
pub fn channel_id_for(a: String, b: String) -> Result<String, ChatError> {
    let channel = channel_id(&ParticipantId::from(a), &ParticipantId::from(b))?;
    Ok(channel.as_str().to_string())
}
