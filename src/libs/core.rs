pub mod account;
pub mod channel_identity;
pub mod chat_session;
pub mod feedback;
pub mod models;
pub mod profile;
pub mod settings;
pub mod validation;
