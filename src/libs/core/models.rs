use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use std::fmt;
use uuid::Uuid;

/// Opaque, immutable identifier of a user.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Fresh identifier for a new account. The simple form carries no
    /// channel delimiter, so channel ids built from it need no escaping.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl ToSql for ParticipantId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for ParticipantId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(ParticipantId::from)
    }
}

/// Partition key of a two-party conversation. Only built through
/// [`crate::libs::core::channel_identity::channel_id`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub(crate) String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ToSql for ChannelId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for ChannelId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(|s| ChannelId(s.to_owned()))
    }
}

/// Client generated idempotency key carried by every outgoing message so
/// the optimistic copy can be matched with the persisted one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClientKey {
    pub uuid: Uuid,
}

impl ClientKey {
    pub fn generate() -> Self {
        Self {
            uuid: Uuid::now_v7(),
        }
    }
}

impl ToSql for ClientKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.uuid.to_string()))
    }
}

impl FromSql for ClientKey {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let uuid_str = value.as_str()?;
        Uuid::parse_str(uuid_str)
            .map(|uuid| ClientKey { uuid })
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, uniffi::Enum)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "LIGHT",
            Theme::Dark => "DARK",
        }
    }

    pub fn parse(value: &str) -> Option<Theme> {
        match value {
            "LIGHT" => Some(Theme::Light),
            "DARK" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum DeliveryState {
    /// Shown optimistically, write not yet acknowledged.
    Pending,
    /// Write failed. Stays visible, no retry.
    Failed,
    /// Sourced from the authoritative stream.
    Synced,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum SessionState {
    Unopened,
    Subscribing,
    Live,
    Closed,
}

/// Where the front-end should land after the splash screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum StartRoute {
    Main,
    LogIn,
}

/// Signed-in user as remembered on the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: ParticipantId,
    pub email: String,
    pub name: String,
}

/// Image picked on the device, handed over as raw bytes.
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
