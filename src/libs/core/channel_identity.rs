use crate::libs::core::models::{ChannelId, ParticipantId};
use thiserror::Error;

pub const CHANNEL_DELIMITER: char = '-';
const ESCAPE: char = '\\';

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChannelError {
    #[error("participant identifier must not be empty")]
    EmptyParticipant,
    #[error("a channel needs two distinct participants, got {0} twice")]
    SelfChannel(ParticipantId),
}

/// Derives the channel shared by two participants:
/// `min(a, b) + "-" + max(a, b)` under lexicographic ordering.
///
/// Swapping the arguments yields the same id. The delimiter and the escape
/// character are escaped inside each identifier so two distinct pairs can
/// never produce the same key, e.g. `("a-b", "c")` and `("a", "b-c")`.
/// Identifiers without either character are joined verbatim, so
/// `("alice", "bob")` gives `"alice-bob"`.
pub fn channel_id(a: &ParticipantId, b: &ParticipantId) -> Result<ChannelId, ChannelError> {
    if a.is_empty() || b.is_empty() {
        return Err(ChannelError::EmptyParticipant);
    }
    if a == b {
        return Err(ChannelError::SelfChannel(a.clone()));
    }

    let (low, high) = if a.as_str() < b.as_str() { (a, b) } else { (b, a) };

    let mut key = escape(low.as_str());
    key.push(CHANNEL_DELIMITER);
    key.push_str(&escape(high.as_str()));
    Ok(ChannelId(key))
}

fn escape(id: &str) -> String {
    let mut escaped = String::with_capacity(id.len());
    for ch in id.chars() {
        if ch == ESCAPE || ch == CHANNEL_DELIMITER {
            escaped.push(ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}
