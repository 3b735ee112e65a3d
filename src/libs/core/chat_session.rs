use crate::libs::config::ClientConfig;
use crate::libs::core::channel_identity::channel_id;
use crate::libs::core::models::{ChannelId, ClientKey, DeliveryState, ParticipantId, SessionState};
use crate::libs::storage::records::{MessageRecord, WriteBatch};
use crate::libs::storage::storage_traits::DocumentStore;
use crate::libs::storage::subscriptions::{ListenerRegistration, SnapshotResult};
use crate::ChatError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Called with the full row list after every change of the view.
pub type ViewObserver = Box<dyn Fn(&[MessageRow]) + Send + Sync>;

/// The signed-in side of a conversation. Name and avatar are stamped on
/// every outgoing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatParticipant {
    pub id: ParticipantId,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageSender {
    pub id: ParticipantId,
    pub name: String,
    pub avatar: String,
}

/// One rendered message. `id` is the document id once persisted, the
/// client key before that.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRow {
    pub id: String,
    pub client_key: ClientKey,
    pub sender: MessageSender,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub delivery: DeliveryState,
}

#[derive(Debug)]
struct ViewState {
    state: SessionState,
    authoritative: Vec<MessageRow>,
    pending: Vec<MessageRow>,
}

impl ViewState {
    /// Newest first. On equal timestamps pending rows come first.
    fn merged(&self) -> Vec<MessageRow> {
        let mut rows: Vec<MessageRow> = self
            .pending
            .iter()
            .chain(self.authoritative.iter())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

/// State shared between the session and its store listener.
struct MessageView {
    channel: ChannelId,
    state: Mutex<ViewState>,
    registration: Mutex<Option<ListenerRegistration>>,
    observer: Option<ViewObserver>,
    unknown_sender_name: String,
    default_avatar: String,
}

impl MessageView {
    fn row_from_record(&self, record: &MessageRecord, delivery: DeliveryState) -> MessageRow {
        MessageRow {
            id: record
                .message_id
                .clone()
                .unwrap_or_else(|| record.client_key.uuid.to_string()),
            client_key: record.client_key,
            sender: MessageSender {
                id: record.sender_id.clone(),
                name: record
                    .sender_name
                    .clone()
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| self.unknown_sender_name.clone()),
                avatar: record
                    .sender_avatar
                    .clone()
                    .filter(|avatar| !avatar.is_empty())
                    .unwrap_or_else(|| self.default_avatar.clone()),
            },
            content: record.content.clone(),
            created_at: record.created_at,
            delivery,
        }
    }

    fn apply_snapshot(&self, snapshot: SnapshotResult) {
        match snapshot {
            Ok(records) => {
                let rows = {
                    let mut view = lock(&self.state);
                    if view.state == SessionState::Closed {
                        return;
                    }
                    let delivered: HashSet<ClientKey> =
                        records.iter().map(|record| record.client_key).collect();
                    view.authoritative = records
                        .iter()
                        .map(|record| self.row_from_record(record, DeliveryState::Synced))
                        .collect();
                    view.pending
                        .retain(|row| !delivered.contains(&row.client_key));
                    view.state = SessionState::Live;
                    view.merged()
                };
                debug!("{} rows in {}", rows.len(), self.channel);
                self.notify(&rows);
            }
            Err(err) => {
                warn!("message stream of {} failed: {err}", self.channel);
                self.shut_down();
            }
        }
    }

    /// Moves to `Closed` and detaches from the store. The last delivered
    /// rows stay readable.
    fn shut_down(&self) {
        lock(&self.state).state = SessionState::Closed;
        let registration = lock(&self.registration).take();
        if let Some(registration) = registration {
            registration.unsubscribe();
        }
    }

    fn notify(&self, rows: &[MessageRow]) {
        if let Some(observer) = &self.observer {
            observer(rows);
        }
    }

    fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut ViewState),
    {
        let rows = {
            let mut view = lock(&self.state);
            change(&mut view);
            view.merged()
        };
        self.notify(&rows);
    }
}

/// Live view of the conversation between the signed-in user and one peer.
///
/// Snapshots from the store replace the authoritative rows. Sent messages
/// show up at once as `Pending` rows and are dropped from the pending set
/// as soon as a snapshot carries their client key.
///
/// No lock is held while the store is called: stores may deliver
/// snapshots from inside `subscribe_messages`, `add_message` or
/// `commit_batch`.
pub struct ChatSession {
    store: Arc<dyn DocumentStore>,
    me: ChatParticipant,
    peer: ParticipantId,
    view: Arc<MessageView>,
}

impl ChatSession {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: &ClientConfig,
        me: ChatParticipant,
        peer: ParticipantId,
    ) -> Result<Self, ChatError> {
        Self::build(store, config, me, peer, None)
    }

    pub fn with_observer(
        store: Arc<dyn DocumentStore>,
        config: &ClientConfig,
        me: ChatParticipant,
        peer: ParticipantId,
        observer: ViewObserver,
    ) -> Result<Self, ChatError> {
        Self::build(store, config, me, peer, Some(observer))
    }

    fn build(
        store: Arc<dyn DocumentStore>,
        config: &ClientConfig,
        me: ChatParticipant,
        peer: ParticipantId,
        observer: Option<ViewObserver>,
    ) -> Result<Self, ChatError> {
        let channel = channel_id(&me.id, &peer)?;
        let view = Arc::new(MessageView {
            channel,
            state: Mutex::new(ViewState {
                state: SessionState::Unopened,
                authoritative: Vec::new(),
                pending: Vec::new(),
            }),
            registration: Mutex::new(None),
            observer,
            unknown_sender_name: config.unknown_sender_name.clone(),
            default_avatar: config.default_avatar.clone(),
        });

        Ok(Self {
            store,
            me,
            peer,
            view,
        })
    }

    pub fn channel(&self) -> &ChannelId {
        &self.view.channel
    }

    pub fn peer(&self) -> &ParticipantId {
        &self.peer
    }

    pub fn state(&self) -> SessionState {
        lock(&self.view.state).state
    }

    pub fn rows(&self) -> Vec<MessageRow> {
        lock(&self.view.state).merged()
    }

    /// Subscribes to the channel. Opening a session that is already open
    /// does nothing; a closed session cannot be reopened.
    pub fn open(&self) -> Result<(), ChatError> {
        {
            let mut view = lock(&self.view.state);
            match view.state {
                SessionState::Unopened => view.state = SessionState::Subscribing,
                SessionState::Subscribing | SessionState::Live => return Ok(()),
                SessionState::Closed => return Err(ChatError::SessionClosed),
            }
        }

        let view = Arc::clone(&self.view);
        let subscribed = self.store.subscribe_messages(
            self.channel(),
            Box::new(move |snapshot| view.apply_snapshot(snapshot)),
        );
        let registration = match subscribed {
            Ok(registration) => registration,
            Err(err) => {
                error!("could not subscribe to {}: {err}", self.channel());
                lock(&self.view.state).state = SessionState::Closed;
                return Err(err.into());
            }
        };

        // the view may have closed since subscribing, through a failed
        // initial snapshot or a concurrent close
        let stale = {
            let view = lock(&self.view.state);
            if view.state == SessionState::Closed {
                Some(registration)
            } else {
                *lock(&self.view.registration) = Some(registration);
                None
            }
        };
        if let Some(registration) = stale {
            registration.unsubscribe();
            return Ok(());
        }

        info!("chat {} opened", self.channel());
        Ok(())
    }

    /// Shows the message right away, then persists it. Blank content is
    /// ignored. A failed write is logged and the row stays visible as
    /// `Failed`.
    ///
    /// Returns the row as the view holds it once the write returns: `Synced`
    /// if the store has already pushed it back, else `Pending` or `Failed`.
    pub fn send(&self, content: &str) -> Result<Option<MessageRow>, ChatError> {
        if content.trim().is_empty() {
            return Ok(None);
        }
        if self.state() == SessionState::Closed {
            return Err(ChatError::SessionClosed);
        }

        let record = MessageRecord::new(
            self.me.id.clone(),
            self.peer.clone(),
            content.to_string(),
            Some(self.me.name.clone()),
            self.me.avatar.clone(),
        );
        let key = record.client_key;
        let mut row = self.view.row_from_record(&record, DeliveryState::Pending);
        let pending = row.clone();
        self.view.update(|view| view.pending.push(pending));

        match self.store.add_message(self.channel(), &record) {
            Ok(document) => debug!("message stored at {}", document.path()),
            Err(err) => {
                error!("Error sending message: {err}");
                self.view.update(|view| {
                    if let Some(failed) = view.pending.iter_mut().find(|r| r.client_key == key) {
                        failed.delivery = DeliveryState::Failed;
                    }
                });
                row.delivery = DeliveryState::Failed;
            }
        }

        let current = {
            let view = lock(&self.view.state);
            view.pending
                .iter()
                .chain(view.authoritative.iter())
                .find(|r| r.client_key == key)
                .cloned()
        };
        Ok(Some(current.unwrap_or(row)))
    }

    /// Deletes every message currently in the channel in one batch and
    /// clears the view. Messages written after the enumeration survive.
    pub fn delete_chat(&self) -> Result<usize, ChatError> {
        let records = self.store.query_messages(self.channel())?;

        let mut batch = WriteBatch::new();
        for record in &records {
            if let Some(document) = record.document_ref(self.channel()) {
                batch.delete(document);
            }
        }
        let deleted = batch.len();
        if let Err(err) = self.store.commit_batch(batch) {
            error!("Error deleting chat {}: {err}", self.channel());
            return Err(err.into());
        }

        self.view.update(|view| {
            view.authoritative.clear();
            view.pending.clear();
        });
        info!("deleted {deleted} messages from {}", self.channel());
        Ok(deleted)
    }

    /// Detaches from the store. Safe to call more than once.
    pub fn close(&self) {
        if self.state() != SessionState::Closed {
            debug!("closing chat {}", self.channel());
        }
        self.view.shut_down();
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
