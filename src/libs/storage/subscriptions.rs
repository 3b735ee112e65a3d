use crate::libs::core::models::ChannelId;
use crate::libs::storage::records::MessageRecord;
use crate::libs::storage::storage_traits::StoreError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::debug;

pub type SnapshotResult = Result<Vec<MessageRecord>, StoreError>;
pub type SnapshotListener = Box<dyn Fn(SnapshotResult) + Send + Sync>;

type SharedListener = Arc<dyn Fn(SnapshotResult) + Send + Sync>;

/// Live listeners per channel. Stores own one and push every committed
/// change of a channel through [`ListenerRegistry::dispatch`].
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<ChannelId, Vec<(u64, SharedListener)>>>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(
        self: &Arc<Self>,
        channel: &ChannelId,
        listener: SnapshotListener,
    ) -> ListenerRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock()
            .entry(channel.clone())
            .or_default()
            .push((id, Arc::from(listener)));
        debug!("listener {id} attached to {channel}");

        ListenerRegistration {
            registry: Arc::downgrade(self),
            channel: channel.clone(),
            id,
            attached: true,
        }
    }

    pub fn has_listeners(&self, channel: &ChannelId) -> bool {
        self.lock().get(channel).is_some_and(|l| !l.is_empty())
    }

    pub fn listener_count(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    /// Delivers `snapshot` to one listener only, used for the initial
    /// result set right after registration.
    pub fn deliver_to(&self, registration: &ListenerRegistration, snapshot: SnapshotResult) {
        let listener = self.lock().get(&registration.channel).and_then(|listeners| {
            listeners
                .iter()
                .find(|(id, _)| *id == registration.id)
                .map(|(_, l)| l.clone())
        });
        if let Some(listener) = listener {
            listener(snapshot);
        }
    }

    /// Delivers `snapshot` to every listener of `channel`. Listeners run
    /// without the registry lock held, so they may unsubscribe.
    pub fn dispatch(&self, channel: &ChannelId, snapshot: SnapshotResult) {
        let listeners: Vec<SharedListener> = match self.lock().get(channel) {
            Some(listeners) => listeners.iter().map(|(_, l)| l.clone()).collect(),
            None => return,
        };

        match snapshot {
            Ok(records) => {
                for listener in listeners {
                    listener(Ok(records.clone()));
                }
            }
            Err(err) => {
                let message = err.to_string();
                for listener in listeners {
                    listener(Err(StoreError::Subscription(message.clone())));
                }
            }
        }
    }

    fn remove(&self, channel: &ChannelId, id: u64) {
        let mut listeners = self.lock();
        if let Some(entries) = listeners.get_mut(channel) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                listeners.remove(channel);
            }
        }
        debug!("listener {id} detached from {channel}");
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ChannelId, Vec<(u64, SharedListener)>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle of a live subscription. Dropping it detaches the listener.
pub struct ListenerRegistration {
    registry: Weak<ListenerRegistry>,
    channel: ChannelId,
    id: u64,
    attached: bool,
}

impl ListenerRegistration {
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.channel, self.id);
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.detach();
    }
}
