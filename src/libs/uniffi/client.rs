use crate::libs::config::ClientConfig;
use crate::libs::core::account::{AccountService, SignUpForm};
use crate::libs::core::chat_session::{ChatParticipant, ChatSession};
use crate::libs::core::feedback::FeedbackService;
use crate::libs::core::models::{ParticipantId, SessionState, StartRoute, Theme};
use crate::libs::core::profile::{OwnProfile, PeerProfile, ProfileService, ProfileUpdate};
use crate::libs::core::settings::DeviceSettings;
use crate::libs::logging::init_logging;
use crate::libs::storage::database::storage_sqllite::SqliteStore;
use crate::libs::storage::storage_traits::{DocumentStore, LocalStore, ObjectStore};
use crate::libs::uniffi::models::{Message, User};
use crate::ChatError;
use std::sync::Arc;
use tracing::info;

/// Implemented by the front-end to receive the message list of an open
/// chat after every change.
#[uniffi::export(callback_interface)]
pub trait MessageListener: Send + Sync {
    fn on_messages(&self, messages: Vec<Message>);
}

#[derive(uniffi::Object)]
pub struct ChatClient {
    config: ClientConfig,
    store: Arc<dyn DocumentStore>,
    device: DeviceSettings,
    accounts: AccountService,
    profiles: ProfileService,
    feedback: FeedbackService,
}

impl ChatClient {
    /// Opens the backend and device databases named in `config`.
    pub fn with_config(config: ClientConfig) -> Result<Arc<Self>, ChatError> {
        init_logging(&config.log_filter);

        let backend = Arc::new(
            SqliteStore::open(&config.backend_path)?
                .with_blob_url_prefix(config.blob_url_prefix.clone()),
        );
        let device = Arc::new(SqliteStore::open(&config.device_path)?);
        Ok(Self::with_stores(config, backend.clone(), backend, device))
    }

    pub fn with_stores(
        config: ClientConfig,
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        local: Arc<dyn LocalStore>,
    ) -> Arc<Self> {
        let device = DeviceSettings::new(local);
        let accounts = AccountService::new(
            store.clone(),
            objects.clone(),
            device.clone(),
            config.bcrypt_cost,
        );
        let profiles = ProfileService::new(
            store.clone(),
            objects,
            device.clone(),
            config.bcrypt_cost,
        );
        let feedback = FeedbackService::new(store.clone());

        Arc::new(Self {
            config,
            store,
            device,
            accounts,
            profiles,
            feedback,
        })
    }

    fn open_session(
        &self,
        peer_id: &str,
        listener: Box<dyn MessageListener>,
    ) -> Result<ChatHandle, ChatError> {
        let own = self.profiles.load_profile()?;
        let peer = self.profiles.load_peer(peer_id)?;

        let me = ChatParticipant {
            id: ParticipantId::from(own.user_id),
            name: own.name,
            avatar: own.image_uri,
        };
        let my_id = me.id.clone();
        let observer_id = me.id.clone();
        let session = ChatSession::with_observer(
            self.store.clone(),
            &self.config,
            me,
            ParticipantId::from(peer.user_id),
            Box::new(move |rows| listener.on_messages(Message::from_rows(rows, &observer_id))),
        )?;
        session.open()?;

        Ok(ChatHandle { session, me: my_id })
    }
}

#[uniffi::export]
impl ChatClient {
    /// Loads the TOML config at `config_path`, or uses the defaults.
    #[uniffi::constructor]
    pub fn new(config_path: Option<String>) -> Result<Arc<Self>, ChatError> {
        let config = match config_path {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };
        Self::with_config(config)
    }

    pub fn sign_up(&self, form: SignUpForm) -> Result<String, ChatError> {
        Ok(self.accounts.sign_up(form)?.to_string())
    }

    pub fn log_in(&self, email: String, password: String) -> Result<User, ChatError> {
        Ok(self.accounts.log_in(&email, &password)?.into())
    }

    pub fn log_out(&self) -> Result<(), ChatError> {
        self.accounts.log_out()
    }

    pub fn current_user(&self) -> Result<User, ChatError> {
        Ok(self.accounts.current_user()?.into())
    }

    pub fn start_route(&self) -> Result<StartRoute, ChatError> {
        self.accounts.start_route()
    }

    pub fn peers(&self) -> Result<Vec<PeerProfile>, ChatError> {
        self.profiles.list_peers()
    }

    pub fn profile(&self) -> Result<OwnProfile, ChatError> {
        self.profiles.load_profile()
    }

    pub fn update_profile(&self, update: ProfileUpdate) -> Result<OwnProfile, ChatError> {
        self.profiles.update_profile(update)
    }

    pub fn submit_feedback(&self, name: String, message: String) -> Result<(), ChatError> {
        self.feedback.submit_feedback(&name, &message)
    }

    pub fn theme(&self) -> Result<Theme, ChatError> {
        Ok(self.device.theme()?)
    }

    pub fn toggle_theme(&self) -> Result<Theme, ChatError> {
        Ok(self.device.toggle_theme()?)
    }

    /// Opens the chat with `peer_id`. `listener` receives the first
    /// message list before this returns.
    pub fn open_chat(
        &self,
        peer_id: String,
        listener: Box<dyn MessageListener>,
    ) -> Result<Arc<ChatHandle>, ChatError> {
        let handle = self.open_session(&peer_id, listener)?;
        info!("chat with {peer_id} ready");
        Ok(Arc::new(handle))
    }
}

/// An open chat. Dropping the last reference closes it.
#[derive(uniffi::Object)]
pub struct ChatHandle {
    session: ChatSession,
    me: ParticipantId,
}

#[uniffi::export]
impl ChatHandle {
    pub fn channel_id(&self) -> String {
        self.session.channel().to_string()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn messages(&self) -> Vec<Message> {
        Message::from_rows(&self.session.rows(), &self.me)
    }

    /// Blank messages are ignored and yield `None`.
    pub fn send(&self, content: String) -> Result<Option<Message>, ChatError> {
        Ok(self
            .session
            .send(&content)?
            .map(|row| Message::from_row(row, &self.me)))
    }

    pub fn delete_chat(&self) -> Result<u32, ChatError> {
        let deleted = self.session.delete_chat()?;
        Ok(u32::try_from(deleted).unwrap_or(u32::MAX))
    }

    pub fn close(&self) {
        self.session.close()
    }
}
