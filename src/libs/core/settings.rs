use crate::libs::core::models::{CurrentUser, ParticipantId, StartRoute, Theme};
use crate::libs::storage::storage_traits::{LocalStore, StoreError};
use std::sync::Arc;
use tracing::{debug, warn};

pub const USER_ID_KEY: &str = "USERID";
pub const EMAIL_KEY: &str = "EMAIL";
pub const NAME_KEY: &str = "NAME";
pub const THEME_KEY: &str = "MODE";

/// Session and theme state kept on the device.
#[derive(Clone)]
pub struct DeviceSettings {
    local: Arc<dyn LocalStore>,
}

impl DeviceSettings {
    pub fn new(local: Arc<dyn LocalStore>) -> Self {
        Self { local }
    }

    pub fn current_user(&self) -> Result<Option<CurrentUser>, StoreError> {
        let Some(user_id) = self.local.get_item(USER_ID_KEY)? else {
            return Ok(None);
        };
        Ok(Some(CurrentUser {
            user_id: ParticipantId::from(user_id),
            email: self.local.get_item(EMAIL_KEY)?.unwrap_or_default(),
            name: self.local.get_item(NAME_KEY)?.unwrap_or_default(),
        }))
    }

    pub fn remember_user(&self, user: &CurrentUser) -> Result<(), StoreError> {
        self.local.set_item(NAME_KEY, &user.name)?;
        self.local.set_item(EMAIL_KEY, &user.email)?;
        self.local.set_item(USER_ID_KEY, user.user_id.as_str())?;
        Ok(())
    }

    pub fn set_display_name(&self, name: &str) -> Result<(), StoreError> {
        self.local.set_item(NAME_KEY, name)
    }

    /// Wipes everything stored on the device, theme included.
    pub fn forget_all(&self) -> Result<(), StoreError> {
        self.local.clear()
    }

    pub fn start_route(&self) -> Result<StartRoute, StoreError> {
        Ok(match self.local.get_item(USER_ID_KEY)? {
            Some(_) => StartRoute::Main,
            None => StartRoute::LogIn,
        })
    }

    pub fn theme(&self) -> Result<Theme, StoreError> {
        match self.local.get_item(THEME_KEY)? {
            None => Ok(Theme::default()),
            Some(value) => Ok(Theme::parse(&value).unwrap_or_else(|| {
                warn!("unknown theme {value:?} on device, falling back to light");
                Theme::default()
            })),
        }
    }

    pub fn toggle_theme(&self) -> Result<Theme, StoreError> {
        let theme = self.theme()?.toggled();
        self.local.set_item(THEME_KEY, theme.as_str())?;
        debug!("theme switched to {}", theme.as_str());
        Ok(theme)
    }
}
