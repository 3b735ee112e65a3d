use crate::libs::core::account::{upload_avatar, verify_password, FILL_ALL_FIELDS, PASSWORD_POLICY};
use crate::libs::core::models::{CurrentUser, ImageUpload, ParticipantId};
use crate::libs::core::settings::DeviceSettings;
use crate::libs::core::validation::is_valid_password;
use crate::libs::storage::records::UserRecord;
use crate::libs::storage::storage_traits::{DocumentStore, ObjectStore};
use crate::ChatError;
use std::sync::Arc;
use tracing::info;

pub const NEW_PASSWORDS_DO_NOT_MATCH: &str = "New passwords do not match.";
pub const CURRENT_PASSWORD_INCORRECT: &str = "Current password is incorrect.";

/// Another user as listed on the users screen. Carries no credential.
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct PeerProfile {
    pub user_id: String,
    pub name: String,
    pub image_uri: Option<String>,
}

impl From<UserRecord> for PeerProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            user_id: record.user_id.to_string(),
            name: record.name,
            image_uri: record.image_uri,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct OwnProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub image_uri: Option<String>,
}

impl From<UserRecord> for OwnProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            user_id: record.user_id.to_string(),
            name: record.name,
            email: record.email,
            mobile: record.mobile,
            image_uri: record.image_uri,
        }
    }
}

/// Edit-details form. Empty `new_password` keeps the current one; the email
/// address cannot be changed.
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct ProfileUpdate {
    pub name: String,
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
    pub image: Option<ImageUpload>,
}

impl ProfileUpdate {
    fn validate(&self) -> Result<(), ChatError> {
        if self.name.is_empty() || self.current_password.is_empty() {
            return Err(ChatError::validation(FILL_ALL_FIELDS));
        }
        if self.new_password != self.confirm_password {
            return Err(ChatError::validation(NEW_PASSWORDS_DO_NOT_MATCH));
        }
        if !self.new_password.is_empty() && !is_valid_password(&self.new_password) {
            return Err(ChatError::validation(PASSWORD_POLICY));
        }
        Ok(())
    }
}

pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    device: DeviceSettings,
    bcrypt_cost: u32,
}

impl ProfileService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        device: DeviceSettings,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            store,
            objects,
            device,
            bcrypt_cost,
        }
    }

    pub fn load_profile(&self) -> Result<OwnProfile, ChatError> {
        Ok(self.load_own_record()?.into())
    }

    /// Every registered user except the signed-in one.
    pub fn list_peers(&self) -> Result<Vec<PeerProfile>, ChatError> {
        let me = self.signed_in()?;
        Ok(self
            .store
            .list_users()?
            .into_iter()
            .filter(|user| user.email != me.email)
            .map(PeerProfile::from)
            .collect())
    }

    pub fn load_peer(&self, user_id: &str) -> Result<PeerProfile, ChatError> {
        self.store
            .load_user(&ParticipantId::from(user_id))?
            .map(PeerProfile::from)
            .ok_or_else(|| ChatError::NotFound(format!("users/{user_id}")))
    }

    pub fn update_profile(&self, update: ProfileUpdate) -> Result<OwnProfile, ChatError> {
        update.validate()?;

        let mut record = self.load_own_record()?;
        if !verify_password(&update.current_password, &record.password_hash) {
            return Err(ChatError::validation(CURRENT_PASSWORD_INCORRECT));
        }

        record.name = update.name;
        if let Some(image) = &update.image {
            // a failed upload keeps the previous avatar
            if let Some(url) = upload_avatar(self.objects.as_ref(), &record.user_id, image) {
                record.image_uri = Some(url);
            }
        }
        if !update.new_password.is_empty() {
            record.password_hash = bcrypt::hash(&update.new_password, self.bcrypt_cost)?;
        }

        self.store.update_user(&record)?;
        self.device.set_display_name(&record.name)?;

        info!("profile of {} updated", record.user_id);
        Ok(record.into())
    }

    fn signed_in(&self) -> Result<CurrentUser, ChatError> {
        self.device.current_user()?.ok_or(ChatError::NotSignedIn)
    }

    fn load_own_record(&self) -> Result<UserRecord, ChatError> {
        let me = self.signed_in()?;
        self.store
            .load_user(&me.user_id)?
            .ok_or_else(|| ChatError::NotFound(format!("users/{}", me.user_id)))
    }
}
