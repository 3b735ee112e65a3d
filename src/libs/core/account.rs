use crate::libs::core::models::{CurrentUser, ImageUpload, ParticipantId, StartRoute};
use crate::libs::core::settings::DeviceSettings;
use crate::libs::core::validation::{all_filled, is_valid_password};
use crate::libs::storage::records::UserRecord;
use crate::libs::storage::storage_traits::{DocumentStore, ObjectStore, StoreError};
use crate::ChatError;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const FILL_ALL_FIELDS: &str = "Please fill all fields.";
pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match.";
pub const PASSWORD_POLICY: &str =
    "Password must be at least 8 characters and include a letter, a number and one of @$!%*?&.";

#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
    pub confirm_password: String,
    pub image: Option<ImageUpload>,
}

impl SignUpForm {
    fn validate(&self) -> Result<(), ChatError> {
        if !all_filled(&[
            self.name.as_str(),
            self.email.as_str(),
            self.mobile.as_str(),
            self.password.as_str(),
            self.confirm_password.as_str(),
        ]) {
            return Err(ChatError::validation(FILL_ALL_FIELDS));
        }
        if self.password != self.confirm_password {
            return Err(ChatError::validation(PASSWORDS_DO_NOT_MATCH));
        }
        if !is_valid_password(&self.password) {
            return Err(ChatError::validation(PASSWORD_POLICY));
        }
        Ok(())
    }
}

/// Registration, sign-in and sign-out against the `users` collection.
pub struct AccountService {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    device: DeviceSettings,
    bcrypt_cost: u32,
}

impl AccountService {
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

    pub fn sign_up(&self, form: SignUpForm) -> Result<ParticipantId, ChatError> {
        form.validate()?;

        if self.store.find_user_by_email(&form.email)?.is_some() {
            return Err(ChatError::EmailAlreadyExists);
        }

        let user_id = ParticipantId::generate();
        let image_uri = form
            .image
            .as_ref()
            .and_then(|image| upload_avatar(self.objects.as_ref(), &user_id, image));
        let password_hash = bcrypt::hash(&form.password, self.bcrypt_cost)?;

        let record = UserRecord::new(
            user_id.clone(),
            form.name,
            form.email,
            form.mobile,
            password_hash,
            image_uri,
        );
        self.store.create_user(&record).map_err(|err| match err {
            StoreError::AlreadyExists(_) => ChatError::EmailAlreadyExists,
            other => ChatError::Storage(other),
        })?;

        info!("registered user {user_id}");
        Ok(user_id)
    }

    /// Unknown email and wrong password are reported the same way.
    pub fn log_in(&self, email: &str, password: &str) -> Result<CurrentUser, ChatError> {
        if !all_filled(&[email, password]) {
            return Err(ChatError::validation(FILL_ALL_FIELDS));
        }

        let Some(user) = self.store.find_user_by_email(email)? else {
            warn!("sign-in rejected");
            return Err(ChatError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash) {
            warn!("sign-in rejected");
            return Err(ChatError::InvalidCredentials);
        }

        let current = CurrentUser {
            user_id: user.user_id,
            email: user.email,
            name: user.name,
        };
        self.device.remember_user(&current)?;

        info!("user {} signed in", current.user_id);
        Ok(current)
    }

    pub fn log_out(&self) -> Result<(), ChatError> {
        self.device.forget_all()?;
        info!("signed out");
        Ok(())
    }

    pub fn current_user(&self) -> Result<CurrentUser, ChatError> {
        self.device.current_user()?.ok_or(ChatError::NotSignedIn)
    }

    pub fn start_route(&self) -> Result<StartRoute, ChatError> {
        Ok(self.device.start_route()?)
    }
}

pub(crate) fn verify_password(password: &str, password_hash: &str) -> bool {
    match bcrypt::verify(password, password_hash) {
        Ok(valid) => valid,
        Err(err) => {
            error!("stored credential could not be checked: {err}");
            false
        }
    }
}

/// Uploads a profile image to `profile_images/{user}/{file}`. Failures are
/// logged and yield `None`.
pub(crate) fn upload_avatar(
    objects: &dyn ObjectStore,
    user_id: &ParticipantId,
    image: &ImageUpload,
) -> Option<String> {
    let file_name = image
        .file_name
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("avatar");
    let path = format!("profile_images/{user_id}/{file_name}");

    match objects.upload(&path, &image.bytes) {
        Ok(url) => Some(url),
        Err(err) => {
            error!("Error uploading image {path}: {err}");
            None
        }
    }
}
