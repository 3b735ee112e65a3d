mod common;

use crate::common::*;
use duo_chat_lib::libs::core::account::{
    AccountService, FILL_ALL_FIELDS, PASSWORDS_DO_NOT_MATCH, PASSWORD_POLICY,
};
use duo_chat_lib::libs::core::feedback::FeedbackService;
use duo_chat_lib::libs::core::models::{ImageUpload, StartRoute, Theme};
use duo_chat_lib::libs::core::profile::{
    ProfileService, ProfileUpdate, CURRENT_PASSWORD_INCORRECT, NEW_PASSWORDS_DO_NOT_MATCH,
};
use duo_chat_lib::libs::core::settings::{DeviceSettings, THEME_KEY};
use duo_chat_lib::libs::storage::storage_traits::{
    LocalStore, ObjectStore, StoreError, UserStore,
};
use duo_chat_lib::ChatError;
use std::sync::Arc;

struct Services {
    env: TestEnv,
    device: DeviceSettings,
    accounts: AccountService,
    profiles: ProfileService,
}

fn services() -> Services {
    services_with_objects(None)
}

fn services_with_objects(objects: Option<Arc<dyn ObjectStore>>) -> Services {
    let env = test_env();
    let objects = objects.unwrap_or_else(|| env.backend.clone() as Arc<dyn ObjectStore>);
    let device = DeviceSettings::new(env.device.clone());
    let accounts = AccountService::new(
        env.backend.clone(),
        objects.clone(),
        device.clone(),
        env.config.bcrypt_cost,
    );
    let profiles = ProfileService::new(
        env.backend.clone(),
        objects,
        device.clone(),
        env.config.bcrypt_cost,
    );
    Services {
        env,
        device,
        accounts,
        profiles,
    }
}

struct BrokenObjects;

impl ObjectStore for BrokenObjects {
    fn upload(&self, path: &str, _bytes: &[u8]) -> Result<String, StoreError> {
        Err(StoreError::Unavailable(path.to_string()))
    }

    fn fetch(&self, _path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(None)
    }
}

fn validation_message(result: Result<impl std::fmt::Debug, ChatError>) -> String {
    match result {
        Err(ChatError::Validation(message)) => message,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

fn update(name: &str, current: &str, new: &str, confirm: &str) -> ProfileUpdate {
    ProfileUpdate {
        name: name.to_string(),
        current_password: current.to_string(),
        new_password: new.to_string(),
        confirm_password: confirm.to_string(),
        image: None,
    }
}

#[test]
fn test_sign_up_stores_hashed_password() {
    let s = services();
    let user_id = s
        .accounts
        .sign_up(sign_up_form("Alice", "alice@example.com"))
        .expect("Sign-up should succeed");

    let stored = s.env.backend.load_user(&user_id).unwrap().unwrap();
    assert_eq!(stored.email, "alice@example.com");
    assert_ne!(stored.password_hash, PASSWORD);
    assert!(bcrypt::verify(PASSWORD, &stored.password_hash).unwrap());
    assert!(!user_id.as_str().contains('-'));
}

#[test]
fn test_sign_up_validation() {
    let s = services();

    let mut form = sign_up_form("Alice", "alice@example.com");
    form.mobile.clear();
    assert_eq!(validation_message(s.accounts.sign_up(form)), FILL_ALL_FIELDS);

    let mut form = sign_up_form("Alice", "alice@example.com");
    form.confirm_password = "Passw0rd?".to_string();
    assert_eq!(
        validation_message(s.accounts.sign_up(form)),
        PASSWORDS_DO_NOT_MATCH
    );

    for weak in ["short1!", "password1", "Password!!", "Passw0rd#"] {
        let mut form = sign_up_form("Alice", "alice@example.com");
        form.password = weak.to_string();
        form.confirm_password = weak.to_string();
        assert_eq!(
            validation_message(s.accounts.sign_up(form)),
            PASSWORD_POLICY,
            "{weak} should be rejected"
        );
    }

    assert!(s.env.backend.list_users().unwrap().is_empty());
}

#[test]
fn test_duplicate_email_is_rejected() {
    let s = services();
    s.accounts
        .sign_up(sign_up_form("Alice", "alice@example.com"))
        .unwrap();

    let result = s.accounts.sign_up(sign_up_form("Other", "alice@example.com"));
    assert!(matches!(result, Err(ChatError::EmailAlreadyExists)));
}

#[test]
fn test_sign_up_with_avatar() {
    let s = services();
    let mut form = sign_up_form("Alice", "alice@example.com");
    form.image = Some(ImageUpload {
        file_name: "/tmp/picked/me.png".to_string(),
        bytes: vec![9, 9, 9],
    });

    let user_id = s.accounts.sign_up(form).unwrap();
    let stored = s.env.backend.load_user(&user_id).unwrap().unwrap();

    let expected_path = format!("profile_images/{user_id}/me.png");
    assert!(stored.image_uri.unwrap().contains(&expected_path));
    assert_eq!(
        s.env.backend.fetch(&expected_path).unwrap(),
        Some(vec![9, 9, 9])
    );
}

#[test]
fn test_sign_up_survives_failed_avatar_upload() {
    let s = services_with_objects(Some(Arc::new(BrokenObjects)));
    let mut form = sign_up_form("Alice", "alice@example.com");
    form.image = Some(ImageUpload {
        file_name: "me.png".to_string(),
        bytes: vec![1],
    });

    let user_id = s.accounts.sign_up(form).unwrap();
    let stored = s.env.backend.load_user(&user_id).unwrap().unwrap();
    assert_eq!(stored.image_uri, None);
}

#[test]
fn test_log_in_remembers_user() {
    let s = services();
    let user_id = s
        .accounts
        .sign_up(sign_up_form("Alice", "alice@example.com"))
        .unwrap();
    assert_eq!(s.accounts.start_route().unwrap(), StartRoute::LogIn);

    let current = s.accounts.log_in("alice@example.com", PASSWORD).unwrap();

    assert_eq!(current.user_id, user_id);
    assert_eq!(current.name, "Alice");
    assert_eq!(s.env.device.get_item("USERID").unwrap(), Some(user_id.to_string()));
    assert_eq!(
        s.env.device.get_item("EMAIL").unwrap(),
        Some("alice@example.com".to_string())
    );
    assert_eq!(s.env.device.get_item("NAME").unwrap(), Some("Alice".to_string()));
    assert_eq!(s.accounts.start_route().unwrap(), StartRoute::Main);
}

#[test]
fn test_log_in_does_not_reveal_which_part_was_wrong() {
    let s = services();
    s.accounts
        .sign_up(sign_up_form("Alice", "alice@example.com"))
        .unwrap();

    let unknown = s.accounts.log_in("nobody@example.com", PASSWORD).unwrap_err();
    let wrong = s
        .accounts
        .log_in("alice@example.com", "Wr0ngpass!")
        .unwrap_err();

    assert!(matches!(unknown, ChatError::InvalidCredentials));
    assert!(matches!(wrong, ChatError::InvalidCredentials));
    assert_eq!(unknown.to_string(), wrong.to_string());
    assert_eq!(s.env.device.get_item("USERID").unwrap(), None);
}

#[test]
fn test_log_in_requires_both_fields() {
    let s = services();
    assert_eq!(
        validation_message(s.accounts.log_in("", PASSWORD)),
        FILL_ALL_FIELDS
    );
}

#[test]
fn test_log_out_clears_device() {
    let s = services();
    s.accounts
        .sign_up(sign_up_form("Alice", "alice@example.com"))
        .unwrap();
    s.accounts.log_in("alice@example.com", PASSWORD).unwrap();
    s.device.toggle_theme().unwrap();

    s.accounts.log_out().unwrap();

    assert!(matches!(
        s.accounts.current_user(),
        Err(ChatError::NotSignedIn)
    ));
    assert_eq!(s.accounts.start_route().unwrap(), StartRoute::LogIn);
    assert_eq!(s.device.theme().unwrap(), Theme::Light);
}

#[test]
fn test_theme_toggle_and_fallback() {
    let s = services();
    assert_eq!(s.device.theme().unwrap(), Theme::Light);

    assert_eq!(s.device.toggle_theme().unwrap(), Theme::Dark);
    assert_eq!(s.env.device.get_item(THEME_KEY).unwrap(), Some("DARK".to_string()));
    assert_eq!(s.device.toggle_theme().unwrap(), Theme::Light);

    s.env.device.set_item(THEME_KEY, "SEPIA").unwrap();
    assert_eq!(s.device.theme().unwrap(), Theme::Light);
}

#[test]
fn test_list_peers_excludes_self() {
    let s = services();
    s.accounts
        .sign_up(sign_up_form("Alice", "alice@example.com"))
        .unwrap();
    let bob = s
        .accounts
        .sign_up(sign_up_form("Bob", "bob@example.com"))
        .unwrap();

    assert!(matches!(s.profiles.list_peers(), Err(ChatError::NotSignedIn)));

    s.accounts.log_in("alice@example.com", PASSWORD).unwrap();
    let peers = s.profiles.list_peers().unwrap();

    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].user_id, bob.to_string());
    assert_eq!(peers[0].name, "Bob");
}

#[test]
fn test_update_profile_changes_name_and_password() {
    let s = services();
    s.accounts
        .sign_up(sign_up_form("Alice", "alice@example.com"))
        .unwrap();
    s.accounts.log_in("alice@example.com", PASSWORD).unwrap();

    let profile = s
        .profiles
        .update_profile(update("Alice L", PASSWORD, "N3wpass!x", "N3wpass!x"))
        .unwrap();

    assert_eq!(profile.name, "Alice L");
    assert_eq!(profile.email, "alice@example.com");
    assert_eq!(s.env.device.get_item("NAME").unwrap(), Some("Alice L".to_string()));

    s.accounts.log_out().unwrap();
    assert!(matches!(
        s.accounts.log_in("alice@example.com", PASSWORD),
        Err(ChatError::InvalidCredentials)
    ));
    assert!(s.accounts.log_in("alice@example.com", "N3wpass!x").is_ok());
}

#[test]
fn test_update_profile_keeps_password_when_left_blank() {
    let s = services();
    s.accounts
        .sign_up(sign_up_form("Alice", "alice@example.com"))
        .unwrap();
    s.accounts.log_in("alice@example.com", PASSWORD).unwrap();

    s.profiles
        .update_profile(update("Alice L", PASSWORD, "", ""))
        .unwrap();

    s.accounts.log_out().unwrap();
    assert!(s.accounts.log_in("alice@example.com", PASSWORD).is_ok());
}

#[test]
fn test_update_profile_validation() {
    let s = services();
    s.accounts
        .sign_up(sign_up_form("Alice", "alice@example.com"))
        .unwrap();
    s.accounts.log_in("alice@example.com", PASSWORD).unwrap();

    assert_eq!(
        validation_message(s.profiles.update_profile(update("", PASSWORD, "", ""))),
        FILL_ALL_FIELDS
    );
    assert_eq!(
        validation_message(s.profiles.update_profile(update("Alice", "", "", ""))),
        FILL_ALL_FIELDS
    );
    assert_eq!(
        validation_message(s.profiles.update_profile(update(
            "Alice",
            PASSWORD,
            "N3wpass!x",
            "N3wpass!y"
        ))),
        NEW_PASSWORDS_DO_NOT_MATCH
    );
    assert_eq!(
        validation_message(s.profiles.update_profile(update("Alice", PASSWORD, "weak", "weak"))),
        PASSWORD_POLICY
    );
    assert_eq!(
        validation_message(s.profiles.update_profile(update("Alice", "Wr0ngpass!", "", ""))),
        CURRENT_PASSWORD_INCORRECT
    );

    assert_eq!(s.profiles.load_profile().unwrap().name, "Alice");
}

#[test]
fn test_update_profile_keeps_avatar_when_upload_fails() {
    let s = services_with_objects(Some(Arc::new(BrokenObjects)));
    let user_id = s
        .accounts
        .sign_up(sign_up_form("Alice", "alice@example.com"))
        .unwrap();

    let mut record = s.env.backend.load_user(&user_id).unwrap().unwrap();
    record.image_uri = Some("blob://old.png".to_string());
    s.env.backend.update_user(&record).unwrap();

    s.accounts.log_in("alice@example.com", PASSWORD).unwrap();
    let mut change = update("Alice", PASSWORD, "", "");
    change.image = Some(ImageUpload {
        file_name: "new.png".to_string(),
        bytes: vec![4, 2],
    });

    let profile = s.profiles.update_profile(change).unwrap();
    assert_eq!(profile.image_uri, Some("blob://old.png".to_string()));
}

#[test]
fn test_feedback_submission() {
    let env = test_env();
    let feedback = FeedbackService::new(env.backend.clone());

    assert_eq!(
        validation_message(feedback.submit_feedback("", "Great app")),
        FILL_ALL_FIELDS
    );
    assert!(feedback.submit_feedback("Alice", "Great app").is_ok());

    let scripted = ScriptedStore::new(env.backend.clone());
    scripted.fail_writes(true);
    let failing = FeedbackService::new(scripted);
    assert!(matches!(
        failing.submit_feedback("Alice", "Great app"),
        Err(ChatError::Storage(_))
    ));
}
