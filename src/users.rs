//! User records kept in the metadata store.
//!
//! Users share the metadata store with the id counter but get their ids from
//! the store's own auto-increment, not from the content id allocator.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{Error, Result};
use crate::hooks::HookRegistry;
use crate::meta::{Document, MetaStore, Predicate, StoredDoc};

pub const MIN_PASSWORD_LEN: usize = 8;

const RECORD_TYPE: &str = "user";

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
}

impl User {
    fn from_doc(doc: &StoredDoc) -> Result<Self> {
        let text = |field: &str| -> Result<String> {
            doc.get(field)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::StoreUnavailable(format!("user record {} lacks '{}'", doc.id, field))
                })
        };
        Ok(Self {
            id: doc.id,
            username: text("username")?,
            password_hash: text("hashed_password")?,
            is_admin: doc.get("is_admin").and_then(Value::as_bool).unwrap_or(false),
        })
    }
}

/// Create a user. Fails with [`Error::InvalidInput`] if the password is too
/// short or the username is taken.
pub async fn create_user(
    store: &MetaStore,
    hooks: &HookRegistry,
    username: &str,
    password: &str,
    is_admin: bool,
) -> Result<User> {
    let username = username.trim();
    if username.is_empty() {
        return Err(Error::InvalidInput("username must not be empty".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidInput(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let password_hash = hash_password(password)?;
    let doc = match json!({
        "type": RECORD_TYPE,
        "username": username,
        "hashed_password": password_hash,
        "is_admin": is_admin,
    }) {
        Value::Object(map) => map,
        _ => Document::new(),
    };

    let id = store
        .insert_unique(&format!("user:{}", username), doc)
        .await?
        .ok_or_else(|| Error::InvalidInput(format!("user '{}' already exists", username)))?;

    let user = User {
        id,
        username: username.to_string(),
        password_hash,
        is_admin,
    };
    info!(id, username = %user.username, is_admin, "created user");
    hooks.on_user_create(&user);
    Ok(user)
}

pub async fn find_user(store: &MetaStore, username: &str) -> Result<Option<User>> {
    let pred = Predicate::new()
        .eq("type", RECORD_TYPE)
        .eq("username", username);
    store.get(&pred).await?.as_ref().map(User::from_doc).transpose()
}

pub async fn get_user(store: &MetaStore, id: i64) -> Result<Option<User>> {
    match store.get_by_id(id).await? {
        Some(doc) if doc.get("type").and_then(Value::as_str) == Some(RECORD_TYPE) => {
            User::from_doc(&doc).map(Some)
        }
        _ => Ok(None),
    }
}

pub fn verify_password(user: &User, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(&user.password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Argon2id PHC string (`$argon2id$v=19$...`) with a random salt.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::InvalidInput(format!("cannot hash password: {}", e)))
}
