//! Profile persistence: the storage seam and its encrypted SQLite implementation.

mod encrypted;

pub use encrypted::SecureStore;

use crate::error::StoreError;
use crate::profile::ProfileBundle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            email: None,
            created_at: Utc::now(),
            last_login: None,
        }
    }
}

pub trait ProfileStore: Send + Sync {
    /// Replace the user's bundle in one write.
    fn save_bundle(&self, bundle: &ProfileBundle) -> Result<(), StoreError>;
    /// Store the bundle and make `user` current, both or neither.
    fn commit_registration(&self, bundle: &ProfileBundle, user: &UserRecord) -> Result<(), StoreError>;
    fn load_bundle(&self, user: &str) -> Result<Option<ProfileBundle>, StoreError>;
    fn set_current_user(&self, user: &UserRecord) -> Result<(), StoreError>;
    fn current_user(&self) -> Result<Option<UserRecord>, StoreError>;
    fn clear_current_user(&self) -> Result<(), StoreError>;
}
