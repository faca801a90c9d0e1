//! Users
//!
//! Record types and the store trait behind the user-management routes. The
//! store is an opaque CRUD collaborator; [`MemoryUserStore`] is the bundled
//! implementation.

mod memory;

pub use memory::MemoryUserStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned ID, starting at 1
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email address, unique across users
    pub email: String,
    /// Age in years
    pub age: i32,
    /// When the user was created
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a user
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Age, defaults to 0
    #[serde(default)]
    pub age: Option<i32>,
}

impl NewUser {
    /// New user with no age
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            age: None,
        }
    }
}

/// Partial update; `None` fields are left unchanged
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New email
    #[serde(default)]
    pub email: Option<String>,
    /// New age
    #[serde(default)]
    pub age: Option<i32>,
}

/// User store failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A field failed validation
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Offending field
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Email already belongs to another user
    #[error("email {0} is already in use")]
    Conflict(String),

    /// Backing storage failed
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// CRUD store for users
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users ordered by name
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// One user by ID
    async fn get(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Create a user, assigning its ID
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Apply a patch; `None` if no such user
    async fn update(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError>;

    /// Delete a user; returns whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}
