//! In-memory user store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::{NewUser, StoreError, User, UserPatch, UserStore};

/// [`UserStore`] backed by a `BTreeMap`
///
/// IDs are assigned from a counter and never reused.
#[derive(Debug)]
pub struct MemoryUserStore {
    users: RwLock<BTreeMap<i64, User>>,
    next_id: AtomicI64,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored users
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let name = validate_name(&user.name)?;
        let email = validate_email(&user.email)?;

        let mut users = self.users.write();
        if email_taken(&users, &email, None) {
            return Err(StoreError::Conflict(email));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = User {
            id,
            name,
            email,
            age: user.age.unwrap_or(0),
            created_at: Utc::now(),
        };
        users.insert(id, created.clone());
        debug!(id, "User created");
        Ok(created)
    }

    fn apply(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let email = patch.email.as_deref().map(validate_email).transpose()?;

        let mut users = self.users.write();
        if let Some(ref email) = email {
            if email_taken(&users, email, Some(id)) {
                return Err(StoreError::Conflict(email.clone()));
            }
        }

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(age) = patch.age {
            user.age = age;
        }
        debug!(id, "User updated");
        Ok(Some(user.clone()))
    }
}

fn validate_name(name: &str) -> Result<String, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::Validation {
            field: "name",
            reason: "must not be empty".into(),
        });
    }
    Ok(name.to_string())
}

fn validate_email(email: &str) -> Result<String, StoreError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(StoreError::Validation {
            field: "email",
            reason: "must not be empty".into(),
        });
    }
    if !email.contains('@') {
        return Err(StoreError::Validation {
            field: "email",
            reason: format!("{email:?} is not an email address"),
        });
    }
    Ok(email.to_string())
}

fn email_taken(users: &BTreeMap<i64, User>, email: &str, except: Option<i64>) -> bool {
    users
        .values()
        .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
}

/// Log a store failure before handing it back
fn logged<T>(operation: &str, result: Result<T, StoreError>) -> Result<T, StoreError> {
    if let Err(ref e) = result {
        warn!(operation, error = %e, "User store operation failed");
    }
    result
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.read().values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn get(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        logged("create", self.insert(user))
    }

    async fn update(&self, id: i64, patch: UserPatch) -> Result<Option<User>, StoreError> {
        logged("update", self.apply(id, patch))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let removed = self.users.write().remove(&id).is_some();
        debug!(id, removed, "User delete");
        Ok(removed)
    }
}
