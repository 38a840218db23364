use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User},
};

/// In-process [`UserStore`]. Enforces the same email uniqueness as the
/// Postgres schema and can simulate an unreachable database.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
    offline: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated database availability.
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Number of stored rows, regardless of simulated availability.
    pub fn len(&self) -> usize {
        match self.users.lock() {
            Ok(users) => users.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, User>>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        self.users
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.lock()?;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.lock()?;
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::DuplicateEmail);
        }
        let row = User {
            id: Uuid::new_v4(),
            email: user.email,
            password: user.password,
            name: user.name,
            image: user.image,
            email_verified: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn mark_email_verified(
        &self,
        id: Uuid,
        at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.lock()?;
        Ok(users.get_mut(&id).map(|u| {
            u.email_verified.get_or_insert(at);
            u.clone()
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn close(&self) {}
}
