pub mod memory;
pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use self::memory::MemoryStore;
use self::models::{ContactMessage, Record, User};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: Record) -> Result<Record, StoreError>;

    /// Every record owned by `user_id`, newest `date` first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Record>, StoreError>;

    /// Like `list_for_user`, restricted to records with at least one metric.
    async fn list_with_metrics(&self, user_id: &str) -> Result<Vec<Record>, StoreError>;

    async fn find(&self, id: &str) -> Result<Option<Record>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the email is taken.
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn update(&self, user: &User) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn insert(&self, message: ContactMessage) -> Result<ContactMessage, StoreError>;
}

/// The three collections the service persists, behind whichever backend is configured.
#[derive(Clone)]
pub struct Stores {
    pub records: Arc<dyn RecordStore>,
    pub users: Arc<dyn UserStore>,
    pub contacts: Arc<dyn ContactStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            records: store.clone(),
            users: store.clone(),
            contacts: store,
        }
    }
}

pub(crate) fn sort_newest_first(records: &mut [Record]) {
    records.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
}
