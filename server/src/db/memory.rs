use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::models::{ContactMessage, Record, User};
use super::{ContactStore, RecordStore, StoreError, UserStore, sort_newest_first};

/// Process-local backend used when no database is configured, and in tests.
/// Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Record>>,
    users: Mutex<HashMap<String, User>>,
    contacts: Mutex<Vec<ContactMessage>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contact_count(&self) -> usize {
        self.contacts.lock().await.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, record: Record) -> Result<Record, StoreError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Record>, StoreError> {
        let records = self.records.lock().await;
        let mut owned: Vec<Record> = records
            .values()
            .filter(|r| r.is_owned_by(user_id))
            .cloned()
            .collect();
        sort_newest_first(&mut owned);
        Ok(owned)
    }

    async fn list_with_metrics(&self, user_id: &str) -> Result<Vec<Record>, StoreError> {
        let mut owned = self.list_for_user(user_id).await?;
        owned.retain(|r| !r.metrics.is_empty());
        Ok(owned)
    }

    async fn find(&self, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.records.lock().await.remove(id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.lock().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(user.email));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().await.get(id).cloned())
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!("user {} does not exist", user.id))),
        }
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn insert(&self, message: ContactMessage) -> Result<ContactMessage, StoreError> {
        self.contacts.lock().await.push(message.clone());
        Ok(message)
    }
}
