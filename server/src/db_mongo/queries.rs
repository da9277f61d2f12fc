use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};

use super::MongoStore;
use crate::db::models::{ContactMessage, Record, User};
use crate::db::{ContactStore, RecordStore, StoreError, UserStore, sort_newest_first};

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(e: &MongoError) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(w)) if w.code == DUPLICATE_KEY
    )
}

fn store_error(e: MongoError) -> StoreError {
    match e.kind.as_ref() {
        ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_) => {
            StoreError::Serialization(e.to_string())
        }
        _ => StoreError::Backend(e.to_string()),
    }
}

impl MongoStore {
    async fn find_records(&self, filter: Document) -> Result<Vec<Record>, StoreError> {
        let cursor = self.records().find(filter).await.map_err(store_error)?;
        let mut records: Vec<Record> = cursor.try_collect().await.map_err(store_error)?;
        sort_newest_first(&mut records);
        Ok(records)
    }
}

#[async_trait]
impl RecordStore for MongoStore {
    async fn insert(&self, record: Record) -> Result<Record, StoreError> {
        self.records().insert_one(&record).await.map_err(store_error)?;
        Ok(record)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Record>, StoreError> {
        self.find_records(doc! { "user": user_id }).await
    }

    async fn list_with_metrics(&self, user_id: &str) -> Result<Vec<Record>, StoreError> {
        self.find_records(doc! { "user": user_id, "metrics.0": { "$exists": true } })
            .await
    }

    async fn find(&self, id: &str) -> Result<Option<Record>, StoreError> {
        self.records()
            .find_one(doc! { "_id": id })
            .await
            .map_err(store_error)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = self
            .records()
            .delete_one(doc! { "_id": id })
            .await
            .map_err(store_error)?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        match self.users().insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate(user.email)),
            Err(e) => Err(store_error(e)),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "email": email })
            .await
            .map_err(store_error)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.users()
            .find_one(doc! { "_id": id })
            .await
            .map_err(store_error)
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let result = self
            .users()
            .replace_one(doc! { "_id": &user.id }, user)
            .await
            .map_err(store_error)?;

        if result.matched_count == 0 {
            return Err(StoreError::Backend(format!("user {} does not exist", user.id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ContactStore for MongoStore {
    async fn insert(&self, message: ContactMessage) -> Result<ContactMessage, StoreError> {
        self.contacts().insert_one(&message).await.map_err(store_error)?;
        Ok(message)
    }
}
