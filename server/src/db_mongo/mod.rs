pub mod queries;

use std::sync::Arc;

use anyhow::{Context, Result};
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};

use crate::db::Stores;
use crate::db::models::{ContactMessage, Record, User};

const RECORDS: &str = "records";
const USERS: &str = "users";
const CONTACTS: &str = "contacts";

/// Create MongoDB connection
pub async fn create_client(uri: &str) -> Result<Client> {
    let client = Client::with_uri_str(uri)
        .await
        .context("Failed to connect to MongoDB")?;

    // Ping to verify connection
    client
        .database("admin")
        .run_command(doc! {"ping": 1})
        .await
        .context("Failed to ping MongoDB")?;

    tracing::info!("Successfully connected to MongoDB");
    Ok(client)
}

/// Get database handle
pub fn get_database(client: &Client, db_name: &str) -> Database {
    client.database(db_name)
}

/// MongoDB backend for every storage trait.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = create_client(uri).await?;
        let store = Self {
            db: get_database(&client, db_name),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users()
            .create_index(unique_email)
            .await
            .context("Failed to create users.email index")?;

        let by_owner = IndexModel::builder().keys(doc! { "user": 1, "date": -1 }).build();
        self.records()
            .create_index(by_owner)
            .await
            .context("Failed to create records.user index")?;

        tracing::debug!("MongoDB indexes ensured");
        Ok(())
    }

    pub fn into_stores(self) -> Stores {
        let store = Arc::new(self);
        Stores {
            records: store.clone(),
            users: store.clone(),
            contacts: store,
        }
    }

    fn records(&self) -> Collection<Record> {
        self.db.collection(RECORDS)
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn contacts(&self) -> Collection<ContactMessage> {
        self.db.collection(CONTACTS)
    }
}
