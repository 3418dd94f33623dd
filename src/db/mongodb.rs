//! MongoDB connector.

use crate::db::Connector;
use crate::error::{DbError, DbResult};
use crate::models::connection::DEFAULT_MONGODB_DATABASE;
use crate::models::{Backend, MongoConfig};
use futures_util::TryStreamExt;
use ::mongodb::bson::{Bson, Document, doc};
use ::mongodb::options::ClientOptions;
use ::mongodb::results::{DeleteResult, InsertManyResult, InsertOneResult, UpdateResult};
use ::mongodb::{Client, Collection, Database};
use std::time::Duration;
use tracing::{debug, info};

/// Options for find.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    pub sort: Option<Document>,
}

pub struct MongoConnector {
    client: Client,
    database: Database,
    target: String,
}

impl MongoConnector {
    /// Connect and ping the selected database.
    pub async fn connect(config: &MongoConfig, connect_timeout: Duration) -> DbResult<Self> {
        let mut options = ClientOptions::parse(&config.url).await.map_err(|e| {
            DbError::invalid_input(format!("Invalid MongoDB URL {}: {}", config.masked_url(), e))
        })?;
        options.app_name = Some("db-mcp".to_string());
        options.server_selection_timeout = Some(connect_timeout);
        options.connect_timeout = Some(connect_timeout);

        let database_name = config
            .explicit_database()
            .map(str::to_string)
            .or_else(|| options.default_database.clone())
            .unwrap_or_else(|| DEFAULT_MONGODB_DATABASE.to_string());

        let client = Client::with_options(options)?;
        let database = client.database(&database_name);

        database.run_command(doc! { "ping": 1 }).await.map_err(|e| {
            DbError::connection(
                format!(
                    "MongoDB connection to {} failed: {}",
                    config.masked_url(),
                    e
                ),
                "Check the MongoDB URL and that the server is reachable",
            )
        })?;

        info!(url = %config.masked_url(), database = %database.name(), "MongoDB connected");
        Ok(Self {
            client,
            database,
            target: config.masked_url(),
        })
    }

    /// Masked URL of the server.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    fn collection(&self, name: &str) -> DbResult<Collection<Document>> {
        if name.trim().is_empty() {
            return Err(DbError::invalid_input("collection name is required"));
        }
        Ok(self.database.collection::<Document>(name))
    }

    pub async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> DbResult<Vec<Document>> {
        let coll = self.collection(collection)?;
        debug!(collection, "MongoDB find");

        let mut action = coll.find(filter);
        if let Some(limit) = options.limit {
            action = action.limit(limit);
        }
        if let Some(skip) = options.skip {
            action = action.skip(skip);
        }
        if let Some(sort) = options.sort {
            action = action.sort(sort);
        }
        let cursor = action.await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn find_one(&self, collection: &str, filter: Document) -> DbResult<Option<Document>> {
        let coll = self.collection(collection)?;
        Ok(coll.find_one(filter).await?)
    }

    pub async fn insert_one(&self, collection: &str, document: Document) -> DbResult<InsertOneResult> {
        let coll = self.collection(collection)?;
        Ok(coll.insert_one(document).await?)
    }

    pub async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> DbResult<InsertManyResult> {
        if documents.is_empty() {
            return Err(DbError::invalid_input("documents must not be empty"));
        }
        let coll = self.collection(collection)?;
        Ok(coll.insert_many(documents).await?)
    }

    pub async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DbResult<UpdateResult> {
        let coll = self.collection(collection)?;
        Ok(coll.update_one(filter, update).await?)
    }

    pub async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> DbResult<UpdateResult> {
        let coll = self.collection(collection)?;
        Ok(coll.update_many(filter, update).await?)
    }

    pub async fn delete_one(&self, collection: &str, filter: Document) -> DbResult<DeleteResult> {
        let coll = self.collection(collection)?;
        Ok(coll.delete_one(filter).await?)
    }

    pub async fn delete_many(&self, collection: &str, filter: Document) -> DbResult<DeleteResult> {
        let coll = self.collection(collection)?;
        Ok(coll.delete_many(filter).await?)
    }

    pub async fn count(&self, collection: &str, filter: Document) -> DbResult<u64> {
        let coll = self.collection(collection)?;
        Ok(coll.count_documents(filter).await?)
    }

    pub async fn list_collections(&self) -> DbResult<Vec<String>> {
        let mut names = self.database.list_collection_names().await?;
        names.sort();
        Ok(names)
    }
}

impl Connector for MongoConnector {
    fn backend(&self) -> Backend {
        Backend::MongoDb
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        info!(url = %self.target, "MongoDB disconnected");
    }
}

/// Ids of inserted documents, ordered by input position.
pub fn inserted_ids(result: &InsertManyResult) -> Vec<Bson> {
    let mut ids: Vec<_> = result.inserted_ids.iter().collect();
    ids.sort_by_key(|(idx, _)| **idx);
    ids.into_iter().map(|(_, id)| id.clone()).collect()
}
