//! MongoDB tools.
//!
//! Filters, documents and updates arrive as JSON objects and are converted to
//! BSON (Extended JSON markers such as `$oid` are honored). Results go back as
//! relaxed Extended JSON.

use crate::db::types::{bson_to_json, document_to_json, json_to_document};
use crate::db::{ConnectorRegistry, FindOptions, MongoConnector};
use crate::error::DbResult;
use crate::models::MongoConfig;
use crate::security::{AccessPolicy, OperationKind};
use crate::tools::DisconnectOutput;
use crate::tools::guard::ensure_operation_allowed;
use ::mongodb::bson::Document;
use ::mongodb::results::UpdateResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

/// Input for the mongodb_connect tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MongoConnectInput {
    /// MongoDB connection URL, e.g. mongodb://localhost:27017
    pub url: String,
    /// Database name (optional, otherwise taken from the URL path, else "test")
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MongoConnectOutput {
    /// Selected database
    pub database: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MongoFindInput {
    /// Collection name
    pub collection: String,
    /// Query filter. Default: {} (all documents)
    #[serde(default)]
    pub filter: Option<JsonValue>,
    /// Maximum number of documents to return
    #[serde(default)]
    pub limit: Option<i64>,
    /// Number of documents to skip
    #[serde(default)]
    pub skip: Option<u64>,
    /// Sort specification, e.g. {"created_at": -1}
    #[serde(default)]
    pub sort: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MongoFindOutput {
    pub documents: Vec<JsonValue>,
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MongoFilterInput {
    /// Collection name
    pub collection: String,
    /// Query filter. Default: {}
    #[serde(default)]
    pub filter: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MongoFindOneOutput {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<JsonValue>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MongoInsertOneInput {
    /// Collection name
    pub collection: String,
    /// Document to insert
    pub document: JsonValue,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MongoInsertOneOutput {
    pub inserted_id: JsonValue,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MongoInsertManyInput {
    /// Collection name
    pub collection: String,
    /// Documents to insert (at least one)
    pub documents: Vec<JsonValue>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MongoInsertManyOutput {
    /// Ids in input order
    pub inserted_ids: Vec<JsonValue>,
    pub inserted_count: usize,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MongoUpdateInput {
    /// Collection name
    pub collection: String,
    /// Query filter selecting the documents to update
    pub filter: JsonValue,
    /// Update operators, e.g. {"$set": {"status": "active"}}
    pub update: JsonValue,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MongoUpdateOutput {
    pub matched_count: u64,
    pub modified_count: u64,
}

impl From<UpdateResult> for MongoUpdateOutput {
    fn from(result: UpdateResult) -> Self {
        Self {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        }
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MongoDeleteInput {
    /// Collection name
    pub collection: String,
    /// Query filter selecting the documents to delete
    pub filter: JsonValue,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MongoDeleteOutput {
    pub deleted_count: u64,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MongoCountOutput {
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MongoListCollectionsOutput {
    pub database: String,
    pub collections: Vec<String>,
}

/// Missing filters mean "match everything".
fn filter_document(filter: Option<JsonValue>) -> DbResult<Document> {
    match filter {
        None | Some(JsonValue::Null) => Ok(Document::new()),
        Some(value) => json_to_document(value, "filter"),
    }
}

pub struct MongoToolHandler {
    registry: Arc<ConnectorRegistry>,
    policy: Arc<AccessPolicy>,
}

impl MongoToolHandler {
    pub fn new(registry: Arc<ConnectorRegistry>, policy: Arc<AccessPolicy>) -> Self {
        Self { registry, policy }
    }

    /// Check the policy, then fetch the live connector.
    async fn authorize(&self, kind: OperationKind) -> DbResult<Arc<MongoConnector>> {
        ensure_operation_allowed(&self.policy, kind)?;
        self.registry.mongodb.get().await
    }

    pub async fn connect(&self, input: MongoConnectInput) -> DbResult<MongoConnectOutput> {
        let config = MongoConfig {
            url: input.url,
            database: input.database,
        };
        let connector =
            MongoConnector::connect(&config, self.registry.settings().connect_timeout).await?;
        let output = MongoConnectOutput {
            database: connector.database_name().to_string(),
            message: format!("Connected to MongoDB at {}", connector.target()),
        };
        self.registry.mongodb.replace(connector).await;
        Ok(output)
    }

    pub async fn find(&self, input: MongoFindInput) -> DbResult<MongoFindOutput> {
        let connector = self.authorize(OperationKind::Find).await?;
        let filter = filter_document(input.filter)?;
        let sort = match input.sort {
            None | Some(JsonValue::Null) => None,
            Some(value) => Some(json_to_document(value, "sort")?),
        };
        let options = FindOptions {
            limit: input.limit,
            skip: input.skip,
            sort,
        };

        let documents: Vec<JsonValue> = connector
            .find(&input.collection, filter, options)
            .await?
            .into_iter()
            .map(document_to_json)
            .collect();
        Ok(MongoFindOutput {
            count: documents.len(),
            documents,
        })
    }

    pub async fn find_one(&self, input: MongoFilterInput) -> DbResult<MongoFindOneOutput> {
        let connector = self.authorize(OperationKind::Find).await?;
        let filter = filter_document(input.filter)?;
        let document = connector
            .find_one(&input.collection, filter)
            .await?
            .map(document_to_json);
        Ok(MongoFindOneOutput {
            found: document.is_some(),
            document,
        })
    }

    pub async fn insert_one(&self, input: MongoInsertOneInput) -> DbResult<MongoInsertOneOutput> {
        let connector = self.authorize(OperationKind::Insert).await?;
        let document = json_to_document(input.document, "document")?;
        let result = connector.insert_one(&input.collection, document).await?;
        info!(tool = "mongodb_insert_one", collection = %input.collection, "Document inserted");
        Ok(MongoInsertOneOutput {
            inserted_id: bson_to_json(result.inserted_id),
        })
    }

    pub async fn insert_many(
        &self,
        input: MongoInsertManyInput,
    ) -> DbResult<MongoInsertManyOutput> {
        let connector = self.authorize(OperationKind::Insert).await?;
        let documents = input
            .documents
            .into_iter()
            .map(|doc| json_to_document(doc, "document"))
            .collect::<DbResult<Vec<_>>>()?;
        let result = connector.insert_many(&input.collection, documents).await?;
        let inserted_ids: Vec<JsonValue> = crate::db::mongodb::inserted_ids(&result)
            .into_iter()
            .map(bson_to_json)
            .collect();
        info!(
            tool = "mongodb_insert_many",
            collection = %input.collection,
            inserted = inserted_ids.len(),
            "Documents inserted"
        );
        Ok(MongoInsertManyOutput {
            inserted_count: inserted_ids.len(),
            inserted_ids,
        })
    }

    pub async fn update_one(&self, input: MongoUpdateInput) -> DbResult<MongoUpdateOutput> {
        let connector = self.authorize(OperationKind::Update).await?;
        let filter = json_to_document(input.filter, "filter")?;
        let update = json_to_document(input.update, "update")?;
        let result = connector.update_one(&input.collection, filter, update).await?;
        Ok(result.into())
    }

    pub async fn update_many(&self, input: MongoUpdateInput) -> DbResult<MongoUpdateOutput> {
        let connector = self.authorize(OperationKind::Update).await?;
        let filter = json_to_document(input.filter, "filter")?;
        let update = json_to_document(input.update, "update")?;
        let result = connector.update_many(&input.collection, filter, update).await?;
        info!(
            tool = "mongodb_update_many",
            collection = %input.collection,
            modified = result.modified_count,
            "Documents updated"
        );
        Ok(result.into())
    }

    pub async fn delete_one(&self, input: MongoDeleteInput) -> DbResult<MongoDeleteOutput> {
        let connector = self.authorize(OperationKind::Delete).await?;
        let filter = json_to_document(input.filter, "filter")?;
        let result = connector.delete_one(&input.collection, filter).await?;
        Ok(MongoDeleteOutput {
            deleted_count: result.deleted_count,
        })
    }

    pub async fn delete_many(&self, input: MongoDeleteInput) -> DbResult<MongoDeleteOutput> {
        let connector = self.authorize(OperationKind::Delete).await?;
        let filter = json_to_document(input.filter, "filter")?;
        let result = connector.delete_many(&input.collection, filter).await?;
        info!(
            tool = "mongodb_delete_many",
            collection = %input.collection,
            deleted = result.deleted_count,
            "Documents deleted"
        );
        Ok(MongoDeleteOutput {
            deleted_count: result.deleted_count,
        })
    }

    pub async fn count(&self, input: MongoFilterInput) -> DbResult<MongoCountOutput> {
        let connector = self.authorize(OperationKind::Count).await?;
        let filter = filter_document(input.filter)?;
        let count = connector.count(&input.collection, filter).await?;
        Ok(MongoCountOutput { count })
    }

    pub async fn list_collections(&self) -> DbResult<MongoListCollectionsOutput> {
        let connector = self.authorize(OperationKind::List).await?;
        let collections = connector.list_collections().await?;
        Ok(MongoListCollectionsOutput {
            database: connector.database_name().to_string(),
            collections,
        })
    }

    pub async fn disconnect(&self) -> DbResult<DisconnectOutput> {
        let disconnected = self.registry.mongodb.disconnect().await;
        Ok(DisconnectOutput {
            disconnected,
            message: if disconnected {
                "MongoDB connection closed".to_string()
            } else {
                "MongoDB was not connected".to_string()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::security::SecurityMode;
    use serde_json::json;

    fn handler(mode: SecurityMode) -> MongoToolHandler {
        MongoToolHandler::new(
            Arc::new(ConnectorRegistry::new()),
            Arc::new(AccessPolicy::new(mode)),
        )
    }

    #[tokio::test]
    async fn test_insert_denied_in_read_only() {
        let err = handler(SecurityMode::ReadOnly)
            .insert_one(MongoInsertOneInput {
                collection: "users".to_string(),
                document: json!({"name": "alice"}),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::PermissionDenied { .. }));
        assert!(err.to_string().contains("does not allow INSERT operations"));
    }

    #[tokio::test]
    async fn test_update_allowed_in_restricted_but_not_connected() {
        let err = handler(SecurityMode::Restricted)
            .update_many(MongoUpdateInput {
                collection: "users".to_string(),
                filter: json!({}),
                update: json!({"$set": {"active": true}}),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotConnected { .. }));
    }

    #[tokio::test]
    async fn test_delete_many_denied_in_restricted() {
        let err = handler(SecurityMode::Restricted)
            .delete_many(MongoDeleteInput {
                collection: "users".to_string(),
                filter: json!({}),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("(restricted)"));
    }

    #[test]
    fn test_filter_document_defaults_to_empty() {
        assert!(filter_document(None).unwrap().is_empty());
        assert!(filter_document(Some(JsonValue::Null)).unwrap().is_empty());
        assert!(filter_document(Some(json!("x"))).is_err());
    }
}
