//! MongoDB document source.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::{Client, Collection};
use tracing::{debug, info, instrument};

use super::{DocumentSource, SampleMode};
use crate::error::{ScanError, SourceError, SourceResult};
use crate::uri::{extract_cluster_name, mask_uri};

/// A [`DocumentSource`] backed by a MongoDB deployment.
#[derive(Debug, Clone)]
pub struct MongoSource {
    client: Client,
    cluster_name: Option<String>,
}

impl MongoSource {
    /// Connects and verifies the deployment answers a `ping` on `admin`.
    #[instrument(skip(uri), fields(uri = %mask_uri(uri)))]
    pub async fn connect(uri: &str) -> crate::Result<Self> {
        let client = Client::with_uri_str(uri).await.map_err(|e| {
            ScanError::connectivity_with_source("failed to create client", Box::new(e))
        })?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ScanError::connectivity_with_source("failed to ping cluster", Box::new(e)))?;

        info!("connected to MongoDB");

        Ok(Self::from_client(client, extract_cluster_name(uri)))
    }

    /// Wraps an existing client.
    pub fn from_client(client: Client, cluster_name: Option<String>) -> Self {
        Self {
            client,
            cluster_name,
        }
    }

    fn collection(&self, database: &str, collection: &str) -> Collection<Document> {
        self.client.database(database).collection(collection)
    }
}

fn op_error(operation: &'static str) -> impl FnOnce(mongodb::error::Error) -> SourceError {
    move |e| SourceError::operation(operation, e.to_string())
}

/// Reads a numeric field that the server may encode as any BSON number type.
fn numeric_field(stats: &Document, key: &str) -> Option<u64> {
    match stats.get(key)? {
        Bson::Double(v) if *v >= 0.0 => Some(*v as u64),
        Bson::Int64(v) => u64::try_from(*v).ok(),
        Bson::Int32(v) => u64::try_from(*v).ok(),
        _ => None,
    }
}

#[async_trait]
impl DocumentSource for MongoSource {
    async fn list_databases(&self) -> SourceResult<Vec<String>> {
        self.client
            .list_database_names()
            .await
            .map_err(|e| SourceError::unreachable(e.to_string()))
    }

    async fn list_collections(&self, database: &str) -> SourceResult<Vec<String>> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(op_error("list_collections"))
    }

    async fn estimated_count(&self, database: &str, collection: &str) -> SourceResult<u64> {
        self.collection(database, collection)
            .estimated_document_count()
            .await
            .map_err(op_error("estimated_count"))
    }

    async fn list_index_names(
        &self,
        database: &str,
        collection: &str,
    ) -> SourceResult<Vec<String>> {
        self.collection(database, collection)
            .list_index_names()
            .await
            .map_err(op_error("list_index_names"))
    }

    async fn sample_documents(
        &self,
        database: &str,
        collection: &str,
        size: u64,
        mode: SampleMode,
    ) -> SourceResult<Vec<Document>> {
        let coll = self.collection(database, collection);
        let limit = i64::try_from(size).unwrap_or(i64::MAX);

        let docs: Vec<Document> = match mode {
            SampleMode::Random => {
                let pipeline = vec![doc! { "$sample": { "size": limit } }];
                coll.aggregate(pipeline)
                    .await
                    .map_err(op_error("sample_random"))?
                    .try_collect()
                    .await
                    .map_err(op_error("sample_random"))?
            }
            SampleMode::FirstN => coll
                .find(doc! {})
                .limit(limit)
                .await
                .map_err(op_error("sample_first_n"))?
                .try_collect()
                .await
                .map_err(op_error("sample_first_n"))?,
        };

        debug!(database, collection, %mode, returned = docs.len(), "sampled documents");
        Ok(docs)
    }

    async fn database_size_bytes(&self, database: &str) -> SourceResult<u64> {
        let stats = self
            .client
            .database(database)
            .run_command(doc! { "dbStats": 1 })
            .await
            .map_err(op_error("database_size"))?;

        numeric_field(&stats, "dataSize").ok_or_else(|| {
            SourceError::operation("database_size", "dbStats returned no numeric dataSize")
        })
    }

    fn cluster_name(&self) -> Option<String> {
        self.cluster_name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_field_accepts_every_number_type() {
        let stats = doc! { "a": 1024.0, "b": 2048_i64, "c": 4096_i32, "d": "big", "e": -1_i32 };
        assert_eq!(numeric_field(&stats, "a"), Some(1024));
        assert_eq!(numeric_field(&stats, "b"), Some(2048));
        assert_eq!(numeric_field(&stats, "c"), Some(4096));
        assert_eq!(numeric_field(&stats, "d"), None);
        assert_eq!(numeric_field(&stats, "e"), None);
        assert_eq!(numeric_field(&stats, "missing"), None);
    }
}
