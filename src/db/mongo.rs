//! MongoDB client and collection wrapper

use bson::{doc, Document};
use futures_util::TryStreamExt;
use mongodb::{
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::types::FaceoffError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, FaceoffError> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast when the server is unreachable instead of hanging on selection
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| FaceoffError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| FaceoffError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection with its schema indexes applied
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, FaceoffError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, FaceoffError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;
        debug!(collection = collection_name, "Collection ready");

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), FaceoffError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| FaceoffError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document guarded by a unique index.
    /// Returns `false` instead of an error when the key already exists.
    pub async fn insert_unique(&self, item: T) -> Result<bool, FaceoffError> {
        match self.inner.insert_one(item).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(FaceoffError::Database(format!("Insert failed: {}", e))),
        }
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, FaceoffError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| FaceoffError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter.
    ///
    /// A document that fails to decode fails the whole read; callers never
    /// receive a silently shortened list.
    pub async fn find_many(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<Vec<T>, FaceoffError> {
        let cursor = self
            .inner
            .find(filter)
            .with_options(options)
            .await
            .map_err(|e| FaceoffError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| FaceoffError::Database(format!("Cursor read failed: {}", e)))
    }

    /// Run an aggregation pipeline and decode the results as `T`
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<T>, FaceoffError> {
        let cursor = self
            .inner
            .aggregate(pipeline)
            .with_type::<T>()
            .await
            .map_err(|e| FaceoffError::Database(format!("Aggregate failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| FaceoffError::Database(format!("Cursor read failed: {}", e)))
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, FaceoffError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| FaceoffError::Database(format!("Update failed: {}", e)))
    }

    /// Delete one document; returns whether a document was removed
    pub async fn delete_one(&self, filter: Document) -> Result<bool, FaceoffError> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| FaceoffError::Database(format!("Delete failed: {}", e)))?;
        Ok(result.deleted_count > 0)
    }

    /// Update many documents
    pub async fn update_many(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, FaceoffError> {
        self.inner
            .update_many(filter, update.into())
            .await
            .map_err(|e| FaceoffError::Database(format!("Update failed: {}", e)))
    }

    /// Atomic find-and-update that creates the document when absent.
    /// Returns the document as it is after the update.
    pub async fn upsert_returning(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<T, FaceoffError> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        self.inner
            .find_one_and_update(filter, update.into())
            .with_options(options)
            .await
            .map_err(|e| FaceoffError::Database(format!("Upsert failed: {}", e)))?
            .ok_or_else(|| FaceoffError::Database("Upsert returned no document".into()))
    }
}

/// Whether a MongoDB error is a duplicate key violation (E11000)
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == 11000,
        ErrorKind::Command(e) => e.code == 11000,
        _ => false,
    }
}
