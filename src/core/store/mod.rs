mod sqlite;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::records::{Record, RecordId};

pub use sqlite::{SqliteRecordStore, is_valid_collection_name};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid collection name '{0}'")]
    InvalidCollection(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Counts reported by a single-document merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Document store used by the record pipeline.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Name reported by the connection probe.
    fn database_name(&self) -> &str;

    async fn find_one(&self, id: &RecordId) -> Result<Option<Record>, StoreError>;

    /// Whether a document with this id is stored. Its contents are not decoded.
    async fn exists(&self, id: &RecordId) -> Result<bool, StoreError>;

    /// Merge `fields` into the document. Unlisted fields stay as they are;
    /// `modified_count` is 0 when every value already matched.
    async fn update_one(
        &self,
        id: &RecordId,
        fields: Map<String, Value>,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
