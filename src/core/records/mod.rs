mod compose;
mod id;
pub mod types;

use std::sync::Arc;

use tracing::{info, warn};

pub use compose::{UpdateInputs, UploadedFile, compose};
pub use id::RecordId;
pub use types::{
    ConnectionState, ConnectionStatus, HealthResponse, Record, UpdateRecordResponse,
    UpdateStatus,
};

use crate::core::ingest::FileProcessingError;
use crate::core::store::{RecordStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid record ID format")]
    InvalidRecordId,
    #[error("Record not found")]
    RecordNotFound,
    #[error("No data provided for update")]
    NoDataProvided,
    #[error(transparent)]
    FileProcessing(#[from] FileProcessingError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        RecordError::Store(StoreError::Json(err))
    }
}

/// Applies record updates against an injected store.
pub struct RecordService {
    store: Arc<dyn RecordStore>,
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Validate, check existence, compose, then merge the staged fields.
    /// Files are only parsed once the record is known to exist.
    pub async fn update_record(
        &self,
        raw_id: &str,
        inputs: UpdateInputs,
    ) -> Result<UpdateRecordResponse, RecordError> {
        let id = RecordId::parse(raw_id)?;

        if !self.store.exists(&id).await? {
            return Err(RecordError::RecordNotFound);
        }

        let staged = compose(inputs).await?;
        let fields = staged.staged_fields();
        let outcome = self.store.update_one(&id, staged.to_set_document()?).await?;

        if outcome.matched_count == 0 {
            warn!(record = %id, "Record disappeared before update");
            return Err(RecordError::RecordNotFound);
        }
        if outcome.modified_count == 0 {
            info!(record = %id, ?fields, "Update left record unchanged");
            return Ok(UpdateRecordResponse::unchanged());
        }

        info!(record = %id, ?fields, task_id = staged.task_id(), "Record updated");
        Ok(UpdateRecordResponse::success(staged.into_response_data()))
    }

    /// Round-trip to the store. Failures are reported in the result, never raised.
    pub async fn check_connection(&self) -> ConnectionStatus {
        match self.store.ping().await {
            Ok(()) => ConnectionStatus {
                status: ConnectionState::Connected,
                message: "Database connection successful".to_string(),
                database: Some(self.store.database_name().to_string()),
            },
            Err(e) => {
                warn!("Database ping failed: {}", e);
                ConnectionStatus {
                    status: ConnectionState::Error,
                    message: e.to_string(),
                    database: None,
                }
            }
        }
    }
}
