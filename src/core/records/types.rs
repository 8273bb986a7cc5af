use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::RecordId;
use crate::core::ingest::FileInfo;

/// Stored timestamps are civil time at UTC+05:30 with the offset dropped.
const STORAGE_OFFSET_SECS: i64 = 5 * 3600 + 30 * 60;

/// Wire format of `updatedDate`: ISO-8601 without offset.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub fn storage_time(at: DateTime<Utc>) -> NaiveDateTime {
    at.naive_utc() + Duration::seconds(STORAGE_OFFSET_SECS)
}

pub fn storage_now() -> NaiveDateTime {
    storage_time(Utc::now())
}

/// A stored record as kept in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(default)]
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<Vec<FileInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_from_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email_address: Option<String>,
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Record {
    /// The record `init-db --sample` seeds for local testing.
    pub fn sample() -> Self {
        let now = storage_now();
        Self {
            id: RecordId::generate(),
            task_id: uuid::Uuid::new_v4().to_string(),
            user_input: Some(vec![FileInfo {
                filename: "Sample_Data.xlsx".to_string(),
                columns: vec![
                    "VIN".to_string(),
                    "Reg_No".to_string(),
                    "Engine_No".to_string(),
                ],
            }]),
            expected_output: Some(vec![
                "result".to_string(),
                "status".to_string(),
                "timestamp".to_string(),
            ]),
            instruction_from_user: Some("Process vehicle data".to_string()),
            client_email_address: Some("test@example.com".to_string()),
            progress: 0,
            created_date: Some(now),
            updated_date: Some(now),
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Success,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordData {
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input: Option<Vec<FileInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction_from_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email_address: Option<String>,
    pub updated_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecordResponse {
    pub status: UpdateStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<UpdateRecordData>,
}

impl UpdateRecordResponse {
    pub fn success(data: UpdateRecordData) -> Self {
        Self {
            status: UpdateStatus::Success,
            message: "Record updated successfully".to_string(),
            data: Some(data),
        }
    }

    pub fn unchanged() -> Self {
        Self {
            status: UpdateStatus::Unchanged,
            message: "No changes made to the record".to_string(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub status: ConnectionState,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            message: "Server is running".to_string(),
        }
    }
}
