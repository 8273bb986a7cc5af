use bytes::Bytes;
use chrono::NaiveDateTime;
use futures_util::future::try_join_all;
use serde::Serialize;
use serde_json::{Map, Value};

use super::RecordError;
use super::types::{TIMESTAMP_FORMAT, UpdateRecordData, storage_now};
use crate::core::ingest::{FileInfo, FileProcessingError, extract_columns};

/// An uploaded file as received by the HTTP layer.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Bytes,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Everything a caller may supply for one record update.
#[derive(Debug, Clone, Default)]
pub struct UpdateInputs {
    pub user_input: Vec<UploadedFile>,
    pub expected_output: Option<UploadedFile>,
    pub instruction_from_user: Option<String>,
    pub client_email_address: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct StagedFields {
    user_input: Option<Vec<FileInfo>>,
    expected_output: Option<Vec<String>>,
    instruction_from_user: Option<String>,
    client_email_address: Option<String>,
}

impl StagedFields {
    fn is_empty(&self) -> bool {
        self.user_input.is_none()
            && self.expected_output.is_none()
            && self.instruction_from_user.is_none()
            && self.client_email_address.is_none()
    }
}

/// A validated partial update. The store document and the response payload
/// are both projected from this one value.
#[derive(Debug, Clone)]
pub struct StagedUpdate {
    fields: StagedFields,
    task_id: String,
    updated_date: NaiveDateTime,
}

#[derive(Serialize)]
struct SetDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_input: Option<&'a [FileInfo]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_output: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instruction_from_user: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_email_address: Option<&'a str>,
    task_id: &'a str,
    updated_date: &'a NaiveDateTime,
}

impl StagedUpdate {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Names of the caller-supplied fields, in document order.
    pub fn staged_fields(&self) -> Vec<&'static str> {
        let f = &self.fields;
        [
            f.user_input.is_some().then_some("user_input"),
            f.expected_output.is_some().then_some("expected_output"),
            f.instruction_from_user.is_some().then_some("instruction_from_user"),
            f.client_email_address.is_some().then_some("client_email_address"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Field map for a `$set`-style merge.
    pub fn to_set_document(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let doc = SetDocument {
            user_input: self.fields.user_input.as_deref(),
            expected_output: self.fields.expected_output.as_deref(),
            instruction_from_user: self.fields.instruction_from_user.as_deref(),
            client_email_address: self.fields.client_email_address.as_deref(),
            task_id: &self.task_id,
            updated_date: &self.updated_date,
        };
        match serde_json::to_value(doc)? {
            Value::Object(map) => Ok(map),
            other => Err(serde::ser::Error::custom(format!(
                "update document is not an object: {other}"
            ))),
        }
    }

    pub fn into_response_data(self) -> UpdateRecordData {
        UpdateRecordData {
            task_id: self.task_id,
            user_input: self.fields.user_input,
            expected_output: self.fields.expected_output,
            instruction_from_user: self.fields.instruction_from_user,
            client_email_address: self.fields.client_email_address,
            updated_date: self.updated_date.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

async fn extract_file(file: UploadedFile) -> Result<FileInfo, RecordError> {
    let filename = file.filename.clone();
    let info = tokio::task::spawn_blocking(move || extract_columns(&file.content, &file.filename))
        .await
        .map_err(|e| FileProcessingError::new(filename, format!("extraction task failed: {e}")))??;
    Ok(info)
}

/// Extract the files concurrently; results keep the input order.
async fn extract_files(files: Vec<UploadedFile>) -> Result<Vec<FileInfo>, RecordError> {
    try_join_all(
        files
            .into_iter()
            .filter(|f| !f.filename.is_empty())
            .map(extract_file),
    )
    .await
}

/// Turn raw inputs into a staged update. Fails with `NoDataProvided` when no
/// caller field survives, before the generated fields are added.
pub async fn compose(inputs: UpdateInputs) -> Result<StagedUpdate, RecordError> {
    let mut fields = StagedFields::default();

    let user_input = extract_files(inputs.user_input).await?;
    if !user_input.is_empty() {
        fields.user_input = Some(user_input);
    }

    if let Some(file) = inputs.expected_output.filter(|f| !f.filename.is_empty()) {
        fields.expected_output = Some(extract_file(file).await?.columns);
    }

    fields.instruction_from_user = inputs.instruction_from_user;
    fields.client_email_address = inputs.client_email_address;

    if fields.is_empty() {
        return Err(RecordError::NoDataProvided);
    }

    Ok(StagedUpdate {
        fields,
        task_id: uuid::Uuid::new_v4().to_string(),
        updated_date: storage_now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(name: &str, body: &str) -> UploadedFile {
        UploadedFile::new(name, body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn empty_inputs_are_rejected() {
        let err = compose(UpdateInputs::default()).await.unwrap_err();
        assert!(matches!(err, RecordError::NoDataProvided));
    }

    #[tokio::test]
    async fn files_without_names_do_not_count() {
        let inputs = UpdateInputs {
            user_input: vec![csv("", "a,b\n")],
            expected_output: Some(csv("", "c\n")),
            ..Default::default()
        };
        let err = compose(inputs).await.unwrap_err();
        assert!(matches!(err, RecordError::NoDataProvided));
    }

    #[tokio::test]
    async fn empty_instruction_is_still_staged() {
        let staged = compose(UpdateInputs {
            instruction_from_user: Some(String::new()),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(staged.staged_fields(), vec!["instruction_from_user"]);
        let doc = staged.to_set_document().unwrap();
        assert_eq!(doc["instruction_from_user"], "");
    }

    #[tokio::test]
    async fn user_input_order_is_preserved() {
        let inputs = UpdateInputs {
            user_input: vec![
                csv("first.csv", "a,b\n"),
                csv("", "ignored\n"),
                csv("second.csv", "c\n"),
                csv("third.csv", "d,e,f\n"),
            ],
            ..Default::default()
        };
        let staged = compose(inputs).await.unwrap();
        let data = staged.into_response_data();
        let names: Vec<_> = data
            .user_input
            .unwrap()
            .into_iter()
            .map(|f| f.filename)
            .collect();
        assert_eq!(names, vec!["first.csv", "second.csv", "third.csv"]);
    }

    #[tokio::test]
    async fn expected_output_keeps_only_columns() {
        let staged = compose(UpdateInputs {
            expected_output: Some(csv("target.csv", "result,status\n1,ok\n")),
            ..Default::default()
        })
        .await
        .unwrap();

        let doc = staged.to_set_document().unwrap();
        assert_eq!(doc["expected_output"], serde_json::json!(["result", "status"]));
        assert!(doc.get("user_input").is_none());

        let data = staged.into_response_data();
        assert_eq!(
            data.expected_output,
            Some(vec!["result".to_string(), "status".to_string()])
        );
    }

    #[tokio::test]
    async fn projections_agree() {
        let staged = compose(UpdateInputs {
            user_input: vec![csv("sample.csv", "VIN,Reg_No\n")],
            client_email_address: Some("ops@example.com".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

        let doc = staged.to_set_document().unwrap();
        let task_id = staged.task_id().to_string();
        let data = staged.into_response_data();

        assert_eq!(doc["task_id"], task_id);
        assert_eq!(data.task_id, task_id);
        assert_eq!(doc["user_input"][0]["filename"], "sample.csv");
        assert_eq!(doc["user_input"][0]["columns"][1], "Reg_No");
        assert_eq!(doc["client_email_address"], "ops@example.com");
        assert!(doc.get("instruction_from_user").is_none());
        assert!(doc["updated_date"].as_str().unwrap().starts_with(&data.updated_date[..19]));
    }

    #[tokio::test]
    async fn every_compose_generates_a_new_task_id() {
        let inputs = UpdateInputs {
            instruction_from_user: Some("same".to_string()),
            ..Default::default()
        };
        let a = compose(inputs.clone()).await.unwrap();
        let b = compose(inputs).await.unwrap();
        assert_ne!(a.task_id(), b.task_id());
    }

    #[tokio::test]
    async fn extraction_failure_propagates() {
        let err = compose(UpdateInputs {
            user_input: vec![UploadedFile::new("bad.xlsx", b"not a zip".to_vec())],
            instruction_from_user: Some("x".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
        match err {
            RecordError::FileProcessing(e) => assert_eq!(e.filename, "bad.xlsx"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
