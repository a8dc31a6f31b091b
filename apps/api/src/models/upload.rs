use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of an uploaded CV.
///
/// `uploaded → processed` on success, `uploaded → error` on failure.
/// `processed` and `error` are terminal unless the caller asks for a forced
/// reprocess, which resets the record to `uploaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "upload_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploaded,
    Processed,
    Error,
}

/// One row per submitted PDF. Every read and write is scoped to `owner_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub status: UploadStatus,
    /// Transient blob key for the raw bytes; consumed when processing succeeds.
    pub raw_file_ref: Option<String>,
    /// Structured markdown, present only once `status = processed`.
    pub extracted_text: Option<String>,
    pub prompts: Option<Json<Vec<String>>>,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UploadRecord {
    pub fn prompt_list(&self) -> Vec<String> {
        self.prompts.as_ref().map(|p| p.0.clone()).unwrap_or_default()
    }
}
