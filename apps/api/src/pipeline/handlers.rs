use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::upload::UploadStatus;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ForceQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub upload_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptsResponse {
    /// Display summary (first 500 chars of the markdown).
    pub extracted_text: String,
    pub markdown_content: String,
    pub example_prompts: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatusResponse {
    pub upload_id: Uuid,
    pub filename: String,
    pub status: UploadStatus,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// POST /api/v1/cv/upload — multipart form field `file`, PDF only, ≤ 5 MiB.
pub async fn handle_upload_cv(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut file: Option<(Bytes, String, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("cv.pdf").to_string();
        let mime = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;
        file = Some((bytes, filename, mime));
    }

    let (bytes, filename, mime) =
        file.ok_or_else(|| AppError::Validation("Missing multipart field 'file'".to_string()))?;

    let record = state
        .pipeline
        .register_upload(owner, bytes, &filename, &mime)
        .await?;

    Ok((StatusCode::CREATED, Json(UploadResponse { upload_id: record.id })))
}

/// POST /api/v1/cv/:uploadId/prompts[?force=true] — runs the text pipeline.
pub async fn handle_generate_prompts(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Path(upload_id): Path<Uuid>,
    Query(query): Query<ForceQuery>,
) -> Result<Json<PromptsResponse>, AppError> {
    let outcome = state
        .pipeline
        .process_upload(upload_id, owner, query.force)
        .await?;

    Ok(Json(PromptsResponse {
        extracted_text: outcome.summary,
        markdown_content: outcome.extracted_text,
        example_prompts: outcome.prompts,
    }))
}

/// GET /api/v1/cv/:uploadId — owner-scoped status view.
pub async fn handle_get_upload(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Path(upload_id): Path<Uuid>,
) -> Result<Json<UploadStatusResponse>, AppError> {
    let record = state
        .pipeline
        .store()
        .get(upload_id, owner)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Upload {upload_id} not found")))?;

    Ok(Json(UploadStatusResponse {
        upload_id: record.id,
        filename: record.filename,
        status: record.status,
        error_message: record.error_message,
        processed_at: record.processed_at,
        created_at: record.created_at,
    }))
}
