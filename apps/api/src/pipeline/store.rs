//! Upload record persistence. Keyed lookups only, always scoped to the
//! owning principal; state transitions are expressed as dedicated methods
//! rather than a free-form patch so the state machine stays auditable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::upload::UploadRecord;

#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn insert(
        &self,
        owner_id: Uuid,
        raw_file_ref: &str,
        filename: &str,
    ) -> Result<UploadRecord, AppError>;

    /// Owner-scoped fetch; a record owned by another principal is invisible.
    async fn get(&self, id: Uuid, owner_id: Uuid) -> Result<Option<UploadRecord>, AppError>;

    /// Forced-reprocess reset: back to `uploaded`, prior results cleared.
    async fn reset_for_reprocess(&self, id: Uuid) -> Result<(), AppError>;

    async fn mark_processed(
        &self,
        id: Uuid,
        extracted_text: &str,
        prompts: &[String],
        at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    async fn mark_error(&self, id: Uuid, message: &str, at: DateTime<Utc>)
        -> Result<(), AppError>;

    /// Most recent processed upload for an owner; feeds the public chat page.
    async fn latest_processed_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<UploadRecord>, AppError>;
}

pub struct PgUploadStore {
    pool: PgPool,
}

impl PgUploadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadStore for PgUploadStore {
    async fn insert(
        &self,
        owner_id: Uuid,
        raw_file_ref: &str,
        filename: &str,
    ) -> Result<UploadRecord, AppError> {
        let record: UploadRecord = sqlx::query_as(
            r#"
            INSERT INTO cv_uploads (id, owner_id, filename, status, raw_file_ref)
            VALUES ($1, $2, $3, 'uploaded', $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(filename)
        .bind(raw_file_ref)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn get(&self, id: Uuid, owner_id: Uuid) -> Result<Option<UploadRecord>, AppError> {
        let record: Option<UploadRecord> =
            sqlx::query_as("SELECT * FROM cv_uploads WHERE id = $1 AND owner_id = $2")
                .bind(id)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(record)
    }

    async fn reset_for_reprocess(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE cv_uploads
            SET status = 'uploaded', extracted_text = NULL, prompts = NULL,
                error_message = NULL, processed_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_processed(
        &self,
        id: Uuid,
        extracted_text: &str,
        prompts: &[String],
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE cv_uploads
            SET status = 'processed', extracted_text = $2, prompts = $3,
                error_message = NULL, processed_at = $4, raw_file_ref = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(extracted_text)
        .bind(Json(prompts))
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_error(
        &self,
        id: Uuid,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE cv_uploads
            SET status = 'error', error_message = $2, processed_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(message)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_processed_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<UploadRecord>, AppError> {
        let record: Option<UploadRecord> = sqlx::query_as(
            r#"
            SELECT * FROM cv_uploads
            WHERE owner_id = $1 AND status = 'processed'
            ORDER BY processed_at DESC
            LIMIT 1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}
