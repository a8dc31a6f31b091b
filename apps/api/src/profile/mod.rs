//! Profile CRUD glue — owner-scoped profile rows plus avatar upload to blob
//! storage.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::profile::ProfileRow;
use crate::state::AppState;

const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

pub async fn get_profile(pool: &PgPool, owner_id: Uuid) -> Result<Option<ProfileRow>, AppError> {
    let row: Option<ProfileRow> = sqlx::query_as("SELECT * FROM profiles WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn get_profile_by_slug(pool: &PgPool, slug: &str) -> Result<Option<ProfileRow>, AppError> {
    let row: Option<ProfileRow> = sqlx::query_as("SELECT * FROM profiles WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub bio: String,
    pub slug: Option<String>,
}

impl UpdateProfileRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.display_name.trim().is_empty() || self.display_name.chars().count() > 100 {
            return Err(AppError::Validation(
                "Display name must be 1-100 characters".to_string(),
            ));
        }
        if self.headline.chars().count() > 200 {
            return Err(AppError::Validation("Headline is too long".to_string()));
        }
        if self.bio.chars().count() > 2000 {
            return Err(AppError::Validation("Bio is too long".to_string()));
        }
        if let Some(slug) = &self.slug {
            let valid_len = (3..=40).contains(&slug.chars().count());
            let valid_chars = slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
            if !valid_len || !valid_chars {
                return Err(AppError::Validation(
                    "Slug must be 3-40 characters of a-z, 0-9 and '-'".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
) -> Result<Json<ProfileRow>, AppError> {
    let profile = get_profile(&state.db, owner)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile has not been set up yet".to_string()))?;
    Ok(Json(profile))
}

/// PUT /api/v1/profile — upsert.
pub async fn handle_put_profile(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileRow>, AppError> {
    req.validate()?;

    let profile: ProfileRow = sqlx::query_as(
        r#"
        INSERT INTO profiles (owner_id, display_name, headline, bio, slug)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (owner_id) DO UPDATE
        SET display_name = $2, headline = $3, bio = $4, slug = $5, updated_at = now()
        RETURNING *
        "#,
    )
    .bind(owner)
    .bind(req.display_name.trim())
    .bind(req.headline.trim())
    .bind(req.bio.trim())
    .bind(&req.slug)
    .fetch_one(&state.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("That slug is already taken".to_string())
        }
        _ => AppError::Database(e),
    })?;

    Ok(Json(profile))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    pub avatar_url: String,
}

/// POST /api/v1/profile/avatar — multipart image upload.
pub async fn handle_upload_avatar(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<AvatarResponse>, AppError> {
    let mut upload: Option<(bytes::Bytes, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let mime = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;
        upload = Some((bytes, mime));
    }

    let (bytes, mime) =
        upload.ok_or_else(|| AppError::Validation("Missing multipart field 'file'".to_string()))?;

    let extension = match mime.as_str() {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        other => {
            return Err(AppError::Validation(format!(
                "Unsupported avatar type '{other}'; use PNG, JPEG or WebP"
            )))
        }
    };
    if bytes.is_empty() {
        return Err(AppError::Validation("No file was supplied".to_string()));
    }
    if bytes.len() > MAX_AVATAR_BYTES {
        return Err(AppError::Validation(
            "Avatar exceeds the 2 MiB limit".to_string(),
        ));
    }

    let key = format!("avatars/{owner}.{extension}");
    state.blobs.store(&key, bytes, &mime).await?;
    let avatar_url = format!("{}/{}/{key}", state.config.s3_endpoint, state.config.s3_bucket);

    sqlx::query(
        r#"
        INSERT INTO profiles (owner_id, avatar_url)
        VALUES ($1, $2)
        ON CONFLICT (owner_id) DO UPDATE SET avatar_url = $2, updated_at = now()
        "#,
    )
    .bind(owner)
    .bind(&avatar_url)
    .execute(&state.db)
    .await?;

    Ok(Json(AvatarResponse { avatar_url }))
}
