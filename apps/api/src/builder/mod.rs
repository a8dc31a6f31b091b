//! Portfolio-builder settings — persistence for the owner's public chat page
//! customization (theme, welcome message, custom prompts, visibility).

use axum::{extract::State, Json};
use serde::Deserialize;
use sqlx::types::Json as SqlJson;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::builder::BuilderSettingsRow;
use crate::state::AppState;

const MAX_CUSTOM_PROMPTS: usize = 10;
const ALLOWED_THEMES: &[&str] = &["light", "dark"];

pub async fn get_settings(
    pool: &PgPool,
    owner_id: Uuid,
) -> Result<Option<BuilderSettingsRow>, AppError> {
    let row: Option<BuilderSettingsRow> =
        sqlx::query_as("SELECT * FROM builder_settings WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_optional(pool)
            .await?;
    Ok(row)
}

#[derive(Debug, Deserialize)]
pub struct UpdateBuilderRequest {
    pub theme: String,
    pub accent_color: String,
    #[serde(default)]
    pub welcome_message: String,
    pub is_public: bool,
    #[serde(default)]
    pub custom_prompts: Vec<String>,
}

impl UpdateBuilderRequest {
    fn validate(&self) -> Result<(), AppError> {
        if !ALLOWED_THEMES.contains(&self.theme.as_str()) {
            return Err(AppError::Validation(format!(
                "Unknown theme '{}'",
                self.theme
            )));
        }
        let color = self.accent_color.as_str();
        let valid_color = color.len() == 7
            && color.starts_with('#')
            && color[1..].chars().all(|c| c.is_ascii_hexdigit());
        if !valid_color {
            return Err(AppError::Validation(
                "Accent color must be a #rrggbb value".to_string(),
            ));
        }
        if self.welcome_message.chars().count() > 500 {
            return Err(AppError::Validation("Welcome message is too long".to_string()));
        }
        if self.custom_prompts.len() > MAX_CUSTOM_PROMPTS {
            return Err(AppError::Validation(format!(
                "At most {MAX_CUSTOM_PROMPTS} custom prompts are allowed"
            )));
        }
        if self
            .custom_prompts
            .iter()
            .any(|p| p.trim().is_empty() || p.chars().count() > 200)
        {
            return Err(AppError::Validation(
                "Custom prompts must be 1-200 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// GET /api/v1/builder — settings, or defaults when never saved.
pub async fn handle_get_builder(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
) -> Result<Json<BuilderSettingsRow>, AppError> {
    let settings = get_settings(&state.db, owner)
        .await?
        .unwrap_or_else(|| default_settings(owner));
    Ok(Json(settings))
}

/// PUT /api/v1/builder — upsert.
pub async fn handle_put_builder(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Json(req): Json<UpdateBuilderRequest>,
) -> Result<Json<BuilderSettingsRow>, AppError> {
    req.validate()?;

    let settings: BuilderSettingsRow = sqlx::query_as(
        r#"
        INSERT INTO builder_settings
            (owner_id, theme, accent_color, welcome_message, is_public, custom_prompts)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (owner_id) DO UPDATE
        SET theme = $2, accent_color = $3, welcome_message = $4,
            is_public = $5, custom_prompts = $6, updated_at = now()
        RETURNING *
        "#,
    )
    .bind(owner)
    .bind(&req.theme)
    .bind(&req.accent_color)
    .bind(req.welcome_message.trim())
    .bind(req.is_public)
    .bind(SqlJson(&req.custom_prompts))
    .fetch_one(&state.db)
    .await?;

    Ok(Json(settings))
}

pub fn default_settings(owner_id: Uuid) -> BuilderSettingsRow {
    BuilderSettingsRow {
        owner_id,
        theme: "light".to_string(),
        accent_color: "#2563eb".to_string(),
        welcome_message: String::new(),
        is_public: true,
        custom_prompts: SqlJson(Vec::new()),
        updated_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> UpdateBuilderRequest {
        UpdateBuilderRequest {
            theme: "dark".to_string(),
            accent_color: "#aabbcc".to_string(),
            welcome_message: "Ask me anything about my CV".to_string(),
            is_public: true,
            custom_prompts: vec!["What drives me?".to_string()],
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_theme_and_bad_color() {
        let mut req = request();
        req.theme = "neon".to_string();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));

        let mut req = request();
        req.accent_color = "blue".to_string();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_rejects_too_many_custom_prompts() {
        let mut req = request();
        req.custom_prompts = vec!["p".to_string(); MAX_CUSTOM_PROMPTS + 1];
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }
}
