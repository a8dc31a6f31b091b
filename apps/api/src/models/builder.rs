use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Portfolio-builder settings for the owner's public chat page.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BuilderSettingsRow {
    pub owner_id: Uuid,
    pub theme: String,
    pub accent_color: String,
    pub welcome_message: String,
    pub is_public: bool,
    /// Owner-authored prompts shown alongside the generated ones.
    pub custom_prompts: Json<Vec<String>>,
    pub updated_at: DateTime<Utc>,
}
