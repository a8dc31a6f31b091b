//! Visitor-facing endpoints: the public portfolio page and the CV chat.
//! Resolved by profile slug; nothing here requires authentication, but a
//! page is only served while the owner keeps it public.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::builder;
use crate::errors::AppError;
use crate::models::builder::BuilderSettingsRow;
use crate::models::profile::ProfileRow;
use crate::profile::get_profile_by_slug;
use crate::state::AppState;

const MAX_QUESTION_CHARS: usize = 500;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPageResponse {
    pub profile: ProfileRow,
    pub builder: BuilderSettingsRow,
    pub example_prompts: Vec<String>,
    pub chat_ready: bool,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

async fn public_profile(
    state: &AppState,
    slug: &str,
) -> Result<(ProfileRow, BuilderSettingsRow), AppError> {
    let profile = get_profile_by_slug(&state.db, slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Page not found".to_string()))?;
    let settings = builder::get_settings(&state.db, profile.owner_id)
        .await?
        .unwrap_or_else(|| builder::default_settings(profile.owner_id));
    if !settings.is_public {
        // A private page is indistinguishable from a missing one.
        return Err(AppError::NotFound("Page not found".to_string()));
    }
    Ok((profile, settings))
}

/// GET /api/v1/public/:slug
pub async fn handle_public_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PublicPageResponse>, AppError> {
    let (profile, settings) = public_profile(&state, &slug).await?;

    let latest = state
        .pipeline
        .store()
        .latest_processed_for_owner(profile.owner_id)
        .await?;

    // Owner-authored prompts first, then the generated ones, deduplicated.
    let mut example_prompts: Vec<String> = settings.custom_prompts.0.clone();
    if let Some(record) = &latest {
        for prompt in record.prompt_list() {
            if !example_prompts.contains(&prompt) {
                example_prompts.push(prompt);
            }
        }
    }

    Ok(Json(PublicPageResponse {
        profile,
        builder: settings,
        example_prompts,
        chat_ready: latest.is_some(),
    }))
}

/// POST /api/v1/public/:slug/chat
pub async fn handle_public_chat(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(AppError::Validation("Question must not be empty".to_string()));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(AppError::Validation(format!(
            "Question exceeds {MAX_QUESTION_CHARS} characters"
        )));
    }

    let (profile, _settings) = public_profile(&state, &slug).await?;

    let record = state
        .pipeline
        .store()
        .latest_processed_for_owner(profile.owner_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No processed CV is available yet".to_string()))?;
    let markdown = record
        .extracted_text
        .as_deref()
        .ok_or_else(|| AppError::NotFound("No processed CV is available yet".to_string()))?;

    let answer = state.chat.answer_about_cv(markdown, question).await?;
    Ok(Json(ChatResponse { answer }))
}
