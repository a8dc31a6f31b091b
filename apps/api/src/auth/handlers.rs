use axum::{extract::State, Json};
use serde::Deserialize;

use crate::auth::AuthTokens;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

impl CredentialsRequest {
    fn validate(&self) -> Result<(), AppError> {
        if !self.email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }
        if self.password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// POST /api/v1/auth/register — delegated to the identity provider.
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<AuthTokens>, AppError> {
    req.validate()?;
    let tokens = state.auth.register(&req.email, &req.password).await?;
    Ok(Json(tokens))
}

/// POST /api/v1/auth/login — delegated to the identity provider.
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<AuthTokens>, AppError> {
    let tokens = state.auth.login(&req.email, &req.password).await?;
    Ok(Json(tokens))
}
