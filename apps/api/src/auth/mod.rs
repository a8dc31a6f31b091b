//! Authentication — fully delegated to an external identity provider. This
//! module only carries the provider client and the `AuthUser` extractor that
//! turns a bearer token into a principal id; no credentials are stored or
//! verified locally.

pub mod handlers;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Token bundle passed through from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
struct CredentialsPayload<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: Uuid,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the external identity provider.
pub struct AuthClient {
    http: Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<AuthTokens, AppError> {
        self.credential_call("signup", email, password).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthTokens, AppError> {
        self.credential_call("login", email, password).await
    }

    /// Validates a bearer token and yields the principal id.
    pub async fn authenticate(&self, token: &str) -> Result<Uuid, AppError> {
        let response = self
            .http
            .get(format!("{}/userinfo", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("identity provider: {e}")))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(AppError::Unauthorized);
        }
        if !status.is_success() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "identity provider returned {status}"
            )));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("identity provider payload: {e}")))?;
        Ok(info.sub)
    }

    async fn credential_call(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthTokens, AppError> {
        let response = self
            .http
            .post(format!("{}/{path}", self.base_url))
            .json(&CredentialsPayload { email, password })
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("identity provider: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| AppError::Internal(anyhow::anyhow!("identity provider payload: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ProviderError>(&body)
            .ok()
            .and_then(|e| e.error_description.or(e.error))
            .unwrap_or_else(|| body.clone());

        match status.as_u16() {
            401 | 403 => Err(AppError::Unauthorized),
            400 | 409 | 422 => Err(AppError::Validation(detail)),
            _ => Err(AppError::Internal(anyhow::anyhow!(
                "identity provider returned {status}: {detail}"
            ))),
        }
    }
}

/// Authenticated principal, extracted from the `Authorization: Bearer` header
/// by asking the identity provider.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let principal = state.auth.authenticate(token).await?;
        Ok(AuthUser(principal))
    }
}
