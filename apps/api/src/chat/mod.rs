//! Chat client — the single point of entry for the generative call that
//! answers visitor questions from an owner's extracted CV text. The call is
//! an external collaborator; everything before it (extraction, structuring,
//! prompt generation) is deterministic and lives in the pipeline.

pub mod handlers;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 1024;
const MAX_RETRIES: u32 = 3;

const SYSTEM_TEMPLATE: &str = "You are a friendly assistant on a personal portfolio page. \
Answer visitor questions about the CV below, in first person on behalf of its owner. \
Only use information present in the CV; say so when the answer is not covered.\n\nCV:\n";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with retry on 429/5xx.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    api_key: String,
}

impl ChatClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Answers a visitor question from the CV markdown.
    pub async fn answer_about_cv(&self, cv_markdown: &str, question: &str) -> Result<String, AppError> {
        let system = format!("{SYSTEM_TEMPLATE}{cv_markdown}");
        let request_body = MessagesRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system: &system,
            messages: vec![Message {
                role: "user",
                content: question,
            }],
        };

        let mut last_error: Option<AppError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Chat call attempt {attempt} failed, retrying after {}ms...",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(AppError::Ai(format!("HTTP error: {e}")));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Chat API returned {status}: {body}");
                last_error = Some(AppError::Ai(format!("API error {status}: {body}")));
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(AppError::Ai(format!("API error {status}: {message}")));
            }

            let payload: MessagesResponse = response
                .json()
                .await
                .map_err(|e| AppError::Ai(format!("Malformed API response: {e}")))?;

            let answer = payload
                .content
                .iter()
                .find(|b| b.block_type == "text")
                .and_then(|b| b.text.clone())
                .ok_or_else(|| AppError::Ai("Model returned empty content".to_string()))?;

            debug!("Chat call succeeded ({} chars)", answer.len());
            return Ok(answer);
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Ai(format!("Rate limited after {MAX_RETRIES} retries"))))
    }
}
