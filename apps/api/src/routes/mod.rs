pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth_handlers;
use crate::builder;
use crate::chat::handlers as chat_handlers;
use crate::pipeline::handlers as cv_handlers;
use crate::pipeline::MAX_UPLOAD_BYTES;
use crate::profile;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth (delegated to the identity provider)
        .route("/api/v1/auth/register", post(auth_handlers::handle_register))
        .route("/api/v1/auth/login", post(auth_handlers::handle_login))
        // CV upload pipeline
        .route("/api/v1/cv/upload", post(cv_handlers::handle_upload_cv))
        .route("/api/v1/cv/:upload_id", get(cv_handlers::handle_get_upload))
        .route(
            "/api/v1/cv/:upload_id/prompts",
            post(cv_handlers::handle_generate_prompts),
        )
        // Owner profile + portfolio builder
        .route(
            "/api/v1/profile",
            get(profile::handle_get_profile).put(profile::handle_put_profile),
        )
        .route("/api/v1/profile/avatar", post(profile::handle_upload_avatar))
        .route(
            "/api/v1/builder",
            get(builder::handle_get_builder).put(builder::handle_put_builder),
        )
        // Visitor-facing page + chat
        .route("/api/v1/public/:slug", get(chat_handlers::handle_public_page))
        .route(
            "/api/v1/public/:slug/chat",
            post(chat_handlers::handle_public_chat),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
