mod auth;
mod builder;
mod chat;
mod config;
mod db;
mod errors;
mod extract;
mod models;
mod pipeline;
mod profile;
mod routes;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::AuthClient;
use crate::chat::ChatClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::extract::PdfTextExtractor;
use crate::pipeline::lock::RedisProcessLock;
use crate::pipeline::store::PgUploadStore;
use crate::pipeline::Pipeline;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::S3BlobStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CVChat API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database_url).await?;

    // Initialize Redis (per-upload advisory locks)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let blobs: Arc<dyn storage::BlobStore> =
        Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone()));
    info!("S3 client initialized");

    // Identity provider client
    let auth = Arc::new(AuthClient::new(config.auth_base_url.clone()));
    info!("Identity provider client initialized ({})", config.auth_base_url);

    // Chat client
    let chat = Arc::new(ChatClient::new(config.anthropic_api_key.clone()));
    info!("Chat client initialized (model: {})", chat::MODEL);

    // Upload pipeline: all collaborators injected here, at the composition root
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(PgUploadStore::new(pool.clone())),
        blobs.clone(),
        Arc::new(PdfTextExtractor),
        Arc::new(RedisProcessLock::new(redis)),
    ));

    let app_state = AppState {
        db: pool,
        pipeline,
        auth,
        chat,
        blobs,
        config: config.clone(),
    };

    let app = build_router(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: tighten CORS in production
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "cvchat-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
