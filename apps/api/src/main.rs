mod config;
mod db;
mod errors;
mod extract;
mod generation;
mod llm_client;
mod models;
mod orders;
mod payments;
mod processor;
mod queue;
mod routes;
mod state;
mod storage;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::create_pool;
use crate::extract::DocumentExtractor;
use crate::generation::LlmContentGenerator;
use crate::llm_client::LlmClient;
use crate::orders::store::PgOrderStore;
use crate::processor::OrderProcessor;
use crate::queue::{run_worker, RedisOrderQueue};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::S3ArtifactStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL (orders)
    let db = create_pool(&config.database_url).await?;
    let orders = Arc::new(PgOrderStore::new(db));

    // Redis (order queue)
    let redis = redis::Client::open(config.redis_url.clone())?;
    let queue = RedisOrderQueue::new(redis, config.order_queue_key.clone());
    info!(key = %config.order_queue_key, "Redis order queue initialized");

    // S3 / MinIO (resumes and generated artifacts)
    let s3 = build_s3_client(&config).await;
    let artifacts = Arc::new(S3ArtifactStore::new(s3, config.s3_bucket.clone()));
    info!(bucket = %config.s3_bucket, "S3 client initialized");

    // LLM
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.timeouts.generation);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let processor = Arc::new(OrderProcessor::new(
        orders.clone(),
        artifacts.clone(),
        Arc::new(DocumentExtractor),
        Arc::new(LlmContentGenerator::new(llm)),
        config.timeouts,
    ));

    for worker in 0..config.order_workers.max(1) {
        tokio::spawn(run_worker(
            worker,
            config.queue_consumer.clone(),
            queue.clone(),
            processor.clone(),
        ));
    }
    info!(workers = config.order_workers.max(1), "Order workers started");

    let state = AppState {
        orders,
        artifacts,
        queue: Arc::new(queue),
        processor,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's domain is fixed

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
        "resume-api-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
