use anyhow::Context;
use axum::{Json, Router, routing::get};
use evaluator::{
    AnthropicClient, CriteriaProcessor, EvaluationStore, FfmpegDecoder, JudgeClient,
    LocalFileStore,
};
use serde_json::json;
use std::sync::Arc;
use storage::Database;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod features;
mod state;

use config::Config;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::evaluation::handlers::start_evaluation,
        features::evaluation::handlers::get_evaluation_progress,
        features::evaluation::handlers::get_latest_run,
        features::evaluation::handlers::extract_frames,
        features::submissions::handlers::list_submissions,
        features::criteria::handlers::generate_criteria,
    ),
    components(
        schemas(
            storage::dto::evaluation::StartEvaluationResponse,
            storage::dto::evaluation::EvaluationProgress,
            storage::dto::evaluation::RunPhase,
            storage::dto::evaluation::RunSummaryResponse,
            storage::dto::evaluation::BatchExtractionSummary,
            storage::dto::evaluation::ExtractionFailure,
            storage::dto::submission::SubmissionResponse,
            storage::dto::criteria::GenerateCriteriaRequest,
            storage::dto::criteria::GeneratedCriteriaResponse,
            storage::models::ProsCons,
            storage::models::ExtractionStatus,
            storage::models::EvaluationStatus,
            storage::models::RunStatus,
        )
    ),
    tags(
        (name = "evaluation", description = "Tournament runs, progress polling and frame extraction"),
        (name = "submissions", description = "Ranked submissions per task"),
        (name = "criteria", description = "Evaluation criteria generation"),
    )
)]
struct ApiDoc;

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Runs left `running` by a previous process can never finish and would block their task.
async fn recover_interrupted_runs(store: &dyn EvaluationStore) -> anyhow::Result<()> {
    let interrupted = store
        .fail_interrupted_runs("interrupted by restart")
        .await
        .context("Failed to recover interrupted runs")?;
    if interrupted > 0 {
        tracing::warn!("Marked {} interrupted evaluation run(s) as failed", interrupted);
    }
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", features::router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting submission evaluation API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!(
        "Connecting to database at: {}",
        config
            .database_url
            .split('@')
            .next_back()
            .unwrap_or("unknown")
    );
    let db = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Database migrations completed successfully");

    recover_interrupted_runs(&db).await?;

    let judge_config = config.judge_config();
    let judge = JudgeClient::new(&judge_config).context("Failed to build judge client")?;
    let criteria_llm = AnthropicClient::new(
        judge_config.base_url.clone(),
        judge_config.api_key.clone(),
        judge_config.model.clone(),
        judge_config.timeout,
    )
    .context("Failed to build criteria client")?;
    tracing::info!("Judge model: {}", judge_config.model);

    let state = AppState::new(
        Arc::new(db),
        Arc::new(LocalFileStore::new()),
        Arc::new(FfmpegDecoder::new(&config.ffmpeg_path, &config.ffprobe_path)),
        Arc::new(judge),
        CriteriaProcessor::new(Arc::new(criteria_llm)),
        config.extraction_config(),
        config.scheduler_config(),
    );

    let bind_address = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server at http://{}", bind_address);

    tracing::info!(
        "Swagger UI available at http://{}/swagger-ui/",
        bind_address
    );

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
