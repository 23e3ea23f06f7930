//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{analysis_llm::OpenAiAnalysisAdapter, db::DbAdapter},
    config::Config,
    error::ApiError,
    web::{
        ai_status_handler, analyze_class_handler, analyze_student_handler, rest::ApiDoc,
        state::AppState,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method},
    routing::get,
    Router,
};
use mood_insight_core::{AnalysisSource, AnalyzerSettings, EmotionAnalyzer};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Analyzer ---
    let settings = AnalyzerSettings {
        provider: config.ai_provider,
        model_timeout: config.ai_timeout,
    };
    let mut analyzer = EmotionAnalyzer::new(db_adapter.clone(), db_adapter.clone(), settings);
    match &config.openai_api_key {
        Some(api_key) => {
            let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            analyzer = analyzer.with_model(Arc::new(OpenAiAnalysisAdapter::new(
                openai_client,
                config.ai_model.clone(),
            )));
        }
        None if config.ai_provider == AnalysisSource::External => {
            warn!("AI_PROVIDER selects OpenAI but OPENAI_API_KEY is not set; using rule-based analysis");
        }
        None => {}
    }
    info!(
        ai_available = analyzer.is_ai_available(),
        model = %config.ai_model,
        "Analyzer ready"
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        analyzer,
        directory: db_adapter,
        config: config.clone(),
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/ai/status", get(ai_status_handler))
        .route("/ai/analyze-class/{class_id}", get(analyze_class_handler))
        .route("/ai/analyze-student/{student_id}", get(analyze_student_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
