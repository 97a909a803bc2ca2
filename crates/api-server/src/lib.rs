use analysis_core::{MarketSentiment, SentimentAnalyzer, Suggestion};
use analysis_orchestrator::{SuggestionBatch, SuggestionGenerator, TtlCache};
use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use investor_analysis::InvestorAnalysisEngine;
use market_data::{PolygonClient, SampleMarketData};
use sentiment_analysis::SentimentAnalysisEngine;
use serde::Serialize;
use std::sync::Arc;
use technical_analysis::TechnicalAnalysisEngine;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod suggestion_routes;

pub use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<SuggestionGenerator>,
    pub batch: Arc<SuggestionBatch>,
    pub sentiment: Arc<dyn SentimentAnalyzer>,
    pub suggestion_cache: Arc<TtlCache<Suggestion>>,
    pub market_cache: Arc<TtlCache<MarketSentiment>>,
    pub tracked_symbols: Arc<Vec<String>>,
}

impl AppState {
    /// Wire the engines against Polygon prices and the sample text/investor feeds.
    pub fn from_config(config: &ServerConfig) -> Self {
        let polygon = Arc::new(PolygonClient::new(
            config.polygon_api_key.clone(),
            config.polygon_rate_limit,
        ));
        let sample = Arc::new(SampleMarketData::new());

        let sentiment: Arc<dyn SentimentAnalyzer> = Arc::new(SentimentAnalysisEngine::new(sample.clone()));
        let generator = SuggestionGenerator::new(polygon.clone())
            .with_technical(Arc::new(
                TechnicalAnalysisEngine::new(polygon).with_lookback_days(config.price_lookback_days),
            ))
            .with_sentiment(sentiment.clone())
            .with_investor(Arc::new(InvestorAnalysisEngine::new(sample)));

        Self::new(Arc::new(generator), sentiment, config)
    }

    pub fn new(
        generator: Arc<SuggestionGenerator>,
        sentiment: Arc<dyn SentimentAnalyzer>,
        config: &ServerConfig,
    ) -> Self {
        let batch = SuggestionBatch::new(generator.clone()).with_max_symbols(config.max_batch_symbols);
        Self {
            generator,
            batch: Arc::new(batch),
            sentiment,
            suggestion_cache: Arc::new(TtlCache::new(config.suggestion_cache_ttl_secs)),
            market_cache: Arc::new(TtlCache::new(config.market_sentiment_cache_ttl_secs)),
            tracked_symbols: Arc::new(config.tracked_symbols.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Handler error: an HTTP status plus the underlying cause.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, anyhow::anyhow!(message.into()))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        }
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.error.to_string()),
        };
        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "ai-analysis",
    })
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|s| s.trim().parse().ok()).collect();

    let allow_origin = if parsed.is_empty() {
        tracing::warn!("CORS_ORIGINS contains no valid origins, allowing any");
        AllowOrigin::any()
    } else {
        tracing::info!("CORS configured with {} allowed origins", parsed.len());
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(suggestion_routes::suggestion_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        "Starting analysis service (tracking {} symbols, batch limit {})",
        config.tracked_symbols.len(),
        config.max_batch_symbols
    );

    let state = AppState::from_config(&config);
    let app = build_router(state, cors_layer(&config.cors_origins));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
