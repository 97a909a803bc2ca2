//! Suggestion and Sentiment API Routes
//!
//! Endpoints for per-stock analysis, buy suggestions and market sentiment.

use analysis_core::{FactorKind, MarketSentiment, StockAnalysis, Suggestion};
use analysis_orchestrator::{suggestion_key, MARKET_SENTIMENT_KEY};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::collections::BTreeSet;

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct AnalyzeStockRequest {
    pub symbol: String,
    #[serde(default = "default_true")]
    pub include_sentiment: bool,
    #[serde(default = "default_true")]
    pub include_technical: bool,
    #[serde(default = "default_true")]
    pub include_investor_activity: bool,
}

fn default_true() -> bool {
    true
}

impl AnalyzeStockRequest {
    fn factors(&self) -> BTreeSet<FactorKind> {
        [
            (self.include_sentiment, FactorKind::Sentiment),
            (self.include_technical, FactorKind::Technical),
            (self.include_investor_activity, FactorKind::Investor),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, kind)| kind)
        .collect()
    }
}

pub fn suggestion_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze-stock", post(analyze_stock))
        .route("/generate-buy-suggestions", post(generate_buy_suggestions))
        .route("/suggestions/:symbol", get(get_suggestion))
        .route("/market-sentiment", get(get_market_sentiment))
}

/// Uppercased ticker, or a 400 for anything that can't be one.
fn normalize_symbol(raw: &str) -> Result<String, AppError> {
    let symbol = raw.trim().to_uppercase();
    let valid = !symbol.is_empty()
        && symbol.len() <= 10
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^'));
    if valid {
        Ok(symbol)
    } else {
        Err(AppError::bad_request(format!("Invalid symbol: '{}'", raw)))
    }
}

fn all_factors() -> BTreeSet<FactorKind> {
    FactorKind::ALL.into_iter().collect()
}

async fn analyze_stock(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeStockRequest>,
) -> Result<Json<ApiResponse<StockAnalysis>>, AppError> {
    let symbol = normalize_symbol(&request.symbol)?;
    let analysis = state.generator.analyze_stock(&symbol, &request.factors()).await;
    Ok(Json(ApiResponse::success(analysis)))
}

async fn generate_buy_suggestions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Suggestion>>>, AppError> {
    let suggestions = state.batch.generate(&state.tracked_symbols, &all_factors()).await;

    for suggestion in &suggestions {
        state
            .suggestion_cache
            .insert(suggestion_key(&suggestion.symbol), suggestion.clone());
    }

    tracing::info!("Generated {} buy suggestions", suggestions.len());
    Ok(Json(ApiResponse::success(suggestions)))
}

async fn get_suggestion(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<Suggestion>>, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    let key = suggestion_key(&symbol);

    if let Some(cached) = state.suggestion_cache.get(&key) {
        tracing::debug!("Suggestion cache hit for {}", symbol);
        return Ok(Json(ApiResponse::success(cached)));
    }

    let suggestion = state
        .generator
        .generate_suggestion(&symbol, &all_factors())
        .await
        .ok_or_else(|| AppError::not_found("Suggestion not found"))?;

    state.suggestion_cache.insert(key, suggestion.clone());
    Ok(Json(ApiResponse::success(suggestion)))
}

async fn get_market_sentiment(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<MarketSentiment>>, AppError> {
    if let Some(cached) = state.market_cache.get(MARKET_SENTIMENT_KEY) {
        return Ok(Json(ApiResponse::success(cached)));
    }

    let sentiment = state.sentiment.get_market_sentiment().await;
    // Failed reads are not cached so the next request retries upstream
    if sentiment.error.is_none() {
        state.market_cache.insert(MARKET_SENTIMENT_KEY, sentiment.clone());
    }
    Ok(Json(ApiResponse::success(sentiment)))
}
