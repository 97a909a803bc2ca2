use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    AnalysisError, Bar, InsiderActivity, InstitutionalActivity, InvestorAnalysis,
    MarketSentiment, SentimentAnalysis, TechnicalAnalysis,
};

// ---------------------------------------------------------------------------
// Collaborators: data sources the engines consume
// ---------------------------------------------------------------------------

/// Source of price data for a symbol
#[async_trait]
pub trait PriceDataProvider: Send + Sync {
    /// Chronological daily bars covering roughly `lookback_days`. May be empty.
    async fn get_price_history(&self, symbol: &str, lookback_days: i64) -> Result<Vec<Bar>, AnalysisError>;

    /// Latest traded price, `None` when the symbol has no quote.
    async fn get_current_price(&self, symbol: &str) -> Result<Option<f64>, AnalysisError>;
}

/// Source of free-form texts (headlines, posts) mentioning a symbol
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn get_news_texts(&self, symbol: &str) -> Result<Vec<String>, AnalysisError>;
    async fn get_social_texts(&self, symbol: &str) -> Result<Vec<String>, AnalysisError>;
}

/// Source of institutional, insider and notable-investor data.
/// `Ok(None)` means the source has nothing for the symbol.
#[async_trait]
pub trait InvestorDataProvider: Send + Sync {
    async fn get_institutional_flow(&self, symbol: &str) -> Result<Option<InstitutionalActivity>, AnalysisError>;
    async fn get_insider_flow(&self, symbol: &str) -> Result<Option<InsiderActivity>, AnalysisError>;
    /// Investor name to the set of symbols they hold.
    async fn get_notable_investor_holdings(&self) -> Result<BTreeMap<String, BTreeSet<String>>, AnalysisError>;
}

// ---------------------------------------------------------------------------
// Analyzers: total functions, failures are carried in the result's error field
// ---------------------------------------------------------------------------

/// Trait for technical analysis engines
#[async_trait]
pub trait TechnicalAnalyzer: Send + Sync {
    async fn analyze_technical(&self, symbol: &str) -> TechnicalAnalysis;
}

/// Trait for sentiment analysis engines
#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    async fn analyze_sentiment(&self, symbol: &str) -> SentimentAnalysis;
    async fn get_market_sentiment(&self) -> MarketSentiment;
}

/// Trait for investor activity engines
#[async_trait]
pub trait InvestorAnalyzer: Send + Sync {
    async fn analyze_investor_activity(&self, symbol: &str) -> InvestorAnalysis;
}
