use analysis_core::{
    FactorKind, InvestorAnalysis, InvestorAnalyzer, PriceDataProvider, SentimentAnalysis,
    SentimentAnalyzer, StockAnalysis, Suggestion, TechnicalAnalysis, TechnicalAnalyzer,
};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;

pub mod batch;
pub mod cache;
pub mod fusion;

pub use batch::{SuggestionBatch, MAX_BATCH_SYMBOLS};
pub use cache::{suggestion_key, TtlCache, MARKET_SENTIMENT_KEY};
pub use fusion::FactorReading;

/// Fuses the configured scorers into buy suggestions. Scorers are injected;
/// a factor is only evaluated when it is both requested and configured.
pub struct SuggestionGenerator {
    prices: Arc<dyn PriceDataProvider>,
    technical: Option<Arc<dyn TechnicalAnalyzer>>,
    sentiment: Option<Arc<dyn SentimentAnalyzer>>,
    investor: Option<Arc<dyn InvestorAnalyzer>>,
}

impl SuggestionGenerator {
    pub fn new(prices: Arc<dyn PriceDataProvider>) -> Self {
        Self {
            prices,
            technical: None,
            sentiment: None,
            investor: None,
        }
    }

    pub fn with_technical(mut self, analyzer: Arc<dyn TechnicalAnalyzer>) -> Self {
        self.technical = Some(analyzer);
        self
    }

    pub fn with_sentiment(mut self, analyzer: Arc<dyn SentimentAnalyzer>) -> Self {
        self.sentiment = Some(analyzer);
        self
    }

    pub fn with_investor(mut self, analyzer: Arc<dyn InvestorAnalyzer>) -> Self {
        self.investor = Some(analyzer);
        self
    }

    /// Factor kinds that are configured and can therefore contribute.
    pub fn available_factors(&self) -> BTreeSet<FactorKind> {
        [
            self.sentiment.as_ref().map(|_| FactorKind::Sentiment),
            self.technical.as_ref().map(|_| FactorKind::Technical),
            self.investor.as_ref().map(|_| FactorKind::Investor),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Run the requested scorers concurrently.
    async fn run_scorers(
        &self,
        symbol: &str,
        factors: &BTreeSet<FactorKind>,
    ) -> (Option<SentimentAnalysis>, Option<TechnicalAnalysis>, Option<InvestorAnalysis>) {
        let sentiment = async {
            match &self.sentiment {
                Some(analyzer) if factors.contains(&FactorKind::Sentiment) => {
                    Some(analyzer.analyze_sentiment(symbol).await)
                }
                _ => None,
            }
        };
        let technical = async {
            match &self.technical {
                Some(analyzer) if factors.contains(&FactorKind::Technical) => {
                    Some(analyzer.analyze_technical(symbol).await)
                }
                _ => None,
            }
        };
        let investor = async {
            match &self.investor {
                Some(analyzer) if factors.contains(&FactorKind::Investor) => {
                    Some(analyzer.analyze_investor_activity(symbol).await)
                }
                _ => None,
            }
        };

        tokio::join!(sentiment, technical, investor)
    }

    /// Per-category analyses for `symbol`, without fusion.
    pub async fn analyze_stock(&self, symbol: &str, factors: &BTreeSet<FactorKind>) -> StockAnalysis {
        tracing::info!("Analyzing {} (factors: {:?})", symbol, factors);
        let (sentiment, technical, investor_activity) = self.run_scorers(symbol, factors).await;

        StockAnalysis {
            symbol: symbol.to_string(),
            sentiment,
            technical,
            investor_activity,
            timestamp: Utc::now(),
        }
    }

    /// Suggestion for `symbol`, or `None` when no usable current price exists.
    pub async fn generate_suggestion(&self, symbol: &str, factors: &BTreeSet<FactorKind>) -> Option<Suggestion> {
        let current_price = match self.prices.get_current_price(symbol).await {
            Ok(Some(price)) if price.is_finite() && price > 0.0 => price,
            Ok(_) => {
                tracing::warn!("No current price for {}, skipping suggestion", symbol);
                return None;
            }
            Err(e) => {
                tracing::warn!("Current price lookup failed for {}: {}", symbol, e);
                return None;
            }
        };

        let (sentiment, technical, investor) = self.run_scorers(symbol, factors).await;
        let suggestion = fusion::fuse(
            symbol,
            current_price,
            sentiment.as_ref(),
            technical.as_ref(),
            investor.as_ref(),
        );

        if !suggestion.confidence_score.is_finite() || !suggestion.target_price.is_finite() {
            tracing::warn!("Degenerate suggestion for {}, dropping it", symbol);
            return None;
        }

        tracing::info!(
            "Suggestion for {}: confidence {:.3}, risk {:?}, target {:.2}",
            symbol,
            suggestion.confidence_score,
            suggestion.risk_level,
            suggestion.target_price
        );
        Some(suggestion)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use analysis_core::{
        AnalysisError, Bar, Indicators, MarketSentiment, SentimentLabel, Trend,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct StubPrices {
        pub prices: HashMap<String, f64>,
        pub failing: Vec<String>,
    }

    impl StubPrices {
        pub fn with(mut self, symbol: &str, price: f64) -> Self {
            self.prices.insert(symbol.to_string(), price);
            self
        }
    }

    #[async_trait]
    impl PriceDataProvider for StubPrices {
        async fn get_price_history(&self, _symbol: &str, _lookback_days: i64) -> Result<Vec<Bar>, AnalysisError> {
            Ok(Vec::new())
        }

        async fn get_current_price(&self, symbol: &str) -> Result<Option<f64>, AnalysisError> {
            if self.failing.iter().any(|s| s == symbol) {
                return Err(AnalysisError::UpstreamFailure("quote feed down".to_string()));
            }
            Ok(self.prices.get(symbol).copied())
        }
    }

    pub struct StubTechnical {
        pub trend: Trend,
        pub indicators: Indicators,
        pub calls: AtomicUsize,
    }

    impl StubTechnical {
        pub fn new(trend: Trend, indicators: Indicators) -> Self {
            Self { trend, indicators, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl TechnicalAnalyzer for StubTechnical {
        async fn analyze_technical(&self, symbol: &str) -> TechnicalAnalysis {
            self.calls.fetch_add(1, Ordering::SeqCst);
            TechnicalAnalysis {
                symbol: symbol.to_string(),
                current_price: 100.0,
                indicators: self.indicators.clone(),
                signals: None,
                trend: self.trend,
                confidence: 0.8,
                error: None,
            }
        }
    }

    pub struct StubSentiment(pub f64);

    #[async_trait]
    impl SentimentAnalyzer for StubSentiment {
        async fn analyze_sentiment(&self, symbol: &str) -> SentimentAnalysis {
            SentimentAnalysis {
                symbol: symbol.to_string(),
                overall_sentiment: self.0,
                news_sentiment: self.0,
                social_sentiment: self.0,
                label: SentimentLabel::from_score(self.0),
                confidence: 0.85,
                error: None,
            }
        }

        async fn get_market_sentiment(&self) -> MarketSentiment {
            MarketSentiment {
                market_sentiment: self.0,
                label: SentimentLabel::from_score(self.0),
                confidence: 0.8,
                indices: vec!["^GSPC".to_string()],
                timestamp: Utc::now(),
                error: None,
            }
        }
    }

    pub struct StubInvestor(pub f64);

    #[async_trait]
    impl InvestorAnalyzer for StubInvestor {
        async fn analyze_investor_activity(&self, symbol: &str) -> InvestorAnalysis {
            InvestorAnalysis {
                symbol: symbol.to_string(),
                institutional_ownership: None,
                insider_trading: None,
                famous_investors: None,
                investor_sentiment: self.0,
                confidence: 0.75,
                error: None,
            }
        }
    }

    pub fn all_factors() -> BTreeSet<FactorKind> {
        FactorKind::ALL.into_iter().collect()
    }

    pub fn generator(prices: StubPrices) -> SuggestionGenerator {
        SuggestionGenerator::new(Arc::new(prices))
            .with_technical(Arc::new(StubTechnical::new(
                Trend::Bullish,
                Indicators { bb_upper: Some(110.0), rsi: Some(55.0), ..Indicators::default() },
            )))
            .with_sentiment(Arc::new(StubSentiment(0.4)))
            .with_investor(Arc::new(StubInvestor(0.1)))
    }
}
