use analysis_core::{
    stats, AnalysisError, MarketSentiment, SentimentAnalysis, SentimentAnalyzer, SentimentLabel, TextSource,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

pub mod lexicon;
pub use lexicon::Lexicon;

/// S&P 500, Dow Jones, NASDAQ Composite
pub const MARKET_INDICES: &[&str] = &["^GSPC", "^DJI", "^IXIC"];

const NEWS_WEIGHT: f64 = 0.6;
const SOCIAL_WEIGHT: f64 = 0.4;
const ANALYSIS_CONFIDENCE: f64 = 0.85;
const MARKET_CONFIDENCE: f64 = 0.8;

pub struct SentimentAnalysisEngine {
    texts: Arc<dyn TextSource>,
    lexicon: Lexicon,
}

impl SentimentAnalysisEngine {
    pub fn new(texts: Arc<dyn TextSource>) -> Self {
        Self {
            texts,
            lexicon: Lexicon::financial(),
        }
    }

    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    /// Weighted blend of the channels that actually had texts. A channel with
    /// no texts drops out of both the sum and the weight total.
    fn blend(news: Option<f64>, social: Option<f64>) -> f64 {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for (score, weight) in [(news, NEWS_WEIGHT), (social, SOCIAL_WEIGHT)] {
            if let Some(s) = score {
                weighted += s * weight;
                total_weight += weight;
            }
        }
        if total_weight > 0.0 {
            weighted / total_weight
        } else {
            0.0
        }
    }

    fn channel_score(&self, texts: &[String]) -> Option<f64> {
        if texts.is_empty() {
            None
        } else {
            Some(self.lexicon.mean_polarity(texts))
        }
    }
}

#[async_trait]
impl SentimentAnalyzer for SentimentAnalysisEngine {
    async fn analyze_sentiment(&self, symbol: &str) -> SentimentAnalysis {
        let (news_result, social_result) = tokio::join!(
            self.texts.get_news_texts(symbol),
            self.texts.get_social_texts(symbol),
        );

        let (news, social) = match (news_result, social_result) {
            (Ok(news), Ok(social)) => (news, social),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Sentiment sources unavailable for {}: {}", symbol, e);
                return SentimentAnalysis::unavailable(symbol, e.to_string());
            }
        };

        let news_sentiment = self.channel_score(&news);
        let social_sentiment = self.channel_score(&social);
        if news_sentiment.is_none() && social_sentiment.is_none() {
            let err = AnalysisError::DataUnavailable(format!("no news or social texts for {}", symbol));
            tracing::warn!("{}", err);
            return SentimentAnalysis::unavailable(symbol, err.to_string());
        }
        let overall = Self::blend(news_sentiment, social_sentiment);

        tracing::debug!(
            "Sentiment for {}: {:.3} ({} news, {} social texts)",
            symbol,
            overall,
            news.len(),
            social.len()
        );

        SentimentAnalysis {
            symbol: symbol.to_string(),
            overall_sentiment: overall,
            news_sentiment: news_sentiment.unwrap_or(0.0),
            social_sentiment: social_sentiment.unwrap_or(0.0),
            label: SentimentLabel::from_score(overall),
            confidence: ANALYSIS_CONFIDENCE,
            error: None,
        }
    }

    async fn get_market_sentiment(&self) -> MarketSentiment {
        let futures = MARKET_INDICES.iter().map(|index| self.analyze_sentiment(index));
        let analyses = futures_util::future::join_all(futures).await;

        let failed: Vec<String> = analyses
            .iter()
            .filter_map(|a| a.error.as_ref().map(|e| format!("{}: {}", a.symbol, e)))
            .collect();
        let average = stats::mean_present(
            analyses
                .iter()
                .map(|a| a.error.is_none().then_some(a.overall_sentiment)),
        );

        let indices = MARKET_INDICES.iter().map(|s| s.to_string()).collect();
        match average {
            Some(market_sentiment) => {
                if !failed.is_empty() {
                    tracing::warn!("Market sentiment excludes failed indices: {}", failed.join("; "));
                }
                MarketSentiment {
                    market_sentiment,
                    label: SentimentLabel::from_score(market_sentiment),
                    confidence: MARKET_CONFIDENCE,
                    indices,
                    timestamp: Utc::now(),
                    error: None,
                }
            }
            None => MarketSentiment {
                market_sentiment: 0.0,
                label: SentimentLabel::Neutral,
                confidence: 0.0,
                indices,
                timestamp: Utc::now(),
                error: Some(format!("No index sentiment available ({})", failed.join("; "))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::AnalysisError;
    use std::collections::HashMap;

    #[derive(Default)]
    struct StubTexts {
        news: HashMap<String, Vec<String>>,
        social: HashMap<String, Vec<String>>,
        failing: Vec<String>,
    }

    impl StubTexts {
        fn with(mut self, symbol: &str, news: &[&str], social: &[&str]) -> Self {
            self.news.insert(symbol.to_string(), news.iter().map(|s| s.to_string()).collect());
            self.social.insert(symbol.to_string(), social.iter().map(|s| s.to_string()).collect());
            self
        }

        fn failing(mut self, symbol: &str) -> Self {
            self.failing.push(symbol.to_string());
            self
        }
    }

    #[async_trait]
    impl TextSource for StubTexts {
        async fn get_news_texts(&self, symbol: &str) -> Result<Vec<String>, AnalysisError> {
            if self.failing.iter().any(|s| s == symbol) {
                return Err(AnalysisError::UpstreamFailure("news feed down".to_string()));
            }
            Ok(self.news.get(symbol).cloned().unwrap_or_default())
        }

        async fn get_social_texts(&self, symbol: &str) -> Result<Vec<String>, AnalysisError> {
            Ok(self.social.get(symbol).cloned().unwrap_or_default())
        }
    }

    fn engine(stub: StubTexts) -> SentimentAnalysisEngine {
        SentimentAnalysisEngine::new(Arc::new(stub))
    }

    #[tokio::test]
    async fn test_weighted_overall() {
        // news: good (0.7); social: bad (-0.7)
        let engine = engine(StubTexts::default().with("AAPL", &["good quarter"], &["bad call"]));
        let result = engine.analyze_sentiment("AAPL").await;

        assert!((result.news_sentiment - 0.7).abs() < 1e-12);
        assert!((result.social_sentiment + 0.7).abs() < 1e-12);
        assert!((result.overall_sentiment - (0.6 * 0.7 - 0.4 * 0.7)).abs() < 1e-12);
        assert_eq!(result.label, SentimentLabel::Neutral);
        assert_eq!(result.confidence, 0.85);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_positive_label() {
        let engine = engine(StubTexts::default().with("MSFT", &["great results"], &["good momentum"]));
        let result = engine.analyze_sentiment("MSFT").await;
        assert!(result.overall_sentiment >= 0.2);
        assert_eq!(result.label, SentimentLabel::Positive);
    }

    #[tokio::test]
    async fn test_missing_channel_is_excluded() {
        let engine = engine(StubTexts::default().with("TSLA", &[], &["crash incoming"]));
        let result = engine.analyze_sentiment("TSLA").await;
        assert_eq!(result.news_sentiment, 0.0);
        assert!((result.overall_sentiment - result.social_sentiment).abs() < 1e-12);
        assert_eq!(result.label, SentimentLabel::Negative);
    }

    #[tokio::test]
    async fn test_no_texts_is_unavailable() {
        let result = engine(StubTexts::default()).analyze_sentiment("ZZZ").await;
        assert_eq!(result.overall_sentiment, 0.0);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.label, SentimentLabel::Neutral);
        assert!(result.error.unwrap().contains("no news or social texts"));
    }

    #[tokio::test]
    async fn test_source_failure_yields_default() {
        let result = engine(StubTexts::default().failing("AAPL")).analyze_sentiment("AAPL").await;
        assert_eq!(result.overall_sentiment, 0.0);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.label, SentimentLabel::Neutral);
        assert!(result.error.unwrap().contains("news feed down"));
    }

    #[tokio::test]
    async fn test_market_sentiment_is_mean_of_indices() {
        let stub = StubTexts::default()
            .with("^GSPC", &["good"], &["good"])
            .with("^DJI", &["bad"], &["bad"])
            .with("^IXIC", &["great"], &["great"]);
        let result = engine(stub).get_market_sentiment().await;
        let expected = (0.7 - 0.7 + 0.8) / 3.0;
        assert!((result.market_sentiment - expected).abs() < 1e-12);
        assert_eq!(result.label, SentimentLabel::Positive);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.indices.len(), 3);
    }

    #[tokio::test]
    async fn test_market_sentiment_skips_failed_index() {
        let stub = StubTexts::default()
            .with("^GSPC", &["bad"], &["bad"])
            .with("^IXIC", &["bad"], &["bad"])
            .failing("^DJI");
        let result = engine(stub).get_market_sentiment().await;
        assert!((result.market_sentiment + 0.7).abs() < 1e-12);
        assert_eq!(result.label, SentimentLabel::Negative);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_market_sentiment_all_failed() {
        let stub = StubTexts::default().failing("^GSPC").failing("^DJI").failing("^IXIC");
        let result = engine(stub).get_market_sentiment().await;
        assert_eq!(result.market_sentiment, 0.0);
        assert_eq!(result.confidence, 0.0);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_market_sentiment_skips_index_without_texts() {
        let stub = StubTexts::default()
            .with("^GSPC", &["good"], &["good"])
            .with("^IXIC", &["good"], &["good"]);
        let result = engine(stub).get_market_sentiment().await;
        assert!((result.market_sentiment - 0.7).abs() < 1e-12);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_market_sentiment_is_repeatable() {
        let stub = StubTexts::default()
            .with("^GSPC", &["strong rally"], &["not bad"])
            .with("^DJI", &["weak outlook"], &[])
            .with("^IXIC", &["record highs"], &["to the moon"]);
        let engine = engine(stub);
        let first = engine.get_market_sentiment().await;
        let second = engine.get_market_sentiment().await;
        // Only the observation time may differ
        assert_eq!(MarketSentiment { timestamp: first.timestamp, ..second }, first);
    }

    #[tokio::test]
    async fn test_analysis_is_idempotent() {
        let engine = engine(StubTexts::default().with("KO", &["strong growth", "not good"], &["to the moon"]));
        assert_eq!(engine.analyze_sentiment("KO").await, engine.analyze_sentiment("KO").await);
    }
}
