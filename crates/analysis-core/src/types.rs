use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// OHLCV bar data, one per trading session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Direction reported by the technical engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl Trend {
    /// Score used when folding the trend into the technical factor.
    pub fn score(&self) -> f64 {
        match self {
            Trend::Bullish => 0.8,
            Trend::Bearish => 0.2,
            Trend::Neutral => 0.5,
        }
    }
}

/// Label for a single technical signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalLabel {
    Overbought,
    Oversold,
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// >= 0.2 positive, <= -0.2 negative, otherwise neutral.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.2 {
            SentimentLabel::Positive
        } else if score <= -0.2 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_risk_factors(risk_factors: u32) -> Self {
        match risk_factors {
            n if n >= 3 => RiskLevel::High,
            n if n >= 1 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

/// Analysis categories that can feed a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorKind {
    Sentiment,
    Technical,
    Investor,
}

impl FactorKind {
    pub const ALL: [FactorKind; 3] = [FactorKind::Sentiment, FactorKind::Technical, FactorKind::Investor];

    /// Fixed fusion weight. The three weights sum to 1.0.
    pub fn weight(&self) -> f64 {
        match self {
            FactorKind::Sentiment => 0.3,
            FactorKind::Technical => 0.4,
            FactorKind::Investor => 0.3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FactorKind::Sentiment => "sentiment",
            FactorKind::Technical => "technical",
            FactorKind::Investor => "investor",
        }
    }
}

/// Indicator values from the technical engine. `None` means unavailable
/// (not enough history for the lookback window).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub volume_sma: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    pub rsi: SignalLabel,
    pub moving_averages: SignalLabel,
    pub macd: SignalLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalAnalysis {
    pub symbol: String,
    pub current_price: f64,
    pub indicators: Indicators,
    /// Empty when the analysis could not be computed.
    pub signals: Option<Signals>,
    pub trend: Trend,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TechnicalAnalysis {
    pub fn unavailable(symbol: &str, error: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            current_price: 0.0,
            indicators: Indicators::default(),
            signals: None,
            trend: Trend::Neutral,
            confidence: 0.0,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub symbol: String,
    pub overall_sentiment: f64,
    pub news_sentiment: f64,
    pub social_sentiment: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SentimentAnalysis {
    pub fn unavailable(symbol: &str, error: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            overall_sentiment: 0.0,
            news_sentiment: 0.0,
            social_sentiment: 0.0,
            label: SentimentLabel::Neutral,
            confidence: 0.0,
            error: Some(error.into()),
        }
    }
}

/// Sentiment aggregated over a basket of market indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSentiment {
    pub market_sentiment: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
    pub indices: Vec<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionalHolder {
    pub name: String,
    pub shares: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionalTransaction {
    pub institution: String,
    pub action: TradeAction,
    pub shares: u64,
}

/// Institutional ownership snapshot and recent flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionalActivity {
    pub total_institutions: u32,
    pub total_shares_held: u64,
    pub percentage_owned: f64,
    pub top_holders: Vec<InstitutionalHolder>,
    pub recent_changes: Vec<InstitutionalTransaction>,
}

impl InstitutionalActivity {
    pub fn volume(&self, action: TradeAction) -> u64 {
        self.recent_changes
            .iter()
            .filter(|t| t.action == action)
            .map(|t| t.shares)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderTransaction {
    pub insider: String,
    pub action: TradeAction,
    pub shares: u64,
    pub date: String,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetActivity {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderActivity {
    pub total_insiders: u32,
    pub recent_transactions: Vec<InsiderTransaction>,
    pub net_activity: NetActivity,
}

/// Tracked well-known investors holding the symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotableInvestorInterest {
    pub interested_investors: Vec<String>,
    pub total_famous_investors: usize,
    pub sentiment: SentimentLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorAnalysis {
    pub symbol: String,
    pub institutional_ownership: Option<InstitutionalActivity>,
    pub insider_trading: Option<InsiderActivity>,
    pub famous_investors: Option<NotableInvestorInterest>,
    pub investor_sentiment: f64,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvestorAnalysis {
    pub fn unavailable(symbol: &str, error: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            institutional_ownership: None,
            insider_trading: None,
            famous_investors: None,
            investor_sentiment: 0.0,
            confidence: 0.0,
            error: Some(error.into()),
        }
    }
}

/// Fused buy suggestion for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub symbol: String,
    pub confidence_score: f64,
    pub reasoning: Vec<String>,
    pub factors: BTreeMap<FactorKind, f64>,
    pub suggested_price: f64,
    pub target_price: f64,
    pub risk_level: RiskLevel,
}

/// Per-category results for a single symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAnalysis {
    pub symbol: String,
    pub sentiment: Option<SentimentAnalysis>,
    pub technical: Option<TechnicalAnalysis>,
    pub investor_activity: Option<InvestorAnalysis>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_weights_sum_to_one() {
        let total: f64 = FactorKind::ALL.iter().map(|k| k.weight()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sentiment_label_thresholds() {
        assert_eq!(SentimentLabel::from_score(0.2), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_score(0.19), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_score(-0.2), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_score(0.0), SentimentLabel::Neutral);
    }

    #[test]
    fn test_risk_level_is_monotonic() {
        let levels: Vec<RiskLevel> = (0..6).map(RiskLevel::from_risk_factors).collect();
        assert_eq!(levels[0], RiskLevel::Low);
        assert_eq!(levels[1], RiskLevel::Medium);
        assert_eq!(levels[2], RiskLevel::Medium);
        assert_eq!(levels[3], RiskLevel::High);
        assert!(levels.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Trend::Bullish).unwrap(), "\"bullish\"");
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"medium\"");
        let mut factors = BTreeMap::new();
        factors.insert(FactorKind::Technical, 0.8);
        assert_eq!(serde_json::to_string(&factors).unwrap(), "{\"technical\":0.8}");
    }
}
