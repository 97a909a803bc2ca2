//! Pure arithmetic that turns per-category analyses into one suggestion.

use analysis_core::{
    FactorKind, InvestorAnalysis, RiskLevel, SentimentAnalysis, Suggestion, TechnicalAnalysis, Trend,
};
use std::collections::BTreeMap;

/// Neutral confidence when no factor contributed.
const NO_FACTOR_CONFIDENCE: f64 = 0.5;
const LABEL_THRESHOLD: f64 = 0.2;

/// One present analysis, viewed as a fusion factor.
#[derive(Debug, Clone, Copy)]
pub enum FactorReading<'a> {
    Sentiment(&'a SentimentAnalysis),
    Technical(&'a TechnicalAnalysis),
    Investor(&'a InvestorAnalysis),
}

impl<'a> FactorReading<'a> {
    pub fn kind(&self) -> FactorKind {
        match self {
            FactorReading::Sentiment(_) => FactorKind::Sentiment,
            FactorReading::Technical(_) => FactorKind::Technical,
            FactorReading::Investor(_) => FactorKind::Investor,
        }
    }

    /// Normalized contribution in [0, 1].
    pub fn score(&self) -> f64 {
        let raw = match self {
            FactorReading::Sentiment(s) => (s.overall_sentiment + 1.0) / 2.0,
            FactorReading::Technical(t) => (t.confidence + t.trend.score()) / 2.0,
            FactorReading::Investor(i) => (i.investor_sentiment + 1.0) / 2.0,
        };
        raw.clamp(0.0, 1.0)
    }

    pub fn reasoning(&self) -> &'static str {
        match self {
            FactorReading::Sentiment(s) => match s.overall_sentiment {
                v if v > LABEL_THRESHOLD => "Positive market sentiment and news coverage",
                v if v < -LABEL_THRESHOLD => "Negative market sentiment and news coverage",
                _ => "Neutral market sentiment",
            },
            FactorReading::Technical(t) => match t.trend {
                Trend::Bullish => "Strong technical indicators showing bullish trend",
                Trend::Bearish => "Technical indicators suggest bearish trend",
                Trend::Neutral => "Mixed technical signals",
            },
            FactorReading::Investor(i) => match i.investor_sentiment {
                v if v > LABEL_THRESHOLD => "Positive institutional and insider activity",
                v if v < -LABEL_THRESHOLD => "Negative institutional and insider activity",
                _ => "Neutral investor activity",
            },
        }
    }
}

/// Collect readings in fixed factor order: sentiment, technical, investor.
pub fn readings<'a>(
    sentiment: Option<&'a SentimentAnalysis>,
    technical: Option<&'a TechnicalAnalysis>,
    investor: Option<&'a InvestorAnalysis>,
) -> Vec<FactorReading<'a>> {
    [
        sentiment.map(FactorReading::Sentiment),
        technical.map(FactorReading::Technical),
        investor.map(FactorReading::Investor),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Weighted mean over the present factors only. Weights are renormalized so
/// they sum to 1.0 over whatever subset is present.
pub fn overall_confidence(readings: &[FactorReading<'_>]) -> f64 {
    let total_weight: f64 = readings.iter().map(|r| r.kind().weight()).sum();
    if total_weight <= 0.0 {
        return NO_FACTOR_CONFIDENCE;
    }
    let weighted: f64 = readings.iter().map(|r| r.score() * r.kind().weight()).sum();
    weighted / total_weight
}

/// Returns `(suggested_price, target_price)`.
pub fn price_targets(current_price: f64, technical: Option<&TechnicalAnalysis>) -> (f64, f64) {
    let Some(technical) = technical else {
        return (current_price, current_price * 1.1);
    };

    match technical.trend {
        Trend::Bullish => {
            let upper = technical.indicators.bb_upper.unwrap_or(current_price * 1.05);
            (current_price * 0.98, upper * 1.05)
        }
        Trend::Bearish => {
            let lower = technical.indicators.bb_lower.unwrap_or(current_price * 0.95);
            (current_price * 1.02, lower * 0.95)
        }
        Trend::Neutral => (current_price, current_price * 1.1),
    }
}

pub fn risk_factors(
    confidence: f64,
    technical: Option<&TechnicalAnalysis>,
    sentiment: Option<&SentimentAnalysis>,
) -> u32 {
    let mut risk = 0;

    if let Some(rsi) = technical.and_then(|t| t.indicators.rsi) {
        if rsi > 70.0 || rsi < 30.0 {
            risk += 1;
        }
    }

    if sentiment.is_some_and(|s| s.overall_sentiment.abs() > 0.5) {
        risk += 1;
    }

    if confidence < 0.4 {
        risk += 2;
    } else if confidence < 0.6 {
        risk += 1;
    }

    risk
}

/// Fuse whatever analyses are present into a suggestion priced off `current_price`.
pub fn fuse(
    symbol: &str,
    current_price: f64,
    sentiment: Option<&SentimentAnalysis>,
    technical: Option<&TechnicalAnalysis>,
    investor: Option<&InvestorAnalysis>,
) -> Suggestion {
    let readings = readings(sentiment, technical, investor);

    let confidence_score = overall_confidence(&readings);
    let reasoning = readings.iter().map(|r| r.reasoning().to_string()).collect();
    let factors: BTreeMap<FactorKind, f64> = readings.iter().map(|r| (r.kind(), r.score())).collect();
    let (suggested_price, target_price) = price_targets(current_price, technical);
    let risk_level = RiskLevel::from_risk_factors(risk_factors(confidence_score, technical, sentiment));

    Suggestion {
        symbol: symbol.to_string(),
        confidence_score,
        reasoning,
        factors,
        suggested_price,
        target_price,
        risk_level,
    }
}
