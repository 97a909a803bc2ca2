use analysis_core::{
    AnalysisError, InsiderActivity, InstitutionalActivity, InvestorAnalysis, InvestorAnalyzer,
    InvestorDataProvider, NetActivity, NotableInvestorInterest, SentimentLabel, TradeAction,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const INSTITUTIONAL_WEIGHT: f64 = 0.4;
const INSIDER_WEIGHT: f64 = 0.3;
const NOTABLE_WEIGHT: f64 = 0.3;

const INSIDER_POSITIVE: f64 = 0.3;
const NOTABLE_HELD: f64 = 0.2;

const ANALYSIS_CONFIDENCE: f64 = 0.75;

pub struct InvestorAnalysisEngine {
    source: Arc<dyn InvestorDataProvider>,
}

/// Net institutional flow in [-1, 1], `None` when there was no volume.
pub fn institutional_flow(activity: &InstitutionalActivity) -> Option<f64> {
    let buy_volume = activity.volume(TradeAction::Buy) as f64;
    let sell_volume = activity.volume(TradeAction::Sell) as f64;
    let total = buy_volume + sell_volume;
    if total > 0.0 {
        Some((buy_volume - sell_volume) / total)
    } else {
        None
    }
}

pub fn insider_component(activity: &InsiderActivity) -> f64 {
    if activity.net_activity == NetActivity::Positive {
        INSIDER_POSITIVE
    } else {
        -INSIDER_POSITIVE
    }
}

pub fn notable_component(interest: &NotableInvestorInterest) -> f64 {
    if interest.total_famous_investors > 0 {
        NOTABLE_HELD
    } else {
        -NOTABLE_HELD
    }
}

/// Investors whose holdings include `symbol`, in name order.
pub fn notable_interest(symbol: &str, holdings: &BTreeMap<String, BTreeSet<String>>) -> NotableInvestorInterest {
    let interested_investors: Vec<String> = holdings
        .iter()
        .filter(|(_, held)| held.contains(symbol))
        .map(|(name, _)| name.clone())
        .collect();
    let total_famous_investors = interested_investors.len();

    NotableInvestorInterest {
        interested_investors,
        total_famous_investors,
        sentiment: if total_famous_investors > 0 {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Neutral
        },
    }
}

/// Weighted component sum divided by the number of components that had data.
/// Missing components count in neither the sum nor the divisor; `None` when
/// no component had data.
pub fn investor_sentiment(
    institutional: Option<&InstitutionalActivity>,
    insider: Option<&InsiderActivity>,
    notable: Option<&NotableInvestorInterest>,
) -> Option<f64> {
    let components = [
        institutional.and_then(institutional_flow).map(|c| c * INSTITUTIONAL_WEIGHT),
        insider.map(|a| insider_component(a) * INSIDER_WEIGHT),
        notable.map(|n| notable_component(n) * NOTABLE_WEIGHT),
    ];

    let present: Vec<f64> = components.into_iter().flatten().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

impl InvestorAnalysisEngine {
    pub fn new(source: Arc<dyn InvestorDataProvider>) -> Self {
        Self { source }
    }

    fn log_failure<T>(symbol: &str, what: &str, result: &Result<T, AnalysisError>) {
        if let Err(e) = result {
            tracing::warn!("{} data unavailable for {}: {}", what, symbol, e);
        }
    }
}

#[async_trait]
impl InvestorAnalyzer for InvestorAnalysisEngine {
    async fn analyze_investor_activity(&self, symbol: &str) -> InvestorAnalysis {
        let (institutional, insider, holdings) = tokio::join!(
            self.source.get_institutional_flow(symbol),
            self.source.get_insider_flow(symbol),
            self.source.get_notable_investor_holdings(),
        );

        let holdings = holdings.map(|h| Some(notable_interest(symbol, &h)));

        Self::log_failure(symbol, "Institutional", &institutional);
        Self::log_failure(symbol, "Insider", &insider);
        Self::log_failure(symbol, "Notable investor", &holdings);

        let errors: Vec<String> = [institutional.as_ref().err(), insider.as_ref().err(), holdings.as_ref().err()]
            .into_iter()
            .flatten()
            .map(|e| e.to_string())
            .collect();

        let institutional = institutional.ok().flatten();
        let insider = insider.ok().flatten();
        let famous = holdings.ok().flatten();

        let Some(sentiment) = investor_sentiment(institutional.as_ref(), insider.as_ref(), famous.as_ref()) else {
            let mut reason = format!("no investor activity data for {}", symbol);
            if !errors.is_empty() {
                reason = format!("{} ({})", reason, errors.join("; "));
            }
            return InvestorAnalysis::unavailable(symbol, AnalysisError::DataUnavailable(reason).to_string());
        };
        tracing::debug!("Investor sentiment for {}: {:.4}", symbol, sentiment);

        InvestorAnalysis {
            symbol: symbol.to_string(),
            institutional_ownership: institutional,
            insider_trading: insider,
            famous_investors: famous,
            investor_sentiment: sentiment,
            confidence: ANALYSIS_CONFIDENCE,
            error: None,
        }
    }
}
