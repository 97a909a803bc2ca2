//! Canned text and investor data for running the service without paid
//! news, 13F or Form 4 feeds.

use analysis_core::{
    AnalysisError, InsiderActivity, InsiderTransaction, InstitutionalActivity, InstitutionalHolder,
    InstitutionalTransaction, InvestorDataProvider, NetActivity, TextSource, TradeAction,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

const NEWS_TEMPLATES: &[&str] = &[
    "{sym} shows strong quarterly performance",
    "Analysts bullish on {sym} future prospects",
    "{sym} faces market challenges",
    "Investors optimistic about {sym} growth",
];

const SOCIAL_TEMPLATES: &[&str] = &[
    "${sym} looking good today!",
    "Not sure about ${sym} anymore",
    "${sym} to the moon!",
    "${sym} earnings beat expectations",
];

const NOTABLE_HOLDINGS: &[(&str, &[&str])] = &[
    ("Warren Buffett", &["BRK-B", "AAPL", "KO", "BAC"]),
    ("Bill Gates", &["MSFT", "BRK-B", "CNI", "WM"]),
    ("Mark Zuckerberg", &["META", "JPM", "V", "MA"]),
    ("Elon Musk", &["TSLA", "SPACE", "XOM", "CVX"]),
    ("Cathie Wood", &["TSLA", "COIN", "SQ", "ROKU"]),
];

/// Offline stand-in for the text and investor feeds. Every symbol gets the
/// same templated headlines and ownership picture.
#[derive(Debug, Clone, Default)]
pub struct SampleMarketData;

impl SampleMarketData {
    pub fn new() -> Self {
        Self
    }

    fn render(templates: &[&str], symbol: &str) -> Vec<String> {
        templates.iter().map(|t| t.replace("{sym}", symbol)).collect()
    }
}

#[async_trait]
impl TextSource for SampleMarketData {
    async fn get_news_texts(&self, symbol: &str) -> Result<Vec<String>, AnalysisError> {
        Ok(Self::render(NEWS_TEMPLATES, symbol))
    }

    async fn get_social_texts(&self, symbol: &str) -> Result<Vec<String>, AnalysisError> {
        Ok(Self::render(SOCIAL_TEMPLATES, symbol))
    }
}

#[async_trait]
impl InvestorDataProvider for SampleMarketData {
    async fn get_institutional_flow(&self, _symbol: &str) -> Result<Option<InstitutionalActivity>, AnalysisError> {
        let holder = |name: &str, shares: u64, percentage: f64| InstitutionalHolder {
            name: name.to_string(),
            shares,
            percentage,
        };
        let change = |institution: &str, action: TradeAction, shares: u64| InstitutionalTransaction {
            institution: institution.to_string(),
            action,
            shares,
        };

        Ok(Some(InstitutionalActivity {
            total_institutions: 1250,
            total_shares_held: 850_000_000,
            percentage_owned: 45.2,
            top_holders: vec![
                holder("Vanguard Group", 85_000_000, 4.5),
                holder("BlackRock", 75_000_000, 4.0),
                holder("State Street", 65_000_000, 3.4),
            ],
            recent_changes: vec![
                change("Fidelity", TradeAction::Buy, 5_000_000),
                change("T. Rowe Price", TradeAction::Sell, 2_000_000),
            ],
        }))
    }

    async fn get_insider_flow(&self, _symbol: &str) -> Result<Option<InsiderActivity>, AnalysisError> {
        Ok(Some(InsiderActivity {
            total_insiders: 15,
            recent_transactions: vec![
                InsiderTransaction {
                    insider: "CEO".to_string(),
                    action: TradeAction::Buy,
                    shares: 10_000,
                    date: "2024-01-15".to_string(),
                    price: 150.25,
                },
                InsiderTransaction {
                    insider: "CFO".to_string(),
                    action: TradeAction::Sell,
                    shares: 5_000,
                    date: "2024-01-10".to_string(),
                    price: 148.75,
                },
            ],
            net_activity: NetActivity::Positive,
        }))
    }

    async fn get_notable_investor_holdings(&self) -> Result<BTreeMap<String, BTreeSet<String>>, AnalysisError> {
        Ok(NOTABLE_HOLDINGS
            .iter()
            .map(|(name, tickers)| {
                (
                    name.to_string(),
                    tickers.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect())
    }
}
