use analysis_core::{
    AnalysisError, Bar, Indicators, PriceDataProvider, SignalLabel, Signals, TechnicalAnalysis, TechnicalAnalyzer, Trend,
};
use async_trait::async_trait;
use std::sync::Arc;

use crate::indicators::*;

/// Roughly six months of daily sessions.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 182;

/// Confidence attached to a successfully computed analysis.
const ANALYSIS_CONFIDENCE: f64 = 0.8;

const RSI_PERIOD: usize = 14;
const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const BB_PERIOD: usize = 20;
const BB_STD_DEV: f64 = 2.0;
const VOLUME_PERIOD: usize = 20;

pub struct TechnicalAnalysisEngine {
    prices: Arc<dyn PriceDataProvider>,
    lookback_days: i64,
}

/// Last value of an indicator series, treating NaN/inf as unavailable.
fn last_finite(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| v.is_finite())
}

impl TechnicalAnalysisEngine {
    pub fn new(prices: Arc<dyn PriceDataProvider>) -> Self {
        Self {
            prices,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    pub fn with_lookback_days(mut self, lookback_days: i64) -> Self {
        self.lookback_days = lookback_days;
        self
    }

    /// Compute the latest value of every indicator. Windows longer than the
    /// history come back as `None`.
    pub fn compute_indicators(bars: &[Bar]) -> Indicators {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let macd_result = macd(&closes, 12, 26, 9);
        let bb = bollinger_bands(&closes, BB_PERIOD, BB_STD_DEV);

        Indicators {
            sma_20: last_finite(&sma(&closes, 20)),
            sma_50: last_finite(&sma(&closes, 50)),
            ema_12: last_finite(&ema(&closes, 12)),
            ema_26: last_finite(&ema(&closes, 26)),
            rsi: last_finite(&rsi(&closes, RSI_PERIOD)),
            macd: last_finite(&macd_result.macd_line),
            macd_signal: last_finite(&macd_result.signal_line),
            macd_histogram: last_finite(&macd_result.histogram),
            bb_upper: last_finite(&bb.upper),
            bb_middle: last_finite(&bb.middle),
            bb_lower: last_finite(&bb.lower),
            volume_sma: last_finite(&sma(&volumes, VOLUME_PERIOD)),
        }
    }

    /// Derive per-indicator signals from the indicator values and current price.
    pub fn generate_signals(indicators: &Indicators, current_price: f64) -> Signals {
        let rsi = match indicators.rsi {
            Some(v) if v > RSI_OVERBOUGHT => SignalLabel::Overbought,
            Some(v) if v < RSI_OVERSOLD => SignalLabel::Oversold,
            _ => SignalLabel::Neutral,
        };

        // Missing averages fall back to the current price, which yields neutral.
        let sma_20 = indicators.sma_20.unwrap_or(current_price);
        let sma_50 = indicators.sma_50.unwrap_or(current_price);
        let moving_averages = if current_price > sma_20 && sma_20 > sma_50 {
            SignalLabel::Bullish
        } else if current_price < sma_20 && sma_20 < sma_50 {
            SignalLabel::Bearish
        } else {
            SignalLabel::Neutral
        };

        let macd = if indicators.macd.unwrap_or(0.0) > indicators.macd_signal.unwrap_or(0.0) {
            SignalLabel::Bullish
        } else {
            SignalLabel::Bearish
        };

        Signals {
            rsi,
            moving_averages,
            macd,
        }
    }

    /// Majority vote of the RSI extreme (oversold votes bullish, overbought
    /// votes bearish) and MACD versus its signal line. Ties are neutral.
    pub fn determine_trend(indicators: &Indicators) -> Trend {
        let mut bullish_votes = 0;
        let mut bearish_votes = 0;

        match indicators.rsi {
            Some(v) if v < RSI_OVERSOLD => bullish_votes += 1,
            Some(v) if v > RSI_OVERBOUGHT => bearish_votes += 1,
            _ => {}
        }

        if indicators.macd.unwrap_or(0.0) > indicators.macd_signal.unwrap_or(0.0) {
            bullish_votes += 1;
        } else {
            bearish_votes += 1;
        }

        if bullish_votes > bearish_votes {
            Trend::Bullish
        } else if bearish_votes > bullish_votes {
            Trend::Bearish
        } else {
            Trend::Neutral
        }
    }

    /// Full analysis over an already-fetched history.
    pub fn analyze_bars(symbol: &str, bars: &[Bar]) -> TechnicalAnalysis {
        let current_price = match bars.last().map(|b| b.close) {
            Some(price) if price.is_finite() => price,
            Some(_) => {
                let err = AnalysisError::ComputationDegenerate("latest close is not a number".to_string());
                return TechnicalAnalysis::unavailable(symbol, err.to_string());
            }
            None => {
                let err = AnalysisError::DataUnavailable(format!("no price history for {}", symbol));
                return TechnicalAnalysis::unavailable(symbol, err.to_string());
            }
        };

        if bars.len() < 50 {
            tracing::debug!(
                "Only {} bars for {}, long-window indicators will be unavailable",
                bars.len(),
                symbol
            );
        }

        let indicators = Self::compute_indicators(bars);
        let signals = Self::generate_signals(&indicators, current_price);
        let trend = Self::determine_trend(&indicators);

        TechnicalAnalysis {
            symbol: symbol.to_string(),
            current_price,
            indicators,
            signals: Some(signals),
            trend,
            confidence: ANALYSIS_CONFIDENCE,
            error: None,
        }
    }
}

#[async_trait]
impl TechnicalAnalyzer for TechnicalAnalysisEngine {
    async fn analyze_technical(&self, symbol: &str) -> TechnicalAnalysis {
        match self.prices.get_price_history(symbol, self.lookback_days).await {
            Ok(bars) => {
                tracing::debug!("Running technical analysis for {} with {} bars", symbol, bars.len());
                Self::analyze_bars(symbol, &bars)
            }
            Err(e) => {
                tracing::warn!("Price history unavailable for {}: {}", symbol, e);
                TechnicalAnalysis::unavailable(symbol, e.to_string())
            }
        }
    }
}
