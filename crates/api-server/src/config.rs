use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::ops::RangeInclusive;

const LOOKBACK_DAYS_RANGE: RangeInclusive<i64> = 1..=3650;
const CACHE_TTL_SECS_RANGE: RangeInclusive<i64> = 1..=604_800;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    // External APIs
    pub polygon_api_key: String,
    pub polygon_rate_limit: usize,          // requests per minute

    // Analysis
    pub price_lookback_days: i64,           // ~6 months of daily bars
    pub tracked_symbols: Vec<String>,
    pub max_batch_symbols: usize,

    // Caching
    pub suggestion_cache_ttl_secs: i64,
    pub market_sentiment_cache_ttl_secs: i64,

    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            host: var("HOST", "0.0.0.0"),
            port: var("PORT", "8000")
                .parse()
                .context("PORT must be a valid port number")?,

            polygon_api_key: lookup("POLYGON_API_KEY")
                .filter(|k| !k.trim().is_empty())
                .context("POLYGON_API_KEY not set")?,
            polygon_rate_limit: var("POLYGON_RATE_LIMIT", "500")
                .parse()
                .context("POLYGON_RATE_LIMIT must be an integer")?,

            price_lookback_days: bounded(
                &var("PRICE_LOOKBACK_DAYS", "182"),
                "PRICE_LOOKBACK_DAYS",
                LOOKBACK_DAYS_RANGE,
            )?,
            tracked_symbols: split_list(&var("TRACKED_SYMBOLS", "AAPL,GOOGL,MSFT,TSLA,AMZN"))
                .into_iter()
                .map(|s| s.to_uppercase())
                .collect(),
            max_batch_symbols: var("MAX_BATCH_SYMBOLS", "10")
                .parse()
                .context("MAX_BATCH_SYMBOLS must be an integer")?,

            suggestion_cache_ttl_secs: bounded(
                &var("SUGGESTION_CACHE_TTL_SECS", "3600"),
                "SUGGESTION_CACHE_TTL_SECS",
                CACHE_TTL_SECS_RANGE,
            )?,
            market_sentiment_cache_ttl_secs: bounded(
                &var("MARKET_SENTIMENT_CACHE_TTL_SECS", "1800"),
                "MARKET_SENTIMENT_CACHE_TTL_SECS",
                CACHE_TTL_SECS_RANGE,
            )?,

            cors_origins: split_list(&var(
                "CORS_ORIGINS",
                "https://localhost:3000,https://localhost:8766",
            )),
        };

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Integer setting that must fall inside `range`.
fn bounded(raw: &str, key: &str, range: RangeInclusive<i64>) -> Result<i64> {
    let value: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{} must be an integer", key))?;
    if !range.contains(&value) {
        bail!("{} must be between {} and {}, got {}", key, range.start(), range.end(), value);
    }
    Ok(value)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[("POLYGON_API_KEY", "pk_test")])).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.polygon_rate_limit, 500);
        assert_eq!(config.price_lookback_days, 182);
        assert_eq!(config.tracked_symbols, vec!["AAPL", "GOOGL", "MSFT", "TSLA", "AMZN"]);
        assert_eq!(config.max_batch_symbols, 10);
        assert_eq!(config.suggestion_cache_ttl_secs, 3600);
        assert_eq!(config.market_sentiment_cache_ttl_secs, 1800);
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("POLYGON_API_KEY", "pk_test"),
            ("PORT", "9001"),
            ("TRACKED_SYMBOLS", " nvda, ko ,,"),
            ("CORS_ORIGINS", "https://app.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.tracked_symbols, vec!["NVDA", "KO"]);
        assert_eq!(config.cors_origins, vec!["https://app.example.com"]);
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        assert!(ServerConfig::from_lookup(lookup(&[])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("POLYGON_API_KEY", "  ")])).is_err());
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("POLYGON_API_KEY", "pk_test"),
            ("MAX_BATCH_SYMBOLS", "ten"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("MAX_BATCH_SYMBOLS"));
    }

    #[test]
    fn test_out_of_range_durations_are_errors() {
        for (key, value) in [
            ("PRICE_LOOKBACK_DAYS", "0"),
            ("PRICE_LOOKBACK_DAYS", "9223372036854775807"),
            ("SUGGESTION_CACHE_TTL_SECS", "-5"),
            ("MARKET_SENTIMENT_CACHE_TTL_SECS", "9223372036854775807"),
        ] {
            let err = ServerConfig::from_lookup(lookup(&[("POLYGON_API_KEY", "pk_test"), (key, value)])).unwrap_err();
            assert!(err.to_string().contains(key), "{}={} accepted", key, value);
        }

        let config = ServerConfig::from_lookup(lookup(&[
            ("POLYGON_API_KEY", "pk_test"),
            ("PRICE_LOOKBACK_DAYS", "365"),
            ("SUGGESTION_CACHE_TTL_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.price_lookback_days, 365);
        assert_eq!(config.suggestion_cache_ttl_secs, 60);
    }
}
