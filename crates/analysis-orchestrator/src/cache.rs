use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

pub const MARKET_SENTIMENT_KEY: &str = "market_sentiment";

pub fn suggestion_key(symbol: &str) -> String {
    format!("suggestion:{}", symbol.to_uppercase())
}

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// In-memory cache whose entries expire by age. Values are handed out as
/// clones and never mutated in place.
pub struct TtlCache<T> {
    entries: DashMap<String, CacheEntry<T>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let entry = self.entries.get(key)?;
        if now - entry.cached_at < self.ttl {
            return Some(entry.data.clone());
        }
        drop(entry);
        self.evict_expired(key, now);
        None
    }

    /// Re-checks age under the shard lock so a concurrent refresh survives.
    fn evict_expired(&self, key: &str, now: DateTime<Utc>) {
        self.entries.remove_if(key, |_, entry| now - entry.cached_at >= self.ttl);
    }

    pub fn insert(&self, key: impl Into<String>, data: T) {
        self.insert_at(key.into(), data, Utc::now());
    }

    fn insert_at(&self, key: String, data: T, cached_at: DateTime<Utc>) {
        self.entries.insert(key, CacheEntry { data, cached_at });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
