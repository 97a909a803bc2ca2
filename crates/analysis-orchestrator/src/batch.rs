use super::SuggestionGenerator;
use analysis_core::{FactorKind, Suggestion};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Upper bound on symbols processed per batch, to stay inside upstream rate limits.
pub const MAX_BATCH_SYMBOLS: usize = 10;

pub struct SuggestionBatch {
    generator: Arc<SuggestionGenerator>,
    max_symbols: usize,
}

impl SuggestionBatch {
    pub fn new(generator: Arc<SuggestionGenerator>) -> Self {
        Self {
            generator,
            max_symbols: MAX_BATCH_SYMBOLS,
        }
    }

    pub fn with_max_symbols(mut self, max_symbols: usize) -> Self {
        self.max_symbols = max_symbols;
        self
    }

    /// Generate suggestions for up to `max_symbols` of `symbols` concurrently.
    /// Symbols without a suggestion are skipped; the rest keep input order.
    pub async fn generate(&self, symbols: &[String], factors: &BTreeSet<FactorKind>) -> Vec<Suggestion> {
        let selected = &symbols[..symbols.len().min(self.max_symbols)];
        if selected.len() < symbols.len() {
            tracing::info!(
                "Batch limited to {} of {} symbols",
                selected.len(),
                symbols.len()
            );
        }

        let mut tasks = JoinSet::new();

        for (index, symbol) in selected.iter().cloned().enumerate() {
            let generator = Arc::clone(&self.generator);
            let factors = factors.clone();
            tasks.spawn(async move {
                let suggestion = generator.generate_suggestion(&symbol, &factors).await;
                (index, symbol, suggestion)
            });
        }

        let mut results = Vec::with_capacity(selected.len());

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok((index, _symbol, Some(suggestion))) => results.push((index, suggestion)),
                Ok((_, symbol, None)) => {
                    tracing::warn!("No suggestion produced for {}", symbol);
                }
                Err(e) => {
                    tracing::error!("Task error: {}", e);
                }
            }
        }

        results.sort_by_key(|(index, _)| *index);

        tracing::info!(
            "Batch complete: {}/{} symbols produced suggestions",
            results.len(),
            selected.len()
        );

        results.into_iter().map(|(_, suggestion)| suggestion).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batch_skips_missing_and_keeps_order() {
        let mut prices = StubPrices::default()
            .with("AAPL", 100.0)
            .with("MSFT", 300.0)
            .with("TSLA", 200.0);
        prices.failing.push("TSLA".to_string());
        let batch = SuggestionBatch::new(Arc::new(generator(prices)));

        let result = batch
            .generate(&symbols(&["MSFT", "NOPE", "TSLA", "AAPL"]), &all_factors())
            .await;

        let got: Vec<&str> = result.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(got, vec!["MSFT", "AAPL"]);
    }

    #[tokio::test]
    async fn test_batch_is_bounded() {
        let names: Vec<String> = (0..15).map(|i| format!("SYM{}", i)).collect();
        let prices = names
            .iter()
            .fold(StubPrices::default(), |acc, s| acc.with(s, 10.0));
        let batch = SuggestionBatch::new(Arc::new(generator(prices)));

        let result = batch.generate(&names, &all_factors()).await;
        assert_eq!(result.len(), MAX_BATCH_SYMBOLS);
        assert_eq!(result[0].symbol, "SYM0");
        assert_eq!(result[9].symbol, "SYM9");

        let small = SuggestionBatch::new(Arc::new(generator(StubPrices::default().with("A", 1.0).with("B", 2.0))))
            .with_max_symbols(1);
        assert_eq!(small.generate(&symbols(&["A", "B"]), &all_factors()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let batch = SuggestionBatch::new(Arc::new(generator(StubPrices::default())));
        assert!(batch.generate(&[], &all_factors()).await.is_empty());
    }
}
