//! Word-list polarity scoring for short financial texts.

use std::collections::{HashMap, HashSet};

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];

const NEGATION_WINDOW: usize = 3;

const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("bullish", 0.6), ("rally", 0.5), ("surge", 0.6), ("soar", 0.7), ("gain", 0.4),
    ("gains", 0.4), ("profit", 0.4), ("growth", 0.4), ("beat", 0.5), ("beats", 0.5),
    ("upgrade", 0.5), ("upgraded", 0.5), ("outperform", 0.5), ("strong", 0.43),
    ("positive", 0.5), ("rise", 0.3), ("increase", 0.3), ("breakthrough", 0.6),
    ("innovation", 0.4), ("success", 0.6), ("exceed", 0.5), ("exceeds", 0.5),
    ("momentum", 0.3), ("buy", 0.3), ("recommend", 0.3), ("optimistic", 0.5),
    ("record", 0.4), ("advance", 0.3), ("dividend", 0.2), ("buyback", 0.3),
    ("upside", 0.4), ("recovery", 0.4), ("rebound", 0.4), ("expansion", 0.3),
    ("robust", 0.5), ("accelerating", 0.4), ("overweight", 0.3), ("raised", 0.3),
    ("tailwind", 0.4), ("good", 0.7), ("great", 0.8), ("moon", 0.5), ("upbeat", 0.5),
    ("sure", 0.5),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("bearish", -0.6), ("decline", -0.4), ("loss", -0.5), ("losses", -0.5),
    ("fall", -0.4), ("plunge", -0.7), ("crash", -0.8), ("miss", -0.5), ("misses", -0.5),
    ("downgrade", -0.5), ("downgraded", -0.5), ("underperform", -0.5), ("weak", -0.4),
    ("negative", -0.5), ("drop", -0.4), ("decrease", -0.3), ("concern", -0.3),
    ("concerns", -0.3), ("risk", -0.2), ("fail", -0.5), ("disappoint", -0.6),
    ("disappointing", -0.6), ("slump", -0.5), ("sell", -0.3), ("warning", -0.4),
    ("pessimistic", -0.5), ("retreat", -0.3), ("fear", -0.5), ("trouble", -0.4),
    ("dilution", -0.4), ("headwind", -0.4), ("lawsuit", -0.5), ("litigation", -0.4),
    ("recall", -0.4), ("investigation", -0.4), ("default", -0.6), ("bankruptcy", -0.9),
    ("layoff", -0.4), ("downside", -0.4), ("overvalued", -0.4), ("bubble", -0.4),
    ("challenges", -0.2), ("bad", -0.7),
];

/// Signed word weights with negation handling. A text scores the mean weight
/// of its matched words, in [-1, 1].
pub struct Lexicon {
    weights: HashMap<&'static str, f64>,
    negations: HashSet<&'static str>,
}

impl Lexicon {
    pub fn financial() -> Self {
        let weights = POSITIVE_WORDS
            .iter()
            .chain(NEGATIVE_WORDS.iter())
            .copied()
            .collect();
        Self {
            weights,
            negations: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    pub fn polarity(&self, text: &str) -> f64 {
        let text_lower = text.to_lowercase();
        let words: Vec<&str> = text_lower
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '$' | '"'))
            .filter(|w| !w.is_empty())
            .collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negations.contains(*w))
            .map(|(i, _)| i)
            .collect();

        let mut total = 0.0;
        let mut matched = 0usize;

        for (i, word) in words.iter().enumerate() {
            let Some(&weight) = self.weights.get(word) else {
                continue;
            };

            let negated = negation_positions
                .iter()
                .any(|&neg_pos| neg_pos < i && (i - neg_pos) <= NEGATION_WINDOW);

            total += if negated { -weight } else { weight };
            matched += 1;
        }

        if matched == 0 {
            return 0.0;
        }
        (total / matched as f64).clamp(-1.0, 1.0)
    }

    /// Mean polarity over a set of texts, 0.0 when there are none.
    pub fn mean_polarity(&self, texts: &[String]) -> f64 {
        if texts.is_empty() {
            return 0.0;
        }
        texts.iter().map(|t| self.polarity(t)).sum::<f64>() / texts.len() as f64
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::financial()
    }
}
