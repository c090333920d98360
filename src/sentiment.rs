//! Sentiment collaborator: the `SentimentScorer` seam and a lexicon-based
//! implementation used when no external classifier is wired in.

use anyhow::Result;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::model::SentimentAnalysis;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// Scores free text. Implementations may call out to a remote classifier.
#[async_trait::async_trait]
pub trait SentimentScorer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<SentimentAnalysis>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Returns (raw lexicon sum, token count).
    /// A negator within the previous 1..=3 tokens flips a word's sign.
    pub fn raw_score(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;

        for i in 0..tokens.len() {
            let base = self.word_score(tokens[i].as_str());
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }

        (score, tokens.len())
    }

    /// Lexicon sum per token, clamped to [-1, 1].
    pub fn score_text(&self, text: &str) -> f64 {
        let (sum, n) = self.raw_score(text);
        if n == 0 {
            return 0.0;
        }
        (sum as f64 / n as f64).clamp(-1.0, 1.0)
    }
}

#[async_trait::async_trait]
impl SentimentScorer for LexiconScorer {
    async fn analyze(&self, text: &str) -> Result<SentimentAnalysis> {
        Ok(SentimentAnalysis::from_score(self.score_text(text)))
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Alphanumeric tokens, lower-cased. Apostrophes stay inside words so
/// contractions like "wasn't" survive as negators.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "weren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "didn't"
            | "without"
    )
}
