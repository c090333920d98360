//! model.rs: Restaurant and Comment records as read from the store.
//!
//! A Comment points at exactly one Restaurant; the Restaurant never keeps a
//! list of its comments. Membership is always derived from `Comment::restaurant`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentiment classification of a comment's tone.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl SentimentLabel {
    /// Scores strictly above this are positive, strictly below its negation negative.
    pub const THRESHOLD: f64 = 0.1;

    pub fn from_score(score: f64) -> Self {
        if score > Self::THRESHOLD {
            SentimentLabel::Positive
        } else if score < -Self::THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

/// Output of the sentiment collaborator, stored on each comment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub label: SentimentLabel,
    /// Always `|score|`.
    #[serde(default)]
    pub confidence: f64,
}

impl SentimentAnalysis {
    /// Label and confidence follow from the score.
    pub fn from_score(score: f64) -> Self {
        Self {
            score,
            label: SentimentLabel::from_score(score),
            confidence: score.abs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    pub cuisine: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    /// External user identity (issued by the identity provider).
    pub user: String,
    /// Owning restaurant id. Required.
    pub restaurant: String,
    #[serde(default)]
    pub sentiment_analysis: SentimentAnalysis,
    pub created_at: DateTime<Utc>,
}
