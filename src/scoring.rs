//! # Scoring Engine
//! Pure, testable logic that maps a restaurant's comments → `RestaurantMetrics`.
//! No I/O, suitable for unit tests and offline evaluation.
//!
//! Policy: the overall score is the average sentiment boosted by comment
//! volume. The boost grows linearly by 0.1 per comment and caps at 2x from
//! ten comments on. An empty comment set yields 0 for every rate and score.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Comment, SentimentLabel};

/// Upper bound of the volume multiplier.
pub const MAX_VOLUME_BOOST: f64 = 2.0;
/// Comment count per +1.0 of boost.
pub const VOLUME_BOOST_DIVISOR: f64 = 10.0;

/// Derived, never persisted. Recomputed on every query.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantMetrics {
    pub total_comments: usize,
    pub positive_comments: usize,
    pub negative_comments: usize,
    pub neutral_comments: usize,
    pub avg_sentiment_score: f64,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
    pub overall_score: f64,
    /// Newest comment timestamp; `None` without comments.
    pub recent_activity: Option<DateTime<Utc>>,
}

/// `min(1 + n/10, 2)`.
pub fn volume_boost(total_comments: usize) -> f64 {
    (1.0 + total_comments as f64 / VOLUME_BOOST_DIVISOR).min(MAX_VOLUME_BOOST)
}

/// Volume-boosted average; 0 when there is nothing to average.
pub fn overall_score(avg_sentiment_score: f64, total_comments: usize) -> f64 {
    if total_comments == 0 {
        0.0
    } else {
        avg_sentiment_score * volume_boost(total_comments)
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

/// Derive all per-restaurant metrics from its comment set.
pub fn compute_metrics<'a, I>(comments: I) -> RestaurantMetrics
where
    I: IntoIterator<Item = &'a Comment>,
{
    let mut m = RestaurantMetrics::default();
    let mut score_sum = 0.0f64;

    for c in comments {
        m.total_comments += 1;
        match c.sentiment_analysis.label {
            SentimentLabel::Positive => m.positive_comments += 1,
            SentimentLabel::Negative => m.negative_comments += 1,
            SentimentLabel::Neutral => m.neutral_comments += 1,
        }
        score_sum += c.sentiment_analysis.score;
        m.recent_activity = match m.recent_activity {
            Some(t) if t >= c.created_at => Some(t),
            _ => Some(c.created_at),
        };
    }

    if m.total_comments > 0 {
        m.avg_sentiment_score = score_sum / m.total_comments as f64;
    }
    m.positive_percentage = percentage(m.positive_comments, m.total_comments);
    m.negative_percentage = percentage(m.negative_comments, m.total_comments);
    m.overall_score = overall_score(m.avg_sentiment_score, m.total_comments);
    m
}
