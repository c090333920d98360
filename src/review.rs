//! Review submission: normalize the comment, score it with the sentiment
//! collaborator, and persist it against an existing restaurant.

use chrono::Utc;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::model::{Comment, SentimentAnalysis};
use crate::sentiment::SentimentScorer;
use crate::store::{new_id, Store};

/// Upper bound on stored comment length, in chars.
pub const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default, alias = "resturantId")]
    pub restaurant_id: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantBrief {
    pub name: String,
    pub location: Option<String>,
    pub cuisine: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReceipt {
    pub restaurant_id: String,
    pub restaurant: RestaurantBrief,
    pub user_id: String,
    pub comment_id: String,
    pub comment: String,
    pub sentiment_analysis: SentimentAnalysis,
}

/// Decode entities, strip tags, collapse whitespace, trim, cap length.
pub fn normalize_content(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_COMMENT_CHARS {
        out = out.chars().take(MAX_COMMENT_CHARS).collect();
    }
    out
}

/// Short anonymized fingerprint for logs. Raw comment text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub async fn submit_review(
    store: &dyn Store,
    scorer: &dyn SentimentScorer,
    user_id: &str,
    req: ReviewRequest,
) -> Result<ReviewReceipt, ApiError> {
    let restaurant_id = req
        .restaurant_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let raw_comment = req.comment.as_deref().filter(|s| !s.trim().is_empty());
    let (restaurant_id, raw_comment) = match (restaurant_id, raw_comment) {
        (Some(r), Some(c)) => (r.to_string(), c),
        _ => {
            return Err(ApiError::InvalidQuery(
                "Please provide restaurant ID and comment".into(),
            ))
        }
    };

    let content = normalize_content(raw_comment);
    if content.is_empty() {
        return Err(ApiError::InvalidQuery("Comment is empty".into()));
    }

    let restaurant = store
        .find_restaurant(&restaurant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Restaurant not found".into()))?;

    let analysis = scorer.analyze(&content).await?;

    let comment = Comment {
        id: new_id("c", &[&restaurant.id, user_id, &content]),
        content,
        user: user_id.to_string(),
        restaurant: restaurant.id.clone(),
        sentiment_analysis: analysis,
        created_at: Utc::now(),
    };
    let receipt = ReviewReceipt {
        restaurant_id: restaurant.id.clone(),
        restaurant: RestaurantBrief {
            name: restaurant.name,
            location: restaurant.location,
            cuisine: restaurant.cuisine,
        },
        user_id: user_id.to_string(),
        comment_id: comment.id.clone(),
        comment: comment.content.clone(),
        sentiment_analysis: analysis,
    };

    info!(
        target: "reviews",
        restaurant = %restaurant.id,
        comment = %anon_hash(&comment.content),
        scorer = scorer.name(),
        score = analysis.score,
        label = analysis.label.as_str(),
        "review scored"
    );
    store.insert_comment(comment).await?;
    metrics::counter!("reviews_submitted_total", "label" => analysis.label.as_str()).increment(1);

    Ok(receipt)
}
