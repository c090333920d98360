//! Statistics rollups over per-restaurant metrics.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::ranking::{load_scored, ScoredRestaurant};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_restaurants: usize,
    pub restaurants_with_reviews: usize,
    pub total_comments: usize,
    pub avg_comments_per_restaurant: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CuisineStats {
    pub cuisine: String,
    pub restaurant_count: usize,
    pub total_comments: usize,
    /// Mean of the restaurants' own averages (unreviewed ones count as 0).
    pub avg_sentiment_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingStats {
    pub overall: OverallStats,
    pub cuisine_rankings: Vec<CuisineStats>,
}

pub fn overall_stats(scored: &[ScoredRestaurant]) -> OverallStats {
    let total_restaurants = scored.len();
    let total_comments: usize = scored.iter().map(|s| s.metrics.total_comments).sum();
    let restaurants_with_reviews = scored
        .iter()
        .filter(|s| s.metrics.total_comments > 0)
        .count();
    let avg_comments_per_restaurant = if total_restaurants > 0 {
        total_comments as f64 / total_restaurants as f64
    } else {
        0.0
    };
    OverallStats {
        total_restaurants,
        restaurants_with_reviews,
        total_comments,
        avg_comments_per_restaurant,
    }
}

/// Group by exact cuisine string, best average first. Equal averages keep
/// alphabetical cuisine order.
pub fn cuisine_stats(scored: &[ScoredRestaurant]) -> Vec<CuisineStats> {
    // (count, comments, sum of averages)
    let mut groups: BTreeMap<&str, (usize, usize, f64)> = BTreeMap::new();
    for s in scored {
        let g = groups.entry(s.restaurant.cuisine.as_str()).or_default();
        g.0 += 1;
        g.1 += s.metrics.total_comments;
        g.2 += s.metrics.avg_sentiment_score;
    }

    let mut out: Vec<CuisineStats> = groups
        .into_iter()
        .map(|(cuisine, (n, comments, sum))| CuisineStats {
            cuisine: cuisine.to_string(),
            restaurant_count: n,
            total_comments: comments,
            avg_sentiment_score: sum / n as f64,
        })
        .collect();
    out.sort_by(|a, b| b.avg_sentiment_score.total_cmp(&a.avg_sentiment_score));
    out
}

pub async fn get_stats(store: &dyn Store) -> Result<RankingStats> {
    let scored = load_scored(store, None).await?;
    Ok(RankingStats {
        overall: overall_stats(&scored),
        cuisine_rankings: cuisine_stats(&scored),
    })
}
