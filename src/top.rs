//! # Category Top-Lists
//! Fixed leaderboards over all restaurants. Only restaurants with at least
//! `RELIABILITY_FLOOR` comments are eligible; `trending` additionally needs a
//! comment within the last `TRENDING_WINDOW_DAYS`.
//!
//! Positions always restart at 1 (no pagination).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use anyhow::Result;

use crate::query::{SortField, SortOrder, SortSpec};
use crate::ranking::{load_scored, rank_from_one, sort_scored, RankedRestaurant, ScoredRestaurant};
use crate::store::Store;

pub const RELIABILITY_FLOOR: usize = 3;
pub const TRENDING_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_TOP_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TopCategory {
    #[default]
    Overall,
    MostPositive,
    MostReviewed,
    Trending,
}

impl TopCategory {
    /// Unknown or missing names fall back to `overall`.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("mostPositive") => TopCategory::MostPositive,
            Some("mostReviewed") => TopCategory::MostReviewed,
            Some("trending") => TopCategory::Trending,
            _ => TopCategory::Overall,
        }
    }

    pub fn sort(&self) -> SortSpec {
        let field = match self {
            TopCategory::Overall | TopCategory::Trending => SortField::OverallScore,
            TopCategory::MostPositive => SortField::PositivePercentage,
            TopCategory::MostReviewed => SortField::TotalComments,
        };
        SortSpec {
            field,
            order: SortOrder::Desc,
        }
    }

    /// Floor plus the category's own constraint.
    pub fn is_eligible(&self, s: &ScoredRestaurant, now: DateTime<Utc>) -> bool {
        if s.metrics.total_comments < RELIABILITY_FLOOR {
            return false;
        }
        match self {
            TopCategory::Trending => {
                let cutoff = now - Duration::days(TRENDING_WINDOW_DAYS);
                s.metrics.recent_activity.is_some_and(|t| t >= cutoff)
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopList {
    pub category: TopCategory,
    pub top_restaurants: Vec<RankedRestaurant>,
    pub count: usize,
}

/// Pure stage: filter, sort, truncate, number.
pub fn build_top(
    scored: Vec<ScoredRestaurant>,
    category: TopCategory,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<RankedRestaurant> {
    let mut eligible: Vec<_> = scored
        .into_iter()
        .filter(|s| category.is_eligible(s, now))
        .collect();
    sort_scored(&mut eligible, category.sort());
    eligible.truncate(limit);
    rank_from_one(eligible)
}

pub async fn get_top(
    store: &dyn Store,
    category: TopCategory,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<TopList> {
    let scored = load_scored(store, None).await?;
    let top_restaurants = build_top(scored, category, limit, now);
    Ok(TopList {
        category,
        count: top_restaurants.len(),
        top_restaurants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comment, Restaurant, SentimentAnalysis};
    use crate::scoring::compute_metrics;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn scored(id: &str, scores: &[f64], newest_age_days: i64) -> ScoredRestaurant {
        let comments: Vec<Comment> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| Comment {
                id: format!("{id}-{i}"),
                content: "ok".into(),
                user: "u".into(),
                restaurant: id.into(),
                sentiment_analysis: SentimentAnalysis::from_score(*s),
                created_at: now() - Duration::days(newest_age_days + i as i64),
            })
            .collect();
        ScoredRestaurant {
            restaurant: Restaurant {
                id: id.into(),
                name: id.into(),
                location: None,
                cuisine: "Thai".into(),
                created_at: now() - Duration::days(400),
            },
            metrics: compute_metrics(&comments),
        }
    }

    fn ids(list: &[RankedRestaurant]) -> Vec<&str> {
        list.iter().map(|r| r.restaurant.id.as_str()).collect()
    }

    #[test]
    fn two_comments_never_qualify() {
        for cat in [
            TopCategory::Overall,
            TopCategory::MostPositive,
            TopCategory::MostReviewed,
            TopCategory::Trending,
        ] {
            let out = build_top(
                vec![scored("star", &[1.0, 1.0], 0), scored("ok", &[0.2, 0.2, 0.2], 0)],
                cat,
                10,
                now(),
            );
            assert_eq!(ids(&out), vec!["ok"], "category {cat:?}");
        }
    }

    #[test]
    fn trending_window_is_thirty_days() {
        let out = build_top(
            vec![scored("old", &[0.9; 3], 31), scored("fresh", &[0.1; 3], 29)],
            TopCategory::Trending,
            10,
            now(),
        );
        assert_eq!(ids(&out), vec!["fresh"]);

        let out = build_top(
            vec![scored("old", &[0.9; 3], 31), scored("fresh", &[0.1; 3], 29)],
            TopCategory::Overall,
            10,
            now(),
        );
        assert_eq!(ids(&out), vec!["old", "fresh"]);
    }

    #[test]
    fn most_reviewed_and_most_positive_orderings() {
        let input = || {
            vec![
                scored("few", &[0.9, 0.9, -0.5], 0),
                scored("many", &[0.2, 0.0, 0.0, 0.0, 0.0], 0),
                scored("allpos", &[0.3, 0.3, 0.3], 0),
            ]
        };
        let out = build_top(input(), TopCategory::MostReviewed, 10, now());
        assert_eq!(out[0].restaurant.id, "many");

        let out = build_top(input(), TopCategory::MostPositive, 10, now());
        assert_eq!(ids(&out), vec!["allpos", "few", "many"]);
    }

    #[test]
    fn limit_truncates_and_positions_restart() {
        let input: Vec<_> = (0..5)
            .map(|i| scored(&format!("r{i}"), &[i as f64 / 10.0; 3], 0))
            .collect();
        let out = build_top(input, TopCategory::Overall, 2, now());
        assert_eq!(ids(&out), vec!["r4", "r3"]);
        assert_eq!(out[0].rank_position, 1);
        assert_eq!(out[1].rank_position, 2);
    }

    #[test]
    fn category_parse_falls_back_to_overall() {
        assert_eq!(TopCategory::parse_or_default(Some("trending")), TopCategory::Trending);
        assert_eq!(TopCategory::parse_or_default(Some("weird")), TopCategory::Overall);
        assert_eq!(TopCategory::parse_or_default(None), TopCategory::Overall);
    }
}
