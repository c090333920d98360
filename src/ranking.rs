//! # Ranking Aggregator
//! Turns the restaurant and comment collections into a filtered, sorted,
//! paginated ranking.
//!
//! Pipeline (each stage is a plain function over an in-memory sequence):
//! select → join → derive → threshold → sort → paginate → rank.
//!
//! The total used for pagination metadata is computed by a separate pass
//! (`count_matching`) that re-runs select → join → threshold on its own.

use std::collections::HashMap;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::model::{Comment, Restaurant};
use crate::query::{
    FiltersEcho, Pagination, PaginationInfo, RankingQuery, RestaurantMatch, SortSpec,
};
use crate::scoring::{compute_metrics, RestaurantMetrics};
use crate::store::Store;

/// A restaurant joined with its derived metrics (comments already dropped).
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRestaurant {
    pub restaurant: Restaurant,
    pub metrics: RestaurantMetrics,
}

/// Output item: base fields + metrics + global rank position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedRestaurant {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    #[serde(flatten)]
    pub metrics: RestaurantMetrics,
    pub rank_position: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingPage {
    pub rankings: Vec<RankedRestaurant>,
    pub pagination: PaginationInfo,
    pub filters: FiltersEcho,
}

/// Join each restaurant with its comments and derive metrics.
/// Restaurants absent from `comments` are scored as having none.
pub fn join_and_score(
    restaurants: Vec<Restaurant>,
    comments: &HashMap<String, Vec<Comment>>,
) -> Vec<ScoredRestaurant> {
    restaurants
        .into_iter()
        .map(|restaurant| {
            let metrics = match comments.get(&restaurant.id) {
                Some(list) => compute_metrics(list),
                None => compute_metrics(std::iter::empty::<&Comment>()),
            };
            ScoredRestaurant {
                restaurant,
                metrics,
            }
        })
        .collect()
}

/// Drop restaurants with fewer than `min_comments` comments.
pub fn apply_min_comments(
    scored: Vec<ScoredRestaurant>,
    min_comments: usize,
) -> Vec<ScoredRestaurant> {
    scored
        .into_iter()
        .filter(|s| s.metrics.total_comments >= min_comments)
        .collect()
}

/// Stable sort; ties keep store order.
pub fn sort_scored(scored: &mut [ScoredRestaurant], sort: SortSpec) {
    scored.sort_by(|a, b| {
        let ord = sort
            .field
            .compare((&a.restaurant, &a.metrics), (&b.restaurant, &b.metrics));
        sort.order.apply(ord)
    });
}

/// Cut one page and number it with global positions.
pub fn paginate(scored: Vec<ScoredRestaurant>, p: Pagination) -> Vec<RankedRestaurant> {
    let offset = p.offset();
    scored
        .into_iter()
        .skip(offset)
        .take(p.limit)
        .enumerate()
        .map(|(i, s)| RankedRestaurant {
            restaurant: s.restaurant,
            metrics: s.metrics,
            rank_position: offset + i + 1,
        })
        .collect()
}

/// Number positions from 1 (no page offset).
pub fn rank_from_one(scored: Vec<ScoredRestaurant>) -> Vec<RankedRestaurant> {
    paginate(scored, Pagination::new(1, usize::MAX))
}

/// select → join → derive for one candidate set.
pub async fn load_scored(
    store: &dyn Store,
    criteria: Option<&RestaurantMatch>,
) -> Result<Vec<ScoredRestaurant>> {
    let restaurants = match criteria {
        Some(c) => store.find_matching(c).await?,
        None => store.find_all().await?,
    };
    let ids: Vec<String> = restaurants.iter().map(|r| r.id.clone()).collect();
    let comments = store.find_by_restaurants(&ids).await?;
    Ok(join_and_score(restaurants, &comments))
}

/// Independent count of restaurants passing the filter and comment threshold.
pub async fn count_matching(
    store: &dyn Store,
    criteria: &RestaurantMatch,
    min_comments: usize,
) -> Result<usize> {
    let restaurants = store.find_matching(criteria).await?;
    let ids: Vec<String> = restaurants.iter().map(|r| r.id.clone()).collect();
    let comments = store.find_by_restaurants(&ids).await?;
    Ok(ids
        .iter()
        .filter(|id| comments.get(*id).map_or(0, Vec::len) >= min_comments)
        .count())
}

/// Full ranking query: one page plus pagination metadata and filter echo.
pub async fn get_rankings(store: &dyn Store, q: &RankingQuery) -> Result<RankingPage> {
    let started = Instant::now();

    let scored = load_scored(store, Some(&q.filter)).await?;
    let candidates = scored.len();
    let mut kept = apply_min_comments(scored, q.min_comments);
    sort_scored(&mut kept, q.sort);
    let rankings = paginate(kept, q.pagination);

    let total = count_matching(store, &q.filter, q.min_comments).await?;

    debug!(
        candidates,
        total,
        page = q.pagination.page,
        returned = rankings.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "rankings computed"
    );

    Ok(RankingPage {
        rankings,
        pagination: PaginationInfo::new(q.pagination, total),
        filters: q.echo(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SentimentAnalysis;
    use crate::query::{SortField, SortOrder};
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn mk_restaurant(id: &str, cuisine: &str) -> Restaurant {
        Restaurant {
            id: id.into(),
            name: format!("Restaurant {id}"),
            location: Some("Austin, Texas".into()),
            cuisine: cuisine.into(),
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    fn mk_comments(restaurant: &str, scores: &[f64]) -> Vec<Comment> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| Comment {
                id: format!("{restaurant}-{i}"),
                content: "food".into(),
                user: "u".into(),
                restaurant: restaurant.into(),
                sentiment_analysis: SentimentAnalysis::from_score(*s),
                created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, i as u32 % 60).unwrap(),
            })
            .collect()
    }

    fn query(min_comments: usize, sort: SortSpec, page: usize, limit: usize) -> RankingQuery {
        RankingQuery {
            filter: RestaurantMatch::default(),
            min_comments,
            sort,
            pagination: Pagination::new(page, limit),
        }
    }

    #[tokio::test]
    async fn volume_boost_outranks_higher_average() {
        let store = MemoryStore::with_data(
            vec![mk_restaurant("b", "Thai"), mk_restaurant("a", "Thai")],
            [mk_comments("a", &[0.6; 10]), mk_comments("b", &[0.9, 0.9])].concat(),
        )
        .unwrap();
        let page = get_rankings(&store, &query(1, SortSpec::default(), 1, 20))
            .await
            .unwrap();
        let ids: Vec<_> = page.rankings.iter().map(|r| r.restaurant.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(page.rankings[0].rank_position, 1);
    }

    #[tokio::test]
    async fn second_page_of_45_has_global_positions() {
        let restaurants: Vec<_> = (0..45)
            .map(|i| mk_restaurant(&format!("r{i:02}"), "Thai"))
            .collect();
        let comments: Vec<_> = (0..45)
            .flat_map(|i| mk_comments(&format!("r{i:02}"), &[i as f64 / 100.0]))
            .collect();
        let store = MemoryStore::with_data(restaurants, comments).unwrap();

        let page = get_rankings(&store, &query(1, SortSpec::default(), 2, 20))
            .await
            .unwrap();
        assert_eq!(page.rankings.len(), 20);
        let positions: Vec<_> = page.rankings.iter().map(|r| r.rank_position).collect();
        assert_eq!(positions, (21..=40).collect::<Vec<_>>());
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.pagination.total_restaurants, 45);
        assert!(page.pagination.has_next);
        assert!(page.pagination.has_prev);
    }

    #[tokio::test]
    async fn zero_comment_restaurants_fail_default_threshold() {
        let store = MemoryStore::with_data(
            vec![mk_restaurant("quiet", "Thai"), mk_restaurant("busy", "Thai")],
            mk_comments("busy", &[0.3]),
        )
        .unwrap();
        let page = get_rankings(&store, &query(1, SortSpec::default(), 1, 20))
            .await
            .unwrap();
        assert_eq!(page.rankings.len(), 1);
        assert_eq!(page.pagination.total_restaurants, 1);

        let page = get_rankings(&store, &query(0, SortSpec::default(), 1, 20))
            .await
            .unwrap();
        assert_eq!(page.rankings.len(), 2);
    }

    #[test]
    fn ties_keep_store_order() {
        let comments: HashMap<String, Vec<Comment>> = ["x", "y", "z"]
            .iter()
            .map(|id| (id.to_string(), mk_comments(id, &[0.5])))
            .collect();
        let mut scored = join_and_score(
            vec![mk_restaurant("x", "A"), mk_restaurant("y", "A"), mk_restaurant("z", "A")],
            &comments,
        );
        sort_scored(&mut scored, SortSpec::default());
        let ids: Vec<_> = scored.iter().map(|s| s.restaurant.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn ascending_sort_by_total_comments() {
        let mut comments = HashMap::new();
        comments.insert("x".to_string(), mk_comments("x", &[0.1, 0.1, 0.1]));
        comments.insert("y".to_string(), mk_comments("y", &[0.1]));
        let mut scored = join_and_score(
            vec![mk_restaurant("x", "A"), mk_restaurant("y", "A"), mk_restaurant("z", "A")],
            &comments,
        );
        sort_scored(
            &mut scored,
            SortSpec {
                field: SortField::TotalComments,
                order: SortOrder::Asc,
            },
        );
        let ids: Vec<_> = scored.iter().map(|s| s.restaurant.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "y", "x"]);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let scored = join_and_score(vec![mk_restaurant("x", "A")], &HashMap::new());
        assert!(paginate(scored, Pagination::new(5, 20)).is_empty());
    }

    #[tokio::test]
    async fn cuisine_filter_applies_to_page_and_count() {
        let store = MemoryStore::with_data(
            vec![mk_restaurant("i", "Italian"), mk_restaurant("t", "Thai")],
            [mk_comments("i", &[0.4]), mk_comments("t", &[0.4])].concat(),
        )
        .unwrap();
        let mut q = query(1, SortSpec::default(), 1, 20);
        q.filter = RestaurantMatch::new(Some("ital"), None);
        let page = get_rankings(&store, &q).await.unwrap();
        assert_eq!(page.rankings.len(), 1);
        assert_eq!(page.rankings[0].restaurant.cuisine, "Italian");
        assert_eq!(page.pagination.total_restaurants, 1);
        assert_eq!(page.filters.cuisine.as_deref(), Some("ital"));
    }

    #[test]
    fn ranked_item_serializes_flat() {
        let ranked = rank_from_one(join_and_score(vec![mk_restaurant("x", "A")], &HashMap::new()));
        let v = serde_json::to_value(&ranked[0]).unwrap();
        for key in [
            "id",
            "name",
            "cuisine",
            "createdAt",
            "totalComments",
            "overallScore",
            "rankPosition",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert!(v.get("comments").is_none());
    }
}
