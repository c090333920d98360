//! Restaurant browsing: a newest-first listing with comment counts, and a
//! detail view with an optional comment page and per-label sentiment stats.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ApiError;
use crate::model::{Comment, Restaurant, SentimentLabel};
use crate::query::{Pagination, PaginationInfo, RestaurantMatch};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSummary {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub comment_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestaurantList {
    pub restaurants: Vec<RestaurantSummary>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsPagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_comments: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl From<PaginationInfo> for CommentsPagination {
    fn from(p: PaginationInfo) -> Self {
        Self {
            current_page: p.current_page,
            total_pages: p.total_pages,
            total_comments: p.total_restaurants,
            has_next: p.has_next,
            has_prev: p.has_prev,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelStats {
    pub label: SentimentLabel,
    pub count: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantDetail {
    pub restaurant: Restaurant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments_pagination: Option<CommentsPagination>,
    pub sentiment_stats: Vec<LabelStats>,
}

pub async fn list_restaurants(
    store: &dyn Store,
    cuisine: Option<&str>,
    p: Pagination,
) -> Result<RestaurantList, ApiError> {
    let mut restaurants = store
        .find_matching(&RestaurantMatch::new(cuisine, None))
        .await?;
    let total = restaurants.len();
    restaurants.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let page: Vec<Restaurant> = restaurants
        .into_iter()
        .skip(p.offset())
        .take(p.limit)
        .collect();
    let ids: Vec<String> = page.iter().map(|r| r.id.clone()).collect();
    let comments = store.find_by_restaurants(&ids).await?;

    let restaurants = page
        .into_iter()
        .map(|r| {
            let comment_count = comments.get(&r.id).map_or(0, Vec::len);
            RestaurantSummary {
                restaurant: r,
                comment_count,
            }
        })
        .collect();

    Ok(RestaurantList {
        restaurants,
        pagination: PaginationInfo::new(p, total),
    })
}

/// Per-label count and mean score, in label order.
pub fn sentiment_stats(comments: &[Comment]) -> Vec<LabelStats> {
    let mut groups: BTreeMap<SentimentLabel, (usize, f64)> = BTreeMap::new();
    for c in comments {
        let g = groups.entry(c.sentiment_analysis.label).or_default();
        g.0 += 1;
        g.1 += c.sentiment_analysis.score;
    }
    groups
        .into_iter()
        .map(|(label, (count, sum))| LabelStats {
            label,
            count,
            avg_score: sum / count as f64,
        })
        .collect()
}

pub async fn restaurant_detail(
    store: &dyn Store,
    id: &str,
    include_comments: bool,
    p: Pagination,
) -> Result<RestaurantDetail, ApiError> {
    let restaurant = store
        .find_restaurant(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Restaurant not found".into()))?;

    let mut comments = store.find_by_restaurant(id).await?;
    let sentiment_stats = sentiment_stats(&comments);

    let (page, pagination) = if include_comments {
        let total = comments.len();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let page: Vec<Comment> = comments.into_iter().skip(p.offset()).take(p.limit).collect();
        let info = CommentsPagination::from(PaginationInfo::new(p, total));
        (Some(page), Some(info))
    } else {
        (None, None)
    };

    Ok(RestaurantDetail {
        restaurant,
        comments: page,
        comments_pagination: pagination,
        sentiment_stats,
    })
}
