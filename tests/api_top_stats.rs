// tests/api_top_stats.rs
//
// GET /rankings/top and GET /rankings/stats through the Router.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _;

use restaurant_rankings::model::{Comment, Restaurant, SentimentAnalysis};
use restaurant_rankings::{router, AppConfig, AppState, MemoryStore, Store};

fn restaurant(id: &str, cuisine: &str) -> Restaurant {
    Restaurant {
        id: id.to_string(),
        name: format!("Place {id}"),
        location: None,
        cuisine: cuisine.to_string(),
        created_at: Utc::now() - Duration::days(365),
    }
}

fn comments(restaurant: &str, scores: &[f64], at: DateTime<Utc>) -> Vec<Comment> {
    scores
        .iter()
        .enumerate()
        .map(|(i, s)| Comment {
            id: format!("{restaurant}-{i}"),
            content: "text".to_string(),
            user: "u".to_string(),
            restaurant: restaurant.to_string(),
            sentiment_analysis: SentimentAnalysis::from_score(*s),
            created_at: at - Duration::minutes(i as i64),
        })
        .collect()
}

/// - busy: 6 comments, mixed, recent
/// - sweet: 3 comments, all positive, 60 days old
/// - fresh: 3 comments, mostly positive, yesterday
/// - thin: 2 comments, glowing (below the reliability floor)
/// - empty: no comments
fn fixture() -> Arc<MemoryStore> {
    let now = Utc::now();
    let restaurants = vec![
        restaurant("busy", "Italian"),
        restaurant("sweet", "Thai"),
        restaurant("fresh", "Thai"),
        restaurant("thin", "Italian"),
        restaurant("empty", "Mexican"),
    ];
    let mut all = comments("busy", &[0.5, 0.4, -0.3, 0.0, 0.6, 0.2], now - Duration::days(2));
    all.extend(comments("sweet", &[0.9, 0.8, 0.7], now - Duration::days(60)));
    all.extend(comments("fresh", &[0.5, 0.5, -0.2], now - Duration::days(1)));
    all.extend(comments("thin", &[1.0, 1.0], now - Duration::days(1)));
    Arc::new(MemoryStore::with_data(restaurants, all).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let resp = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn app(store: Arc<MemoryStore>) -> Router {
    router(AppState::new(store, AppConfig::default()))
}

fn top_ids(v: &Json) -> Vec<String> {
    v["data"]["topRestaurants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn overall_top_respects_reliability_floor() {
    let (status, v) = get_json(app(fixture()), "/rankings/top").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["category"], "overall");

    let ids = top_ids(&v);
    assert!(!ids.contains(&"thin".to_string()));
    assert!(!ids.contains(&"empty".to_string()));
    assert_eq!(ids[0], "sweet");
    assert_eq!(v["data"]["count"], ids.len());

    let ranks: Vec<u64> = v["data"]["topRestaurants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["rankPosition"].as_u64().unwrap())
        .collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[tokio::test]
async fn most_reviewed_and_limit() {
    let (_, v) = get_json(app(fixture()), "/rankings/top?category=mostReviewed&limit=1").await;
    assert_eq!(v["data"]["category"], "mostReviewed");
    assert_eq!(top_ids(&v), vec!["busy"]);
    assert_eq!(v["data"]["count"], 1);
}

#[tokio::test]
async fn most_positive_orders_by_share() {
    let (_, v) = get_json(app(fixture()), "/rankings/top?category=mostPositive").await;
    let ids = top_ids(&v);
    assert_eq!(ids[0], "sweet");
    assert!(
        (v["data"]["topRestaurants"][0]["positivePercentage"].as_f64().unwrap() - 100.0).abs()
            < 1e-9
    );
}

#[tokio::test]
async fn trending_drops_stale_restaurants() {
    let (_, v) = get_json(app(fixture()), "/rankings/top?category=trending").await;
    let ids = top_ids(&v);
    assert!(!ids.contains(&"sweet".to_string()), "60 days old is outside the window");
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"busy".to_string()));
    assert!(ids.contains(&"fresh".to_string()));
}

#[tokio::test]
async fn unknown_category_means_overall() {
    let (status, v) = get_json(app(fixture()), "/rankings/top?category=spiciest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["category"], "overall");
}

#[tokio::test]
async fn stats_rollup() {
    let (status, v) = get_json(app(fixture()), "/rankings/stats").await;
    assert_eq!(status, StatusCode::OK);

    let overall = &v["data"]["overall"];
    assert_eq!(overall["totalRestaurants"], 5);
    assert_eq!(overall["restaurantsWithReviews"], 4);
    assert_eq!(overall["totalComments"], 14);
    assert!((overall["avgCommentsPerRestaurant"].as_f64().unwrap() - 2.8).abs() < 1e-9);

    let cuisines = v["data"]["cuisineRankings"].as_array().unwrap();
    let names: Vec<&str> = cuisines.iter().map(|c| c["cuisine"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Italian", "Thai", "Mexican"]);

    let scores: Vec<f64> = cuisines
        .iter()
        .map(|c| c["avgSentimentScore"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(cuisines[0]["restaurantCount"], 2);
    assert_eq!(cuisines[0]["totalComments"], 8);
}

#[tokio::test]
async fn stats_on_empty_store_are_zero() {
    let store = Arc::new(MemoryStore::new());
    let (status, v) = get_json(app(store), "/rankings/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["overall"]["totalRestaurants"], 0);
    assert_eq!(v["data"]["overall"]["avgCommentsPerRestaurant"], 0.0);
    assert!(v["data"]["cuisineRankings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn store_fault_messages_per_endpoint() {
    let store = fixture();
    store.close().await;
    let (status, v) = get_json(app(store.clone()), "/rankings/top").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v["message"], "Server error while fetching top restaurants");

    let (status, v) = get_json(app(store), "/rankings/stats").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v["message"], "Server error while fetching ranking statistics");
}
