use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, Query, State},
    http::request::Parts,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::config::AppConfig;
use crate::error::{ApiError, EndpointError};
use crate::metrics::Metrics;
use crate::query::{parse_count, Pagination, RankingQuery};
use crate::ranking;
use crate::restaurants;
use crate::review::{self, ReviewRequest};
use crate::sentiment::{LexiconScorer, SentimentScorer};
use crate::stats;
use crate::store::Store;
use crate::top::{self, TopCategory};

/// Header carrying the caller identity verified by the identity provider.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Process-scoped handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub scorer: Arc<dyn SentimentScorer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: AppConfig) -> Self {
        Self {
            store,
            scorer: Arc::new(LexiconScorer::new()),
            config: Arc::new(config),
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn SentimentScorer>) -> Self {
        self.scorer = scorer;
        self
    }
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/rankings/restaurants", get(get_rankings))
        .route("/rankings/top", get(get_top))
        .route("/rankings/stats", get(get_stats))
        .route("/restaurants", get(list_restaurants))
        .route("/restaurants/{id}", get(restaurant_detail))
        .route("/reviews/submit", post(submit_review));

    if state.config.metrics.enabled {
        match Metrics::init() {
            Some(m) => app = app.merge(m.router()),
            None => warn!("metrics enabled but no recorder available; /metrics not mounted"),
        }
    }

    app.layer(CorsLayer::very_permissive()).with_state(state)
}

/// `{ success: true, data }`
fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Per-request telemetry: request counter on start, duration (and error
/// counter) on finish.
struct Observe {
    endpoint: &'static str,
    started: Instant,
}

impl Observe {
    fn start(endpoint: &'static str) -> Self {
        counter!("rankings_requests_total", "endpoint" => endpoint).increment(1);
        Self {
            endpoint,
            started: Instant::now(),
        }
    }

    fn finish<T>(self, res: &Result<T, ApiError>) {
        let ms = self.started.elapsed().as_secs_f64() * 1000.0;
        histogram!("rankings_duration_ms", "endpoint" => self.endpoint).record(ms);
        if let Err(ApiError::Store(_)) = res {
            counter!("rankings_errors_total", "endpoint" => self.endpoint).increment(1);
        }
    }

    fn rejected(self) {
        let ms = self.started.elapsed().as_secs_f64() * 1000.0;
        histogram!("rankings_duration_ms", "endpoint" => self.endpoint).record(ms);
    }
}

fn fail(message: &'static str, inner: ApiError) -> EndpointError {
    EndpointError { message, inner }
}

async fn get_rankings(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Value>, EndpointError> {
    const MSG: &str = "Server error while calculating rankings";
    let obs = Observe::start("/rankings/restaurants");
    let cfg = &state.config.rankings;

    let query = match RankingQuery::from_params(&q, cfg.default_limit, cfg.max_limit) {
        Ok(query) => query,
        Err(e) => {
            warn!(
                endpoint = "/rankings/restaurants",
                params = ?q,
                error = %e,
                "rejected ranking query"
            );
            obs.rejected();
            return Err(fail(MSG, e));
        }
    };

    let res = ranking::get_rankings(state.store.as_ref(), &query)
        .await
        .map_err(ApiError::from);
    obs.finish(&res);
    match res {
        Ok(page) => Ok(ok(page)),
        Err(e) => {
            error!(
                endpoint = "/rankings/restaurants",
                filters = ?query.echo(),
                error = %e,
                "get rankings failed"
            );
            Err(fail(MSG, e))
        }
    }
}

async fn get_top(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Value>, EndpointError> {
    const MSG: &str = "Server error while fetching top restaurants";
    let obs = Observe::start("/rankings/top");
    let cfg = &state.config.rankings;

    let category = TopCategory::parse_or_default(q.get("category").map(String::as_str));
    let limit = match parse_count(q.get("limit").map(String::as_str)) {
        Some(0) | None => cfg.top_default_limit,
        Some(n) => n.min(cfg.max_limit),
    };

    let res = top::get_top(state.store.as_ref(), category, limit, Utc::now())
        .await
        .map_err(ApiError::from);
    obs.finish(&res);
    match res {
        Ok(list) => Ok(ok(list)),
        Err(e) => {
            error!(
                endpoint = "/rankings/top",
                ?category,
                limit,
                error = %e,
                "get top restaurants failed"
            );
            Err(fail(MSG, e))
        }
    }
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<Value>, EndpointError> {
    const MSG: &str = "Server error while fetching ranking statistics";
    let obs = Observe::start("/rankings/stats");

    let res = stats::get_stats(state.store.as_ref())
        .await
        .map_err(ApiError::from);
    obs.finish(&res);
    match res {
        Ok(s) => {
            gauge!("store_restaurants").set(s.overall.total_restaurants as f64);
            Ok(ok(s))
        }
        Err(e) => {
            error!(endpoint = "/rankings/stats", error = %e, "get ranking stats failed");
            Err(fail(MSG, e))
        }
    }
}

async fn list_restaurants(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Value>, EndpointError> {
    let cfg = &state.config.restaurants;
    let p = Pagination::from_params(
        q.get("page").map(String::as_str),
        q.get("limit").map(String::as_str),
        cfg.default_limit,
        cfg.max_limit,
    );
    let cuisine = q.get("cuisine").map(String::as_str);

    match restaurants::list_restaurants(state.store.as_ref(), cuisine, p).await {
        Ok(list) => Ok(ok(list)),
        Err(e) => {
            error!(
                endpoint = "/restaurants",
                ?cuisine,
                page = p.page,
                error = %e,
                "list restaurants failed"
            );
            Err(fail("Server error while fetching restaurants", e))
        }
    }
}

async fn restaurant_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Value>, EndpointError> {
    let cfg = &state.config.restaurants;
    let include_comments = q
        .get("includeComments")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
    let p = Pagination::from_params(
        q.get("page").map(String::as_str),
        q.get("limit").map(String::as_str),
        cfg.comments_default_limit,
        cfg.max_limit,
    );

    match restaurants::restaurant_detail(state.store.as_ref(), &id, include_comments, p).await {
        Ok(d) => Ok(ok(d)),
        Err(e) => {
            if let ApiError::Store(_) = e {
                error!(endpoint = "/restaurants/{id}", %id, error = %e, "get restaurant failed");
            }
            Err(fail("Server error while fetching restaurant", e))
        }
    }
}

/// Caller identity, taken from the `x-user-id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| UserId(s.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}

async fn submit_review(
    State(state): State<AppState>,
    UserId(user): UserId,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<Value>, EndpointError> {
    const MSG: &str = "Server error during review processing";
    let Json(req) = body.map_err(|e| {
        fail(
            MSG,
            ApiError::InvalidQuery(format!("Malformed request body: {}", e.body_text())),
        )
    })?;
    let restaurant_id = req.restaurant_id.clone();

    match review::submit_review(state.store.as_ref(), state.scorer.as_ref(), &user, req).await {
        Ok(receipt) => Ok(Json(json!({
            "success": true,
            "data": receipt,
            "message": "Sentiment analysis completed successfully",
        }))),
        Err(e) => {
            if let ApiError::Store(_) = e {
                error!(
                    endpoint = "/reviews/submit",
                    restaurant = ?restaurant_id,
                    error = %e,
                    "review submission failed"
                );
            }
            Err(fail(MSG, e))
        }
    }
}
