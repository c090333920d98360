//! Query parameter parsing for ranking and browsing endpoints.
//!
//! Numeric parameters never fail a request: garbage falls back to the
//! default and out-of-range values are clamped. The only hard rejection is an
//! unknown `sortBy`, which has no sensible fallback.

use std::cmp::Ordering;
use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::error::ApiError;
use crate::model::Restaurant;
use crate::scoring::RestaurantMetrics;

pub const DEFAULT_MIN_COMMENTS: usize = 1;

/// Case-insensitive, unanchored pattern on a text field.
#[derive(Debug, Clone)]
pub struct TextPattern {
    raw: String,
    re: Regex,
}

impl TextPattern {
    /// `None` for absent or blank input (no constraint).
    /// A pattern that is not a valid regex is matched literally.
    pub fn new(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let re = RegexBuilder::new(raw)
            .case_insensitive(true)
            .build()
            .or_else(|_| {
                RegexBuilder::new(&regex::escape(raw))
                    .case_insensitive(true)
                    .build()
            })
            .ok()?;
        Some(Self {
            raw: raw.to_string(),
            re,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.re.is_match(s)
    }
}

/// Restaurant selection criteria handed to the store.
#[derive(Debug, Clone, Default)]
pub struct RestaurantMatch {
    pub cuisine: Option<TextPattern>,
    pub location: Option<TextPattern>,
}

impl RestaurantMatch {
    pub fn new(cuisine: Option<&str>, location: Option<&str>) -> Self {
        Self {
            cuisine: cuisine.and_then(TextPattern::new),
            location: location.and_then(TextPattern::new),
        }
    }

    /// A location constraint never matches a restaurant without a location.
    pub fn matches(&self, r: &Restaurant) -> bool {
        let cuisine_ok = match &self.cuisine {
            None => true,
            Some(p) => p.is_match(&r.cuisine),
        };
        let location_ok = match (&self.location, &r.location) {
            (None, _) => true,
            (Some(p), Some(loc)) => p.is_match(loc),
            (Some(_), None) => false,
        };
        cuisine_ok && location_ok
    }
}

/// Metric (and base) fields a ranking can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    OverallScore,
    AvgSentimentScore,
    TotalComments,
    PositiveComments,
    NegativeComments,
    NeutralComments,
    PositivePercentage,
    NegativePercentage,
    RecentActivity,
    Name,
    CreatedAt,
}

impl SortField {
    pub const ALL: [SortField; 11] = [
        SortField::OverallScore,
        SortField::AvgSentimentScore,
        SortField::TotalComments,
        SortField::PositiveComments,
        SortField::NegativeComments,
        SortField::NeutralComments,
        SortField::PositivePercentage,
        SortField::NegativePercentage,
        SortField::RecentActivity,
        SortField::Name,
        SortField::CreatedAt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::OverallScore => "overallScore",
            SortField::AvgSentimentScore => "avgSentimentScore",
            SortField::TotalComments => "totalComments",
            SortField::PositiveComments => "positiveComments",
            SortField::NegativeComments => "negativeComments",
            SortField::NeutralComments => "neutralComments",
            SortField::PositivePercentage => "positivePercentage",
            SortField::NegativePercentage => "negativePercentage",
            SortField::RecentActivity => "recentActivity",
            SortField::Name => "name",
            SortField::CreatedAt => "createdAt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }

    /// Ascending comparison of two scored restaurants on this field.
    /// A missing `recentActivity` sorts below any timestamp.
    pub fn compare(
        &self,
        a: (&Restaurant, &RestaurantMetrics),
        b: (&Restaurant, &RestaurantMetrics),
    ) -> Ordering {
        let (ra, ma) = a;
        let (rb, mb) = b;
        match self {
            SortField::OverallScore => ma.overall_score.total_cmp(&mb.overall_score),
            SortField::AvgSentimentScore => {
                ma.avg_sentiment_score.total_cmp(&mb.avg_sentiment_score)
            }
            SortField::TotalComments => ma.total_comments.cmp(&mb.total_comments),
            SortField::PositiveComments => ma.positive_comments.cmp(&mb.positive_comments),
            SortField::NegativeComments => ma.negative_comments.cmp(&mb.negative_comments),
            SortField::NeutralComments => ma.neutral_comments.cmp(&mb.neutral_comments),
            SortField::PositivePercentage => {
                ma.positive_percentage.total_cmp(&mb.positive_percentage)
            }
            SortField::NegativePercentage => {
                ma.negative_percentage.total_cmp(&mb.negative_percentage)
            }
            SortField::RecentActivity => ma.recent_activity.cmp(&mb.recent_activity),
            SortField::Name => ra.name.cmp(&rb.name),
            SortField::CreatedAt => ra.created_at.cmp(&rb.created_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Anything other than `asc`/`desc` keeps the default.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::default(),
        }
    }

    pub fn apply(&self, ord: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

/// 1-based page with a bounded limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Lenient parse: non-numeric → default, page < 1 → 1, limit clamped to `1..=max_limit`.
    pub fn from_params(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: usize,
        max_limit: usize,
    ) -> Self {
        let page = parse_count(page).unwrap_or(1).max(1);
        let limit = match parse_count(limit) {
            Some(0) | None => default_limit,
            Some(n) => n,
        };
        Self::new(page, limit.min(max_limit.max(1)))
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Serialized pagination block shared by list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: usize,
    pub total_pages: usize,
    /// Named after its use on ranking endpoints; it counts whatever the list holds.
    pub total_restaurants: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationInfo {
    pub fn new(p: Pagination, total: usize) -> Self {
        let total_pages = total.div_ceil(p.limit);
        Self {
            current_page: p.page,
            total_pages,
            total_restaurants: total,
            has_next: p.page < total_pages,
            has_prev: p.page > 1,
        }
    }
}

/// Parse a non-negative count. Negative numbers clamp to 0, junk yields `None`.
/// Accepts a leading integer like `"20abc"` the way lenient form parsers do.
pub fn parse_count(raw: Option<&str>) -> Option<usize> {
    let s = raw?.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(n.max(0) as usize);
    }
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let lead: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    if lead.is_empty() {
        return None;
    }
    if neg {
        return Some(0);
    }
    Some(lead.parse::<usize>().unwrap_or(usize::MAX))
}

/// Parameters of the full ranking query.
#[derive(Debug, Clone)]
pub struct RankingQuery {
    pub filter: RestaurantMatch,
    pub min_comments: usize,
    pub sort: SortSpec,
    pub pagination: Pagination,
}

/// Echo of the effective filters, returned with each ranking page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltersEcho {
    pub cuisine: Option<String>,
    pub location: Option<String>,
    pub min_comments: usize,
    pub sort_by: SortField,
    pub order: SortOrder,
}

impl RankingQuery {
    pub fn from_params(
        q: &HashMap<String, String>,
        default_limit: usize,
        max_limit: usize,
    ) -> Result<Self, ApiError> {
        let get = |k: &str| q.get(k).map(String::as_str);

        let field = match get("sortBy").map(str::trim).filter(|s| !s.is_empty()) {
            None => SortField::default(),
            Some(s) => SortField::parse(s).ok_or_else(|| {
                let allowed: Vec<&str> = SortField::ALL.iter().map(|f| f.as_str()).collect();
                ApiError::InvalidQuery(format!(
                    "Unknown sortBy '{s}'. Allowed: {}",
                    allowed.join(", ")
                ))
            })?,
        };

        Ok(Self {
            filter: RestaurantMatch::new(get("cuisine"), get("location")),
            min_comments: parse_count(get("minComments")).unwrap_or(DEFAULT_MIN_COMMENTS),
            sort: SortSpec {
                field,
                order: SortOrder::parse_or_default(get("order")),
            },
            pagination: Pagination::from_params(
                get("page"),
                get("limit"),
                default_limit,
                max_limit,
            ),
        })
    }

    pub fn echo(&self) -> FiltersEcho {
        FiltersEcho {
            cuisine: self.filter.cuisine.as_ref().map(|p| p.as_str().to_string()),
            location: self.filter.location.as_ref().map(|p| p.as_str().to_string()),
            min_comments: self.min_comments,
            sort_by: self.sort.field,
            order: self.sort.order,
        }
    }
}
