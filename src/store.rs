//! # Store
//! Read access to the Restaurant and Comment collections, plus comment
//! insertion for review submission.
//!
//! `Store` is the seam towards the document database. `MemoryStore` is the
//! in-process implementation: restaurants keep insertion order, comments are
//! indexed by owning restaurant. It is opened at startup from a JSON seed and
//! shared as `Arc<dyn Store>`; after `close()` every call fails.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::model::{Comment, Restaurant, SentimentAnalysis, SentimentLabel};
use crate::query::RestaurantMatch;

/// Built-in sample data used when no seed file is present.
const BUILTIN_SEED: &str = include_str!("../config/seed.json");

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Restaurant>>;

    async fn find_matching(&self, criteria: &RestaurantMatch) -> Result<Vec<Restaurant>>;

    async fn find_restaurant(&self, id: &str) -> Result<Option<Restaurant>>;

    async fn find_by_restaurant(&self, restaurant_id: &str) -> Result<Vec<Comment>>;

    /// Batched join for a candidate set. Every requested id is present in the
    /// result, with an empty list when it has no comments.
    async fn find_by_restaurants(&self, ids: &[String]) -> Result<HashMap<String, Vec<Comment>>> {
        let mut out = HashMap::with_capacity(ids.len());
        for id in ids {
            out.insert(id.clone(), self.find_by_restaurant(id).await?);
        }
        Ok(out)
    }

    async fn insert_comment(&self, comment: Comment) -> Result<()>;

    /// Release the handle. Later calls fail.
    async fn close(&self) {}
}

#[derive(Debug, Default)]
struct Collections {
    restaurants: Vec<Restaurant>,
    comments: HashMap<String, Vec<Comment>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store, rejecting duplicate restaurant ids and comments that
    /// reference unknown restaurants.
    pub fn with_data(restaurants: Vec<Restaurant>, comments: Vec<Comment>) -> Result<Self> {
        let mut cols = Collections {
            restaurants,
            comments: HashMap::new(),
        };
        for r in &cols.restaurants {
            if cols.comments.insert(r.id.clone(), Vec::new()).is_some() {
                bail!("duplicate restaurant id {}", r.id);
            }
        }
        for c in comments {
            validate_comment(&c)?;
            match cols.comments.get_mut(&c.restaurant) {
                Some(list) => list.push(c),
                None => bail!(
                    "comment {} references unknown restaurant {}",
                    c.id,
                    c.restaurant
                ),
            }
        }
        Ok(Self {
            inner: RwLock::new(cols),
            closed: AtomicBool::new(false),
        })
    }

    /// Load from a JSON seed file, or the built-in seed when the file does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let store = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading seed from {}", path.display()))?;
            Self::from_seed_json(&raw)
                .with_context(|| format!("parsing seed {}", path.display()))?
        } else {
            info!(path = %path.display(), "seed file not found, using built-in sample data");
            Self::builtin()?
        };
        Ok(store)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_seed_json(BUILTIN_SEED).context("parsing built-in seed")
    }

    pub fn from_seed_json(raw: &str) -> Result<Self> {
        let seed: SeedFile = serde_json::from_str(raw)?;
        let now = Utc::now();
        let restaurants: Vec<Restaurant> = seed
            .restaurants
            .into_iter()
            .map(|r| r.into_restaurant(now))
            .collect();
        let comments = seed
            .comments
            .into_iter()
            .map(|c| c.into_comment(now))
            .collect();
        let store = Self::with_data(restaurants, comments)?;
        Ok(store)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(anyhow!("store is closed"))
        } else {
            Ok(())
        }
    }
}

fn validate_comment(c: &Comment) -> Result<()> {
    if c.content.trim().is_empty() {
        bail!("comment {} has empty content", c.id);
    }
    if c.user.trim().is_empty() {
        bail!("comment {} has no user", c.id);
    }
    Ok(())
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn find_all(&self) -> Result<Vec<Restaurant>> {
        self.ensure_open()?;
        Ok(self.inner.read().await.restaurants.clone())
    }

    async fn find_matching(&self, criteria: &RestaurantMatch) -> Result<Vec<Restaurant>> {
        self.ensure_open()?;
        let g = self.inner.read().await;
        Ok(g
            .restaurants
            .iter()
            .filter(|r| criteria.matches(r))
            .cloned()
            .collect())
    }

    async fn find_restaurant(&self, id: &str) -> Result<Option<Restaurant>> {
        self.ensure_open()?;
        let g = self.inner.read().await;
        Ok(g.restaurants.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_restaurant(&self, restaurant_id: &str) -> Result<Vec<Comment>> {
        self.ensure_open()?;
        let g = self.inner.read().await;
        Ok(g.comments.get(restaurant_id).cloned().unwrap_or_default())
    }

    // One lock acquisition for the whole candidate set.
    async fn find_by_restaurants(&self, ids: &[String]) -> Result<HashMap<String, Vec<Comment>>> {
        self.ensure_open()?;
        let g = self.inner.read().await;
        Ok(ids
            .iter()
            .map(|id| (id.clone(), g.comments.get(id).cloned().unwrap_or_default()))
            .collect())
    }

    async fn insert_comment(&self, comment: Comment) -> Result<()> {
        self.ensure_open()?;
        validate_comment(&comment)?;
        let mut g = self.inner.write().await;
        match g.comments.get_mut(&comment.restaurant) {
            Some(list) => {
                list.push(comment);
                Ok(())
            }
            None => Err(anyhow!(
                "comment references unknown restaurant {}",
                comment.restaurant
            )),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        info!("store closed");
    }
}

/* ----------------------------
Seed file schema (JSON)
---------------------------- */

#[derive(Debug, Deserialize)]
struct SeedFile {
    restaurants: Vec<SeedRestaurant>,
    #[serde(default)]
    comments: Vec<SeedComment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedRestaurant {
    id: String,
    name: String,
    #[serde(default)]
    location: Option<String>,
    cuisine: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl SeedRestaurant {
    fn into_restaurant(self, now: DateTime<Utc>) -> Restaurant {
        Restaurant {
            id: self.id,
            name: self.name,
            location: self.location,
            cuisine: self.cuisine,
            created_at: self.created_at.unwrap_or(now),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedComment {
    #[serde(default)]
    id: Option<String>,
    content: String,
    user: String,
    restaurant: String,
    #[serde(default)]
    score: f64,
    /// Derived from `score` when absent.
    #[serde(default)]
    label: Option<SentimentLabel>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl SeedComment {
    fn into_comment(self, now: DateTime<Utc>) -> Comment {
        let mut analysis = SentimentAnalysis::from_score(self.score);
        if let Some(label) = self.label {
            analysis.label = label;
        }
        let created_at = self.created_at.unwrap_or(now);
        let id = self
            .id
            .unwrap_or_else(|| new_id("c", &[&self.restaurant, &self.user, &self.content]));
        Comment {
            id,
            content: self.content,
            user: self.user,
            restaurant: self.restaurant,
            sentiment_analysis: analysis,
            created_at,
        }
    }
}

/// Opaque id: prefix + first 6 bytes of a SHA-256 over the parts and a process counter.
pub fn new_id(prefix: &str, parts: &[&str]) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    static SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(seq.to_le_bytes());
    hasher.update(Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(prefix.len() + 13);
    out.push_str(prefix);
    out.push('-');
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
