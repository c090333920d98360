// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

pub const DEFAULT_APP_CONFIG_PATH: &str = "config/app.toml";
pub const ENV_APP_CONFIG_PATH: &str = "APP_CONFIG_PATH";
pub const ENV_SEED_PATH: &str = "SEED_PATH";
pub const ENV_METRICS_ENABLED: &str = "METRICS_ENABLED";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON seed with restaurants and comments. Missing file → built-in sample data.
    pub seed_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            seed_path: PathBuf::from("config/seed.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingsConfig {
    pub default_limit: usize,
    pub max_limit: usize,
    pub top_default_limit: usize,
}

impl Default for RankingsConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            top_default_limit: crate::top::DEFAULT_TOP_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestaurantsConfig {
    pub default_limit: usize,
    pub comments_default_limit: usize,
    pub max_limit: usize,
}

impl Default for RestaurantsConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            comments_default_limit: 5,
            max_limit: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose `/metrics` (Prometheus exposition).
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub rankings: RankingsConfig,
    pub restaurants: RestaurantsConfig,
    pub metrics: MetricsConfig,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Resolution order:
    /// 1) $APP_CONFIG_PATH (must exist)
    /// 2) config/app.toml
    /// 3) built-in defaults
    ///
    /// Env overrides ($SEED_PATH, $METRICS_ENABLED) are applied last.
    pub fn load_default() -> Result<Self> {
        let cfg = if let Ok(p) = env::var(ENV_APP_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("APP_CONFIG_PATH points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_APP_CONFIG_PATH);
            if p.exists() {
                Self::load_from_file(&p)?
            } else {
                Self::default()
            }
        };
        Ok(cfg.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(p) = env::var(ENV_SEED_PATH) {
            if !p.trim().is_empty() {
                self.store.seed_path = PathBuf::from(p.trim());
            }
        }
        if let Some(on) = parse_flag_env(env::var(ENV_METRICS_ENABLED).ok()) {
            self.metrics.enabled = on;
        }
        self
    }

    /// Keep limits usable: every limit ≥ 1 and defaults ≤ their max.
    pub fn sanitized(mut self) -> Self {
        let r = &mut self.rankings;
        r.max_limit = r.max_limit.max(1);
        r.default_limit = r.default_limit.clamp(1, r.max_limit);
        r.top_default_limit = r.top_default_limit.clamp(1, r.max_limit);

        let b = &mut self.restaurants;
        b.max_limit = b.max_limit.max(1);
        b.default_limit = b.default_limit.clamp(1, b.max_limit);
        b.comments_default_limit = b.comments_default_limit.clamp(1, b.max_limit);
        self
    }
}

// "1"/"true"/"yes"/"on" → Some(true); "0"/"false"/"no"/"off" → Some(false)
fn parse_flag_env(raw: Option<String>) -> Option<bool> {
    match raw?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
