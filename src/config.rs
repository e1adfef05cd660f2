use serde::Deserialize;

use crate::models::SimilarityMetric;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Tunables for the analytics and recommendation engine.
///
/// Read from `SCENTINEL_`-prefixed variables, e.g. `SCENTINEL_DEFAULT_METRIC=jaccard`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EngineSettings {
    /// Days without a wear before an item counts as neglected
    #[serde(default = "default_neglect_threshold_days")]
    pub neglect_threshold_days: i64,

    /// Trailing window used for frequency bucketing
    #[serde(default = "default_trailing_window_days")]
    pub trailing_window_days: i64,

    /// Items worn within this many days are not used as content anchors
    #[serde(default = "default_recent_wear_days")]
    pub recent_wear_days: i64,

    /// Number of highest-rated items used as content anchors
    #[serde(default = "default_top_rated_count")]
    pub top_rated_count: usize,

    /// Minimum share of the final score a component needs to earn a reason
    #[serde(default = "default_reason_share_threshold")]
    pub reason_share_threshold: f64,

    /// Metric used for the content component of recommendations
    #[serde(default)]
    pub default_metric: SimilarityMetric,
}

/// Upper bound for every day-valued setting (about a century)
pub const MAX_DAY_SETTING: i64 = 36_500;

fn default_neglect_threshold_days() -> i64 {
    30
}

fn default_trailing_window_days() -> i64 {
    365
}

fn default_recent_wear_days() -> i64 {
    7
}

fn default_top_rated_count() -> usize {
    5
}

fn default_reason_share_threshold() -> f64 {
    0.25
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            neglect_threshold_days: default_neglect_threshold_days(),
            trailing_window_days: default_trailing_window_days(),
            recent_wear_days: default_recent_wear_days(),
            top_rated_count: default_top_rated_count(),
            reason_share_threshold: default_reason_share_threshold(),
            default_metric: SimilarityMetric::default(),
        }
    }
}

impl EngineSettings {
    /// Load engine settings from `SCENTINEL_*` environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let settings = envy::prefixed("SCENTINEL_")
            .from_env::<EngineSettings>()
            .map_err(|e| anyhow::anyhow!("Failed to load engine settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let day_range = 1..=MAX_DAY_SETTING;
        if !day_range.contains(&self.neglect_threshold_days)
            || !day_range.contains(&self.trailing_window_days)
        {
            anyhow::bail!("Day thresholds must be between 1 and {}", MAX_DAY_SETTING);
        }
        if !(0..=MAX_DAY_SETTING).contains(&self.recent_wear_days) {
            anyhow::bail!("recent_wear_days must be between 0 and {}", MAX_DAY_SETTING);
        }
        if !(0.0..=1.0).contains(&self.reason_share_threshold) {
            anyhow::bail!("reason_share_threshold must be within [0, 1]");
        }
        Ok(())
    }
}
