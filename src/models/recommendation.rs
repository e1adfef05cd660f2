use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{ItemId, Occasion, Season};

/// Which part of the hybrid score a reason comes from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoreComponent {
    Content,
    Behavioral,
    Contextual,
}

/// A labeled contribution to a recommendation's score
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Reason {
    pub component: ScoreComponent,
    pub label: String,
    /// Weighted contribution to the final score
    pub contribution: f64,
}

/// One ranked suggestion
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendationEntry {
    pub item_id: ItemId,
    pub name: String,
    pub brand: String,
    pub score: f64,
    pub content_score: f64,
    pub behavioral_score: f64,
    pub contextual_score: f64,
    pub days_since_last_worn: Option<i64>,
    pub reasons: Vec<Reason>,
}

/// Situation a recommendation is requested for
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationContext {
    pub now: NaiveDateTime,
    /// Overrides the season derived from `now`
    pub season: Option<Season>,
    /// Hard filter on historical occasion use
    pub occasion: Option<Occasion>,
    pub limit: Option<usize>,
}

impl RecommendationContext {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now,
            season: None,
            occasion: None,
            limit: None,
        }
    }

    pub fn with_occasion(mut self, occasion: Occasion) -> Self {
        self.occasion = Some(occasion);
        self
    }

    pub fn with_season(mut self, season: Season) -> Self {
        self.season = Some(season);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn current_season(&self) -> Season {
        self.season
            .unwrap_or_else(|| Season::for_date(self.now.date()))
    }
}
