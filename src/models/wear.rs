use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use super::ItemId;

/// Season a wear was logged for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    /// Meteorological season for a calendar month (1-12)
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Fall,
        }
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self::from_month(date.month())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        }
    }
}

impl Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Season {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Season::ALL
            .into_iter()
            .find(|season| season.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown season '{}'", s))
    }
}

/// Occasion a fragrance was worn for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Occasion {
    Casual,
    Work,
    Date,
    Formal,
    Exercise,
    Special,
}

impl Occasion {
    pub const ALL: [Occasion; 6] = [
        Occasion::Casual,
        Occasion::Work,
        Occasion::Date,
        Occasion::Formal,
        Occasion::Exercise,
        Occasion::Special,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Occasion::Casual => "casual",
            Occasion::Work => "work",
            Occasion::Date => "date",
            Occasion::Formal => "formal",
            Occasion::Exercise => "exercise",
            Occasion::Special => "special",
        }
    }
}

impl Display for Occasion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Occasion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Occasion::ALL
            .into_iter()
            .find(|occasion| occasion.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown occasion '{}'", s))
    }
}

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

/// A single logged wear of an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WearRecord {
    pub id: Uuid,
    pub item_id: ItemId,
    /// Naive local time; no timezone is attached
    pub timestamp: NaiveDateTime,
    pub season: Season,
    pub occasion: Occasion,
    /// 1.0-5.0 when present; wears may be logged without a rating
    pub rating: Option<f64>,
}

impl WearRecord {
    pub fn new(
        item_id: ItemId,
        timestamp: NaiveDateTime,
        season: Season,
        occasion: Occasion,
        rating: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id,
            timestamp,
            season,
            occasion,
            rating,
        }
    }
}

/// Returns true when `rating` is a finite value within the 1-5 scale
pub fn rating_in_range(rating: f64) -> bool {
    rating.is_finite() && (MIN_RATING..=MAX_RATING).contains(&rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_from_month() {
        assert_eq!(Season::from_month(1), Season::Winter);
        assert_eq!(Season::from_month(2), Season::Winter);
        assert_eq!(Season::from_month(3), Season::Spring);
        assert_eq!(Season::from_month(7), Season::Summer);
        assert_eq!(Season::from_month(10), Season::Fall);
        assert_eq!(Season::from_month(12), Season::Winter);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Summer".parse::<Season>().unwrap(), Season::Summer);
        assert_eq!(" date ".parse::<Occasion>().unwrap(), Occasion::Date);
        assert!("autumn".parse::<Season>().is_err());
        assert!("party".parse::<Occasion>().is_err());
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(serde_json::to_string(&Season::Fall).unwrap(), "\"fall\"");
        assert_eq!(
            serde_json::to_string(&Occasion::Exercise).unwrap(),
            "\"exercise\""
        );
        let occasion: Occasion = serde_json::from_str("\"formal\"").unwrap();
        assert_eq!(occasion, Occasion::Formal);
    }

    #[test]
    fn test_rating_in_range() {
        assert!(rating_in_range(1.0));
        assert!(rating_in_range(4.5));
        assert!(rating_in_range(5.0));
        assert!(!rating_in_range(0.9));
        assert!(!rating_in_range(5.1));
        assert!(!rating_in_range(f64::NAN));
    }
}
