use std::fmt::Display;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Represent a track resolved by the catalog.
///
/// Tracks are never mutated after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// canonical catalog url, unique per track
    pub url: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub release_date: Option<ReleaseDate>,
    pub image_url: Option<String>,
}

/// Release date with the precision the catalog knows it at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "precision", rename_all = "snake_case")]
pub enum ReleaseDate {
    Year { year: i32 },
    Month { year: i32, month: u32 },
    Day { date: NaiveDate },
}

impl ReleaseDate {
    /// parses "2020", "2020-05" or "2020-05-17"
    pub fn parse(s: &str) -> Option<Self> {
        let parts = s.trim().split('-').collect::<Vec<_>>();
        match parts.as_slice() {
            [year] => Some(Self::Year {
                year: year.parse().ok()?,
            }),
            [year, month] => {
                let year = year.parse().ok()?;
                let month = month.parse().ok()?;
                // validates the month
                NaiveDate::from_ymd_opt(year, month, 1)?;
                Some(Self::Month { year, month })
            }
            [_, _, _] => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .ok()
                .map(|date| Self::Day { date }),
            _ => None,
        }
    }
}

impl Display for ReleaseDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Year { year } => write!(f, "{year:04}"),
            Self::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            Self::Day { date } => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.name, self.artist)?;
        if let Some(date) = &self.release_date {
            write!(f, " - {date}")?;
        }
        Ok(())
    }
}
