//! Nomination queries typed in by users

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("give either a track url or a track name with an artist, not both")]
    Ambiguous,

    #[error("give a track url or a track name with an artist")]
    Missing,

    #[error("both track name and artist are needed to search")]
    IncompleteSearch,

    #[error("voter id is empty")]
    EmptyVoter,
}

/// What the user asked to nominate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackQuery {
    Url(String),
    Search { name: String, artist: String },
}

impl TrackQuery {
    /// Builds a query out of optional form fields.
    ///
    /// Blank fields count as missing. Exactly one of `url` or the `name` + `artist` pair
    /// must be present.
    pub fn from_parts(
        url: Option<&str>,
        name: Option<&str>,
        artist: Option<&str>,
    ) -> Result<Self, QueryError> {
        let url = url.map(str::trim).filter(|s| !s.is_empty());
        let name = name.map(normalize_text).filter(|s| !s.is_empty());
        let artist = artist.map(normalize_text).filter(|s| !s.is_empty());

        match (url, name, artist) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(QueryError::Ambiguous),
            (Some(url), None, None) => Ok(Self::Url(url.to_string())),
            (None, Some(name), Some(artist)) => Ok(Self::Search { name, artist }),
            (None, None, None) => Err(QueryError::Missing),
            (None, _, _) => Err(QueryError::IncompleteSearch),
        }
    }
}

/// trims and collapses runs of whitespace
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
