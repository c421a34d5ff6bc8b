//! Capabilities provided by the music catalog and the target playlist

use crate::domain::track::Track;

pub mod error;
pub mod spotify;

use error::CatalogError;

/// Resolves user queries to track metadata
pub trait TrackCatalog {
    /// `Ok(None)` when the catalog has no such track
    fn resolve_by_url(&self, url: &str) -> Result<Option<Track>, CatalogError>;

    /// first match for the name and artist, `Ok(None)` when nothing matches
    fn resolve_by_query(&self, name: &str, artist: &str) -> Result<Option<Track>, CatalogError>;
}

/// Answers whether a track is already on the target playlist.
///
/// Implementations must look through the whole playlist, it has no useful ordering.
pub trait PlaylistMembership {
    fn contains(&self, track_url: &str) -> Result<bool, CatalogError>;
}

/// Adds tracks to the target playlist
pub trait PlaylistMutation {
    fn add_item(&self, track_url: &str) -> Result<(), CatalogError>;
}

/// Everything a voting session needs from the catalog side
pub trait Catalog: TrackCatalog + PlaylistMembership + PlaylistMutation {}

impl<T: TrackCatalog + PlaylistMembership + PlaylistMutation> Catalog for T {}
