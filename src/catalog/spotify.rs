//! Spotify Web API client backed by `ureq`.
//!
//! One client is built per session from a refresh token and handed to every
//! operation that talks to Spotify.

use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    catalog::{PlaylistMembership, PlaylistMutation, TrackCatalog, error::CatalogError},
    config::SpotifyConfig,
    domain::track::{ReleaseDate, Track},
};

const PLAYLIST_PAGE_SIZE: usize = 100;
const TRACK_ID_LEN: usize = 22;

pub struct SpotifyClient {
    http_client: ureq::Agent,
    api_base: String,
    playlist_id: String,
    access_token: String,
}

impl SpotifyClient {
    /// Exchanges the configured refresh token for an access token.
    pub fn connect(config: &SpotifyConfig, playlist_id: &str) -> Result<Self, CatalogError> {
        let credentials = config.credentials()?;
        let http_client = Self::agent(config.timeout_secs);

        let response: TokenResponse = http_client
            .post(&format!(
                "{}/api/token",
                config.accounts_base.trim_end_matches('/')
            ))
            .send_form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &credentials.refresh_token),
                ("client_id", &credentials.client_id),
                ("client_secret", &credentials.client_secret),
            ])?
            .into_json()
            .map_err(|e| CatalogError::Parse(format!("token response: {e}")))?;
        info!("Obtained Spotify access token");

        Ok(Self::with_token(config, playlist_id, response.access_token))
    }

    pub fn with_token(config: &SpotifyConfig, playlist_id: &str, access_token: String) -> Self {
        Self {
            http_client: Self::agent(config.timeout_secs),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            playlist_id: playlist_id.to_string(),
            access_token,
        }
    }

    fn agent(timeout_secs: u64) -> ureq::Agent {
        let timeout = Duration::from_secs(timeout_secs);
        ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build()
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        debug!("GET {url}");
        self.http_client
            .get(url)
            .set("Authorization", &self.bearer())
            .call()?
            .into_json()
            .map_err(|e| CatalogError::Parse(format!("{url}: {e}")))
    }

    /// every track url on the playlist, following `next` links until the last page
    fn playlist_track_ids(&self) -> Result<Vec<String>, CatalogError> {
        let mut next = Some(format!(
            "{}/playlists/{}/tracks?fields=items(track(id,external_urls)),next&limit={PLAYLIST_PAGE_SIZE}",
            self.api_base, self.playlist_id
        ));
        let mut ids = Vec::new();

        while let Some(url) = next {
            let page: Paging<PlaylistItem> = self.get_json(&url)?;
            ids.extend(page.items.into_iter().filter_map(PlaylistItem::track_id));
            next = page.next;
        }

        debug!("Playlist {} holds {} tracks", self.playlist_id, ids.len());
        Ok(ids)
    }
}

impl TrackCatalog for SpotifyClient {
    fn resolve_by_url(&self, url: &str) -> Result<Option<Track>, CatalogError> {
        let Some(id) = track_id_from_url(url) else {
            debug!("{url} is not a Spotify track link");
            return Ok(None);
        };

        match self.get_json::<ApiTrack>(&format!("{}/tracks/{id}", self.api_base)) {
            Ok(track) => track.into_track().map(Some),
            Err(CatalogError::Http {
                status: 400 | 404, ..
            }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn resolve_by_query(&self, name: &str, artist: &str) -> Result<Option<Track>, CatalogError> {
        let query = format!("track:{name} artist:{artist}");
        let url = format!(
            "{}/search?type=track&limit=1&q={}",
            self.api_base,
            urlencoding::encode(&query)
        );
        let response: SearchResponse = self.get_json(&url)?;

        response
            .tracks
            .items
            .into_iter()
            .next()
            .map(ApiTrack::into_track)
            .transpose()
    }
}

impl PlaylistMembership for SpotifyClient {
    fn contains(&self, track_url: &str) -> Result<bool, CatalogError> {
        let Some(id) = track_id_from_url(track_url) else {
            return Ok(false);
        };
        Ok(self.playlist_track_ids()?.iter().any(|known| known == id))
    }
}

impl PlaylistMutation for SpotifyClient {
    fn add_item(&self, track_url: &str) -> Result<(), CatalogError> {
        let id = track_id_from_url(track_url)
            .ok_or_else(|| CatalogError::Parse(format!("{track_url} is not a track link")))?;

        self.http_client
            .post(&format!(
                "{}/playlists/{}/tracks",
                self.api_base, self.playlist_id
            ))
            .set("Authorization", &self.bearer())
            .send_json(serde_json::json!({ "uris": [format!("spotify:track:{id}")] }))?;

        info!("Added {track_url} to playlist {}", self.playlist_id);
        Ok(())
    }
}

/// Extracts the track id from `https://open.spotify.com/[intl-xx/]track/{id}[?..]`
/// or `spotify:track:{id}`.
pub fn track_id_from_url(url: &str) -> Option<&str> {
    let url = url.trim();

    let id = if let Some(id) = url.strip_prefix("spotify:track:") {
        id
    } else {
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url)
            .strip_prefix("open.spotify.com/")?;
        let path = rest.split(['?', '#']).next().unwrap_or_default();

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let mut first = segments.next()?;
        if first.starts_with("intl-") {
            first = segments.next()?;
        }
        if first != "track" {
            return None;
        }
        let id = segments.next()?;
        if segments.next().is_some() {
            return None;
        }
        id
    };

    (id.len() == TRACK_ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric())).then_some(id)
}

pub fn canonical_track_url(id: &str) -> String {
    format!("https://open.spotify.com/track/{id}")
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct Paging<T> {
    items: Vec<T>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: Paging<ApiTrack>,
}

#[derive(Deserialize, Default)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Deserialize)]
struct ApiImage {
    url: String,
}

#[derive(Deserialize)]
struct ApiAlbum {
    name: String,
    release_date: Option<String>,
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Deserialize)]
struct ApiTrack {
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    album: ApiAlbum,
    #[serde(default)]
    external_urls: ExternalUrls,
}

impl ApiTrack {
    fn into_track(self) -> Result<Track, CatalogError> {
        let url = self
            .external_urls
            .spotify
            .or_else(|| self.id.as_deref().map(canonical_track_url))
            .ok_or_else(|| CatalogError::Parse(format!("track {} has no url", self.name)))?;

        Ok(Track {
            url,
            artist: self
                .artists
                .into_iter()
                .next()
                .map(|a| a.name)
                .unwrap_or_default(),
            album: self.album.name,
            release_date: self
                .album
                .release_date
                .as_deref()
                .and_then(ReleaseDate::parse),
            image_url: self.album.images.into_iter().next().map(|i| i.url),
            name: self.name,
        })
    }
}

#[derive(Deserialize)]
struct PlaylistItem {
    /// null for tracks that vanished from the catalog
    track: Option<PlaylistTrack>,
}

#[derive(Deserialize)]
struct PlaylistTrack {
    id: Option<String>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

impl PlaylistItem {
    fn track_id(self) -> Option<String> {
        let track = self.track?;
        track.id.or_else(|| {
            track
                .external_urls
                .spotify
                .as_deref()
                .and_then(track_id_from_url)
                .map(str::to_string)
        })
    }
}
