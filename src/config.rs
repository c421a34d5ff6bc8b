use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::catalog::error::CatalogError;

/// Votes strictly above this promote a track.
pub const DEFAULT_PROMOTION_THRESHOLD: usize = 5;
pub const DEFAULT_DISPLAY_WINDOW_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    pub database: Database,
    pub playlist: PlaylistConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    pub http: HttpConfig,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.to_string_lossy()))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    pub in_memory: bool,
    pub path: Option<PathBuf>,
}

/// The playlist votes are collected for, and the voting rules
#[derive(Debug, Deserialize, Clone)]
pub struct PlaylistConfig {
    pub id: String,
    #[serde(default = "default_threshold")]
    pub promotion_threshold: usize,
    #[serde(default = "default_window")]
    pub display_window_days: u32,
    /// run a promotion scan after every vote
    #[serde(default = "default_true")]
    pub auto_promote: bool,
}

fn default_threshold() -> usize {
    DEFAULT_PROMOTION_THRESHOLD
}

fn default_window() -> u32 {
    DEFAULT_DISPLAY_WINDOW_DAYS
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub api_base: String,
    pub accounts_base: String,
    pub timeout_secs: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            refresh_token: None,
            api_base: "https://api.spotify.com/v1".to_string(),
            accounts_base: "https://accounts.spotify.com".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl SpotifyConfig {
    /// Values from the config file win, environment variables fill the gaps.
    pub fn credentials(&self) -> Result<SpotifyCredentials, CatalogError> {
        self.credentials_with(|key| std::env::var(key).ok())
    }

    fn credentials_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<SpotifyCredentials, CatalogError> {
        let pick = |value: &Option<String>, key: &str| {
            value
                .clone()
                .or_else(|| env(key))
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CatalogError::Config(format!("{key} is not set")))
        };
        Ok(SpotifyCredentials {
            client_id: pick(&self.client_id, "SPOTIFY_CLIENT_ID")?,
            client_secret: pick(&self.client_secret, "SPOTIFY_CLIENT_SECRET")?,
            refresh_token: pick(&self.refresh_token, "SPOTIFY_REFRESH_TOKEN")?,
        })
    }
}
