//! Adapters over the third-party data sources a round is built from.
//!
//! Providers do plain I/O and normalization only; they never see game state.

mod football;
mod tmdb;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use football::ApiFootballProvider;
pub use tmdb::TmdbProvider;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while talking to a data provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Response parsing failed: {0}")]
    ParseError(String),
}

/// An entry of the provider's popular-people listing
#[derive(Debug, Clone, PartialEq)]
pub struct PersonSummary {
    pub id: u64,
    pub name: String,
}

/// One acting credit of a person
#[derive(Debug, Clone, PartialEq)]
pub struct MovieCredit {
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: f64,
    pub vote_count: u32,
}

/// Movie search hit returned by the autocomplete endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSearchResult {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FootballerSummary {
    pub id: u64,
    pub name: String,
}

/// A single move between clubs
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub joined: Option<String>,
    pub left: Option<String>,
}

/// Source of actors and their filmographies
#[async_trait]
pub trait MovieProvider: Send + Sync {
    /// One page of currently popular people
    async fn popular_people(&self, page: u32) -> ProviderResult<Vec<PersonSummary>>;

    /// Acting credits of a person, in provider order
    async fn movie_credits(&self, person_id: u64) -> ProviderResult<Vec<MovieCredit>>;

    async fn search_movies(&self, query: &str) -> ProviderResult<Vec<MovieSearchResult>>;

    /// Absolute URL of a poster given the provider's relative path
    fn poster_url(&self, poster_path: &str) -> String;

    fn name(&self) -> &str;
}

/// Source of footballers and their club history
#[async_trait]
pub trait FootballProvider: Send + Sync {
    /// Look a footballer up by display name
    async fn search_player(&self, name: &str) -> ProviderResult<Option<FootballerSummary>>;

    async fn transfers(&self, player_id: u64) -> ProviderResult<Vec<Transfer>>;

    /// Club names of the reference league, used as distractors
    async fn league_teams(&self) -> ProviderResult<Vec<String>>;

    fn name(&self) -> &str;
}

/// Configuration for the data providers
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub tmdb_api_key: Option<String>,
    pub tmdb_base_url: String,
    pub tmdb_image_base_url: String,
    pub tmdb_language: String,
    pub rapidapi_key: Option<String>,
    pub rapidapi_host: Option<String>,
    /// League whose roster provides distractor clubs
    pub football_league: String,
    pub football_season: String,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            tmdb_base_url: "https://api.themoviedb.org/3".to_string(),
            tmdb_image_base_url: "https://image.tmdb.org/t/p/w200".to_string(),
            tmdb_language: "es-ES".to_string(),
            rapidapi_key: None,
            rapidapi_host: None,
            football_league: "140".to_string(),
            football_season: "2023".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Read an environment variable, treating blank values as unset
fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl ProviderConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            tmdb_api_key: non_empty_env("TMDB_API_KEY"),
            tmdb_base_url: non_empty_env("TMDB_BASE_URL").unwrap_or(defaults.tmdb_base_url),
            tmdb_image_base_url: non_empty_env("TMDB_IMAGE_BASE_URL")
                .unwrap_or(defaults.tmdb_image_base_url),
            tmdb_language: non_empty_env("TMDB_LANGUAGE").unwrap_or(defaults.tmdb_language),
            rapidapi_key: non_empty_env("RAPIDAPI_KEY"),
            rapidapi_host: non_empty_env("RAPIDAPI_HOST"),
            football_league: non_empty_env("FOOTBALL_LEAGUE").unwrap_or(defaults.football_league),
            football_season: non_empty_env("FOOTBALL_SEASON").unwrap_or(defaults.football_season),
            timeout: std::env::var("PROVIDER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn build_movie_provider(&self) -> ProviderResult<TmdbProvider> {
        if self.tmdb_api_key.is_none() {
            tracing::warn!("TMDB_API_KEY not set; movie rounds will fail until it is configured");
        }
        TmdbProvider::new(self)
    }

    pub fn build_football_provider(&self) -> ProviderResult<ApiFootballProvider> {
        if self.rapidapi_key.is_none() || self.rapidapi_host.is_none() {
            tracing::warn!(
                "RAPIDAPI_KEY/RAPIDAPI_HOST not set; club rounds will fail until they are configured"
            );
        }
        ApiFootballProvider::new(self)
    }
}

/// Shared HTTP client with the configured timeout
fn http_client(timeout: Duration) -> ProviderResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

/// Map a reqwest failure, keeping timeouts distinguishable
fn request_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::ApiError(err.to_string())
    }
}
