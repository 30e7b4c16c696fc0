//! Music catalog search client
//!
//! Talks to the catalog's public search API using an app-level
//! client-credentials token (no end-user session involved). The token is
//! cached in-process and refreshed with a safety buffer before expiry.
//!
//! Search runs in two passes: a strict field-qualified query first, then a
//! broadened plain-text query when the strict one returns nothing.

use crate::catalog::matcher;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use topfive_common::chart::CatalogTrack;
use topfive_common::config::CatalogConfig;
use topfive_common::{Error, Result};
use tracing::{debug, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const SEARCH_LIMIT: u32 = 10;

/// Refresh the cached token this long before it actually expires.
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Resolves a chart song/artist pair to a catalog track.
///
/// `Ok(Some)` is a resolved track, `Ok(None)` a search that genuinely
/// returned zero candidates, and `Err` an upstream failure. Callers decide
/// how each outcome is cached; the distinction matters because upstream
/// failures must not be negative-cached.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Verify the resolver can reach its upstream before a run starts.
    async fn warm_up(&self) -> Result<()>;

    async fn resolve(
        &self,
        song: &str,
        artist: &str,
        year: Option<i32>,
    ) -> Result<Option<CatalogTrack>>;
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Client for the catalog search API.
pub struct CatalogClient {
    http: reqwest::Client,
    config: CatalogConfig,
    token: Mutex<Option<CachedToken>>,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("topfive/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client construction cannot fail with static options");

        Self {
            http,
            config,
            token: Mutex::new(None),
        }
    }

    /// Get an app-level access token via the client-credentials flow,
    /// reusing the cached one while it remains comfortably valid.
    pub async fn client_credentials_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_EXPIRY_BUFFER < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        let basic = BASE64.encode(format!(
            "{}:{}",
            self.config.client_id, self.config.client_secret
        ));

        let response = self
            .http
            .post(&self.config.token_url)
            .header("Authorization", format!("Basic {basic}"))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| Error::Http(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!(
                "token request rejected ({status}): {body}"
            )));
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| Error::Http(format!("malformed token response: {e}")))?;

        debug!(expires_in = grant.expires_in, "catalog token refreshed");
        let expires_at = Instant::now() + Duration::from_secs(grant.expires_in);
        let access_token = grant.access_token.clone();
        *cached = Some(CachedToken {
            access_token: grant.access_token,
            expires_at,
        });

        Ok(access_token)
    }

    async fn search(&self, token: &str, query: &str) -> Result<Vec<CandidateTrack>> {
        let limit = SEARCH_LIMIT.to_string();
        let response = self
            .http
            .get(format!("{}/search", self.config.api_base_url))
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| Error::Http(format!("search request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!("search rejected ({status}): {body}")));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Http(format!("malformed search response: {e}")))?;

        Ok(parsed.tracks.map(|page| page.items).unwrap_or_default())
    }

    /// Strict field-qualified search, broadened to plain text when the
    /// strict query finds nothing.
    pub async fn search_track(
        &self,
        token: &str,
        song: &str,
        artist: &str,
    ) -> Result<Vec<CandidateTrack>> {
        let clean_song: String = song
            .chars()
            .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
            .collect();
        let clean_song = clean_song.trim();
        let clean_artist = matcher::primary_artist(artist);

        let strict = format!("track:{clean_song} artist:{clean_artist}");
        let candidates = self.search(token, &strict).await?;
        if !candidates.is_empty() {
            return Ok(candidates);
        }

        debug!(song, artist, "strict search empty, broadening");
        self.search(token, &format!("{clean_song} {clean_artist}"))
            .await
    }
}

#[async_trait]
impl TrackResolver for CatalogClient {
    async fn warm_up(&self) -> Result<()> {
        self.client_credentials_token().await.map(|_| ())
    }

    async fn resolve(
        &self,
        song: &str,
        artist: &str,
        year: Option<i32>,
    ) -> Result<Option<CatalogTrack>> {
        let token = self.client_credentials_token().await?;
        let candidates = self.search_track(&token, song, artist).await?;

        let Some((best, score)) = matcher::best_match(&candidates, song, artist, year) else {
            return Ok(None);
        };

        if score < matcher::MIN_CONFIDENCE_SCORE {
            warn!(song, artist, score, uri = %best.uri, "low-confidence catalog match");
        }

        Ok(Some(best.to_catalog_track()))
    }
}

#[derive(Deserialize)]
struct TokenGrant {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: Option<TrackPage>,
}

#[derive(Deserialize)]
struct TrackPage {
    items: Vec<CandidateTrack>,
}

/// One track candidate as returned by the catalog search API.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateTrack {
    pub uri: String,
    pub name: String,
    pub artists: Vec<CandidateArtist>,
    pub album: CandidateAlbum,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateAlbum {
    pub name: String,
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<CandidateImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateImage {
    pub url: String,
}

impl CandidateTrack {
    pub fn artist_names(&self) -> Vec<&str> {
        self.artists.iter().map(|a| a.name.as_str()).collect()
    }

    /// Release year parsed from the album's `release_date` prefix.
    pub fn release_year(&self) -> Option<i32> {
        self.album
            .release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok())
    }

    pub fn to_catalog_track(&self) -> CatalogTrack {
        CatalogTrack {
            uri: self.uri.clone(),
            name: self.name.clone(),
            artists: self.artist_names().join(", "),
            album: self.album.name.clone(),
            image: self
                .album
                .images
                .first()
                .map(|i| i.url.clone())
                .unwrap_or_default(),
        }
    }
}
