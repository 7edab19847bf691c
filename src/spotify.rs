//! Spotify Web API client implementing [`CatalogApi`].
//!
//! Responses are decoded into private `Api*` structs and mapped straight
//! into [`Track`], so nothing past this module sees the Spotify schema.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use crate::catalog::{CatalogApi, CatalogClients, CatalogSession, RecommendationRequest, Track};
use crate::config::Config;
use crate::error::{MoodError, Result};
use crate::spotify_auth::{self, ClientCredentials, CredentialMode};

const API_BASE: &str = "https://api.spotify.com/v1";
const USER_AGENT: &str = "moodtune/0.1";

// ── API response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    tracks: ApiPaging,
}

#[derive(Debug, Deserialize)]
struct ApiPaging {
    #[serde(default)]
    items: Vec<Option<ApiTrack>>,
}

#[derive(Debug, Deserialize)]
struct ApiRecommendations {
    #[serde(default)]
    tracks: Vec<Option<ApiTrack>>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    /// Null for local files
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    #[serde(default)]
    external_urls: ApiExternalUrls,
    preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    id: Option<String>,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiExternalUrls {
    spotify: Option<String>,
}

impl ApiTrack {
    /// Map to the pipeline's record shape.  Tracks without an ID are dropped.
    fn into_track(self) -> Option<Track> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let artist = self
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let first_artist_id = self.artists.first().and_then(|a| a.id.clone());
        let url = self
            .external_urls
            .spotify
            .unwrap_or_else(|| format!("https://open.spotify.com/track/{}", id));

        Some(Track {
            id,
            name: self.name,
            artist,
            url,
            preview_url: self.preview_url.filter(|u| !u.is_empty()),
            first_artist_id,
        })
    }
}

fn map_tracks(items: Vec<Option<ApiTrack>>) -> Vec<Track> {
    items
        .into_iter()
        .flatten()
        .filter_map(ApiTrack::into_track)
        .collect()
}

/// Query parameters for `GET /recommendations`.
fn recommendation_query(request: &RecommendationRequest) -> Vec<(&'static str, String)> {
    vec![
        (request.seeds.param_name(), request.seeds.joined()),
        ("limit", request.limit.to_string()),
        ("market", request.market.clone()),
        ("target_valence", format!("{:.2}", request.target.valence)),
        ("target_energy", format!("{:.2}", request.target.energy)),
    ]
}

// ── Client ───────────────────────────────────────────────────────────────────

/// An authenticated Spotify client in one credential mode.
pub struct SpotifyClient {
    name: String,
    mode: CredentialMode,
    access_token: String,
    agent: ureq::Agent,
}

impl SpotifyClient {
    /// App-scoped client via the client-credentials grant.
    pub fn app(creds: &ClientCredentials) -> Result<Self> {
        let agent = ureq::AgentBuilder::new().build();
        let token = spotify_auth::request_app_token(&agent, creds)?;
        Ok(Self::from_parts(CredentialMode::App, token.access_token, agent))
    }

    /// User-scoped client from a stored refresh token.
    pub fn user(creds: &ClientCredentials, refresh_token: &str) -> Result<Self> {
        let agent = ureq::AgentBuilder::new().build();
        let token = spotify_auth::refresh_user_token(&agent, creds, refresh_token)?;
        Ok(Self::from_parts(CredentialMode::User, token.access_token, agent))
    }

    /// Wrap an access token obtained elsewhere.
    pub fn with_token(mode: CredentialMode, access_token: &str) -> Self {
        Self::from_parts(mode, access_token.to_string(), ureq::AgentBuilder::new().build())
    }

    fn from_parts(mode: CredentialMode, access_token: String, agent: ureq::Agent) -> Self {
        Self {
            name: format!("Spotify ({})", mode.as_str()),
            mode,
            access_token,
            agent,
        }
    }

    pub fn mode(&self) -> CredentialMode {
        self.mode
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", API_BASE, path);
        let mut request = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {}", self.access_token))
            .set("User-Agent", USER_AGENT)
            .set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        let response = request.call()?;
        let body: T = serde_json::from_reader(response.into_reader())?;
        Ok(body)
    }
}

impl CatalogApi for SpotifyClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        let params = [
            ("q", query.to_string()),
            ("type", "track".to_string()),
            ("limit", limit.to_string()),
        ];
        let api: ApiSearchResponse = self.get_json("/search", &params)?;
        let tracks = map_tracks(api.tracks.items);
        debug!(client = %self.name, query, found = tracks.len(), "search");
        Ok(tracks)
    }

    fn recommendations(&self, request: &RecommendationRequest) -> Result<Vec<Track>> {
        if request.seeds.values().is_empty() {
            return Err(MoodError::Decode("recommendation request without seeds".to_string()));
        }
        let params = recommendation_query(request);
        let api: ApiRecommendations = self.get_json("/recommendations", &params)?;
        let tracks = map_tracks(api.tracks);
        debug!(
            client = %self.name,
            seed_type = request.seeds.param_name(),
            found = tracks.len(),
            "recommendations"
        );
        Ok(tracks)
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// Both credential modes, connected once per process.
///
/// The app client is always present.  The user client exists only when a
/// refresh token is configured.
pub struct SpotifySession {
    user: Option<SpotifyClient>,
    app: SpotifyClient,
}

impl SpotifySession {
    /// Obtain the tokens for every mode the configuration allows.
    pub fn connect(config: &Config) -> Result<Self> {
        let creds = ClientCredentials::from_config(config)?;
        let user = match config.refresh_token.as_deref() {
            Some(refresh_token) => Some(SpotifyClient::user(&creds, refresh_token)?),
            None => None,
        };
        let app = SpotifyClient::app(&creds)?;
        info!(user = user.is_some(), "connected to Spotify");
        Ok(Self { user, app })
    }

    pub fn from_clients(user: Option<SpotifyClient>, app: SpotifyClient) -> Self {
        Self { user, app }
    }
}

impl CatalogSession for SpotifySession {
    fn clients(&self) -> CatalogClients<'_> {
        CatalogClients {
            user: self.user.as_ref().map(|c| c as &dyn CatalogApi),
            app: Some(&self.app),
        }
    }
}
