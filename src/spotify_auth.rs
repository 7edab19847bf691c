//! Spotify account-service token flows.
//!
//! Two credential modes are needed by the recommendation chain:
//!
//! * **app-scoped**: client-credentials grant, needs only client ID/secret
//! * **user-scoped**: delegated user token, refreshed from a refresh token
//!   that `spotify_authorize` obtains through the authorization-code flow
//!
//! All token requests authenticate the application with HTTP Basic auth
//! (`base64(client_id:client_secret)`).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{MoodError, Result};

pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const USER_SCOPES: &str =
    "user-read-private,user-read-playback-state,user-read-recently-played";

// ── Credentials ──────────────────────────────────────────────────────────────

/// Application client ID + secret.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl ClientCredentials {
    /// Both fields must be present and non-blank.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client_id = non_blank(config.client_id.as_deref())
            .ok_or_else(|| MoodError::MissingCredentials("Spotify client ID".to_string()))?;
        let client_secret = non_blank(config.client_secret.as_deref())
            .ok_or_else(|| MoodError::MissingCredentials("Spotify client secret".to_string()))?;
        Ok(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ── Token responses ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTokenError {
    error: String,
    error_description: Option<String>,
}

/// A bearer token and, for user flows, the refresh token that came with it.
#[derive(Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
}

/// Which credential mode a catalog client was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    User,
    App,
}

impl CredentialMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialMode::User => "user",
            CredentialMode::App => "app",
        }
    }
}

// ── Token flows ──────────────────────────────────────────────────────────────

/// Client-credentials grant (app-scoped).
pub fn request_app_token(agent: &ureq::Agent, creds: &ClientCredentials) -> Result<AccessToken> {
    post_token_form(agent, creds, &[("grant_type", "client_credentials")])
}

/// Refresh-token grant (user-scoped).  Spotify may or may not rotate the
/// refresh token; when it does not, the old one stays valid.
pub fn refresh_user_token(
    agent: &ureq::Agent,
    creds: &ClientCredentials,
    refresh_token: &str,
) -> Result<AccessToken> {
    let mut token = post_token_form(
        agent,
        creds,
        &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
    )?;
    if token.refresh_token.is_none() {
        token.refresh_token = Some(refresh_token.to_string());
    }
    Ok(token)
}

/// Exchange an authorization code for user tokens.
pub fn exchange_code(
    agent: &ureq::Agent,
    creds: &ClientCredentials,
    code: &str,
    redirect_uri: &str,
) -> Result<AccessToken> {
    post_token_form(
        agent,
        creds,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ],
    )
}

fn post_token_form(
    agent: &ureq::Agent,
    creds: &ClientCredentials,
    form: &[(&str, &str)],
) -> Result<AccessToken> {
    let grant = form.first().map(|(_, v)| *v).unwrap_or("?");
    debug!(grant, "requesting Spotify token");

    let response = agent
        .post(TOKEN_URL)
        .set("Authorization", &creds.basic_auth_header())
        .send_form(form);

    match response {
        Ok(resp) => {
            let api: ApiTokenResponse = resp
                .into_json()
                .map_err(|e| MoodError::Decode(e.to_string()))?;
            debug!(grant, expires_in = api.expires_in, "token granted");
            Ok(AccessToken {
                access_token: api.access_token,
                expires_in: api.expires_in,
                refresh_token: api.refresh_token,
            })
        }
        Err(ureq::Error::Status(status, resp)) if status == 400 || status == 401 => {
            let body = resp.into_string().unwrap_or_default();
            Err(MoodError::Auth(describe_token_error(status, &body)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Turn an OAuth error body into a one-line message.
fn describe_token_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiTokenError>(body) {
        Ok(err) => match err.error_description {
            Some(desc) => format!("{} ({})", err.error, desc),
            None => err.error,
        },
        Err(_) => format!("token endpoint returned HTTP {}", status),
    }
}

// ── Authorization-code flow helpers ──────────────────────────────────────────

/// Build the URL the user opens in a browser to grant access.
pub fn authorize_url(client_id: &str, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}&show_dialog=true",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(USER_SCOPES),
        urlencoding::encode(state),
    )
}

/// Random `state` value for CSRF protection.
pub fn new_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Extract the authorization code from what the user pasted.
///
/// Accepts either the full redirect URL (then `state` must match) or the
/// bare code.
pub fn parse_redirect(input: &str, expected_state: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(MoodError::Auth("no authorization code given".to_string()));
    }

    let query = match input.split_once('?') {
        Some((_, q)) => q,
        None if input.contains('=') => input,
        None => return Ok(input.to_string()),
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(MoodError::Auth(format!("authorization denied: {}", error)));
    }
    if state.as_deref() != Some(expected_state) {
        return Err(MoodError::Auth("state mismatch in redirect URL".to_string()));
    }
    code.filter(|c| !c.is_empty())
        .ok_or_else(|| MoodError::Auth("redirect URL has no code".to_string()))
}
