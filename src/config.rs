use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const DEFAULT_MODEL: &str = "daigo/bert-base-japanese-sentiment";
pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_MARKET: &str = "JP";
pub const DEFAULT_DISPLAY_LIMIT: usize = 15;
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8501/callback/";

/// Configuration defaults that can be saved to a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Delegated-user refresh token obtained with `spotify_authorize`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hf_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inference_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_limit: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_model: Option<bool>,
}

impl Config {
    /// Create a new empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in defaults, the lowest layer of the precedence chain.
    pub fn builtin() -> Self {
        Config {
            redirect_uri: Some(DEFAULT_REDIRECT_URI.to_string()),
            model: Some(DEFAULT_MODEL.to_string()),
            inference_url: Some(DEFAULT_INFERENCE_URL.to_string()),
            market: Some(DEFAULT_MARKET.to_string()),
            display_limit: Some(DEFAULT_DISPLAY_LIMIT),
            use_model: Some(true),
            ..Self::default()
        }
    }

    /// Get the config file path (~/.state/moodtune/defaults.toml)
    pub fn get_config_path() -> std::result::Result<PathBuf, io::Error> {
        let home = std::env::var("HOME").map_err(|_| {
            io::Error::new(io::ErrorKind::NotFound, "HOME environment variable not set")
        })?;

        let config_dir = Path::new(&home).join(".state").join("moodtune");
        Ok(config_dir.join("defaults.toml"))
    }

    /// Load config from the default file
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load config from a specific path; a missing file yields an empty config.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::new());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to the default file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        write_private(path, &toml_string)?;

        Ok(())
    }

    /// Read credentials from the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Config {
            client_id: get("SPOTIFY_CLIENT_ID"),
            client_secret: get("SPOTIFY_CLIENT_SECRET"),
            refresh_token: get("SPOTIFY_REFRESH_TOKEN"),
            hf_token: get("HF_TOKEN"),
            ..Self::default()
        }
    }

    /// Merge this config with another, preferring values from other
    pub fn merge(&mut self, other: &Config) {
        if other.client_id.is_some() {
            self.client_id = other.client_id.clone();
        }
        if other.client_secret.is_some() {
            self.client_secret = other.client_secret.clone();
        }
        if other.refresh_token.is_some() {
            self.refresh_token = other.refresh_token.clone();
        }
        if other.redirect_uri.is_some() {
            self.redirect_uri = other.redirect_uri.clone();
        }
        if other.hf_token.is_some() {
            self.hf_token = other.hf_token.clone();
        }
        if other.model.is_some() {
            self.model = other.model.clone();
        }
        if other.inference_url.is_some() {
            self.inference_url = other.inference_url.clone();
        }
        if other.market.is_some() {
            self.market = other.market.clone();
        }
        if other.display_limit.is_some() {
            self.display_limit = other.display_limit;
        }
        if other.use_model.is_some() {
            self.use_model = other.use_model;
        }
    }

    /// Layer built-ins, the saved file, the environment and the command line.
    pub fn resolve(saved: &Config, env: &Config, cli: &Config) -> Config {
        let mut config = Config::builtin();
        config.merge(saved);
        config.merge(env);
        config.merge(cli);
        config
    }

    pub fn market(&self) -> &str {
        self.market.as_deref().unwrap_or(DEFAULT_MARKET)
    }

    pub fn display_limit(&self) -> usize {
        self.display_limit.unwrap_or(DEFAULT_DISPLAY_LIMIT)
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri.as_deref().unwrap_or(DEFAULT_REDIRECT_URI)
    }

    /// Print the config in a human-readable format; secrets are masked.
    pub fn print(&self, title: &str) {
        println!("{}:", title);

        if let Some(client_id) = &self.client_id {
            println!("  Client ID:          {}", mask(client_id));
        }
        if self.client_secret.is_some() {
            println!("  Client secret:      (set)");
        }
        if self.refresh_token.is_some() {
            println!("  User refresh token: (set)");
        }
        if let Some(redirect_uri) = &self.redirect_uri {
            println!("  Redirect URI:       {}", redirect_uri);
        }
        if self.hf_token.is_some() {
            println!("  HF token:           (set)");
        }
        if let Some(model) = &self.model {
            println!("  Sentiment model:    {}", model);
        }
        if let Some(url) = &self.inference_url {
            println!("  Inference URL:      {}", url);
        }
        if let Some(market) = &self.market {
            println!("  Market:             {}", market);
        }
        if let Some(limit) = self.display_limit {
            println!("  Display limit:      {} tracks", limit);
        }
        if let Some(use_model) = self.use_model {
            let state = if use_model { "enabled" } else { "disabled (heuristic only)" };
            println!("  Model inference:    {}", state);
        }
    }
}

/// Write a file readable by the owner only; it may hold the client secret
/// and the refresh token.
#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies when the file is created.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    fs::write(path, contents)
}

/// Show only the first four characters of an identifier.
fn mask(value: &str) -> String {
    let head: String = value.chars().take(4).collect();
    format!("{}…", head)
}
