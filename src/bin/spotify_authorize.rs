//! Obtain a Spotify refresh token for the delegated-user credential mode.
//!
//! Usage:
//!   spotify_authorize [--client-id ID] [--client-secret SECRET]
//!                     [--redirect-uri URI] [--save-defaults]
//!
//! Prints the authorize URL, waits for the redirected URL (or the bare code)
//! on stdin, and exchanges it for tokens.  The redirect target does not need
//! to be reachable: copy the URL from the browser's address bar.

use std::io::{self, BufRead, Write};
use std::process;

use clap::Parser;
use tracing::info;

use moodtune::spotify_auth::{self, ClientCredentials};
use moodtune::{logging, Config, MoodError};

#[derive(Parser, Debug)]
#[command(name = "spotify_authorize", about = "Authorize moodtune against a Spotify account")]
struct CliArgs {
    /// Spotify application client ID
    #[arg(long)]
    client_id: Option<String>,

    /// Spotify application client secret
    #[arg(long)]
    client_secret: Option<String>,

    /// Redirect URI registered for the application
    #[arg(long)]
    redirect_uri: Option<String>,

    /// Store the refresh token in the defaults file
    #[arg(long)]
    save_defaults: bool,
}

fn read_line(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn authorize(config: &Config) -> Result<String, MoodError> {
    let creds = ClientCredentials::from_config(config)?;
    let redirect_uri = config.redirect_uri();
    let state = spotify_auth::new_state();

    println!("Open this URL in a browser and approve access:");
    println!();
    println!("  {}", spotify_auth::authorize_url(&creds.client_id, redirect_uri, &state));
    println!();

    let pasted = read_line("Paste the URL you were redirected to (or just the code): ")?;
    let code = spotify_auth::parse_redirect(&pasted, &state)?;

    let agent = ureq::AgentBuilder::new().build();
    let token = spotify_auth::exchange_code(&agent, &creds, &code, redirect_uri)?;
    info!(expires_in = token.expires_in, "authorization code exchanged");

    token
        .refresh_token
        .ok_or_else(|| MoodError::Auth("token response has no refresh token".to_string()))
}

fn main() {
    let args = CliArgs::parse();
    logging::init();

    let saved = Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable defaults file: {}", e);
        Config::new()
    });
    let cli = Config {
        client_id: args.client_id.clone(),
        client_secret: args.client_secret.clone(),
        redirect_uri: args.redirect_uri.clone(),
        ..Config::new()
    };
    let config = Config::resolve(&saved, &Config::from_env(), &cli);

    let refresh_token = match authorize(&config) {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Authorization failed: {}", e);
            process::exit(1);
        }
    };

    println!();
    println!("Refresh token:");
    println!("  {}", refresh_token);
    println!();

    if args.save_defaults {
        let mut to_save = saved;
        to_save.merge(&cli);
        to_save.refresh_token = Some(refresh_token);
        if let Err(e) = to_save.save() {
            eprintln!("Error saving defaults: {}", e);
            process::exit(1);
        }
        if let Ok(path) = Config::get_config_path() {
            println!("Refresh token saved to {:?}", path);
        }
    } else {
        println!("Set SPOTIFY_REFRESH_TOKEN, pass --refresh-token to moodtune,");
        println!("or rerun with --save-defaults to store it.");
    }
}
