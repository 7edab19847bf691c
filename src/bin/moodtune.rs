//! Mood text in, playlist out.
//!
//! Usage:
//!   moodtune "テストでミスして落ち込んだ。雨だし気分が重い…"
//!   echo "今日は最高の一日！" | moodtune --market US --limit 10
//!   moodtune --client-id ID --client-secret SECRET --save-defaults

use std::io::{self, BufRead};
use std::process;

use clap::Parser;
use tracing::{error, info};

use moodtune::config::{
    DEFAULT_DISPLAY_LIMIT, DEFAULT_INFERENCE_URL, DEFAULT_MARKET, DEFAULT_MODEL,
    DEFAULT_REDIRECT_URI,
};
use moodtune::pipeline::{self, PipelineOptions};
use moodtune::{display, logging, Config, SentimentClassifier, SpotifySession};

#[derive(Parser, Debug)]
#[command(name = "moodtune", about = "Turn a few words about your mood into a Spotify playlist")]
struct CliArgs {
    /// Mood text. Read from one line of stdin when omitted.
    text: Option<String>,

    /// Spotify application client ID
    #[arg(long)]
    client_id: Option<String>,

    /// Spotify application client secret
    #[arg(long)]
    client_secret: Option<String>,

    /// Delegated-user refresh token (see `spotify_authorize`)
    #[arg(long)]
    refresh_token: Option<String>,

    /// Hugging Face API token for the sentiment model
    #[arg(long)]
    hf_token: Option<String>,

    /// Sentiment model repository ID
    #[arg(long)]
    model: Option<String>,

    /// Catalog market (ISO 3166-1 alpha-2)
    #[arg(long)]
    market: Option<String>,

    /// Maximum number of tracks to show
    #[arg(long)]
    limit: Option<usize>,

    /// Skip the sentiment model and use the keyword heuristic only
    #[arg(long)]
    no_model: bool,

    /// List the seed sets and every recommendation attempt
    #[arg(long)]
    show_seeds: bool,

    /// Print the built-in defaults and exit
    #[arg(long)]
    show_defaults: bool,

    /// Print the saved defaults and exit
    #[arg(long)]
    show_saved_defaults: bool,

    /// Save the options given on this command line as defaults and exit
    #[arg(long)]
    save_defaults: bool,
}

impl CliArgs {
    /// Only the options that were given explicitly.
    fn to_config(&self) -> Config {
        Config {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            refresh_token: self.refresh_token.clone(),
            hf_token: self.hf_token.clone(),
            model: self.model.clone(),
            market: self.market.clone(),
            display_limit: self.limit,
            use_model: self.no_model.then_some(false),
            ..Config::new()
        }
    }
}

fn show_defaults() {
    println!("Built-in default settings:");
    println!();
    println!("  Sentiment model:    {}", DEFAULT_MODEL);
    println!("  Inference URL:      {}", DEFAULT_INFERENCE_URL);
    println!("  Market:             {}", DEFAULT_MARKET);
    println!("  Display limit:      {} tracks", DEFAULT_DISPLAY_LIMIT);
    println!("  Redirect URI:       {}", DEFAULT_REDIRECT_URI);
    println!("  Model inference:    enabled");
    println!();
    println!("Credentials are read from SPOTIFY_CLIENT_ID, SPOTIFY_CLIENT_SECRET,");
    println!("SPOTIFY_REFRESH_TOKEN and HF_TOKEN when not given on the command line.");
}

fn show_saved_defaults(saved: &Config) {
    match Config::get_config_path() {
        Ok(path) if path.exists() => {
            println!("Saved defaults from {:?}:", path);
            println!();
            saved.print("Configuration");
        }
        Ok(path) => {
            println!("No saved defaults file found at {:?}", path);
            println!("Use --save-defaults to create one.");
        }
        Err(_) => println!("Could not determine config file path"),
    }
}

fn save_defaults(saved: &Config, cli: &Config) -> i32 {
    let mut to_save = saved.clone();
    to_save.merge(cli);
    match to_save.save() {
        Ok(()) => {
            if let Ok(path) = Config::get_config_path() {
                println!("Defaults saved to {:?}", path);
                println!();
            }
            to_save.print("Saved configuration");
            0
        }
        Err(e) => {
            eprintln!("Error saving defaults: {}", e);
            1
        }
    }
}

fn read_mood_text(arg: Option<String>) -> String {
    if let Some(text) = arg {
        return text;
    }
    let mut line = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut line) {
        error!("could not read mood text from stdin: {}", e);
    }
    line
}

fn main() {
    let args = CliArgs::parse();
    logging::init();

    let saved = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring unreadable defaults file: {}", e);
            Config::new()
        }
    };
    let cli = args.to_config();

    if args.show_defaults {
        show_defaults();
        process::exit(0);
    }
    if args.show_saved_defaults {
        show_saved_defaults(&saved);
        process::exit(0);
    }
    if args.save_defaults {
        process::exit(save_defaults(&saved, &cli));
    }

    let config = Config::resolve(&saved, &Config::from_env(), &cli);
    let classifier = SentimentClassifier::from_config(&config);
    info!(model = classifier.model_name().unwrap_or("heuristic"), "classifier ready");

    let text = read_mood_text(args.text);
    let options = PipelineOptions {
        market: config.market(),
        display_limit: config.display_limit(),
    };
    let report = pipeline::run(&classifier, || SpotifySession::connect(&config), &text, &options);

    if let Err(e) = display::print_report(&report, args.show_seeds) {
        error!("could not write report: {}", e);
    }
    process::exit(report.exit_code());
}
