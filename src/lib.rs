pub mod catalog;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod recommend;
pub mod search;
pub mod sentiment;
pub mod spotify;
pub mod spotify_auth;
pub mod tags;

pub use catalog::{CatalogApi, CatalogClients, CatalogSession, Track};
pub use config::Config;
pub use display::{print_report, write_report};
pub use error::{MoodError, Result};
pub use pipeline::{run, Banner, BannerLevel, Halt, PipelineOptions, Report, TrackSource};
pub use recommend::{recommend_with_fallback, SeedSets};
pub use sentiment::{Label, SentimentClassifier, SentimentResult};
pub use spotify::{SpotifyClient, SpotifySession};
pub use tags::derive_tags;
