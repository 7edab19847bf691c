//! One mood-to-playlist request, start to finish.
//!
//! [`run`] never returns an error.  Every failure is folded into the
//! [`Report`] as a [`Banner`], and the stages that did complete are kept so
//! the caller can still show them.

use rand::Rng;
use tracing::{debug, info};

use crate::catalog::{CatalogSession, Track};
use crate::config::DEFAULT_DISPLAY_LIMIT;
use crate::error::{MoodError, Result};
use crate::normalize::normalize_with_rng;
use crate::recommend::{recommend_with_fallback, Attempt, AttemptRecord, SeedSets};
use crate::search::search_tags;
use crate::sentiment::{SentimentClassifier, SentimentResult};
use crate::tags::derive_tags;

/// Query used to verify the catalog connection before any real work.
const CONNECTION_CHECK_QUERY: &str = "lofi";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A user-facing status message.
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub level: BannerLevel,
    pub message: String,
    pub detail: Option<String>,
}

impl Banner {
    fn new(level: BannerLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            detail: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Why a request stopped before producing tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    EmptyInput,
    MissingCredentials,
    Connection,
    NoSearchResults,
}

impl Halt {
    /// Process exit status: 1 for errors the user must fix in the setup,
    /// 2 for warnings about the input.
    pub fn exit_code(&self) -> i32 {
        match self {
            Halt::MissingCredentials | Halt::Connection => 1,
            Halt::EmptyInput | Halt::NoSearchResults => 2,
        }
    }
}

/// Where the displayed tracks came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Recommendations(Attempt),
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions<'a> {
    pub market: &'a str,
    pub display_limit: usize,
}

impl Default for PipelineOptions<'_> {
    fn default() -> Self {
        Self {
            market: crate::config::DEFAULT_MARKET,
            display_limit: DEFAULT_DISPLAY_LIMIT,
        }
    }
}

/// Everything one request produced, in display order.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub sentiment: Option<SentimentResult>,
    pub tags: Vec<String>,
    pub seeds: Option<SeedSets>,
    pub attempts: Vec<AttemptRecord>,
    pub tracks: Vec<Track>,
    pub source: Option<TrackSource>,
    pub banners: Vec<Banner>,
    pub halted: Option<Halt>,
}

impl Report {
    fn halt(mut self, halt: Halt, banner: Banner) -> Self {
        info!(?halt, "request halted");
        self.halted = Some(halt);
        self.banners.push(banner);
        self
    }

    pub fn exit_code(&self) -> i32 {
        self.halted.map_or(0, |h| h.exit_code())
    }
}

/// Run one request with the thread-local RNG.
pub fn run<S, F>(
    classifier: &SentimentClassifier,
    connect: F,
    text: &str,
    options: &PipelineOptions<'_>,
) -> Report
where
    S: CatalogSession,
    F: FnOnce() -> Result<S>,
{
    run_with_rng(classifier, connect, text, options, &mut rand::thread_rng())
}

/// Run one request.  `connect` is called at most once, after classification,
/// and only when the input is non-empty.
pub fn run_with_rng<S, F, R>(
    classifier: &SentimentClassifier,
    connect: F,
    text: &str,
    options: &PipelineOptions<'_>,
    rng: &mut R,
) -> Report
where
    S: CatalogSession,
    F: FnOnce() -> Result<S>,
    R: Rng + ?Sized,
{
    let mut report = Report::default();

    if text.trim().is_empty() {
        return report.halt(
            Halt::EmptyInput,
            Banner::new(BannerLevel::Warning, "Please enter some text describing your mood."),
        );
    }

    let sentiment = classifier.estimate(text);
    debug!(
        label = %sentiment.label,
        confidence = sentiment.confidence,
        source = ?sentiment.source,
        "sentiment"
    );
    let label = sentiment.label;
    report.sentiment = Some(sentiment);

    let session = match connect() {
        Ok(session) => session,
        Err(e @ MoodError::MissingCredentials(_)) => {
            return report.halt(
                Halt::MissingCredentials,
                Banner::new(
                    BannerLevel::Error,
                    "Spotify client ID and secret are required \
                     (--client-id/--client-secret or SPOTIFY_CLIENT_ID/SPOTIFY_CLIENT_SECRET).",
                )
                .with_detail(e.to_string()),
            );
        }
        Err(e) => return report.halt(Halt::Connection, connection_banner(&e)),
    };
    let clients = session.clients();
    let Some(primary) = clients.primary() else {
        return report.halt(
            Halt::MissingCredentials,
            Banner::new(BannerLevel::Error, "No Spotify client is available."),
        );
    };

    if let Err(e) = primary.search_tracks(CONNECTION_CHECK_QUERY, 1) {
        return report.halt(Halt::Connection, connection_banner(&e));
    }

    report.tags = derive_tags(label, text);

    let search = search_tags(primary, &report.tags);
    if search.is_empty() {
        return report.halt(
            Halt::NoSearchResults,
            Banner::new(
                BannerLevel::Warning,
                "No tracks found. Try describing your mood in other words.",
            ),
        );
    }

    let seeds = SeedSets::build(&search, &report.tags);
    let chain = recommend_with_fallback(&clients, &seeds, label, options.market);
    report.seeds = Some(seeds);
    report.attempts = chain.log;

    let candidates = match chain.winner {
        Some(attempt) => {
            report.source = Some(TrackSource::Recommendations(attempt));
            chain.tracks
        }
        None => {
            report.banners.push(
                Banner::new(BannerLevel::Warning, "Could not fetch recommendations.")
                    .with_detail("Empty recommendations"),
            );
            report.banners.push(Banner::new(
                BannerLevel::Info,
                "Showing picks from the search results instead.",
            ));
            report.source = Some(TrackSource::Search);
            search.tracks
        }
    };

    report.tracks = normalize_with_rng(candidates, options.display_limit, rng);
    report.banners.push(Banner::new(
        BannerLevel::Success,
        format!("{} tracks picked for your mood.", report.tracks.len()),
    ));
    report
}

fn connection_banner(error: &MoodError) -> Banner {
    Banner::new(BannerLevel::Error, "Spotify error. Check your credentials and connection.")
        .with_detail(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogApi, CatalogClients, RecommendationRequest, Seeds};
    use crate::recommend::{AttemptStatus, Tier};
    use crate::search::tests::track;
    use crate::spotify_auth::CredentialMode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;

    const RAINY_TEXT: &str = "テストでミスして落ち込んだ。雨だし気分が重い…";

    fn id(n: usize, prefix: char) -> String {
        format!("{}{:021}", prefix, n)
    }

    /// Search returns a few tracks per query; recommendations are scripted.
    struct FakeCatalog {
        name: &'static str,
        fail_search: bool,
        fail_check: bool,
        recommendations: Option<Vec<Track>>,
        searches: RefCell<Vec<String>>,
        seed_types: RefCell<Vec<&'static str>>,
    }

    impl FakeCatalog {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                fail_search: false,
                fail_check: false,
                recommendations: None,
                searches: RefCell::new(Vec::new()),
                seed_types: RefCell::new(Vec::new()),
            }
        }
    }

    impl CatalogApi for FakeCatalog {
        fn name(&self) -> &str {
            self.name
        }

        fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
            self.searches.borrow_mut().push(query.to_string());
            if query == CONNECTION_CHECK_QUERY && limit == 1 {
                if self.fail_check {
                    return Err(MoodError::Http {
                        status: 401,
                        body: "invalid token".into(),
                    });
                }
                return Ok(vec![track(&id(0, 'c'), "Check", "C", None)]);
            }
            if self.fail_search {
                return Err(MoodError::Transport("offline".into()));
            }
            let n = self.searches.borrow().len();
            Ok((0..3)
                .map(|i| {
                    let k = n * 10 + i;
                    track(&id(k, 't'), &format!("{} {}", query, i), "Artist", Some(&id(k, 'a')))
                })
                .collect())
        }

        fn recommendations(&self, request: &RecommendationRequest) -> Result<Vec<Track>> {
            self.seed_types.borrow_mut().push(request.seeds.param_name());
            match &self.recommendations {
                Some(tracks) => Ok(tracks.clone()),
                None => Err(MoodError::Http {
                    status: 404,
                    body: String::new(),
                }),
            }
        }
    }

    struct FakeSession<'a> {
        user: Option<&'a FakeCatalog>,
        app: &'a FakeCatalog,
    }

    impl CatalogSession for FakeSession<'_> {
        fn clients(&self) -> CatalogClients<'_> {
            CatalogClients {
                user: self.user.map(|c| c as &dyn CatalogApi),
                app: Some(self.app),
            }
        }
    }

    fn run_fake(text: &str, user: Option<&FakeCatalog>, app: &FakeCatalog) -> Report {
        let classifier = SentimentClassifier::heuristic_only();
        let mut rng = StdRng::seed_from_u64(1);
        run_with_rng(
            &classifier,
            || Ok(FakeSession { user, app }),
            text,
            &PipelineOptions::default(),
            &mut rng,
        )
    }

    #[test]
    fn test_empty_input_halts_before_connecting() {
        let classifier = SentimentClassifier::heuristic_only();
        let mut connected = false;
        let report = run(
            &classifier,
            || -> Result<FakeSession<'static>> {
                connected = true;
                Err(MoodError::Transport("unused".into()))
            },
            "   \n",
            &PipelineOptions::default(),
        );
        assert!(!connected);
        assert_eq!(report.halted, Some(Halt::EmptyInput));
        assert_eq!(report.exit_code(), 2);
        assert!(report.sentiment.is_none());
        assert_eq!(report.banners[0].level, BannerLevel::Warning);
    }

    #[test]
    fn test_missing_credentials_keeps_sentiment() {
        let classifier = SentimentClassifier::heuristic_only();
        let report = run(
            &classifier,
            || -> Result<FakeSession<'static>> {
                Err(MoodError::MissingCredentials("SPOTIFY_CLIENT_ID".into()))
            },
            RAINY_TEXT,
            &PipelineOptions::default(),
        );
        assert_eq!(report.halted, Some(Halt::MissingCredentials));
        assert_eq!(report.exit_code(), 1);
        assert!(report.sentiment.is_some());
        assert!(report.tags.is_empty());
        assert_eq!(report.banners.last().map(|b| b.level), Some(BannerLevel::Error));
    }

    #[test]
    fn test_failed_connection_check_is_an_error() {
        let mut app = FakeCatalog::new("app");
        app.fail_check = true;
        let report = run_fake(RAINY_TEXT, None, &app);
        assert_eq!(report.halted, Some(Halt::Connection));
        assert_eq!(report.exit_code(), 1);
        let banner = &report.banners[0];
        assert_eq!(banner.level, BannerLevel::Error);
        assert!(banner.detail.as_deref().unwrap_or("").contains("401"));
        assert_eq!(app.searches.borrow().len(), 1);
    }

    #[test]
    fn test_all_searches_failing_is_a_warning() {
        let mut app = FakeCatalog::new("app");
        app.fail_search = true;
        let report = run_fake(RAINY_TEXT, None, &app);
        assert_eq!(report.halted, Some(Halt::NoSearchResults));
        assert_eq!(report.exit_code(), 2);
        assert_eq!(report.tags.len(), 5);
        assert!(report.tracks.is_empty());
    }

    #[test]
    fn test_falls_back_to_search_results() {
        let user = FakeCatalog::new("user");
        let app = FakeCatalog::new("app");
        let report = run_fake(RAINY_TEXT, Some(&user), &app);

        assert_eq!(report.halted, None);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(
            report.sentiment.as_ref().map(|s| s.label),
            Some(crate::sentiment::Label::Negative)
        );
        assert_eq!(report.tags, vec!["calm", "chill", "ambient", "lofi", "rainy day"]);
        assert_eq!(report.source, Some(TrackSource::Search));
        assert_eq!(report.tracks.len(), 15);

        let levels: Vec<BannerLevel> = report.banners.iter().map(|b| b.level).collect();
        assert_eq!(levels, vec![BannerLevel::Warning, BannerLevel::Info, BannerLevel::Success]);
        assert_eq!(report.banners[0].detail.as_deref(), Some("Empty recommendations"));

        // Search and the connection check go through the user client.
        assert_eq!(user.searches.borrow().len(), 6);
        assert!(app.searches.borrow().is_empty());

        // Every tier, user then app.
        assert_eq!(report.attempts.len(), 6);
        assert!(report
            .attempts
            .iter()
            .all(|r| matches!(r.status, AttemptStatus::Failed(_))));
        assert_eq!(*user.seed_types.borrow(), vec!["seed_tracks", "seed_artists", "seed_genres"]);
        assert_eq!(*app.seed_types.borrow(), vec!["seed_tracks", "seed_artists", "seed_genres"]);

        let seeds = report.seeds.as_ref().map(|s| s.genres.clone());
        assert_eq!(seeds, Some(vec!["chill".to_string(), "ambient".to_string()]));
    }

    #[test]
    fn test_recommendations_win_on_first_tier() {
        let mut app = FakeCatalog::new("app");
        app.recommendations = Some(vec![
            track(&id(1, 'r'), "Rec", "R", None),
            track(&id(2, 'r'), "Rec", "R", None),
            track(&id(3, 'r'), "Other", "R", None),
        ]);
        let report = run_fake(RAINY_TEXT, None, &app);

        assert_eq!(
            report.source,
            Some(TrackSource::Recommendations(Attempt {
                tier: Tier::Tracks,
                mode: CredentialMode::App,
            }))
        );
        assert_eq!(report.tracks.len(), 2);
        assert_eq!(report.banners.len(), 1);
        assert_eq!(report.banners[0].level, BannerLevel::Success);
        assert_eq!(*app.seed_types.borrow(), vec!["seed_tracks"]);
    }

    #[test]
    fn test_display_limit_is_respected() {
        let app = FakeCatalog::new("app");
        let classifier = SentimentClassifier::heuristic_only();
        let options = PipelineOptions {
            market: "US",
            display_limit: 4,
        };
        let connect = || Ok(FakeSession { user: None, app: &app });
        let report = run(&classifier, connect, "今日は最高！", &options);
        assert_eq!(report.tracks.len(), 4);
        assert_eq!(report.source, Some(TrackSource::Search));
    }

    #[test]
    fn test_seeds_are_capped_per_request() {
        let app = FakeCatalog::new("app");
        let report = run_fake(RAINY_TEXT, None, &app);
        let seeds = report.seeds.unwrap_or_default();
        assert_eq!(seeds.tracks.len(), 5);
        assert!(matches!(seeds.seeds_for(Tier::Tracks), Some(Seeds::Tracks(v)) if v.len() == 3));
    }
}
