use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};

use crate::catalog::Track;
use crate::pipeline::{Banner, BannerLevel, Report, TrackSource};
use crate::recommend::{AttemptStatus, SeedSets};
use crate::sentiment::{SentimentResult, SentimentSource};

fn banner_style(level: BannerLevel) -> (Color, &'static str) {
    match level {
        BannerLevel::Success => (Color::Green, "✔"),
        BannerLevel::Info => (Color::Cyan, "ℹ"),
        BannerLevel::Warning => (Color::Yellow, "⚠"),
        BannerLevel::Error => (Color::Red, "✖"),
    }
}

/// Which classifier path produced the label, as shown under the sentiment.
pub fn source_note(sentiment: &SentimentResult) -> &'static str {
    match sentiment.source {
        SentimentSource::Model => "model",
        SentimentSource::Heuristic => "keyword heuristic (model unavailable or disabled)",
        SentimentSource::Override => "keyword override",
    }
}

/// The lines printed for one track, without styling.
pub fn track_lines(index: usize, track: &Track) -> Vec<String> {
    let mut lines = vec![
        format!("{:2}. {}", index + 1, track),
        format!("    {}", track.url),
    ];
    if let Some(preview) = &track.preview_url {
        lines.push(format!("    ▶ preview: {}", preview));
    }
    lines
}

pub fn write_banner<W: Write>(out: &mut W, banner: &Banner) -> io::Result<()> {
    let (color, icon) = banner_style(banner.level);
    queue!(
        out,
        SetForegroundColor(color),
        Print(format!("{} {}", icon, banner.message)),
        ResetColor,
        Print("\n")
    )?;
    if let Some(detail) = &banner.detail {
        queue!(
            out,
            SetForegroundColor(Color::DarkGrey),
            Print(format!("  {}\n", detail)),
            ResetColor
        )?;
    }
    Ok(())
}

fn write_heading<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    queue!(
        out,
        SetAttribute(Attribute::Bold),
        Print(text),
        SetAttribute(Attribute::Reset),
        Print("\n")
    )
}

fn write_seeds<W: Write>(out: &mut W, seeds: &SeedSets, report: &Report) -> io::Result<()> {
    write_heading(out, "Seeds")?;
    writeln!(out, "  tracks:  {}", seeds.tracks.join(", "))?;
    writeln!(out, "  artists: {}", seeds.artists.join(", "))?;
    writeln!(out, "  genres:  {}", seeds.genres.join(", "))?;
    for record in &report.attempts {
        let status = match &record.status {
            AttemptStatus::Found(n) => format!("{} tracks", n),
            AttemptStatus::Empty => "empty".to_string(),
            AttemptStatus::Failed(e) => format!("failed: {}", e),
        };
        queue!(
            out,
            SetForegroundColor(Color::DarkGrey),
            Print(format!("  {}: {}\n", record.attempt, status)),
            ResetColor
        )?;
    }
    Ok(())
}

/// Render a finished request: sentiment, tags, optional seeds, banners,
/// then the track list.
pub fn write_report<W: Write>(out: &mut W, report: &Report, show_seeds: bool) -> io::Result<()> {
    if let Some(sentiment) = &report.sentiment {
        queue!(
            out,
            Print("Estimated sentiment: "),
            SetAttribute(Attribute::Bold),
            Print(sentiment.to_string()),
            SetAttribute(Attribute::Reset),
            Print("\n"),
            SetForegroundColor(Color::DarkGrey),
            Print(format!("  via {}\n", source_note(sentiment))),
            ResetColor
        )?;
    }

    if !report.tags.is_empty() {
        writeln!(out, "Search tags: {}", report.tags.join(", "))?;
    }

    if show_seeds {
        if let Some(seeds) = &report.seeds {
            write_seeds(out, seeds, report)?;
        }
    }

    for banner in &report.banners {
        write_banner(out, banner)?;
    }

    if !report.tracks.is_empty() {
        let heading = match report.source {
            Some(TrackSource::Recommendations(attempt)) => format!("Recommendations ({})", attempt),
            _ => "From search results".to_string(),
        };
        writeln!(out)?;
        write_heading(out, &heading)?;
        for (i, track) in report.tracks.iter().enumerate() {
            let mut lines = track_lines(i, track).into_iter();
            if let Some(title) = lines.next() {
                writeln!(out, "{}", title)?;
            }
            for line in lines {
                queue!(out, SetForegroundColor(Color::Blue), Print(line), ResetColor, Print("\n"))?;
            }
        }
    }

    out.flush()
}

/// [`write_report`] to stdout.
pub fn print_report(report: &Report, show_seeds: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_report(&mut lock, report, show_seeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Halt;
    use crate::recommend::{Attempt, AttemptRecord, Tier};
    use crate::search::tests::track;
    use crate::sentiment::Label;
    use crate::spotify_auth::CredentialMode;

    fn render(report: &Report, show_seeds: bool) -> String {
        let mut buf = Vec::new();
        write_report(&mut buf, report, show_seeds).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn sample_report() -> Report {
        let mut with_preview = track("4uLU6hMCjMI75M1A2tKUQC", "Rainy Lofi", "Band A", None);
        with_preview.preview_url = Some("https://p.scdn.co/mp3-preview/abc".into());
        let attempt = Attempt {
            tier: Tier::Artists,
            mode: CredentialMode::App,
        };
        Report {
            sentiment: Some(SentimentResult {
                label: Label::Negative,
                confidence: 0.9,
                source: SentimentSource::Override,
            }),
            tags: vec!["calm".into(), "lofi".into()],
            seeds: Some(SeedSets {
                tracks: vec!["t".repeat(22)],
                artists: vec!["a".repeat(22)],
                genres: vec!["chill".into()],
            }),
            attempts: vec![AttemptRecord {
                attempt,
                status: AttemptStatus::Found(1),
            }],
            tracks: vec![with_preview, track("7ouMYWpwJ422jRcDASZB7P", "Quiet", "Solo", None)],
            source: Some(TrackSource::Recommendations(attempt)),
            banners: Vec::new(),
            halted: None,
        }
    }

    #[test]
    fn test_track_lines_with_and_without_preview() {
        let report = sample_report();
        let first = track_lines(0, &report.tracks[0]);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0], " 1. Rainy Lofi — Band A");
        assert!(first[2].contains("▶ preview: https://p.scdn.co/mp3-preview/abc"));

        let second = track_lines(1, &report.tracks[1]);
        assert_eq!(second.len(), 2);
        assert_eq!(second[1], "    https://open.spotify.com/track/7ouMYWpwJ422jRcDASZB7P");
    }

    #[test]
    fn test_report_sections_in_order() {
        let out = render(&sample_report(), false);
        let sentiment = out.find("negative (confidence 0.90)").unwrap();
        let tags = out.find("Search tags: calm, lofi").unwrap();
        let heading = out.find("Recommendations (artist seeds via app credentials)").unwrap();
        let track = out.find("Rainy Lofi — Band A").unwrap();
        assert!(sentiment < tags && tags < heading && heading < track);
        assert!(out.contains("keyword override"));
        assert!(!out.contains("genres:"));
    }

    #[test]
    fn test_seeds_shown_on_request() {
        let out = render(&sample_report(), true);
        assert!(out.contains("genres:  chill"));
        assert!(out.contains("artist seeds via app credentials: 1 tracks"));
    }

    #[test]
    fn test_halted_report_shows_banner_only() {
        let report = Report {
            banners: vec![Banner {
                level: BannerLevel::Warning,
                message: "Please enter some text describing your mood.".into(),
                detail: None,
            }],
            halted: Some(Halt::EmptyInput),
            ..Report::default()
        };
        let out = render(&report, true);
        assert!(out.contains("⚠ Please enter some text"));
        assert!(!out.contains("Estimated sentiment"));
        assert!(!out.contains("Search tags"));
    }

    #[test]
    fn test_banner_detail_rendered() {
        let banner = Banner {
            level: BannerLevel::Error,
            message: "Spotify error.".into(),
            detail: Some("HTTP 401: invalid token".into()),
        };
        let mut buf = Vec::new();
        write_banner(&mut buf, &banner).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("✖ Spotify error."));
        assert!(out.contains("  HTTP 401: invalid token"));
    }
}
