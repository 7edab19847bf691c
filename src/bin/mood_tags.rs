//! Show how a mood text is classified and which search tags it maps to.
//! Makes no catalog calls.
//!
//! Usage:
//!   mood_tags "仕事で疲れた…" ["another entry" ...]
//!   mood_tags --model "なんだか眠い朝"

use std::process;

use clap::Parser;

use moodtune::recommend::{genres_from_tags, target_params};
use moodtune::{derive_tags, logging, Config, SentimentClassifier};

#[derive(Parser, Debug)]
#[command(name = "mood_tags", about = "Classify mood texts and print the derived search tags")]
struct CliArgs {
    /// One or more mood texts
    #[arg(required = true)]
    texts: Vec<String>,

    /// Use the external sentiment model instead of the keyword heuristic
    #[arg(long)]
    model: bool,

    /// Hugging Face API token (defaults to HF_TOKEN)
    #[arg(long)]
    hf_token: Option<String>,
}

impl CliArgs {
    /// `--model` turns inference on even when the saved defaults disable it.
    fn to_config(&self) -> Config {
        Config {
            hf_token: self.hf_token.clone(),
            use_model: Some(true),
            ..Config::new()
        }
    }
}

fn build_classifier(args: &CliArgs, saved: &Config, env: &Config) -> SentimentClassifier {
    if args.model {
        SentimentClassifier::from_config(&Config::resolve(saved, env, &args.to_config()))
    } else {
        SentimentClassifier::heuristic_only()
    }
}

fn main() {
    let args = CliArgs::parse();
    logging::init();

    let saved = if args.model {
        Config::load().unwrap_or_default()
    } else {
        Config::new()
    };
    let classifier = build_classifier(&args, &saved, &Config::from_env());

    let mut blank = 0;
    for text in &args.texts {
        if text.trim().is_empty() {
            eprintln!("Skipping empty text");
            blank += 1;
            continue;
        }

        let sentiment = classifier.estimate(text);
        let tags = derive_tags(sentiment.label, text);
        let target = target_params(sentiment.label);

        println!("{}", text);
        println!("  Sentiment: {} [{:?}]", sentiment, sentiment.source);
        println!("  Tags:      {}", tags.join(", "));
        println!("  Target:    valence {:.2}, energy {:.2}", target.valence, target.energy);
        println!("  Genres:    {}", genres_from_tags(&tags).join(", "));
        println!();
    }

    if blank == args.texts.len() {
        process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_flag_overrides_saved_heuristic_only() {
        let saved = Config {
            use_model: Some(false),
            ..Config::default()
        };
        let args = CliArgs::parse_from(["mood_tags", "--model", "眠い朝"]);
        let classifier = build_classifier(&args, &saved, &Config::new());
        assert_eq!(classifier.model_name(), Some(moodtune::config::DEFAULT_MODEL));
    }

    #[test]
    fn test_without_model_flag_stays_offline() {
        let args = CliArgs::parse_from(["mood_tags", "眠い朝"]);
        let classifier = build_classifier(&args, &Config::default(), &Config::new());
        assert!(classifier.model_name().is_none());
    }
}
