//! Sentiment estimation for a short mood diary entry.
//!
//! The external model is consumed through the [`SentimentModel`] trait.  The
//! bundled implementation calls the Hugging Face inference API for
//! `daigo/bert-base-japanese-sentiment`.  Any failure there degrades to a
//! keyword-counting heuristic with the same output shape, and a keyword
//! override is applied on top of whichever path produced the result.

use serde::Deserialize;
use std::fmt;
use tracing::debug;

use crate::config::{Config, DEFAULT_INFERENCE_URL, DEFAULT_MODEL};
use crate::error::{MoodError, Result};

/// Only this many characters of the diary entry are classified.
pub const CLASSIFY_MAX_CHARS: usize = 200;

/// Confidence forced by the keyword override.
pub const OVERRIDE_CONFIDENCE: f32 = 0.9;

const HEURISTIC_POSITIVE: &[&str] = &[
    "嬉しい", "最高", "楽しい", "ワクワク", "感謝", "元気", "わくわく", "良い", "幸せ", "やるぞ",
];

const HEURISTIC_NEGATIVE: &[&str] = &[
    "疲れた", "最悪", "ムカつく", "悲しい", "つらい", "無理", "だるい", "しんどい", "泣きたい",
    "不安", "落ち込",
];

// Overlaps the heuristic lists but is not the same set ("不安" is heuristic-only).
const OVERRIDE_POSITIVE: &[&str] = &["嬉しい", "最高", "楽しい", "ワクワク", "わくわく", "ハッピー"];
const OVERRIDE_NEGATIVE: &[&str] = &["疲れ", "悲しい", "だる", "無理", "落ち込", "しんど"];

// ── Types ────────────────────────────────────────────────────────────────────

/// Categorical sentiment outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Positive,
    Negative,
    Neutral,
}

impl Label {
    /// Normalize a raw classifier label.  Unknown labels map to neutral.
    pub fn from_raw(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "positive" | "ポジティブ" => Label::Positive,
            "negative" | "ネガティブ" => Label::Negative,
            _ => Label::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Positive => "positive",
            Label::Negative => "negative",
            Label::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced a [`SentimentResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentSource {
    Model,
    Heuristic,
    Override,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentResult {
    pub label: Label,
    /// In `[0, 1]`.
    pub confidence: f32,
    pub source: SentimentSource,
}

impl fmt::Display for SentimentResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (confidence {:.2})", self.label, self.confidence)
    }
}

// ── Model trait ──────────────────────────────────────────────────────────────

/// A black-box text classifier returning a raw label and a score.
pub trait SentimentModel {
    /// Short display name, e.g. the model repository ID.
    fn name(&self) -> &str;

    /// Classify `text`.  The caller truncates the input beforehand.
    fn classify(&self, text: &str) -> Result<(String, f32)>;
}

#[derive(Debug, Deserialize)]
struct ApiLabelScore {
    label: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiInferenceResponse {
    Nested(Vec<Vec<ApiLabelScore>>),
    Flat(Vec<ApiLabelScore>),
}

/// Pick the top-scoring label from a text-classification response.
fn top_label(response: ApiInferenceResponse) -> Result<(String, f32)> {
    let scores = match response {
        ApiInferenceResponse::Nested(outer) => outer.into_iter().next().unwrap_or_default(),
        ApiInferenceResponse::Flat(scores) => scores,
    };

    scores
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map(|s| (s.label, s.score))
        .ok_or_else(|| MoodError::Decode("empty classification result".to_string()))
}

/// Sentiment model served by the Hugging Face inference API.
pub struct HuggingFaceModel {
    model: String,
    endpoint: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl HuggingFaceModel {
    pub fn new(model: &str, base_url: &str, token: Option<String>) -> Self {
        Self {
            model: model.to_string(),
            endpoint: format!("{}/{}", base_url.trim_end_matches('/'), model),
            token,
            agent: ureq::AgentBuilder::new().build(),
        }
    }
}

impl SentimentModel for HuggingFaceModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn classify(&self, text: &str) -> Result<(String, f32)> {
        let mut request = self.agent.post(&self.endpoint);
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }

        let response = request
            .send_json(serde_json::json!({ "inputs": text }))
            .map_err(|e| MoodError::ModelUnavailable(MoodError::from(e).to_string()))?;

        let body: ApiInferenceResponse = response
            .into_json()
            .map_err(|e| MoodError::Decode(e.to_string()))?;

        top_label(body)
    }
}

// ── Classifier adapter ───────────────────────────────────────────────────────

/// Built once per process and passed by reference to the pipeline.
pub struct SentimentClassifier {
    model: Option<Box<dyn SentimentModel>>,
}

impl SentimentClassifier {
    /// A classifier that never calls out and always uses the heuristic.
    pub fn heuristic_only() -> Self {
        Self { model: None }
    }

    pub fn with_model(model: Box<dyn SentimentModel>) -> Self {
        Self { model: Some(model) }
    }

    pub fn from_config(config: &Config) -> Self {
        if config.use_model == Some(false) {
            return Self::heuristic_only();
        }
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let url = config.inference_url.as_deref().unwrap_or(DEFAULT_INFERENCE_URL);
        Self::with_model(Box::new(HuggingFaceModel::new(model, url, config.hf_token.clone())))
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref().map(|m| m.name())
    }

    /// Classify `text`.  Never fails.
    ///
    /// The model sees only the first [`CLASSIFY_MAX_CHARS`] characters; the
    /// heuristic fallback scans the whole text.
    pub fn classify(&self, text: &str) -> SentimentResult {
        if let Some(model) = &self.model {
            match model.classify(truncate_chars(text, CLASSIFY_MAX_CHARS)) {
                Ok((raw, score)) => {
                    debug!(model = model.name(), raw_label = %raw, score, "model classification");
                    return SentimentResult {
                        label: Label::from_raw(&raw),
                        confidence: score.clamp(0.0, 1.0),
                        source: SentimentSource::Model,
                    };
                }
                Err(e) => {
                    debug!(model = model.name(), "sentiment model failed, using heuristic: {}", e);
                }
            }
        }

        let (label, confidence) = naive_sentiment(text);
        SentimentResult {
            label,
            confidence,
            source: SentimentSource::Heuristic,
        }
    }

    /// Classify and then apply the keyword override to the full text.
    pub fn estimate(&self, text: &str) -> SentimentResult {
        apply_keyword_override(text, self.classify(text))
    }
}

/// Count how many positive and negative words appear in `text`.
///
/// No hits at all yields `(Neutral, 0.5)`.  Otherwise the majority wins,
/// ties going to positive, with confidence `0.5 + min(0.49, 0.1 × |p − n|)`.
pub fn naive_sentiment(text: &str) -> (Label, f32) {
    let p = HEURISTIC_POSITIVE.iter().filter(|w| text.contains(**w)).count();
    let n = HEURISTIC_NEGATIVE.iter().filter(|w| text.contains(**w)).count();

    if p == 0 && n == 0 {
        return (Label::Neutral, 0.5);
    }

    let label = if p >= n { Label::Positive } else { Label::Negative };
    let diff = p.abs_diff(n) as f32;
    (label, 0.5 + (diff * 0.1).min(0.49))
}

/// Force a label when the text contains an unambiguous keyword.
/// Positive keywords are checked first.
pub fn apply_keyword_override(text: &str, result: SentimentResult) -> SentimentResult {
    let forced = if OVERRIDE_POSITIVE.iter().any(|w| text.contains(w)) {
        Some(Label::Positive)
    } else if OVERRIDE_NEGATIVE.iter().any(|w| text.contains(w)) {
        Some(Label::Negative)
    } else {
        None
    };

    match forced {
        Some(label) => SentimentResult {
            label,
            confidence: OVERRIDE_CONFIDENCE,
            source: SentimentSource::Override,
        },
        None => result,
    }
}

/// Cut `text` to at most `max` characters, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
