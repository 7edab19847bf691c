//! Keyword-driven search tags for a mood.
//!
//! Tags are chosen from a base table keyed by sentiment label (with two
//! extra negative variants for fatigue and sadness), followed by contextual
//! tags for weather, study, morning and night cues in the diary text.

use crate::sentiment::Label;

/// Maximum number of tags returned by [`derive_tags`].
pub const MAX_TAGS: usize = 5;

const POSITIVE_TAGS: &[&str] = &["happy", "energetic", "summer", "uplifting", "j-pop happy"];
const FATIGUE_TAGS: &[&str] = &["lofi beats", "chill", "healing piano", "relax", "study"];
const SADNESS_TAGS: &[&str] = &["sad lofi", "ballad", "piano sad", "j-pop ballad"];
const NEGATIVE_TAGS: &[&str] = &["calm", "chill", "ambient", "lofi"];
const NEUTRAL_TAGS: &[&str] = &["focus", "lofi", "coffeehouse", "chillhop"];

const FATIGUE_CUES: &[&str] = &["疲", "だる", "しんど"];
const SADNESS_CUES: &[&str] = &["悲", "泣", "失恋"];

/// A contextual tag and the cues that trigger it.  English cues are matched
/// against the lower-cased text, Japanese ones against the raw text.
struct ContextRule {
    tag: &'static str,
    ja: &'static str,
    en: &'static str,
}

const CONTEXT_RULES: &[ContextRule] = &[
    ContextRule { tag: "rainy day", ja: "雨", en: "rain" },
    ContextRule { tag: "study lofi", ja: "勉強", en: "study" },
    ContextRule { tag: "morning", ja: "朝", en: "morning" },
    ContextRule { tag: "night chill", ja: "夜", en: "night" },
];

fn contains_any(text: &str, cues: &[&str]) -> bool {
    cues.iter().any(|c| text.contains(c))
}

/// Base tag set for a label.  Never empty.
fn base_tags(label: Label, text: &str) -> &'static [&'static str] {
    match label {
        Label::Positive => POSITIVE_TAGS,
        Label::Negative if contains_any(text, FATIGUE_CUES) => FATIGUE_TAGS,
        Label::Negative if contains_any(text, SADNESS_CUES) => SADNESS_TAGS,
        Label::Negative => NEGATIVE_TAGS,
        Label::Neutral => NEUTRAL_TAGS,
    }
}

/// Derive up to [`MAX_TAGS`] unique search tags, base tags first.
pub fn derive_tags(label: Label, text: &str) -> Vec<String> {
    let text_lower = text.to_lowercase();

    let context = CONTEXT_RULES
        .iter()
        .filter(|rule| text.contains(rule.ja) || text_lower.contains(rule.en))
        .map(|rule| rule.tag);

    let mut tags: Vec<String> = Vec::with_capacity(MAX_TAGS);
    for tag in base_tags(label, text).iter().copied().chain(context) {
        if tags.len() == MAX_TAGS {
            break;
        }
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}
