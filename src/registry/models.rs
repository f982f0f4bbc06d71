//! Model-name plausibility checks.
//!
//! A mismatch is advisory only: the call proceeds and the caller gets a
//! [`Warning`]. Providers ship new model families faster than any pattern
//! list can track.

use crate::types::{ProviderId, Warning};
use regex::Regex;

fn pattern(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::OpenAi => r"^(gpt-|o\d|chatgpt-|ft:|text-|davinci|babbage|codex-|omni-)",
        ProviderId::Anthropic => r"^claude-",
        ProviderId::Gemini => r"^((models/)?(gemini-|gemma-|learnlm-)|tunedModels/)",
        ProviderId::Xai => r"^grok-",
        // vendor/model slugs, including openrouter/auto
        ProviderId::OpenRouter => r"^[\w.-]+/[\w.:-]+$",
    }
}

lazy_static::lazy_static! {
    static ref PATTERNS: Vec<(ProviderId, Regex)> = ProviderId::ALL
        .iter()
        .filter_map(|id| Regex::new(pattern(*id)).ok().map(|re| (*id, re)))
        .collect();
}

/// `Some(warning)` when `model` does not look like one of `provider`'s models.
pub fn check_model(provider: ProviderId, model: &str) -> Option<Warning> {
    let model = model.trim();
    if model.is_empty() {
        return None;
    }
    let re = PATTERNS
        .iter()
        .find_map(|(id, re)| (*id == provider).then_some(re))?;
    if re.is_match(model) {
        None
    } else {
        Some(Warning::UnrecognizedModel {
            provider,
            model: model.to_string(),
        })
    }
}
