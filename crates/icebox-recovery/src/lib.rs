//! Icebox Recovery - structured payload extraction from raw model text
//!
//! The generative model is an adversarial-by-unreliability text source,
//! not a typed API. This crate turns its raw output into validated
//! experiment candidates through a fixed sequence of pure transforms,
//! each defending against one documented failure mode:
//!
//! 1. trim surrounding whitespace
//! 2. strip a wrapping markdown code fence (fence wrapping)
//! 3. slice from the first `{` to the last `}` (prose wrapping)
//! 4. parse as JSON - a failure here is terminal for the attempt
//! 5. extract the experiment list (wrapper-object deviation)
//! 6. cap at 5 entries (over-production)
//! 7. normalize field names into a stable shape (field-name drift)
//!
//! There is no negotiation channel back to the model, so every stage
//! recovers what it can and the parse stage alone decides pass/fail.

#![warn(unreachable_pub)]

use icebox_core::{ExperimentCandidate, MAX_EXPERIMENTS_PER_BATCH};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Errors while recovering a payload from model output.
///
/// Deliberately separate from upstream generation errors: the remedy for
/// a recovery failure is to generate again, not to fix the input.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    /// Output was not parseable JSON after fence and prose stripping
    #[error("model output is not valid JSON: {0}")]
    InvalidJson(String),

    /// Parsed fine but yielded no experiment entries
    #[error("model output contained no experiments")]
    NoExperiments,
}

/// Validated result of one recovery pass
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredBatch {
    /// Free-text strategic summary, when the model supplied one
    pub strategic_vision: Option<String>,
    /// At most [`MAX_EXPERIMENTS_PER_BATCH`] normalized candidates
    pub candidates: Vec<ExperimentCandidate>,
}

/// Entire-text code fence, with or without a language tag
static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:[A-Za-z0-9_+-]*)?[ \t]*\n?(.*?)\n?[ \t]*```$")
        .expect("fence regex is valid")
});

/// Recover a validated experiment batch from raw model output.
///
/// Applies the full transform sequence. Returns [`RecoveryError`] when
/// the text cannot be parsed or parses to something with no experiment
/// entries; there is no partial recovery.
pub fn recover(raw: &str) -> Result<RecoveredBatch, RecoveryError> {
    let text = strip_code_fence(raw.trim());
    // A bare top-level array must survive intact; slicing it to its first
    // and last object braces would corrupt it and defeat the array branch
    // of the extraction step below.
    let text = if text.starts_with('[') {
        text
    } else {
        brace_span(text).unwrap_or(text)
    };

    let parsed: Value = serde_json::from_str(text).map_err(|e| {
        tracing::warn!(
            head = %text.chars().take(200).collect::<String>(),
            "model output failed to parse as JSON"
        );
        RecoveryError::InvalidJson(e.to_string())
    })?;

    let strategic_vision = parsed
        .get("strategic_vision")
        .and_then(Value::as_str)
        .map(str::to_string);

    let entries = extract_experiments(&parsed);
    if entries.is_empty() {
        return Err(RecoveryError::NoExperiments);
    }

    let candidates = entries
        .into_iter()
        .take(MAX_EXPERIMENTS_PER_BATCH)
        .map(normalize_candidate)
        .collect();

    Ok(RecoveredBatch {
        strategic_vision,
        candidates,
    })
}

/// Strip a markdown fence wrapping the entire text, keeping the interior.
///
/// Idempotent: text without a surrounding fence passes through unchanged,
/// and the interior of a stripped fence contains no further fence to strip.
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    match FENCE_RE.captures(text) {
        Some(caps) => caps.get(1).map_or(text, |m| m.as_str().trim()),
        None => text,
    }
}

/// Slice to the span from the first `{` to the last `}`, discarding any
/// leading or trailing prose. `None` when no such span exists.
///
/// This is the primary defense against models that "explain" before or
/// after the JSON despite instructions.
#[must_use]
pub fn brace_span(text: &str) -> Option<&str> {
    let first = text.find('{')?;
    let last = text.rfind('}')?;
    (last > first).then(|| &text[first..=last])
}

/// Pull the experiment entries out of the parsed value.
///
/// Preference order: an `experiments` array property; the whole value if
/// it is itself an array; as a last resort, all object-typed values of
/// the parsed object (a model that ignored the wrapper-object contract).
#[must_use]
pub fn extract_experiments(parsed: &Value) -> Vec<Value> {
    if let Some(arr) = parsed.get("experiments").and_then(Value::as_array) {
        return arr.clone();
    }
    if let Some(arr) = parsed.as_array() {
        return arr.clone();
    }
    parsed
        .as_object()
        .map(|map| {
            map.values()
                .filter(|v| v.is_object())
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Normalize one raw entry into the stable candidate shape.
///
/// Hypothesis falls back to title; a missing field becomes an explicit
/// `None` rather than being omitted, so downstream mapping never has to
/// probe for key presence. The ice score stays raw - integer-ness is a
/// mapping-time decision.
#[must_use]
pub fn normalize_candidate(entry: Value) -> ExperimentCandidate {
    let title = string_field(&entry, "title");
    let hypothesis = string_field(&entry, "hypothesis").or_else(|| title.clone());

    ExperimentCandidate {
        title,
        hypothesis,
        metric: string_field(&entry, "metric"),
        target: entry.get("target").and_then(Value::as_f64),
        cutoff_line: string_field(&entry, "cutoff_line"),
        ice_score: entry.get("ice_score").cloned(),
    }
}

fn string_field(entry: &Value, key: &str) -> Option<String> {
    entry.get(key).and_then(Value::as_str).map(str::to_string)
}
