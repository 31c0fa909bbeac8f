//! Core domain types for the experiment pipeline
//!
//! Everything that crosses a component boundary lives here: goal
//! identifiers (numeric or opaque), diagnostic contexts, goals,
//! transient experiment candidates, and persisted experiment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate new random user id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[inline]
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique diagnostic context identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Generate new random context id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    #[inline]
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-generated experiment row identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentId(pub i64);

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Goal identifier: either a positive integer or a UUID-shaped string.
///
/// Both forms are valid in storage and must be distinguished by shape,
/// not type. Serialized untagged so a numeric id round-trips as a JSON
/// number and an opaque id as a JSON string, preserving the ambiguity
/// through every layer that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GoalId {
    /// Numeric goal id
    Numeric(i64),
    /// UUID-shaped string goal id
    Opaque(String),
}

impl GoalId {
    /// Classify a raw goal reference into a usable goal id.
    ///
    /// Heuristic: a string longer than 10 characters containing a hyphen
    /// is treated as an opaque (UUID-shaped) id; any other string must
    /// coerce to an integer. A string of 11+ digits without a hyphen
    /// would still take the numeric path, so the practical misclassification
    /// risk is limited to short non-standard UUIDs.
    #[must_use]
    pub fn classify(raw: &Value) -> Option<Self> {
        match raw {
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else if s.len() > 10 && s.contains('-') {
                    Some(Self::Opaque(s.to_string()))
                } else {
                    s.parse::<i64>().ok().map(Self::Numeric)
                }
            }
            Value::Number(n) => n.as_i64().map(Self::Numeric),
            _ => None,
        }
    }

    /// Last-line invariant guard applied before any store write
    #[inline]
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::Numeric(n) => *n > 0,
            Self::Opaque(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Opaque(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for GoalId {
    fn from(n: i64) -> Self {
        Self::Numeric(n)
    }
}

/// A value that may arrive as a JSON number or as free text.
///
/// Diagnostic metrics and edited expected results are weakly typed at the
/// storage boundary; this keeps both shapes without lossy coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Numeric form
    Number(f64),
    /// Free-text form
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Stored record of a prior free-form analysis plus its structured
/// interpretation. Immutable once created except for goal association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticContext {
    pub id: ContextId,
    pub user_id: UserId,
    /// Original free-form input
    pub raw_input: String,
    /// Opaque JSON blob from the prior diagnostic step. May itself be a
    /// JSON-encoded string for legacy rows.
    pub structured_analysis: Value,
    /// Raw goal reference as stored (number or string), classified lazily
    pub goal_ref: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl DiagnosticContext {
    /// Structured analysis with the legacy double-encoding unwrapped.
    ///
    /// Old rows store the analysis as a JSON-encoded string; newer rows
    /// store it as a JSON value directly. Unparsable legacy text passes
    /// through as a raw string.
    #[must_use]
    pub fn parsed_analysis(&self) -> Value {
        match &self.structured_analysis {
            Value::String(s) => {
                serde_json::from_str(s).unwrap_or_else(|_| self.structured_analysis.clone())
            }
            other => other.clone(),
        }
    }
}

/// User-defined optimization objective. Read-only from the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub title: String,
    /// Metric the goal optimizes for (e.g. CPA, CTR)
    pub target_metric: Option<String>,
    /// Paid-traffic platform in focus (e.g. Meta Ads)
    pub ad_platform: Option<String>,
    pub current_cycle: u32,
}

/// Quantitative block from the latest diagnostic, injected into the
/// prompt one line per present field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpa_current: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpa_target: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctr_current: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_test_budget: Option<Scalar>,
}

impl TrafficContext {
    /// True when no field carries data
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.platform.is_none()
            && self.cpa_current.is_none()
            && self.cpa_target.is_none()
            && self.ctr_current.is_none()
            && self.daily_test_budget.is_none()
    }
}

/// Transient, normalized experiment suggestion out of response recovery.
///
/// Every field is explicitly optional so the mapper sees a stable shape
/// regardless of which keys the model dropped. `ice_score` stays a raw
/// JSON value; its integer-ness is checked at mapping time rather than
/// silently coerced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentCandidate {
    pub title: Option<String>,
    pub hypothesis: Option<String>,
    pub metric: Option<String>,
    pub target: Option<f64>,
    pub cutoff_line: Option<String>,
    pub ice_score: Option<Value>,
}

/// Lifecycle status of a persisted experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperimentStatus {
    /// Not yet chosen for execution (initial)
    #[serde(rename = "backlog")]
    Backlog,
    /// Currently being executed
    #[serde(rename = "em_execucao")]
    Active,
    /// Soft-terminal: never deleted, only archived
    #[serde(rename = "archived")]
    Archived,
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Backlog => "backlog",
            Self::Active => "em_execucao",
            Self::Archived => "archived",
        };
        write!(f, "{s}")
    }
}

/// Row ready for batch insertion, produced only by the mapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExperiment {
    pub user_id: UserId,
    pub hypothesis: String,
    /// Variable under test (the candidate's metric)
    pub variable: String,
    pub expected_result: Option<Scalar>,
    pub target_value: Option<f64>,
    pub cutoff_line: Option<String>,
    pub context_id: Option<ContextId>,
    /// Mandatory: resolved before generation was attempted
    pub goal_id: GoalId,
    pub status: ExperimentStatus,
}

/// Persisted, lifecycle-tracked experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub id: ExperimentId,
    pub user_id: UserId,
    pub hypothesis: String,
    pub variable: String,
    pub expected_result: Option<Scalar>,
    pub target_value: Option<f64>,
    pub cutoff_line: Option<String>,
    pub context_id: Option<ContextId>,
    pub goal_id: GoalId,
    pub status: ExperimentStatus,
    pub created_at: DateTime<Utc>,
}

/// Direct field edits applied as a single-row update.
///
/// Absent fields are left untouched; a present field overwrites its
/// column, and an empty or whitespace-only value clears it. The expected
/// result mirrors into the typed target value when it parses as a number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentPatch {
    pub hypothesis: Option<String>,
    pub variable: Option<String>,
    pub expected_result: Option<String>,
    pub cutoff_line: Option<String>,
}
