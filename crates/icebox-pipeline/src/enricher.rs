//! Context enricher
//!
//! Loads goal metadata to personalize the generation prompt.
//! Personalization is best-effort: a failed or empty lookup degrades to
//! empty fields with a warning and never blocks generation.

use icebox_core::GoalId;
use icebox_store::GoalStore;

/// Goal metadata feeding prompt augmentation. Absent fields are empty
/// strings, which the assembler treats as "omit the sentence".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalProfile {
    pub title: String,
    pub metric: String,
    pub platform: String,
}

/// Fetch `{title, target_metric, ad_platform}` for the resolved goal.
///
/// The caller's supplied target metric is used unless the goal provides
/// its own, in which case the goal's value takes precedence.
pub async fn enrich(
    goal_id: &GoalId,
    caller_metric: Option<&str>,
    goals: &dyn GoalStore,
) -> GoalProfile {
    let mut profile = GoalProfile {
        metric: caller_metric.unwrap_or_default().to_string(),
        ..Default::default()
    };

    match goals.get(goal_id).await {
        Ok(Some(goal)) => {
            profile.title = goal.title;
            if let Some(metric) = goal.target_metric.filter(|m| !m.is_empty()) {
                profile.metric = metric;
            }
            if let Some(platform) = goal.ad_platform {
                profile.platform = platform;
            }
        }
        Ok(None) => {
            tracing::warn!(goal = %goal_id, "goal not found; generating without personalization");
        }
        Err(e) => {
            tracing::warn!(goal = %goal_id, error = %e, "goal lookup failed; generating without personalization");
        }
    }

    profile
}
