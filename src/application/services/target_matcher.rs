//! Targeting rule selection.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::warn;

use crate::domain::attributes::DetectedAttributes;
use crate::domain::entities::{LinkTarget, normalize_target_value};
use crate::domain::repositories::TargetRepository;

/// Picks the rule that should override the destination for these attributes.
///
/// A rule matches when it is active and its value equals the visitor's value for
/// the rule's type (both compared in canonical lower-case form). Among matching
/// rules the highest `priority` wins; ties go to the earliest `created_at`, then
/// the lowest `id`, so the outcome never depends on the order of `rules`.
pub fn select_best_rule<'a>(
    rules: &'a [LinkTarget],
    attributes: &DetectedAttributes,
) -> Option<&'a LinkTarget> {
    rules
        .iter()
        .filter(|rule| rule.is_active && rule_matches(rule, attributes))
        .min_by(|a, b| precedence(a, b))
}

fn rule_matches(rule: &LinkTarget, attributes: &DetectedAttributes) -> bool {
    attributes
        .value_for(rule.target_type)
        .is_some_and(|value| normalize_target_value(value) == normalize_target_value(&rule.value))
}

/// Orders rules so that the winner compares as the smallest.
fn precedence(a: &LinkTarget, b: &LinkTarget) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Resolves targeting overrides against stored rules.
pub struct TargetMatcher {
    repository: Arc<dyn TargetRepository>,
}

impl TargetMatcher {
    pub fn new(repository: Arc<dyn TargetRepository>) -> Self {
        Self { repository }
    }

    /// Returns the target URL of the best matching rule, if any.
    ///
    /// Storage failures are logged and treated as "no override".
    pub async fn match_target(&self, link_id: i64, attributes: &DetectedAttributes) -> Option<String> {
        let rules = match self.repository.list_active(link_id).await {
            Ok(rules) => rules,
            Err(e) => {
                warn!(link_id, step = "targeting", error = %e, "Failed to load targeting rules");
                return None;
            }
        };

        select_best_rule(&rules, attributes).map(|rule| rule.target_url.clone())
    }
}
