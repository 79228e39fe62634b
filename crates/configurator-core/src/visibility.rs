//! # Conditional Visibility
//!
//! Decides which custom fields are shown for the current selection.
//!
//! ## Condition Semantics
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────────────┐
//! │ kind             │ true when                                            │
//! ├──────────────────┼──────────────────────────────────────────────────────┤
//! │ option           │ option (id or key) selected, in the given group or   │
//! │                  │ in any group; unmapped key → false                   │
//! │ addOn            │ add-on (id or key) selected; unmapped key → false    │
//! │ subscriptionPlan │ plan (id or key) selected; unmapped key → TRUE       │
//! │ channel          │ no active channel, or same channel (any case)        │
//! └──────────────────┴──────────────────────────────────────────────────────┘
//!   mode all → every condition       mode any → at least one
//! ```
//!
//! A condition carrying both an id and an editor key holds when either one
//! matches the selection, so ids invalidated by a catalog re-import do not
//! hide fields whose keys still resolve. An unmapped plan key only counts as
//! satisfied when the condition has no plan id.

use crate::editor_keys::EditorKeyIndex;
use crate::selection::Selection;
use crate::types::{CustomField, VisibilityCondition, VisibilityMode};

/// Everything a condition can look at.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityContext<'a> {
    pub selection: &'a Selection,
    pub keys: &'a EditorKeyIndex,
    pub active_channel: Option<&'a str>,
}

/// Whether `field` is visible.
pub fn is_visible(field: &CustomField, ctx: &VisibilityContext<'_>) -> bool {
    let Some(rules) = field.visibility.as_ref() else {
        return true;
    };
    if rules.conditions.is_empty() {
        return true;
    }

    let mut results = rules.conditions.iter().map(|c| condition_holds(c, ctx));
    match rules.mode {
        VisibilityMode::All => results.all(|held| held),
        VisibilityMode::Any => results.any(|held| held),
    }
}

/// Evaluates a single condition against the live selection.
pub fn condition_holds(condition: &VisibilityCondition, ctx: &VisibilityContext<'_>) -> bool {
    match condition {
        VisibilityCondition::Option {
            option_id,
            option_key,
            group_id,
            group_key,
        } => {
            let group_id = non_empty(group_id);
            let keyed_group = non_empty(group_key).map(|key| ctx.keys.group(key));
            if group_id.is_none() && keyed_group == Some(None) {
                return false;
            }
            let groups: Vec<&str> = group_id.into_iter().chain(keyed_group.flatten()).collect();
            let in_scope = |group: &str| groups.is_empty() || groups.iter().any(|g| *g == group);

            let by_id = non_empty(option_id).is_some_and(|id| {
                if groups.is_empty() {
                    ctx.selection.is_option_selected(id, None)
                } else {
                    groups.iter().any(|g| ctx.selection.is_option_selected(id, Some(*g)))
                }
            });
            by_id
                || non_empty(option_key).is_some_and(|key| {
                    ctx.keys
                        .options(key)
                        .iter()
                        .filter(|r| in_scope(&r.group_id))
                        .any(|r| ctx.selection.is_option_selected(&r.option_id, Some(&r.group_id)))
                })
        }

        VisibilityCondition::AddOn {
            add_on_id,
            add_on_key,
        } => {
            let by_id = non_empty(add_on_id).is_some_and(|id| ctx.selection.is_add_on_selected(id));
            by_id
                || non_empty(add_on_key)
                    .and_then(|key| ctx.keys.add_on(key))
                    .is_some_and(|id| ctx.selection.is_add_on_selected(id))
        }

        VisibilityCondition::SubscriptionPlan { plan_id, plan_key } => {
            let selected = ctx.selection.plan_id.as_deref();
            let plan_id = non_empty(plan_id);
            if plan_id.is_some_and(|id| selected == Some(id)) {
                return true;
            }
            match non_empty(plan_key) {
                Some(key) => match ctx.keys.plan(key) {
                    Some(id) => selected == Some(id),
                    None if plan_id.is_none() => {
                        tracing::trace!(plan_key = %key, "unmapped plan key treated as satisfied");
                        true
                    }
                    None => false,
                },
                None => plan_id.is_none(),
            }
        }

        VisibilityCondition::Channel { channel } => match ctx.active_channel {
            None => true,
            Some(active) => active.trim().eq_ignore_ascii_case(channel.trim()),
        },
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================
