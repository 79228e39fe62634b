//! # Selection State
//!
//! The live, mutable snapshot of what a shopper has picked.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Catalog ──► Selection::seed ─────────┐                                │
//! │                                         │                               │
//! │   SelectionSnapshot (saved / preset) ──►├──► Selection ──► mutations    │
//! │        └─ Selection::sanitize ──────────┘        │       (toggle, set)  │
//! │                                                   │                     │
//! │                                                   ▼                     │
//! │                                      to_snapshot() ──► host persists    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sanitization never fails. Whatever comes in, what comes out is consistent
//! with the catalog: stale ids are dropped, `single` groups hold exactly one
//! option, the plan exists.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Catalog, OptionGroup};

// =============================================================================
// Snapshot (external form)
// =============================================================================

/// Serializable selection as saved by hosts and authored in presets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SelectionSnapshot {
    /// Group id → selected option ids.
    #[serde(default)]
    pub options: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub add_ons: Vec<String>,

    #[serde(default)]
    #[ts(optional)]
    pub plan_id: Option<String>,

    /// Field id → raw value.
    #[serde(default)]
    pub custom_fields: BTreeMap<String, String>,
}

// =============================================================================
// Selection
// =============================================================================

/// Canonical in-session selection.
///
/// Set and map semantics throughout: order of picks never matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub options: BTreeMap<String, BTreeSet<String>>,
    pub add_ons: BTreeSet<String>,
    pub plan_id: Option<String>,
    pub custom_fields: BTreeMap<String, String>,

    /// Inferred by preset reconciliation; never set by a user action.
    pub preset_id: Option<String>,
}

impl Selection {
    /// Catalog defaults: recommended-or-first per `single` group, nothing in
    /// `multiple` groups, default-or-first plan, no field values yet.
    pub fn seed(catalog: &Catalog) -> Self {
        let options = catalog
            .option_groups
            .iter()
            .map(|group| (group.id.clone(), seed_group(group)))
            .collect();

        Selection {
            options,
            add_ons: BTreeSet::new(),
            plan_id: catalog.default_plan().map(|p| p.id.clone()),
            custom_fields: BTreeMap::new(),
            preset_id: None,
        }
    }

    /// Projects an arbitrary snapshot onto the catalog.
    pub fn sanitize(catalog: &Catalog, incoming: &SelectionSnapshot) -> Self {
        let mut options = BTreeMap::new();
        for group in &catalog.option_groups {
            let requested = incoming.options.get(&group.id);
            let mut kept: BTreeSet<String> = BTreeSet::new();

            if let Some(ids) = requested {
                for id in ids {
                    if !group.contains(id) {
                        tracing::debug!(group = %group.id, option = %id, "dropping stale option id");
                        continue;
                    }
                    // single groups keep the first surviving id
                    if group.is_single() && !kept.is_empty() {
                        continue;
                    }
                    kept.insert(id.clone());
                }
            }

            if group.is_single() && kept.is_empty() {
                kept = seed_group(group);
            }
            options.insert(group.id.clone(), kept);
        }

        for group_id in incoming.options.keys() {
            if catalog.group(group_id).is_none() {
                tracing::debug!(group = %group_id, "dropping stale option group");
            }
        }

        let add_ons = incoming
            .add_ons
            .iter()
            .filter(|id| {
                let known = catalog.add_on(id).is_some();
                if !known {
                    tracing::debug!(add_on = %id, "dropping stale add-on id");
                }
                known
            })
            .cloned()
            .collect();

        let plan_id = incoming
            .plan_id
            .as_deref()
            .and_then(|id| catalog.plan(id))
            .or_else(|| catalog.default_plan())
            .map(|p| p.id.clone());

        let mut custom_fields = BTreeMap::new();
        for field in &catalog.custom_fields {
            let value = incoming
                .custom_fields
                .get(&field.id)
                .map(String::as_str)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| field.default_value());
            if let Some(value) = value {
                custom_fields.insert(field.id.clone(), value.to_string());
            }
        }

        Selection {
            options,
            add_ons,
            plan_id,
            custom_fields,
            preset_id: None,
        }
    }

    /// The "save configuration" projection.
    pub fn to_snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            options: self
                .options
                .iter()
                .map(|(group, ids)| (group.clone(), ids.iter().cloned().collect()))
                .collect(),
            add_ons: self.add_ons.iter().cloned().collect(),
            plan_id: self.plan_id.clone(),
            custom_fields: self.custom_fields.clone(),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether `option_id` is selected in `group_id`, or in any group.
    pub fn is_option_selected(&self, option_id: &str, group_id: Option<&str>) -> bool {
        match group_id {
            Some(group) => self
                .options
                .get(group)
                .is_some_and(|ids| ids.contains(option_id)),
            None => self.options.values().any(|ids| ids.contains(option_id)),
        }
    }

    pub fn is_add_on_selected(&self, add_on_id: &str) -> bool {
        self.add_ons.contains(add_on_id)
    }

    /// Stored value of a field, treating whitespace-only as absent.
    pub fn field_value(&self, field_id: &str) -> Option<&str> {
        self.custom_fields
            .get(field_id)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    // =========================================================================
    // Mutations
    // =========================================================================
    // Each returns whether the selection changed. Unknown ids are ignored.

    /// Selects `option_id` in a `single` group (evicting the previous pick) or
    /// flips it in a `multiple` group.
    pub fn toggle_option(&mut self, catalog: &Catalog, group_id: &str, option_id: &str) -> bool {
        let Some(group) = catalog.group(group_id) else {
            tracing::debug!(group = %group_id, "toggle ignored: unknown group");
            return false;
        };
        if !group.contains(option_id) {
            tracing::debug!(group = %group_id, option = %option_id, "toggle ignored: unknown option");
            return false;
        }

        let ids = self.options.entry(group.id.clone()).or_default();
        if group.is_single() {
            if ids.len() == 1 && ids.contains(option_id) {
                return false;
            }
            ids.clear();
            ids.insert(option_id.to_string());
        } else if !ids.remove(option_id) {
            ids.insert(option_id.to_string());
        }
        true
    }

    pub fn toggle_add_on(&mut self, catalog: &Catalog, add_on_id: &str) -> bool {
        if catalog.add_on(add_on_id).is_none() {
            tracing::debug!(add_on = %add_on_id, "toggle ignored: unknown add-on");
            return false;
        }
        if !self.add_ons.remove(add_on_id) {
            self.add_ons.insert(add_on_id.to_string());
        }
        true
    }

    /// Selects a plan. `None` is ignored while the catalog offers plans,
    /// since a selection always carries one then.
    pub fn select_plan(&mut self, catalog: &Catalog, plan_id: Option<&str>) -> bool {
        let next = match plan_id {
            Some(id) => match catalog.plan(id) {
                Some(plan) => Some(plan.id.clone()),
                None => {
                    tracing::debug!(plan = %id, "plan change ignored: unknown plan");
                    return false;
                }
            },
            None if !catalog.subscription_plans.is_empty() => {
                tracing::debug!("plan clear ignored: catalog offers plans");
                return false;
            }
            None => None,
        };
        if self.plan_id == next {
            return false;
        }
        self.plan_id = next;
        true
    }

    /// Stores a raw field value. An empty value clears the field.
    pub fn set_field_value(&mut self, catalog: &Catalog, field_id: &str, value: &str) -> bool {
        if catalog.field(field_id).is_none() {
            tracing::debug!(field = %field_id, "value ignored: unknown field");
            return false;
        }
        if value.is_empty() {
            return self.custom_fields.remove(field_id).is_some();
        }
        let previous = self
            .custom_fields
            .insert(field_id.to_string(), value.to_string());
        previous.as_deref() != Some(value)
    }
}

fn seed_group(group: &OptionGroup) -> BTreeSet<String> {
    if !group.is_single() {
        return BTreeSet::new();
    }
    group
        .default_option()
        .map(|o| BTreeSet::from([o.id.clone()]))
        .unwrap_or_default()
}

// =============================================================================
// Unit Tests
// =============================================================================
