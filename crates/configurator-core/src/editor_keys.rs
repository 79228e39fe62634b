//! # Editor Key Index
//!
//! Maps stable, author-controlled editor keys to the live ids of one
//! catalog snapshot.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  visibility rule: { kind: "option", optionKey: "premium-tier" }         │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │  EditorKeyIndex (built once per catalog snapshot)                      │
//! │     groups   "tier"         → "grp_81f3"                                │
//! │     options  "premium-tier" → [("grp_81f3", "opt_a09c")]                │
//! │     add-ons  "rush"         → "add_77d1"                                │
//! │     plans    "monthly"      → "plan_0b2e"                               │
//! │                                                                         │
//! │  Re-import the catalog with new ids: rebuild the index, same behavior.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The index is a pure function of the catalog. It is never mutated after
//! construction; a new catalog gets a new index.

use std::collections::HashMap;

use crate::types::Catalog;

/// Live location of an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRef {
    pub group_id: String,
    pub option_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct EditorKeyIndex {
    groups: HashMap<String, String>,
    options: HashMap<String, Vec<OptionRef>>,
    add_ons: HashMap<String, String>,
    plans: HashMap<String, String>,
}

impl EditorKeyIndex {
    pub fn build(catalog: &Catalog) -> Self {
        let mut index = EditorKeyIndex::default();

        for group in &catalog.option_groups {
            if let Some(key) = usable_key(group.editor_key.as_deref()) {
                index.groups.entry(key).or_insert_with(|| group.id.clone());
            }
            for option in &group.options {
                if let Some(key) = usable_key(option.editor_key.as_deref()) {
                    index.options.entry(key).or_default().push(OptionRef {
                        group_id: group.id.clone(),
                        option_id: option.id.clone(),
                    });
                }
            }
        }

        for add_on in &catalog.add_ons {
            if let Some(key) = usable_key(add_on.editor_key.as_deref()) {
                index.add_ons.entry(key).or_insert_with(|| add_on.id.clone());
            }
        }

        for plan in &catalog.subscription_plans {
            if let Some(key) = usable_key(plan.editor_key.as_deref()) {
                index.plans.entry(key).or_insert_with(|| plan.id.clone());
            }
        }

        tracing::trace!(
            groups = index.groups.len(),
            options = index.options.len(),
            add_ons = index.add_ons.len(),
            plans = index.plans.len(),
            "editor key index built"
        );
        index
    }

    pub fn group(&self, key: &str) -> Option<&str> {
        self.groups.get(key.trim()).map(String::as_str)
    }

    /// Every option carrying `key`. Empty when unmapped.
    pub fn options(&self, key: &str) -> &[OptionRef] {
        self.options
            .get(key.trim())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_on(&self, key: &str) -> Option<&str> {
        self.add_ons.get(key.trim()).map(String::as_str)
    }

    pub fn plan(&self, key: &str) -> Option<&str> {
        self.plans.get(key.trim()).map(String::as_str)
    }
}

fn usable_key(key: Option<&str>) -> Option<String> {
    key.map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}
