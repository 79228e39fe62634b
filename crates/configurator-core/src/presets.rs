//! # Preset Reconciliation
//!
//! Infers which catalog preset, if any, the current selection is.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  catalog presets (authored order)                                       │
//! │     "Starter" ──sanitize──► projection A ─┐                             │
//! │     "Pro"     ──sanitize──► projection B ─┼─► first equal ──► presetId  │
//! │     "Agency"  ──sanitize──► projection C ─┘         │                   │
//! │                                                      └── none ──► null  │
//! │  current Selection ──────► projection ─────────────────┘                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Comparison is structural and order-independent. Field values compare by
//! their effective value (entered, else the field default), so a preset that
//! leaves a defaulted field blank still matches a selection showing that
//! default.

use std::collections::{BTreeMap, BTreeSet};

use crate::selection::Selection;
use crate::types::Catalog;

/// Order-independent comparison form of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionProjection {
    options: BTreeMap<String, BTreeSet<String>>,
    add_ons: BTreeSet<String>,
    plan_id: Option<String>,
    fields: BTreeMap<String, String>,
}

impl SelectionProjection {
    pub fn of(catalog: &Catalog, selection: &Selection) -> Self {
        let options = selection
            .options
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(group, ids)| (group.clone(), ids.clone()))
            .collect();

        let fields = catalog
            .custom_fields
            .iter()
            .filter_map(|field| {
                selection
                    .field_value(&field.id)
                    .or_else(|| field.default_value())
                    .map(|v| (field.id.clone(), v.to_string()))
            })
            .collect();

        SelectionProjection {
            options,
            add_ons: selection.add_ons.clone(),
            plan_id: selection.plan_id.clone(),
            fields,
        }
    }
}

/// Sanitized preset projections for one catalog snapshot.
#[derive(Debug, Clone, Default)]
pub struct PresetMatcher {
    presets: Vec<(String, SelectionProjection)>,
}

impl PresetMatcher {
    pub fn new(catalog: &Catalog) -> Self {
        let presets = catalog
            .configuration_presets
            .iter()
            .map(|preset| {
                let sanitized = Selection::sanitize(catalog, &preset.selection);
                (preset.id.clone(), SelectionProjection::of(catalog, &sanitized))
            })
            .collect();
        PresetMatcher { presets }
    }

    /// Id of the first preset equal to `selection`.
    pub fn match_selection(&self, catalog: &Catalog, selection: &Selection) -> Option<String> {
        if self.presets.is_empty() {
            return None;
        }
        let current = SelectionProjection::of(catalog, selection);
        self.presets
            .iter()
            .find(|(_, projection)| *projection == current)
            .map(|(id, _)| id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_json_str(
            r#"{
                "basePrice": 100, "currency": "EUR",
                "optionGroups": [
                    {"id": "size", "name": "Size", "type": "single", "options": [
                        {"id": "s", "label": "S"}, {"id": "l", "label": "L"}
                    ]},
                    {"id": "extras", "name": "Extras", "type": "multiple", "options": [
                        {"id": "gift", "label": "Gift"}, {"id": "card", "label": "Card"}
                    ]}
                ],
                "addOns": [{"id": "rush", "label": "Rush"}],
                "customFields": [{"id": "qty", "type": "number", "defaultValue": "10"}],
                "configurationPresets": [
                    {"id": "big", "label": "Big", "selection": {
                        "options": {"size": ["l"], "extras": ["card", "gift", "stale"]},
                        "addOns": ["rush"]
                    }},
                    {"id": "also-big", "label": "Also big", "selection": {
                        "options": {"size": ["l"], "extras": ["gift", "card"]},
                        "addOns": ["rush"]
                    }}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_order_independent_match_first_wins() {
        let catalog = catalog();
        let matcher = PresetMatcher::new(&catalog);

        let mut selection = Selection::seed(&catalog);
        selection.toggle_option(&catalog, "size", "l");
        selection.toggle_option(&catalog, "extras", "gift");
        selection.toggle_option(&catalog, "extras", "card");
        selection.toggle_add_on(&catalog, "rush");

        assert_eq!(
            matcher.match_selection(&catalog, &selection).as_deref(),
            Some("big")
        );
    }

    #[test]
    fn test_deviation_clears_match() {
        let catalog = catalog();
        let matcher = PresetMatcher::new(&catalog);
        let preset = catalog.preset("big").unwrap();
        let mut selection = Selection::sanitize(&catalog, &preset.selection);
        assert!(matcher.match_selection(&catalog, &selection).is_some());

        selection.toggle_add_on(&catalog, "rush");
        assert!(matcher.match_selection(&catalog, &selection).is_none());
    }

    #[test]
    fn test_field_default_counts_as_value() {
        let catalog = catalog();
        let matcher = PresetMatcher::new(&catalog);
        let preset = catalog.preset("big").unwrap();
        let mut selection = Selection::sanitize(&catalog, &preset.selection);

        selection.set_field_value(&catalog, "qty", "");
        assert!(matcher.match_selection(&catalog, &selection).is_some());

        selection.set_field_value(&catalog, "qty", "20");
        assert!(matcher.match_selection(&catalog, &selection).is_none());
    }
}
