//! # Price Calculation
//!
//! Folds option, add-on and plan deltas into a total.
//!
//! ## Application Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  running = base price                                                   │
//! │                                                                         │
//! │  1. options  (catalog group order, then option order)                   │
//! │       single group + structured  → structured.base − catalog base       │
//! │       multiple group + structured → structured.base                     │
//! │       otherwise                   → priceDelta                          │
//! │                                                                         │
//! │  2. add-ons  (catalog add-on order, against the RUNNING subtotal)       │
//! │       flat            → computedDelta ?? priceDelta                     │
//! │       percentage      → running × multiplier                            │
//! │       serviceOverride → channel price ?? computedDelta ?? priceDelta    │
//! │                                                                         │
//! │  3. plan     running += priceDelta                                      │
//! │              running  = round(running × multiplier)   ◄── only rounding │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::margin::resolve_service_amount;
use crate::money::Money;
use crate::selection::Selection;
use crate::types::{AddOn, AddOnPricingMode, Catalog, OptionGroup, ProductOption, SubscriptionPlan};

// =============================================================================
// Breakdown
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum PriceLineKind {
    Base,
    Option,
    AddOn,
    PlanDelta,
    /// Difference introduced by the plan multiplier, rounding included.
    PlanMultiplier,
}

/// One receipt line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PriceLine {
    pub kind: PriceLineKind,

    /// Option, add-on or plan id. `None` for the base line.
    #[ts(optional)]
    pub ref_id: Option<String>,

    pub label: String,
    pub delta: Money,

    /// Total after this line.
    pub running_total: Money,
}

/// Result of one pricing pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceBreakdown {
    pub lines: Vec<PriceLine>,
    pub total: Money,
}

impl PriceBreakdown {
    fn start(base: Money) -> Self {
        let mut breakdown = PriceBreakdown {
            lines: Vec::new(),
            total: base,
        };
        breakdown.lines.push(PriceLine {
            kind: PriceLineKind::Base,
            ref_id: None,
            label: "Base price".to_string(),
            delta: base,
            running_total: base,
        });
        breakdown
    }

    fn push(&mut self, kind: PriceLineKind, id: &str, label: &str, delta: Money) {
        self.total += delta;
        self.lines.push(PriceLine {
            kind,
            ref_id: Some(id.to_string()),
            label: label.to_string(),
            delta,
            running_total: self.total,
        });
    }

    /// Delta of the line for `id` and `kind`, if present.
    pub fn delta_of(&self, kind: PriceLineKind, id: &str) -> Option<Money> {
        self.lines
            .iter()
            .find(|l| l.kind == kind && l.ref_id.as_deref() == Some(id))
            .map(|l| l.delta)
    }
}

// =============================================================================
// Deltas
// =============================================================================

/// Delta contributed by one selected option.
pub fn option_delta(base_price: Money, group: &OptionGroup, option: &ProductOption) -> Money {
    match &option.structured_pricing {
        Some(structured) if group.is_single() => structured.base_price - base_price,
        Some(structured) => structured.base_price,
        None => option.price_delta,
    }
}

/// Delta contributed by one selected add-on, given the subtotal so far.
pub fn add_on_delta(add_on: &AddOn, running: Money, active_channel: Option<&str>) -> Money {
    match add_on.pricing_mode {
        AddOnPricingMode::Flat => add_on.computed_delta.unwrap_or(add_on.price_delta),
        AddOnPricingMode::Percentage => match add_on.percentage_multiplier {
            Some(multiplier) => running.scale(multiplier),
            None => {
                tracing::debug!(add_on = %add_on.id, "percentage add-on without multiplier");
                Money::zero()
            }
        },
        AddOnPricingMode::ServiceOverride => resolve_service_amount(add_on, active_channel),
    }
}

/// Plan step: flat delta first, then multiplier with a single rounding.
///
/// Returns the new total.
///
/// ## Example
/// ```rust
/// use configurator_core::money::Money;
/// use configurator_core::pricing::apply_plan;
/// use configurator_core::types::SubscriptionPlan;
///
/// let plan: SubscriptionPlan = serde_json::from_str(
///     r#"{"id": "q", "priceDelta": 100, "priceMultiplier": "2.5"}"#,
/// ).unwrap();
///
/// // (1000 + 100) × 2.5 = 2750
/// assert_eq!(apply_plan(Money::from_major(1000), &plan), Money::from_major(2750));
/// ```
pub fn apply_plan(running: Money, plan: &SubscriptionPlan) -> Money {
    let with_delta = running + plan.price_delta.unwrap_or_default();
    match plan.price_multiplier {
        Some(multiplier) => with_delta.scale(multiplier).round_to_unit(),
        None => with_delta,
    }
}

// =============================================================================
// Full Pass
// =============================================================================

/// Prices a selection from scratch.
pub fn calculate(
    catalog: &Catalog,
    selection: &Selection,
    active_channel: Option<&str>,
) -> PriceBreakdown {
    let mut breakdown = PriceBreakdown::start(catalog.base_price);

    for group in &catalog.option_groups {
        let Some(selected) = selection.options.get(&group.id) else {
            continue;
        };
        for option in group.options.iter().filter(|o| selected.contains(&o.id)) {
            let delta = option_delta(catalog.base_price, group, option);
            breakdown.push(PriceLineKind::Option, &option.id, &option.label, delta);
        }
    }

    for add_on in catalog
        .add_ons
        .iter()
        .filter(|a| selection.is_add_on_selected(&a.id))
    {
        let delta = add_on_delta(add_on, breakdown.total, active_channel);
        breakdown.push(PriceLineKind::AddOn, &add_on.id, &add_on.label, delta);
    }

    if let Some(plan) = selection.plan_id.as_deref().and_then(|id| catalog.plan(id)) {
        if let Some(delta) = plan.price_delta.filter(|d| !d.is_zero()) {
            breakdown.push(PriceLineKind::PlanDelta, &plan.id, &plan.label, delta);
        }
        if plan.price_multiplier.is_some() {
            let before = breakdown.total;
            let after = apply_plan(
                before,
                &SubscriptionPlan {
                    price_delta: None,
                    ..plan.clone()
                },
            );
            if after != before {
                breakdown.push(PriceLineKind::PlanMultiplier, &plan.id, &plan.label, after - before);
            }
        }
    }

    tracing::trace!(total = %breakdown.total, lines = breakdown.lines.len(), "priced selection");
    breakdown
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn catalog(json: &str) -> Catalog {
        Catalog::from_json_str(json).unwrap()
    }

    #[test]
    fn test_flat_options_add_up() {
        let catalog = catalog(
            r#"{"basePrice": 1000, "currency": "EUR", "optionGroups": [
                {"id": "a", "name": "A", "type": "multiple", "options": [
                    {"id": "x", "label": "X", "priceDelta": 200},
                    {"id": "y", "label": "Y", "priceDelta": 100}
                ]}
            ]}"#,
        );
        let mut selection = Selection::seed(&catalog);
        selection.toggle_option(&catalog, "a", "x");
        selection.toggle_option(&catalog, "a", "y");

        let breakdown = calculate(&catalog, &selection, None);
        assert_eq!(breakdown.total, Money::from_major(1300));
        assert_eq!(breakdown.lines.len(), 3);
        assert_eq!(breakdown.lines[2].running_total, Money::from_major(1300));
    }

    #[test]
    fn test_structured_single_replaces_base_multiple_adds() {
        let catalog = catalog(
            r#"{"basePrice": 1000, "currency": "EUR", "optionGroups": [
                {"id": "tier", "name": "Tier", "type": "single", "options": [
                    {"id": "std", "label": "Std", "recommended": true,
                     "structuredPricing": {"amount": 1, "basePrice": 1000}},
                    {"id": "pro", "label": "Pro",
                     "structuredPricing": {"amount": 1, "basePrice": 1800}}
                ]},
                {"id": "extra", "name": "Extra", "type": "multiple", "options": [
                    {"id": "pack", "label": "Pack",
                     "structuredPricing": {"amount": 1, "basePrice": 250}}
                ]}
            ]}"#,
        );
        let mut selection = Selection::seed(&catalog);
        assert_eq!(calculate(&catalog, &selection, None).total, Money::from_major(1000));

        selection.toggle_option(&catalog, "extra", "pack");
        assert_eq!(calculate(&catalog, &selection, None).total, Money::from_major(1250));

        selection.toggle_option(&catalog, "tier", "pro");
        assert_eq!(calculate(&catalog, &selection, None).total, Money::from_major(2050));
    }

    #[test]
    fn test_percentage_uses_running_subtotal_in_order() {
        let catalog = catalog(
            r#"{"basePrice": 1000, "currency": "EUR",
                "optionGroups": [{"id": "g", "name": "G", "type": "multiple", "options": [
                    {"id": "o", "label": "O", "priceDelta": 200}
                ]}],
                "addOns": [
                    {"id": "setup", "label": "Setup", "priceDelta": 300},
                    {"id": "care", "label": "Care", "pricingMode": "percentage", "percentageMultiplier": "0.1"}
                ]}"#,
        );
        let mut selection = Selection::seed(&catalog);
        selection.toggle_option(&catalog, "g", "o");
        selection.toggle_add_on(&catalog, "care");
        selection.toggle_add_on(&catalog, "setup");

        let breakdown = calculate(&catalog, &selection, None);
        // (1000 + 200 + 300) × 0.1
        assert_eq!(
            breakdown.delta_of(PriceLineKind::AddOn, "care"),
            Some(Money::new(dec!(150.0)))
        );
        assert_eq!(breakdown.total, Money::from_major(1650));
    }

    #[test]
    fn test_flat_add_on_prefers_computed_delta() {
        let add_on: AddOn = serde_json::from_str(
            r#"{"id": "a", "label": "A", "priceDelta": 10, "computedDelta": 12}"#,
        )
        .unwrap();
        assert_eq!(add_on_delta(&add_on, Money::zero(), None), Money::from_major(12));
    }

    #[test]
    fn test_plan_multiplier() {
        let catalog = catalog(
            r#"{"basePrice": 1000, "currency": "EUR", "subscriptionPlans": [
                {"id": "triple", "label": "Triple", "priceMultiplier": 3}
            ]}"#,
        );
        let selection = Selection::seed(&catalog);
        let breakdown = calculate(&catalog, &selection, None);
        assert_eq!(breakdown.total, Money::from_major(3000));
        assert_eq!(
            breakdown.delta_of(PriceLineKind::PlanMultiplier, "triple"),
            Some(Money::from_major(2000))
        );
    }

    #[test]
    fn test_plan_delta_before_multiplier_single_rounding() {
        let plan: SubscriptionPlan = serde_json::from_str(
            r#"{"id": "p", "priceDelta": "0.3", "priceMultiplier": "1.5"}"#,
        )
        .unwrap();
        // (10.2 + 0.3) × 1.5 = 15.75 → 16
        assert_eq!(apply_plan(Money::new(dec!(10.2)), &plan), Money::from_major(16));
        // multiplier first would give 10.2 × 1.5 + 0.3 = 15.6
    }

    #[test]
    fn test_absurd_magnitudes_saturate() {
        let catalog = catalog(
            r#"{"basePrice": 1000000, "currency": "EUR",
                "addOns": [{"id": "fee", "label": "Fee", "pricingMode": "percentage",
                            "percentageMultiplier": "79228162514264337593543950335"}],
                "subscriptionPlans": [{"id": "m", "label": "M", "priceMultiplier": "79228162514264337593543950335"}]}"#,
        );
        let mut selection = Selection::seed(&catalog);
        selection.toggle_add_on(&catalog, "fee");

        let breakdown = calculate(&catalog, &selection, None);
        assert_eq!(breakdown.total, Money::new(rust_decimal::Decimal::MAX));
    }

    #[test]
    fn test_breakdown_lines_sum_to_total() {
        let catalog = catalog(
            r#"{"basePrice": 99, "currency": "EUR",
                "addOns": [{"id": "fee", "label": "Fee", "pricingMode": "percentage", "percentageMultiplier": "0.07"}],
                "subscriptionPlans": [{"id": "m", "label": "M", "priceDelta": 1, "priceMultiplier": "1.1"}]}"#,
        );
        let mut selection = Selection::seed(&catalog);
        selection.toggle_add_on(&catalog, "fee");

        let breakdown = calculate(&catalog, &selection, None);
        let sum: Money = breakdown.lines.iter().map(|l| l.delta).sum();
        assert_eq!(sum, breakdown.total);
        // (99 + 6.93 + 1) × 1.1 = 117.623 → 118
        assert_eq!(breakdown.total, Money::from_major(118));
    }
}
