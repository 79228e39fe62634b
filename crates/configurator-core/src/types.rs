//! # Catalog Types
//!
//! The catalog-authored data the engine computes over. Every type here is
//! produced by the content backend and treated as immutable input.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Catalog                                    │
//! │  base_price, currency                                                  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  OptionGroup    │   │     AddOn       │   │ SubscriptionPlan│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  single|multiple│   │  flat           │   │  price_delta    │       │
//! │  │  ProductOption* │   │  percentage     │   │  multiplier     │       │
//! │  │   └ Structured- │   │  serviceOverride│   │  is_default     │       │
//! │  │     Pricing     │   │   └ Service-    │   └─────────────────┘       │
//! │  └─────────────────┘   │     Descriptor  │                              │
//! │                        └─────────────────┘                              │
//! │  ┌─────────────────┐   ┌─────────────────┐                              │
//! │  │  CustomField    │   │ ConfiguratorPre-│                              │
//! │  │  text|url|number│   │ set (snapshot)  │                              │
//! │  │  FieldValidation│   └─────────────────┘                              │
//! │  │  visibility     │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every bindable entity has:
//! - `id`: backend id - volatile, changes when content is re-imported
//! - `editor_key`: author-controlled key - stable across imports, used by
//!   visibility rules (see [`crate::editor_keys`])

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::margin::ServiceDescriptor;
use crate::money::Money;
use crate::selection::SelectionSnapshot;

// =============================================================================
// Catalog
// =============================================================================

/// One product's complete configurator definition.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Catalog {
    /// Price before any option, add-on or plan is applied.
    pub base_price: Money,

    /// Storefront currency (ISO 4217).
    pub currency: String,

    #[serde(default)]
    pub option_groups: Vec<OptionGroup>,

    /// Add-ons in application order. Percentage add-ons depend on it.
    #[serde(default)]
    pub add_ons: Vec<AddOn>,

    #[serde(default)]
    pub custom_fields: Vec<CustomField>,

    #[serde(default)]
    pub subscription_plans: Vec<SubscriptionPlan>,

    #[serde(default)]
    pub configuration_presets: Vec<ConfiguratorPreset>,
}

impl Catalog {
    /// Decodes a catalog from its JSON representation.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn group(&self, group_id: &str) -> Option<&OptionGroup> {
        self.option_groups.iter().find(|g| g.id == group_id)
    }

    pub fn add_on(&self, add_on_id: &str) -> Option<&AddOn> {
        self.add_ons.iter().find(|a| a.id == add_on_id)
    }

    pub fn plan(&self, plan_id: &str) -> Option<&SubscriptionPlan> {
        self.subscription_plans.iter().find(|p| p.id == plan_id)
    }

    pub fn field(&self, field_id: &str) -> Option<&CustomField> {
        self.custom_fields.iter().find(|f| f.id == field_id)
    }

    pub fn preset(&self, preset_id: &str) -> Option<&ConfiguratorPreset> {
        self.configuration_presets
            .iter()
            .find(|p| p.id == preset_id)
    }

    /// The plan seeded for a fresh session: flagged default, else first.
    pub fn default_plan(&self) -> Option<&SubscriptionPlan> {
        self.subscription_plans
            .iter()
            .find(|p| p.is_default)
            .or_else(|| self.subscription_plans.first())
    }

    /// Checks structural integrity.
    ///
    /// ## Rules
    /// - Currency must be three ASCII letters
    /// - Ids must be unique per entity kind (options: unique per group)
    ///
    /// Stale references (a preset naming a deleted option, a visibility
    /// rule naming an unknown editor key) are NOT integrity errors; the
    /// engine drops or tolerates them at runtime.
    pub fn validate(&self) -> CoreResult<()> {
        if !is_currency_code(&self.currency) {
            return Err(CoreError::InvalidCurrency(self.currency.clone()));
        }

        ensure_unique("option group", self.option_groups.iter().map(|g| &g.id))?;
        for group in &self.option_groups {
            ensure_unique("option", group.options.iter().map(|o| &o.id))?;
        }
        ensure_unique("add-on", self.add_ons.iter().map(|a| &a.id))?;
        ensure_unique("plan", self.subscription_plans.iter().map(|p| &p.id))?;
        ensure_unique("custom field", self.custom_fields.iter().map(|f| &f.id))?;
        ensure_unique(
            "preset",
            self.configuration_presets.iter().map(|p| &p.id),
        )?;

        Ok(())
    }
}

/// Returns true for a three-letter alphabetic currency code (any case).
pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

fn ensure_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a String>,
) -> CoreResult<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(CoreError::DuplicateId {
                kind,
                id: id.clone(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Option Groups
// =============================================================================

/// Selection cardinality of an option group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum GroupType {
    /// Exactly one option once initialized (radio buttons).
    #[default]
    Single,
    /// Any subset (checkboxes).
    Multiple,
}

/// A named group of mutually related options.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OptionGroup {
    pub id: String,
    pub name: String,

    #[serde(rename = "type", default)]
    pub group_type: GroupType,

    /// For `multiple` groups: at least one option is expected.
    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub options: Vec<ProductOption>,

    #[serde(default)]
    #[ts(optional)]
    pub editor_key: Option<String>,
}

impl OptionGroup {
    pub fn is_single(&self) -> bool {
        self.group_type == GroupType::Single
    }

    pub fn option(&self, option_id: &str) -> Option<&ProductOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn contains(&self, option_id: &str) -> bool {
        self.option(option_id).is_some()
    }

    /// The option seeded for a `single` group: recommended, else first.
    pub fn default_option(&self) -> Option<&ProductOption> {
        self.options
            .iter()
            .find(|o| o.recommended)
            .or_else(|| self.options.first())
    }
}

/// One selectable option inside a group.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductOption {
    pub id: String,
    pub label: String,

    /// Flat delta used when no structured pricing is present.
    #[serde(default)]
    pub price_delta: Money,

    #[serde(default)]
    #[ts(optional)]
    pub structured_pricing: Option<StructuredPricing>,

    /// Preferred default for `single` groups.
    #[serde(default)]
    pub recommended: bool,

    #[serde(default)]
    #[ts(optional)]
    pub metadata: Option<OptionMetadata>,

    #[serde(default)]
    #[ts(optional)]
    pub editor_key: Option<String>,
}

impl ProductOption {
    /// The catalog-authored calculator expression, if any.
    pub fn calculator_expression(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.calculator.as_deref())
            .filter(|expr| !expr.trim().is_empty())
    }
}

/// Marketing metadata carried by an option.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OptionMetadata {
    #[serde(default)]
    #[ts(optional)]
    pub marketing_text: Option<String>,

    #[serde(default)]
    #[ts(optional)]
    pub hero_image: Option<String>,

    /// Arithmetic over `amount` and `days`, e.g. `"amount / days"`.
    #[serde(default)]
    #[ts(optional)]
    pub calculator: Option<String>,
}

// =============================================================================
// Structured Pricing
// =============================================================================

/// Quantity-shaped pricing: `base_price` buys `amount` units.
///
/// ## Tier Selection
/// ```text
/// amount requested: 2500
///
///   tiers: [ {min 1000, 0.90}, {min 2000, 0.80}, {min 5000, 0.70} ]
///                                   ▲
///                       largest min_amount ≤ 2500 → unit price 0.80
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StructuredPricing {
    /// Units included in `base_price`.
    #[ts(type = "string")]
    pub amount: Decimal,

    /// Display unit ("followers", "GB", "days").
    #[serde(default)]
    pub amount_unit: String,

    pub base_price: Money,

    /// Price per unit above `amount` when no tier applies.
    #[serde(default)]
    pub unit_price: Money,

    #[serde(default)]
    pub discount_tiers: Vec<DiscountTier>,

    /// Minimum units delivered per day for drip-fed services.
    #[serde(default)]
    #[ts(type = "string | null")]
    pub drip_min_per_day: Option<Decimal>,
}

impl StructuredPricing {
    /// The discount tier reached at `amount`, if any.
    pub fn active_tier(&self, amount: Decimal) -> Option<&DiscountTier> {
        self.discount_tiers
            .iter()
            .filter(|t| t.min_amount <= amount)
            .max_by(|a, b| a.min_amount.cmp(&b.min_amount))
    }

    /// Unit price in effect at `amount`.
    pub fn unit_price_at(&self, amount: Decimal) -> Money {
        self.active_tier(amount)
            .map(|t| t.unit_price)
            .unwrap_or(self.unit_price)
    }

    /// Prices an arbitrary amount.
    ///
    /// Amounts up to `self.amount` cost `base_price`; every unit beyond is
    /// charged at the unit price of the tier reached by the full amount.
    pub fn quote(&self, amount: Decimal) -> Money {
        let extra = amount.saturating_sub(self.amount);
        if extra <= Decimal::ZERO {
            return self.base_price;
        }
        self.base_price + self.unit_price_at(amount) * extra
    }

    /// Days needed to deliver `amount` at the drip minimum, rounded up.
    pub fn drip_days(&self, amount: Decimal) -> Option<Decimal> {
        let per_day = self.drip_min_per_day.filter(|d| *d > Decimal::ZERO)?;
        amount.checked_div(per_day).map(|days| days.ceil())
    }
}

/// Reduced unit price from a minimum amount upward.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DiscountTier {
    #[ts(type = "string")]
    pub min_amount: Decimal,
    pub unit_price: Money,
    #[serde(default)]
    pub label: String,
}

// =============================================================================
// Add-ons
// =============================================================================

/// How an add-on's customer price is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum AddOnPricingMode {
    /// Fixed delta.
    #[default]
    Flat,
    /// Multiplier on the running subtotal.
    Percentage,
    /// Fulfilled by an external provider; price resolved from the service
    /// descriptor and margin-checked against provider cost.
    ServiceOverride,
}

/// An optional extra that can be toggled on top of the options.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AddOn {
    pub id: String,
    pub label: String,

    #[serde(default)]
    pub price_delta: Money,

    #[serde(default)]
    pub pricing_mode: AddOnPricingMode,

    /// Delta precomputed by admin tooling.
    #[serde(default)]
    #[ts(optional)]
    pub computed_delta: Option<Money>,

    /// Fraction of the running subtotal (`0.15` = 15 %).
    #[serde(default)]
    #[ts(type = "string | null")]
    pub percentage_multiplier: Option<Decimal>,

    #[serde(default)]
    #[ts(optional)]
    pub service: Option<ServiceDescriptor>,

    #[serde(default)]
    #[ts(optional)]
    pub editor_key: Option<String>,
}

// =============================================================================
// Subscription Plans
// =============================================================================

/// Billing cadence of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum BillingCycle {
    #[default]
    OneTime,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

/// A subscription plan. At most one is selected.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SubscriptionPlan {
    pub id: String,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub billing_cycle: BillingCycle,

    #[serde(default)]
    #[ts(optional)]
    pub price_delta: Option<Money>,

    /// Applied after `price_delta`, then rounded to a whole unit.
    #[serde(default)]
    #[ts(type = "string | null")]
    pub price_multiplier: Option<Decimal>,

    #[serde(default, rename = "default")]
    pub is_default: bool,

    #[serde(default)]
    #[ts(optional)]
    pub editor_key: Option<String>,
}

// =============================================================================
// Custom Fields
// =============================================================================

/// Input type of a custom field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum FieldType {
    #[default]
    Text,
    Url,
    Number,
}

/// Declarative rule set for one custom field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FieldValidation {
    #[serde(default)]
    #[ts(optional)]
    pub min_length: Option<usize>,

    #[serde(default)]
    #[ts(optional)]
    pub max_length: Option<usize>,

    #[serde(default)]
    pub disallow_whitespace: bool,

    /// Regular expression, unanchored.
    #[serde(default)]
    #[ts(optional)]
    pub pattern: Option<String>,

    /// Message shown instead of the generic one on pattern mismatch.
    #[serde(default)]
    #[ts(optional)]
    pub pattern_message: Option<String>,

    #[serde(default)]
    pub allowed_values: Vec<String>,

    #[serde(default)]
    #[ts(optional)]
    pub numeric_min: Option<f64>,

    #[serde(default)]
    #[ts(optional)]
    pub numeric_max: Option<f64>,

    #[serde(default)]
    #[ts(optional)]
    pub numeric_step: Option<f64>,
}

/// A free-form input collected alongside the configuration.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomField {
    pub id: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub validation: FieldValidation,

    #[serde(default)]
    #[ts(optional)]
    pub default_value: Option<String>,

    #[serde(default)]
    #[ts(optional)]
    pub visibility: Option<ConditionalVisibility>,

    #[serde(default)]
    #[ts(optional)]
    pub editor_key: Option<String>,
}

impl CustomField {
    /// Label for messages, falling back to the id.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.id
        } else {
            &self.label
        }
    }

    /// The declared default, ignoring blank defaults.
    pub fn default_value(&self) -> Option<&str> {
        self.default_value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
    }
}

/// How a field's conditions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum VisibilityMode {
    /// Every condition must hold.
    #[default]
    All,
    /// At least one condition must hold.
    Any,
}

/// Conditional visibility rules for a custom field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ConditionalVisibility {
    #[serde(default)]
    pub mode: VisibilityMode,

    #[serde(default)]
    pub conditions: Vec<VisibilityCondition>,
}

/// One visibility condition. References accept a live id, a stable editor
/// key, or both (the id wins when both are given).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[ts(export)]
pub enum VisibilityCondition {
    #[serde(rename_all = "camelCase")]
    Option {
        #[serde(default)]
        #[ts(optional)]
        option_id: Option<String>,
        #[serde(default)]
        #[ts(optional)]
        option_key: Option<String>,
        #[serde(default)]
        #[ts(optional)]
        group_id: Option<String>,
        #[serde(default)]
        #[ts(optional)]
        group_key: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    AddOn {
        #[serde(default)]
        #[ts(optional)]
        add_on_id: Option<String>,
        #[serde(default)]
        #[ts(optional)]
        add_on_key: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    SubscriptionPlan {
        #[serde(default)]
        #[ts(optional)]
        plan_id: Option<String>,
        #[serde(default)]
        #[ts(optional)]
        plan_key: Option<String>,
    },
    Channel { channel: String },
}

// =============================================================================
// Presets
// =============================================================================

/// A named, catalog-authored selection.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ConfiguratorPreset {
    pub id: String,
    pub label: String,
    pub selection: SelectionSnapshot,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn followers_pricing() -> StructuredPricing {
        StructuredPricing {
            amount: dec!(1000),
            amount_unit: "followers".to_string(),
            base_price: Money::from_major(10),
            unit_price: Money::new(dec!(0.01)),
            discount_tiers: vec![
                DiscountTier {
                    min_amount: dec!(2000),
                    unit_price: Money::new(dec!(0.008)),
                    label: "2k+".to_string(),
                },
                DiscountTier {
                    min_amount: dec!(5000),
                    unit_price: Money::new(dec!(0.006)),
                    label: "5k+".to_string(),
                },
            ],
            drip_min_per_day: Some(dec!(300)),
        }
    }

    #[test]
    fn test_active_tier_picks_largest_reached_minimum() {
        let pricing = followers_pricing();
        assert!(pricing.active_tier(dec!(1500)).is_none());
        assert_eq!(pricing.active_tier(dec!(2500)).unwrap().label, "2k+");
        assert_eq!(pricing.active_tier(dec!(9000)).unwrap().label, "5k+");
    }

    #[test]
    fn test_quote() {
        let pricing = followers_pricing();
        assert_eq!(pricing.quote(dec!(800)), Money::from_major(10));
        // 500 extra units at the base unit price
        assert_eq!(pricing.quote(dec!(1500)), Money::new(dec!(15)));
        // 1500 extra units at the 2k+ tier price
        assert_eq!(pricing.quote(dec!(2500)), Money::new(dec!(22)));
    }

    #[test]
    fn test_drip_days_rounds_up() {
        let pricing = followers_pricing();
        assert_eq!(pricing.drip_days(dec!(1000)), Some(dec!(4)));

        let no_drip = StructuredPricing {
            drip_min_per_day: None,
            ..followers_pricing()
        };
        assert_eq!(no_drip.drip_days(dec!(1000)), None);
    }

    #[test]
    fn test_group_default_option() {
        let group: OptionGroup = serde_json::from_str(
            r#"{
                "id": "tier", "name": "Tier", "type": "single",
                "options": [
                    {"id": "a", "label": "A"},
                    {"id": "b", "label": "B", "recommended": true}
                ]
            }"#,
        )
        .unwrap();
        assert!(group.is_single());
        assert_eq!(group.default_option().unwrap().id, "b");
    }

    #[test]
    fn test_catalog_validate_rejects_duplicates() {
        let catalog = Catalog::from_json_str(
            r#"{
                "basePrice": 100, "currency": "EUR",
                "addOns": [
                    {"id": "x", "label": "X"},
                    {"id": "x", "label": "X again"}
                ]
            }"#,
        )
        .unwrap();
        let err = catalog.validate().unwrap_err();
        assert_eq!(err.to_string(), "Duplicate add-on id: x");
    }

    #[test]
    fn test_catalog_validate_rejects_bad_currency() {
        let catalog = Catalog::from_json_str(r#"{"basePrice": 100, "currency": "EURO"}"#).unwrap();
        assert!(matches!(
            catalog.validate(),
            Err(CoreError::InvalidCurrency(_))
        ));
    }

    #[test]
    fn test_visibility_condition_deserializes_tagged() {
        let cond: VisibilityCondition =
            serde_json::from_str(r#"{"kind": "addOn", "addOnKey": "rush"}"#).unwrap();
        assert!(matches!(
            cond,
            VisibilityCondition::AddOn { add_on_key: Some(ref k), .. } if k == "rush"
        ));
    }

    #[test]
    fn test_field_display_label_falls_back_to_id() {
        let field: CustomField =
            serde_json::from_str(r#"{"id": "handle", "type": "text"}"#).unwrap();
        assert_eq!(field.display_label(), "handle");
        assert_eq!(field.field_type, FieldType::Text);
    }
}
