//! # Margin Evaluation
//!
//! Health check for `serviceOverride` add-ons: what the customer pays versus
//! what the fulfillment provider charges, in one currency.
//!
//! ## Evaluation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Per serviceOverride add-on                          │
//! │                                                                         │
//! │  provider cost ── explicit amount? ──yes──► cost                        │
//! │                        │ no                                             │
//! │                        ▼                                                │
//! │                  cost model @ preview qty (explicit → model default     │
//! │                                            inputs → 1)                  │
//! │                        │                                                │
//! │  provider currency: override → model → guardrail → service → storefront │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  FxTable::convert ── no rate ──► requiresConversion, status IDLE        │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  margin = customer delta − converted cost, percent = margin / delta     │
//! │                        │                                                │
//! │                        ▼                                                │
//! │  guardrails (normalized to storefront) ──► PASS | WARN | FAIL           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Channel advisories ride along but never change the price or block a
//! selection.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::fx::{normalize_currency, same_currency, FxTable};
use crate::money::Money;
use crate::types::AddOn;

/// Default warn band above the minimum margin percent, in percentage points.
pub const DEFAULT_WARN_BUFFER_PERCENT: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

// =============================================================================
// Service Descriptor
// =============================================================================

/// Provider-side definition of a service-backed add-on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ServiceDescriptor {
    #[serde(default)]
    #[ts(optional)]
    pub provider_id: Option<String>,

    #[serde(default)]
    #[ts(optional)]
    pub service_id: Option<String>,

    /// Currency the provider bills in when nothing more specific says so.
    #[serde(default)]
    #[ts(optional)]
    pub default_currency: Option<String>,

    /// Known provider charge; wins over the cost model.
    #[serde(default)]
    #[ts(optional)]
    pub provider_cost: Option<ProviderCost>,

    #[serde(default)]
    #[ts(optional)]
    pub cost_model: Option<ProviderCostModel>,

    /// Quantity used to estimate cost from the model.
    #[serde(default)]
    #[ts(type = "string | null")]
    pub preview_quantity: Option<Decimal>,

    #[serde(default)]
    #[ts(optional)]
    pub guardrails: Option<Guardrails>,

    #[serde(default)]
    pub overrides: Vec<ChannelOverrideRule>,
}

impl ServiceDescriptor {
    fn identity(&self, rule: &ChannelOverrideRule) -> String {
        let provider = rule
            .provider_id
            .as_deref()
            .or(self.provider_id.as_deref())
            .unwrap_or("-");
        let service = rule
            .service_id
            .as_deref()
            .or(self.service_id.as_deref())
            .unwrap_or("-");
        format!("{provider}/{service}")
    }

    /// Rules that apply to `active_channel`, in authored order.
    pub fn matching_rules<'a>(
        &'a self,
        active_channel: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ChannelOverrideRule> + 'a {
        self.overrides
            .iter()
            .filter(move |rule| rule.matches(active_channel))
    }
}

/// An explicit provider charge.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProviderCost {
    pub amount: Money,

    /// Explicit currency; outranks every other currency source.
    #[serde(default)]
    #[ts(optional)]
    pub currency: Option<String>,
}

/// Formula used to estimate a provider charge.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProviderCostModel {
    #[serde(default)]
    #[ts(optional)]
    pub currency: Option<String>,

    pub formula: CostFormula,

    #[serde(default)]
    #[ts(optional)]
    pub default_inputs: Option<CostModelInputs>,
}

impl ProviderCostModel {
    /// Estimated charge at `quantity`.
    pub fn estimate(&self, quantity: Decimal) -> Money {
        self.formula.cost_at(quantity)
    }
}

/// Quantity fallbacks declared by the cost model itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CostModelInputs {
    #[serde(default)]
    #[ts(type = "string | null")]
    pub quantity: Option<Decimal>,

    #[serde(default)]
    #[ts(type = "string | null")]
    pub duration: Option<Decimal>,
}

/// Cost formula shapes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[ts(export)]
pub enum CostFormula {
    /// Fixed charge regardless of quantity.
    Flat { amount: Money },

    /// `unit_cost × quantity`, never below `minimum_charge`.
    #[serde(rename_all = "camelCase")]
    PerUnit {
        unit_cost: Money,
        #[serde(default)]
        #[ts(optional)]
        minimum_charge: Option<Money>,
    },

    /// Graduated bands: each band prices the units that fall inside it.
    Tiered { bands: Vec<CostBand> },
}

impl CostFormula {
    pub fn cost_at(&self, quantity: Decimal) -> Money {
        let quantity = quantity.max(Decimal::ZERO);
        match self {
            CostFormula::Flat { amount } => *amount,
            CostFormula::PerUnit {
                unit_cost,
                minimum_charge,
            } => {
                let cost = *unit_cost * quantity;
                match minimum_charge {
                    Some(min) if cost < *min => *min,
                    _ => cost,
                }
            }
            CostFormula::Tiered { bands } => {
                let mut remaining = quantity;
                let mut floor = Decimal::ZERO;
                let mut cost = Money::zero();
                for band in bands {
                    if remaining <= Decimal::ZERO {
                        break;
                    }
                    let units = match band.up_to {
                        Some(ceiling) => remaining.min(ceiling.saturating_sub(floor).max(Decimal::ZERO)),
                        None => remaining,
                    };
                    cost += band.unit_cost * units;
                    remaining = remaining.saturating_sub(units);
                    if let Some(ceiling) = band.up_to {
                        floor = ceiling;
                    }
                }
                cost
            }
        }
    }
}

/// One graduated cost band. `up_to = None` is the open-ended last band.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CostBand {
    #[serde(default)]
    #[ts(type = "string | null")]
    pub up_to: Option<Decimal>,
    pub unit_cost: Money,
}

/// Minimum acceptable margin.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Guardrails {
    #[serde(default)]
    #[ts(type = "string | null")]
    pub minimum_margin_percent: Option<Decimal>,

    /// Expressed in `currency` (else the storefront currency).
    #[serde(default)]
    #[ts(optional)]
    pub minimum_margin_absolute: Option<Money>,

    #[serde(default)]
    #[ts(optional)]
    pub currency: Option<String>,

    /// Percentage points above the minimum that still count as `warn`.
    #[serde(default)]
    #[ts(type = "string | null")]
    pub warn_buffer_percent: Option<Decimal>,
}

/// A channel-scoped override of the provider binding or price.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChannelOverrideRule {
    #[serde(default)]
    #[ts(optional)]
    pub id: Option<String>,

    /// Channels the rule is limited to. Empty = every channel.
    #[serde(default)]
    pub channels: Vec<String>,

    #[serde(default)]
    #[ts(optional)]
    pub provider_id: Option<String>,

    #[serde(default)]
    #[ts(optional)]
    pub service_id: Option<String>,

    /// Customer price charged when this rule applies.
    #[serde(default)]
    #[ts(optional)]
    pub price_override: Option<Money>,

    #[serde(default)]
    #[ts(optional)]
    pub provider_cost: Option<ProviderCost>,
}

impl ChannelOverrideRule {
    pub fn declares_channels(&self) -> bool {
        !self.channels.is_empty()
    }

    pub fn matches(&self, active_channel: Option<&str>) -> bool {
        if !self.declares_channels() {
            return true;
        }
        match active_channel {
            Some(active) => self
                .channels
                .iter()
                .any(|c| c.trim().eq_ignore_ascii_case(active.trim())),
            None => false,
        }
    }
}

// =============================================================================
// Evaluation Output
// =============================================================================

/// Guardrail classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum MarginStatus {
    Pass,
    Warn,
    Fail,
    /// Not evaluated: no provider cost, or a currency could not be converted.
    Idle,
}

/// Advisory signal about channel override rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[ts(export)]
pub enum ChannelAdvisory {
    /// Rules are channel-scoped and none covers the active channel.
    UnsupportedForChannel { channel: String },
    /// Several matching rules bind different provider/service identities.
    AmbiguousOverride { identities: Vec<String> },
}

impl ChannelAdvisory {
    pub fn message(&self) -> String {
        match self {
            ChannelAdvisory::UnsupportedForChannel { channel } => {
                format!("Unsupported for channel '{channel}'")
            }
            ChannelAdvisory::AmbiguousOverride { identities } => format!(
                "Ambiguous override ({}) - manual review required",
                identities.join(", ")
            ),
        }
    }
}

/// Margin health of one add-on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MarginEvaluation {
    pub add_on_id: String,

    /// What the customer pays for the add-on, storefront currency.
    pub customer_delta: Money,

    /// Provider charge in `provider_currency`.
    pub provider_cost: Option<Money>,

    pub provider_currency: String,

    /// Provider charge in storefront currency.
    pub converted_cost: Option<Money>,

    pub margin_value: Option<Money>,

    #[ts(type = "string | null")]
    pub margin_percent: Option<Decimal>,

    pub status: MarginStatus,

    pub requires_conversion: bool,

    pub advisories: Vec<ChannelAdvisory>,
}

/// Inputs shared by every evaluation in one recomputation.
#[derive(Debug, Clone, Copy)]
pub struct MarginContext<'a> {
    pub storefront_currency: &'a str,
    pub fx: &'a FxTable,
    pub active_channel: Option<&'a str>,
}

// =============================================================================
// Resolution
// =============================================================================

/// Customer amount of a `serviceOverride` add-on.
///
/// First matching channel rule's price override, else the precomputed
/// delta, else the flat delta.
pub fn resolve_service_amount(add_on: &AddOn, active_channel: Option<&str>) -> Money {
    let rule_price = add_on
        .service
        .as_ref()
        .and_then(|s| s.matching_rules(active_channel).find_map(|r| r.price_override));

    rule_price
        .or(add_on.computed_delta)
        .unwrap_or(add_on.price_delta)
}

/// Quantity the cost model is evaluated at.
pub fn preview_quantity(service: &ServiceDescriptor) -> Decimal {
    service
        .preview_quantity
        .or_else(|| {
            service
                .cost_model
                .as_ref()
                .and_then(|m| m.default_inputs.as_ref())
                .and_then(|inputs| inputs.quantity.or(inputs.duration))
        })
        .unwrap_or(Decimal::ONE)
}

/// Provider charge and the explicit currency attached to it, if any.
fn resolve_provider_cost(
    service: &ServiceDescriptor,
    active_channel: Option<&str>,
) -> (Option<Money>, Option<String>) {
    let explicit = service
        .matching_rules(active_channel)
        .find_map(|r| r.provider_cost.as_ref())
        .or(service.provider_cost.as_ref());

    if let Some(cost) = explicit {
        return (Some(cost.amount), cost.currency.clone());
    }

    let estimated = service
        .cost_model
        .as_ref()
        .map(|model| model.estimate(preview_quantity(service)));
    (estimated, None)
}

/// Provider currency by priority, falling back to the storefront currency.
pub fn resolve_provider_currency(
    service: &ServiceDescriptor,
    override_currency: Option<&str>,
    storefront_currency: &str,
) -> String {
    let candidates = [
        override_currency,
        service.cost_model.as_ref().and_then(|m| m.currency.as_deref()),
        service.guardrails.as_ref().and_then(|g| g.currency.as_deref()),
        service.default_currency.as_deref(),
    ];

    candidates
        .into_iter()
        .flatten()
        .find(|c| !c.trim().is_empty())
        .map(normalize_currency)
        .unwrap_or_else(|| normalize_currency(storefront_currency))
}

/// Channel advisories for one service descriptor.
pub fn detect_channel_conflicts(
    service: &ServiceDescriptor,
    active_channel: Option<&str>,
) -> Vec<ChannelAdvisory> {
    let mut advisories = Vec::new();

    if let Some(channel) = active_channel {
        let scoped: Vec<&ChannelOverrideRule> = service
            .overrides
            .iter()
            .filter(|r| r.declares_channels())
            .collect();
        if !scoped.is_empty() && !scoped.iter().any(|r| r.matches(Some(channel))) {
            advisories.push(ChannelAdvisory::UnsupportedForChannel {
                channel: channel.to_string(),
            });
        }
    }

    let identities: BTreeSet<String> = service
        .matching_rules(active_channel)
        .map(|rule| service.identity(rule))
        .collect();
    if identities.len() > 1 {
        advisories.push(ChannelAdvisory::AmbiguousOverride {
            identities: identities.into_iter().collect(),
        });
    }

    advisories
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluates margin health for a `serviceOverride` add-on.
///
/// `customer_delta` is the amount the pricing pass charges for the add-on.
/// Never fails: anything that cannot be evaluated honestly is `Idle`.
pub fn evaluate_add_on(
    add_on: &AddOn,
    customer_delta: Money,
    ctx: &MarginContext<'_>,
) -> MarginEvaluation {
    let service = add_on.service.clone().unwrap_or_default();
    let advisories = detect_channel_conflicts(&service, ctx.active_channel);

    let (provider_cost, override_currency) = resolve_provider_cost(&service, ctx.active_channel);
    let provider_currency = resolve_provider_currency(
        &service,
        override_currency.as_deref(),
        ctx.storefront_currency,
    );

    let mut evaluation = MarginEvaluation {
        add_on_id: add_on.id.clone(),
        customer_delta,
        provider_cost,
        provider_currency: provider_currency.clone(),
        converted_cost: None,
        margin_value: None,
        margin_percent: None,
        status: MarginStatus::Idle,
        requires_conversion: false,
        advisories,
    };

    let Some(cost) = provider_cost else {
        return evaluation;
    };

    let Some(converted) = ctx
        .fx
        .convert(cost, &provider_currency, ctx.storefront_currency)
    else {
        tracing::debug!(
            add_on = %add_on.id,
            from = %provider_currency,
            to = %ctx.storefront_currency,
            "margin withheld: provider cost needs conversion"
        );
        evaluation.requires_conversion = true;
        return evaluation;
    };

    let margin = customer_delta - converted;
    let percent = margin.percent_of(customer_delta);
    evaluation.converted_cost = Some(converted);
    evaluation.margin_value = Some(margin);
    evaluation.margin_percent = percent;

    match classify(margin, percent, service.guardrails.as_ref(), ctx) {
        Some(status) => evaluation.status = status,
        None => evaluation.requires_conversion = true,
    }

    evaluation
}

/// Classifies a resolved margin. `None` means the absolute guardrail could
/// not be normalized into the storefront currency.
fn classify(
    margin: Money,
    percent: Option<Decimal>,
    guardrails: Option<&Guardrails>,
    ctx: &MarginContext<'_>,
) -> Option<MarginStatus> {
    if margin.is_negative() {
        return Some(MarginStatus::Fail);
    }

    let Some(guardrails) = guardrails else {
        return Some(MarginStatus::Pass);
    };

    let minimum_absolute = match guardrails.minimum_margin_absolute {
        Some(min) => {
            let currency = guardrails
                .currency
                .as_deref()
                .unwrap_or(ctx.storefront_currency);
            if same_currency(currency, ctx.storefront_currency) {
                Some(min)
            } else {
                Some(ctx.fx.convert(min, currency, ctx.storefront_currency)?)
            }
        }
        None => None,
    };

    if let Some(min) = minimum_absolute {
        if margin < min {
            return Some(MarginStatus::Fail);
        }
    }

    if let (Some(min_percent), Some(percent)) = (guardrails.minimum_margin_percent, percent) {
        if percent < min_percent {
            return Some(MarginStatus::Fail);
        }
        let buffer = guardrails
            .warn_buffer_percent
            .unwrap_or(DEFAULT_WARN_BUFFER_PERCENT);
        if percent < min_percent + buffer {
            return Some(MarginStatus::Warn);
        }
    }

    Some(MarginStatus::Pass)
}

// =============================================================================
// Unit Tests
// =============================================================================
