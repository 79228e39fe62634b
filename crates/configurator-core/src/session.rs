//! # Configurator Session
//!
//! One shopper's configurator: a catalog snapshot, the pricing context, the
//! live selection and the derived state emitted after every action.
//!
//! ## Recomputation Cascade
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  user action (toggle / select / set / apply preset / rehydrate)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Selection mutated                                                      │
//! │       │                                                                 │
//! │       ├──► 1. pricing::calculate          total + breakdown             │
//! │       ├──► 2. margin::evaluate_add_on     health per serviceOverride    │
//! │       ├──► 3. visibility::is_visible      visible fields, defaults      │
//! │       ├──► 4. FieldValidator::validate    errors for visible fields     │
//! │       ├──► 5. PresetMatcher               presetId                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DerivedState ──► listener (host callback)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every step runs from scratch on every action. Nothing derived survives a
//! mutation, so a caller can never observe a stale total or error list.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::editor_keys::EditorKeyIndex;
use crate::expression::{Bindings, CalculatorExpression};
use crate::fx::FxTable;
use crate::margin::{evaluate_add_on, resolve_service_amount, MarginContext, MarginEvaluation};
use crate::money::Money;
use crate::presets::PresetMatcher;
use crate::pricing::{self, PriceLine};
use crate::selection::{Selection, SelectionSnapshot};
use crate::types::{AddOnPricingMode, Catalog, GroupType};
use crate::validation::FieldValidator;
use crate::visibility::{is_visible, VisibilityContext};

// =============================================================================
// Inputs
// =============================================================================

/// Host-supplied inputs that are not part of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricingContext {
    /// Required for margin evaluation across currencies. An empty table
    /// leaves every cross-currency margin idle.
    pub fx_rates: FxTable,

    /// Hosting surface, e.g. `"storefront"` or `"admin"`.
    #[serde(default)]
    #[ts(optional)]
    pub active_channel: Option<String>,
}

/// Everything derived once per catalog: the catalog itself, its editor-key
/// index, compiled field rules and sanitized preset projections.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    catalog: Arc<Catalog>,
    keys: EditorKeyIndex,
    validator: FieldValidator,
    presets: PresetMatcher,
}

impl CatalogSnapshot {
    pub fn new(catalog: impl Into<Arc<Catalog>>) -> Self {
        let catalog = catalog.into();
        CatalogSnapshot {
            keys: EditorKeyIndex::build(&catalog),
            validator: FieldValidator::new(&catalog),
            presets: PresetMatcher::new(&catalog),
            catalog,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn keys(&self) -> &EditorKeyIndex {
        &self.keys
    }
}

// =============================================================================
// Output
// =============================================================================

/// Result of a calculator expression on a selected option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CalculatorPreview {
    pub group_id: String,
    pub option_id: String,
    pub expression: String,
    #[ts(type = "string")]
    pub value: Decimal,
}

/// Everything emitted to the host after a recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DerivedState {
    pub total: Money,
    pub currency: String,
    pub breakdown: Vec<PriceLine>,

    /// Group id → selected option ids, catalog order.
    pub selected_options: BTreeMap<String, Vec<String>>,
    pub selected_add_ons: Vec<String>,
    #[ts(optional)]
    pub selected_plan_id: Option<String>,

    /// Values of visible fields only.
    pub custom_fields: BTreeMap<String, String>,
    pub visible_fields: Vec<String>,

    /// Field id → message. Visible fields only.
    pub errors: BTreeMap<String, String>,

    pub add_on_health: Vec<MarginEvaluation>,

    #[ts(optional)]
    pub preset_id: Option<String>,

    pub calculator_previews: Vec<CalculatorPreview>,

    /// Required `multiple` groups with nothing selected.
    pub incomplete_groups: Vec<String>,
}

impl DerivedState {
    /// True when no visible field has an error.
    pub fn is_submittable(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn health_of(&self, add_on_id: &str) -> Option<&MarginEvaluation> {
        self.add_on_health.iter().find(|h| h.add_on_id == add_on_id)
    }
}

type Listener = Box<dyn FnMut(&DerivedState) + Send>;

// =============================================================================
// Session
// =============================================================================

/// A configurator session.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product page opens                                                     │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  ConfiguratorSession::new / ::rehydrate (saved cart item)               │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  Shopper clicks ──► toggle_option / toggle_add_on / select_plan /       │
/// │                     set_field_value / apply_preset                      │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  derived() ──► price, health badges, visible inputs, errors, preset     │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  "Add to cart" enabled when derived().is_submittable()                  │
/// │  "Save" persists to_snapshot()                                          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub struct ConfiguratorSession {
    snapshot: CatalogSnapshot,
    context: PricingContext,
    selection: Selection,
    /// Fields visible after the previous recomputation.
    visible: BTreeSet<String>,
    derived: DerivedState,
    listener: Option<Listener>,
}

impl fmt::Debug for ConfiguratorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfiguratorSession")
            .field("selection", &self.selection)
            .field("context", &self.context)
            .field("derived", &self.derived)
            .finish_non_exhaustive()
    }
}

impl ConfiguratorSession {
    /// Starts a session from catalog defaults.
    pub fn new(catalog: impl Into<Arc<Catalog>>, context: PricingContext) -> Self {
        let snapshot = CatalogSnapshot::new(catalog);
        let selection = Selection::seed(snapshot.catalog());
        Self::start(snapshot, context, selection)
    }

    /// Starts a session from a saved or externally supplied selection.
    pub fn rehydrate(
        catalog: impl Into<Arc<Catalog>>,
        context: PricingContext,
        initial: &SelectionSnapshot,
    ) -> Self {
        let snapshot = CatalogSnapshot::new(catalog);
        let selection = Selection::sanitize(snapshot.catalog(), initial);
        Self::start(snapshot, context, selection)
    }

    fn start(snapshot: CatalogSnapshot, context: PricingContext, selection: Selection) -> Self {
        let currency = snapshot.catalog().currency.clone();
        let mut session = ConfiguratorSession {
            snapshot,
            context,
            selection,
            visible: BTreeSet::new(),
            derived: DerivedState::empty(currency),
            listener: None,
        };
        session.recompute();
        session
    }

    /// Registers a callback invoked with every emitted state, starting with
    /// the current one.
    pub fn with_listener(mut self, listener: impl FnMut(&DerivedState) + Send + 'static) -> Self {
        let mut listener: Listener = Box::new(listener);
        listener(&self.derived);
        self.listener = Some(listener);
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn derived(&self) -> &DerivedState {
        &self.derived
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn catalog(&self) -> &Catalog {
        self.snapshot.catalog()
    }

    pub fn context(&self) -> &PricingContext {
        &self.context
    }

    /// The "save configuration" projection of the current selection.
    pub fn to_snapshot(&self) -> SelectionSnapshot {
        self.selection.to_snapshot()
    }

    // =========================================================================
    // Actions
    // =========================================================================

    pub fn toggle_option(&mut self, group_id: &str, option_id: &str) -> &DerivedState {
        self.selection
            .toggle_option(self.snapshot.catalog(), group_id, option_id);
        self.recompute()
    }

    pub fn toggle_add_on(&mut self, add_on_id: &str) -> &DerivedState {
        self.selection
            .toggle_add_on(self.snapshot.catalog(), add_on_id);
        self.recompute()
    }

    pub fn select_plan(&mut self, plan_id: Option<&str>) -> &DerivedState {
        self.selection
            .select_plan(self.snapshot.catalog(), plan_id);
        self.recompute()
    }

    pub fn set_field_value(&mut self, field_id: &str, value: &str) -> &DerivedState {
        self.selection
            .set_field_value(self.snapshot.catalog(), field_id, value);
        self.recompute()
    }

    /// Replaces the selection with a sanitized preset. Unknown ids are ignored.
    pub fn apply_preset(&mut self, preset_id: &str) -> &DerivedState {
        match self.snapshot.catalog().preset(preset_id) {
            Some(preset) => {
                self.selection = Selection::sanitize(self.snapshot.catalog(), &preset.selection);
            }
            None => tracing::debug!(preset = %preset_id, "apply ignored: unknown preset"),
        }
        self.recompute()
    }

    /// Replaces the selection with a sanitized external snapshot.
    pub fn load_snapshot(&mut self, incoming: &SelectionSnapshot) -> &DerivedState {
        self.selection = Selection::sanitize(self.snapshot.catalog(), incoming);
        self.recompute()
    }

    pub fn set_active_channel(&mut self, channel: Option<String>) -> &DerivedState {
        self.context.active_channel = channel.filter(|c| !c.trim().is_empty());
        self.recompute()
    }

    /// Swaps in a new catalog snapshot and re-sanitizes the selection
    /// against it.
    pub fn replace_catalog(&mut self, catalog: impl Into<Arc<Catalog>>) -> &DerivedState {
        let carried = self.selection.to_snapshot();
        self.snapshot = CatalogSnapshot::new(catalog);
        self.selection = Selection::sanitize(self.snapshot.catalog(), &carried);
        self.derived.currency = self.snapshot.catalog().currency.clone();
        self.recompute()
    }

    // =========================================================================
    // Recomputation
    // =========================================================================

    fn recompute(&mut self) -> &DerivedState {
        let _span = tracing::debug_span!("recompute").entered();

        let catalog = Arc::clone(&self.snapshot.catalog);
        let channel = self.context.active_channel.as_deref();

        // 1. pricing
        let breakdown = pricing::calculate(&catalog, &self.selection, channel);

        // 2. margins, read-only against the total
        let margin_ctx = MarginContext {
            storefront_currency: &catalog.currency,
            fx: &self.context.fx_rates,
            active_channel: channel,
        };
        let add_on_health: Vec<MarginEvaluation> = catalog
            .add_ons
            .iter()
            .filter(|a| a.pricing_mode == AddOnPricingMode::ServiceOverride)
            .map(|a| evaluate_add_on(a, resolve_service_amount(a, channel), &margin_ctx))
            .collect();

        // 3. visibility; newly shown empty fields take their default
        let mut now_visible = BTreeSet::new();
        for field in &catalog.custom_fields {
            let ctx = VisibilityContext {
                selection: &self.selection,
                keys: &self.snapshot.keys,
                active_channel: channel,
            };
            if is_visible(field, &ctx) {
                now_visible.insert(field.id.clone());
            }
        }
        for field in &catalog.custom_fields {
            let newly_shown = now_visible.contains(&field.id) && !self.visible.contains(&field.id);
            if newly_shown && self.selection.field_value(&field.id).is_none() {
                if let Some(default) = field.default_value() {
                    self.selection
                        .custom_fields
                        .insert(field.id.clone(), default.to_string());
                }
            }
        }

        // 4. validation of visible fields
        let mut errors = BTreeMap::new();
        let mut custom_fields = BTreeMap::new();
        let mut visible_fields = Vec::new();
        for field in catalog
            .custom_fields
            .iter()
            .filter(|f| now_visible.contains(&f.id))
        {
            visible_fields.push(field.id.clone());
            let value = self.selection.field_value(&field.id);
            if let Some(v) = value {
                custom_fields.insert(field.id.clone(), v.to_string());
            }
            if let Err(err) = self.snapshot.validator.validate(field, value) {
                errors.insert(field.id.clone(), err.to_string());
            }
        }

        // 5. preset reconciliation
        self.selection.preset_id = self.snapshot.presets.match_selection(&catalog, &self.selection);

        self.visible = now_visible;
        self.derived = DerivedState {
            total: breakdown.total,
            currency: catalog.currency.clone(),
            breakdown: breakdown.lines,
            selected_options: selected_options(&catalog, &self.selection),
            selected_add_ons: catalog
                .add_ons
                .iter()
                .filter(|a| self.selection.is_add_on_selected(&a.id))
                .map(|a| a.id.clone())
                .collect(),
            selected_plan_id: self.selection.plan_id.clone(),
            custom_fields,
            visible_fields,
            errors,
            add_on_health,
            preset_id: self.selection.preset_id.clone(),
            calculator_previews: calculator_previews(&catalog, &self.selection),
            incomplete_groups: incomplete_groups(&catalog, &self.selection),
        };

        tracing::debug!(
            total = %self.derived.total,
            errors = self.derived.errors.len(),
            preset = ?self.derived.preset_id,
            "derived state emitted"
        );

        if let Some(listener) = self.listener.as_mut() {
            listener(&self.derived);
        }
        &self.derived
    }
}

impl DerivedState {
    fn empty(currency: String) -> Self {
        DerivedState {
            total: Money::zero(),
            currency,
            breakdown: Vec::new(),
            selected_options: BTreeMap::new(),
            selected_add_ons: Vec::new(),
            selected_plan_id: None,
            custom_fields: BTreeMap::new(),
            visible_fields: Vec::new(),
            errors: BTreeMap::new(),
            add_on_health: Vec::new(),
            preset_id: None,
            calculator_previews: Vec::new(),
            incomplete_groups: Vec::new(),
        }
    }
}

fn selected_options(catalog: &Catalog, selection: &Selection) -> BTreeMap<String, Vec<String>> {
    catalog
        .option_groups
        .iter()
        .map(|group| {
            let ids = group
                .options
                .iter()
                .filter(|o| selection.is_option_selected(&o.id, Some(&group.id)))
                .map(|o| o.id.clone())
                .collect();
            (group.id.clone(), ids)
        })
        .collect()
}

fn incomplete_groups(catalog: &Catalog, selection: &Selection) -> Vec<String> {
    catalog
        .option_groups
        .iter()
        .filter(|g| g.group_type == GroupType::Multiple && g.required)
        .filter(|g| selection.options.get(&g.id).map_or(true, |ids| ids.is_empty()))
        .map(|g| g.id.clone())
        .collect()
}

fn calculator_previews(catalog: &Catalog, selection: &Selection) -> Vec<CalculatorPreview> {
    let mut previews = Vec::new();
    for group in &catalog.option_groups {
        for option in group
            .options
            .iter()
            .filter(|o| selection.is_option_selected(&o.id, Some(&group.id)))
        {
            let Some(source) = option.calculator_expression() else {
                continue;
            };
            let structured = option.structured_pricing.as_ref();
            let amount = structured.map_or(Decimal::ONE, |s| s.amount);
            let bindings = Bindings {
                amount,
                days: structured
                    .and_then(|s| s.drip_days(amount))
                    .unwrap_or(Decimal::ONE),
            };

            match CalculatorExpression::parse(source).and_then(|expr| expr.evaluate(&bindings)) {
                Ok(value) => previews.push(CalculatorPreview {
                    group_id: group.id.clone(),
                    option_id: option.id.clone(),
                    expression: source.to_string(),
                    value,
                }),
                Err(err) => tracing::debug!(
                    option = %option.id,
                    expression = %source,
                    error = %err,
                    "calculator preview dropped"
                ),
            }
        }
    }
    previews
}

// =============================================================================
// Unit Tests
// =============================================================================
