//! # configurator-core: Pure Product Configuration & Pricing Engine
//!
//! Takes a catalog (option groups, add-ons, plans, custom fields, presets)
//! and a shopper's in-progress selection and derives, deterministically,
//! everything a product page needs to show.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Configurator Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │         Hosts: storefront page, admin preview, CLI              │   │
//! │  │   fetch catalog ──► session ──► render ──► persist snapshot     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ actions / DerivedState                 │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ configurator-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ selection │  │  pricing  │  │  margin   │  │visibility │  │   │
//! │  │   │ seed      │  │  deltas   │  │  fx       │  │editor_keys│  │   │
//! │  │   │ sanitize  │  │  plan ×   │  │  guardrail│  │validation │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │  presets  │  │expression │  │  session  │                  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog types (OptionGroup, AddOn, SubscriptionPlan, ...)
//! - [`money`] - Decimal money type
//! - [`fx`] - Directed currency rate table
//! - [`margin`] - Provider cost, margin and channel advisories
//! - [`pricing`] - Total and price breakdown
//! - [`selection`] - Selection seeding, sanitization and mutation
//! - [`editor_keys`] - Stable editor key → live id index
//! - [`visibility`] - Conditional field visibility
//! - [`validation`] - Custom field validation
//! - [`presets`] - Preset reconciliation
//! - [`expression`] - Restricted calculator expressions
//! - [`session`] - The recomputation cascade
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same catalog, context and selection = same output
//! 2. **No I/O**: fetching, persistence and rendering belong to hosts
//! 3. **Decimal Money**: exact arithmetic, one rounding point (plan multiplier)
//! 4. **Degrade, Don't Throw**: bad catalog data becomes data (idle margins,
//!    dropped ids, passing patterns), never a failed action
//!
//! ## Example Usage
//!
//! ```rust
//! use configurator_core::{Catalog, ConfiguratorSession, Money, PricingContext};
//!
//! let catalog = Catalog::from_json_str(r#"{
//!     "basePrice": 1000,
//!     "currency": "EUR",
//!     "optionGroups": [{
//!         "id": "extras", "name": "Extras", "type": "multiple",
//!         "options": [
//!             {"id": "gift", "label": "Gift wrap", "priceDelta": 200},
//!             {"id": "card", "label": "Card", "priceDelta": 100}
//!         ]
//!     }]
//! }"#).unwrap();
//!
//! let mut session = ConfiguratorSession::new(catalog, PricingContext::default());
//! session.toggle_option("extras", "gift");
//! let state = session.toggle_option("extras", "card");
//!
//! assert_eq!(state.total, Money::from_major(1300));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod editor_keys;
pub mod error;
pub mod expression;
pub mod fx;
pub mod margin;
pub mod money;
pub mod presets;
pub mod pricing;
pub mod selection;
pub mod session;
pub mod types;
pub mod validation;
pub mod visibility;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use configurator_core::Money` instead of
// `use configurator_core::money::Money`

pub use error::{CoreError, CoreResult, ExpressionError, FieldError};
pub use fx::FxTable;
pub use margin::{ChannelAdvisory, MarginEvaluation, MarginStatus};
pub use money::Money;
pub use selection::{Selection, SelectionSnapshot};
pub use session::{ConfiguratorSession, DerivedState, PricingContext};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tolerance for numeric step alignment of custom field values.
///
/// ## Why an epsilon?
/// Field values are typed text parsed as `f64`. `0.3 % 0.1` is
/// `0.09999999999999998`, not `0`, so alignment accepts remainders within
/// this distance of either `0` or the step itself.
pub const STEP_EPSILON: f64 = 1e-6;

/// Longest calculator expression accepted, in characters.
pub const MAX_EXPRESSION_LEN: usize = 256;

/// Deepest parenthesis / unary nesting accepted in a calculator expression.
pub const MAX_EXPRESSION_DEPTH: usize = 32;
