//! # FX Conversion
//!
//! Currency conversion for provider costs quoted in a currency other than
//! the storefront's.
//!
//! ## Rate Lookup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rates[FROM][TO] = how many TO one FROM buys                            │
//! │                                                                         │
//! │   USD ──► { EUR: 0.92, GBP: 0.79 }                                      │
//! │   EUR ──► { USD: 1.09 }                                                 │
//! │                                                                         │
//! │  convert(10 USD → EUR) = 10 × 0.92 = 9.20 EUR                           │
//! │  convert(10 GBP → EUR) = None  (no GBP row: caller withholds margin)    │
//! │                                                                         │
//! │  Both directions are authored separately. EUR→USD is never derived as  │
//! │  1 / rates[USD][EUR]; spreads make them differ on purpose.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The table is an explicit input. There is no built-in default table: a host
//! that wants margins evaluated must configure one.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// Currency → currency → rate table. Codes are stored uppercase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(from = "BTreeMap<String, BTreeMap<String, Decimal>>")]
#[serde(into = "BTreeMap<String, BTreeMap<String, Decimal>>")]
#[ts(export)]
pub struct FxTable(
    #[ts(type = "Record<string, Record<string, string>>")] BTreeMap<String, BTreeMap<String, Decimal>>,
);

impl FxTable {
    /// Creates an empty table. Only same-currency conversion succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one directed rate.
    pub fn insert(&mut self, from: &str, to: &str, rate: Decimal) {
        self.0
            .entry(normalize_currency(from))
            .or_default()
            .insert(normalize_currency(to), rate);
    }

    /// Builder-style [`FxTable::insert`].
    pub fn with_rate(mut self, from: &str, to: &str, rate: Decimal) -> Self {
        self.insert(from, to, rate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|row| row.is_empty())
    }

    /// Iterates every directed rate as `(from, to, rate)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Decimal)> {
        self.0.iter().flat_map(|(from, row)| {
            row.iter()
                .map(move |(to, rate)| (from.as_str(), to.as_str(), *rate))
        })
    }

    /// Directed rate lookup, case-insensitive. Same currency is always 1.
    pub fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        if same_currency(from, to) {
            return Some(Decimal::ONE);
        }
        self.0
            .get(&normalize_currency(from))
            .and_then(|row| row.get(&normalize_currency(to)))
            .copied()
    }

    /// Converts `amount` from one currency into another.
    ///
    /// Returns `None` when no directed rate exists.
    pub fn convert(&self, amount: Money, from: &str, to: &str) -> Option<Money> {
        let rate = self.rate(from, to);
        if rate.is_none() {
            tracing::debug!(from, to, "no FX rate for currency pair");
        }
        rate.map(|r| amount.scale(r))
    }
}

impl From<BTreeMap<String, BTreeMap<String, Decimal>>> for FxTable {
    fn from(raw: BTreeMap<String, BTreeMap<String, Decimal>>) -> Self {
        let mut table = FxTable::new();
        for (from, row) in raw {
            for (to, rate) in row {
                table.insert(&from, &to, rate);
            }
        }
        table
    }
}

impl From<FxTable> for BTreeMap<String, BTreeMap<String, Decimal>> {
    fn from(table: FxTable) -> Self {
        table.0
    }
}

/// Uppercases and trims a currency code.
pub fn normalize_currency(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Case-insensitive currency comparison.
pub fn same_currency(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

// =============================================================================
// Unit Tests
// =============================================================================
