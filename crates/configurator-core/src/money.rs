//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Decimal Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Configurator totals chain percentages and multipliers:                 │
//! │    1000 + 7% add-on + plan ×3 → every step compounds float error       │
//! │                                                                         │
//! │  OUR SOLUTION: Exact base-10 decimals                                   │
//! │    Intermediate values keep every digit (1070.00 × 3 = 3210.00)         │
//! │    Rounding happens ONCE, at the plan multiplier step                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use configurator_core::money::Money;
//!
//! let base = Money::from_major(1000);
//! let total = base + Money::from_major(200);
//! assert_eq!(total, Money::from_major(1200));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in major currency units (e.g. euros, not cents).
///
/// ## Design Decisions
/// - **Decimal (signed)**: negative deltas are legal (a cheaper sibling option)
/// - **No currency tag**: a session works in exactly one storefront currency;
///   provider costs in other currencies go through [`crate::fx::FxTable`]
///   before they are ever compared against a `Money` in storefront currency
/// - **Serde**: accepts JSON numbers or strings, serializes as a string so no
///   digit is lost on the way to the front end
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Catalog.base_price ──┬──► option deltas ──► add-on deltas ──► plan     │
/// │                       │                                         │       │
/// │                       │                              round_to_unit()    │
/// │                       │                                         ▼       │
/// │                       └────────────────────────────────► total          │
/// │                                                                         │
/// │  ServiceDescriptor.provider_cost ──► FxTable ──► margin vs. delta       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(#[ts(type = "string")] Decimal);

impl Money {
    /// Creates a Money value from a decimal amount in major units.
    #[inline]
    pub const fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    /// Creates a Money value from a whole number of major units.
    ///
    /// ## Example
    /// ```rust
    /// use configurator_core::money::Money;
    ///
    /// let price = Money::from_major(1500);
    /// assert_eq!(price.amount().to_string(), "1500");
    /// ```
    #[inline]
    pub fn from_major(units: i64) -> Self {
        Money(Decimal::from(units))
    }

    /// Returns the underlying decimal amount.
    #[inline]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Scales the amount by a factor without rounding.
    ///
    /// Used for percentage add-ons (factor `0.15` = 15 %), FX conversion and
    /// plan multipliers. The result keeps full precision; callers decide if
    /// and when to round. Saturates at `Decimal::MAX`/`MIN`.
    #[inline]
    pub fn scale(&self, factor: Decimal) -> Money {
        Money(self.0.saturating_mul(factor))
    }

    /// Rounds to the nearest whole currency unit, halves away from zero.
    ///
    /// ## Rounding Point
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  running total 1234.50 ──► + plan delta ──► × multiplier           │
    /// │                                                  │                  │
    /// │                                          round_to_unit() ◄── ONLY   │
    /// │                                                  │          HERE    │
    /// │                                                  ▼                  │
    /// │                                               total                 │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use configurator_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let raw = Money::new(Decimal::new(10005, 1)); // 1000.5
    /// assert_eq!(raw.round_to_unit(), Money::from_major(1001));
    /// ```
    pub fn round_to_unit(&self) -> Money {
        Money(
            self.0
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Ratio of `self` to `whole` as a percentage (`25` = 25 %).
    ///
    /// Returns `None` when `whole` is zero.
    pub fn percent_of(&self, whole: Money) -> Option<Decimal> {
        if whole.is_zero() {
            return None;
        }
        self.0
            .checked_div(whole.0)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================
// Arithmetic saturates at the `Decimal` bounds instead of panicking.

/// Display shows the normalized decimal amount (`1250`, `12.5`).
///
/// ## Note
/// This is for debugging and logs. Currency symbols and locale formatting
/// belong to the front end.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Money(amount)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a decimal quantity (unit price × amount).
impl Mul<Decimal> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: Decimal) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_major() {
        let money = Money::from_major(1099);
        assert_eq!(money.amount(), dec!(1099));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_major(1250)), "1250");
        assert_eq!(format!("{}", Money::new(dec!(12.50))), "12.5");
        assert_eq!(format!("{}", Money::new(dec!(-5.25))), "-5.25");
        assert_eq!(format!("{}", Money::zero()), "0");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_major(1000);
        let b = Money::from_major(500);

        assert_eq!((a + b).amount(), dec!(1500));
        assert_eq!((a - b).amount(), dec!(500));
        assert_eq!((a * dec!(3)).amount(), dec!(3000));
        assert_eq!((-b).amount(), dec!(-500));
    }

    #[test]
    fn test_scale_keeps_precision() {
        let subtotal = Money::from_major(1234);
        let fee = subtotal.scale(dec!(0.07));
        assert_eq!(fee.amount(), dec!(86.38));
    }

    #[test]
    fn test_round_to_unit_midpoint_away_from_zero() {
        assert_eq!(Money::new(dec!(1000.5)).round_to_unit(), Money::from_major(1001));
        assert_eq!(Money::new(dec!(1000.49)).round_to_unit(), Money::from_major(1000));
        assert_eq!(Money::new(dec!(-2.5)).round_to_unit(), Money::from_major(-3));
    }

    #[test]
    fn test_percent_of() {
        let margin = Money::from_major(25);
        assert_eq!(margin.percent_of(Money::from_major(100)), Some(dec!(25)));
        assert_eq!(margin.percent_of(Money::zero()), None);
    }

    #[test]
    fn test_extreme_amounts_saturate() {
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge + Money::from_major(1), huge);
        assert_eq!(huge.scale(dec!(1000)), huge);
        assert_eq!(Money::new(Decimal::MIN) - Money::from_major(1), Money::new(Decimal::MIN));
        assert_eq!(huge.percent_of(Money::new(dec!(0.0001))), None);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_major(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs(), Money::from_major(100));
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_major(200), Money::from_major(100)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_major(1300) - Money::from_major(1000));
    }

    #[test]
    fn test_deserialize_from_number_and_string() {
        let from_number: Money = serde_json::from_str("1500").unwrap();
        let from_string: Money = serde_json::from_str("\"1500\"").unwrap();
        assert_eq!(from_number, from_string);

        let fractional: Money = serde_json::from_str("0.15").unwrap();
        assert_eq!(fractional.amount(), dec!(0.15));
    }
}
