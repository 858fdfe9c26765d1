//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely, plus the
//! pt-BR formatting helpers used by receipts, exports and reports.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer centavos                                         │
//! │    R$ 10,50 is stored as 1050                                           │
//! │    Division rounds explicitly, never silently                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pdv_core::money::Money;
//!
//! let price = Money::from_cents(1050);
//! let total = price * 3;
//! assert_eq!(total.to_string(), "R$ 31,50");
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos.
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values show up in balances and refunds
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// Product.price_cents ──► CartLine.unit_price ──► CartLine.line_total
///                                                     │
/// Cart.subtotal ──► discount ──► Cart.total ──► Sale.total_cents
///                                                     │
///                                Reports, CSV, receipts ◄┘
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// let price = Money::from_cents(1050); // R$ 10,50
    /// assert_eq!(price.cents(), 1050);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from reais and centavos.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -R$ 5,50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole reais portion.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavos portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the larger of `self` and zero.
    ///
    /// Totals are clamped with this so a discount never produces a
    /// negative amount due.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies money by a quantity, saturating at the `i64` bounds.
    ///
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Returns `bps` basis points of this amount, rounded half away from
    /// zero (1000 bps = 10%).
    ///
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// // 12,5% of R$ 10,00 = R$ 1,25
    /// assert_eq!(Money::from_cents(1000).percentage_of(1250).cents(), 125);
    /// // 10% of R$ 0,05 = 0,5 centavo → 1 centavo
    /// assert_eq!(Money::from_cents(5).percentage_of(1000).cents(), 1);
    /// ```
    pub fn percentage_of(&self, bps: u32) -> Money {
        // i128 keeps large totals from overflowing during the multiply
        Money(div_round(self.0 as i128 * bps as i128, 10_000) as i64)
    }

    /// Applies a percentage discount, returning the discounted amount.
    ///
    /// ```rust
    /// use pdv_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(10000);
    /// assert_eq!(subtotal.apply_percentage_discount(1000).cents(), 9000);
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        *self - self.percentage_of(discount_bps)
    }

    /// Divides and rounds half away from zero.
    ///
    /// Used to derive a unit cost from a total purchase cost. Returns zero
    /// when `divisor` is zero.
    pub fn divide_rounded(&self, divisor: i64) -> Money {
        if divisor == 0 {
            return Money::zero();
        }
        Money(div_round(self.0 as i128, divisor as i128) as i64)
    }
}

/// Integer division rounded half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let negative = (numerator < 0) != (denominator < 0);
    let (n, d) = (numerator.abs(), denominator.abs());
    let q = (n + d / 2) / d;
    if negative {
        -q
    } else {
        q
    }
}

// =============================================================================
// Display (pt-BR currency)
// =============================================================================

/// Formats as Brazilian reais: `R$ 1.234,56`, `-R$ 10,50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let reais = group_thousands(self.0.unsigned_abs() / 100);
        write!(f, "{}R$ {},{:02}", sign, reais, self.cents_part())
    }
}

/// Inserts `.` every three digits from the right.
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Formats an amount without the currency symbol (`1.234,56`), as used in
/// spreadsheet cells.
pub fn format_decimal_br(money: Money) -> String {
    let sign = if money.is_negative() { "-" } else { "" };
    format!(
        "{}{},{:02}",
        sign,
        group_thousands(money.cents().unsigned_abs() / 100),
        money.cents_part()
    )
}

/// Formats a calendar date as `dd/mm/yyyy`.
///
/// ```rust
/// use chrono::NaiveDate;
/// use pdv_core::money::format_date_br;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// assert_eq!(format_date_br(date), "15/01/2024");
/// ```
pub fn format_date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Share of `value` in `total` as a whole percentage, rounded to nearest.
///
/// Returns 0 when `total` is zero.
///
/// ```rust
/// use pdv_core::money::calculate_percentage;
///
/// assert_eq!(calculate_percentage(1, 3), 33);
/// assert_eq!(calculate_percentage(2, 3), 67);
/// assert_eq!(calculate_percentage(5, 0), 0);
/// ```
pub fn calculate_percentage(value: i64, total: i64) -> i64 {
    if total == 0 {
        return 0;
    }
    div_round(value as i128 * 100, total as i128) as i64
}

// =============================================================================
// Operator Implementations
// =============================================================================

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, qty: i64) -> Money {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.reais(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display_brl() {
        assert_eq!(Money::from_cents(1050).to_string(), "R$ 10,50");
        assert_eq!(Money::from_cents(100_000).to_string(), "R$ 1.000,00");
        assert_eq!(Money::from_cents(123_456_789).to_string(), "R$ 1.234.567,89");
        assert_eq!(Money::from_cents(-1050).to_string(), "-R$ 10,50");
        assert_eq!(Money::from_cents(0).to_string(), "R$ 0,00");
        assert_eq!(Money::from_cents(5).to_string(), "R$ 0,05");
    }

    #[test]
    fn test_format_decimal_br() {
        assert_eq!(format_decimal_br(Money::from_cents(123_456)), "1.234,56");
        assert_eq!(format_decimal_br(Money::from_cents(-99)), "-0,99");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_percentage_discount() {
        let subtotal = Money::from_cents(10000);
        assert_eq!(subtotal.apply_percentage_discount(1000).cents(), 9000);
        // 33,33% of R$ 10,00 = 333,3 → 333
        assert_eq!(Money::from_cents(1000).percentage_of(3333).cents(), 333);
    }

    #[test]
    fn test_multiply_quantity_saturates() {
        assert_eq!(Money::from_cents(299).multiply_quantity(3).cents(), 897);
        assert_eq!(Money::from_cents(i64::MAX / 2).multiply_quantity(3).cents(), i64::MAX);
        assert_eq!(Money::from_cents(i64::MIN / 2).multiply_quantity(3).cents(), i64::MIN);
    }

    #[test]
    fn test_divide_rounded() {
        assert_eq!(Money::from_cents(1000).divide_rounded(3).cents(), 333);
        assert_eq!(Money::from_cents(1000).divide_rounded(6).cents(), 167);
        assert_eq!(Money::from_cents(-1000).divide_rounded(6).cents(), -167);
        assert_eq!(Money::from_cents(1000).divide_rounded(0).cents(), 0);
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_cents(-10).clamp_non_negative(), Money::zero());
        assert_eq!(Money::from_cents(10).clamp_non_negative().cents(), 10);
    }

    #[test]
    fn test_calculate_percentage() {
        assert_eq!(calculate_percentage(50, 100), 50);
        assert_eq!(calculate_percentage(1, 3), 33);
        assert_eq!(calculate_percentage(2, 3), 67);
        assert_eq!(calculate_percentage(10, 0), 0);
    }

    #[test]
    fn test_format_date_br() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 5).unwrap();
        assert_eq!(format_date_br(date), "05/12/2024");
    }
}
