//! Turkish lira amounts and the price normalizer.
//!
//! The basket gateway returns prices as loosely formatted strings: the
//! currency glyph may be missing, whitespace is arbitrary and thousands are
//! grouped with dots (`"₺1.250,00"`, `"1250,00"`, `" 1.250,00 ₺"`). Every
//! price shown to a user goes through [`normalize_price`] so that it ends up
//! in the canonical `₺<int>,<2dp>` format.
//!
//! Thousands-separator dots are stripped *before* the decimal comma is
//! converted. Doing it the other way round turns `"1.000,00"` into
//! `"1.000.00"` and the amount comes out a hundred times too small.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul};
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Currency glyph prefixed to every canonical price.
pub const CURRENCY_GLYPH: char = '₺';

/// Errors that can occur when strictly parsing a [`Money`] value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input was empty after stripping the glyph and whitespace.
    #[error("price cannot be empty")]
    Empty,
    /// The input is not a recognizable amount.
    #[error("malformed price: {0:?}")]
    Malformed(String),
}

/// A non-negative amount of Turkish lira.
///
/// The amount keeps full decimal precision; rounding to two places only
/// happens in [`Money::display`]. That way a line total derived from a
/// divided unit price (`1.000,00 / 3 × 3`) still displays as `₺1.000,00`.
///
/// ```
/// use pinbazaar_core::Money;
///
/// let price = Money::parse("₺1.250,50").unwrap();
/// assert_eq!(price.display(), "₺1.250,50");
/// assert_eq!(Money::parse("1250,5").unwrap(), price);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// The zero amount, also used as the sentinel for unparseable prices.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest amount accepted from the gateway (one quadrillion lira).
    ///
    /// Anything above this is treated as malformed. Arithmetic on accepted
    /// amounts saturates instead of overflowing.
    pub const LIMIT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

    /// Create a money value from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Returns the zero amount.
    #[must_use]
    pub const fn zero() -> Self {
        Self::ZERO
    }

    /// Returns the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Accept a gateway amount if it is non-negative and within [`Self::LIMIT`].
    #[must_use]
    pub fn bounded(amount: Decimal) -> Option<Self> {
        (!amount.is_sign_negative() && amount <= Self::LIMIT).then_some(Self(amount))
    }

    /// Returns `true` if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strictly parse a loosely formatted lira price.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Empty`] if nothing remains after stripping the
    /// glyph and whitespace, or [`MoneyError::Malformed`] if the remainder is
    /// not a non-negative decimal amount no larger than [`Self::LIMIT`].
    pub fn parse(raw: &str) -> Result<Self, MoneyError> {
        let stripped: String = raw
            .chars()
            .filter(|c| *c != CURRENCY_GLYPH && !c.is_whitespace())
            .collect();

        if stripped.is_empty() {
            return Err(MoneyError::Empty);
        }

        // Dots are thousands separators, the comma is the decimal mark.
        let numeric = stripped.replace('.', "").replace(',', ".");

        let well_formed = !numeric.is_empty()
            && numeric.chars().all(|c| c.is_ascii_digit() || c == '.')
            && numeric.matches('.').count() <= 1
            && numeric.chars().any(|c| c.is_ascii_digit());
        if !well_formed {
            return Err(MoneyError::Malformed(raw.to_owned()));
        }

        Decimal::from_str(&numeric)
            .ok()
            .and_then(Self::bounded)
            .ok_or_else(|| MoneyError::Malformed(raw.to_owned()))
    }

    /// Leniently parse a price, substituting zero for anything unparseable.
    ///
    /// Empty input is zero as well. Use [`normalize_price`] when the caller
    /// needs to know whether the sentinel was substituted.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        Self::parse(raw).unwrap_or(Self::ZERO)
    }

    /// Format as a canonical price string, e.g. `₺12.345,60`.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let plain = format!("{:.2}", rounded.abs());
        let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, digit) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }

        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        format!("{sign}{CURRENCY_GLYPH}{grouped},{frac_part}")
    }

    /// Multiply by a quantity, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(
            self.0
                .checked_mul(Decimal::from(quantity))
                .unwrap_or(Decimal::MAX),
        )
    }

    /// Divide evenly across `parts`, keeping full precision.
    ///
    /// Dividing by zero returns the amount unchanged.
    #[must_use]
    pub fn split(self, parts: u32) -> Self {
        if parts == 0 {
            return self;
        }
        Self(self.0 / Decimal::from(parts))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.checked_add(rhs.0).unwrap_or(Decimal::MAX))
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        self.times(rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Output of the price normalizer: canonical display string plus amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPrice {
    /// Canonical display string (`₺<int>,<2dp>`).
    pub display: String,
    /// Parsed amount; zero when the input was malformed.
    pub amount: Money,
    /// `true` when the input could not be parsed and zero was substituted.
    pub malformed: bool,
}

/// Normalize a raw price string. Never fails.
///
/// Missing or empty input is treated as zero without being flagged as
/// malformed. Anything else that fails to parse is replaced by the zero
/// sentinel and flagged so the caller can log it.
///
/// ```
/// use pinbazaar_core::normalize_price;
///
/// assert_eq!(normalize_price(Some("1.000,00")).display, "₺1.000,00");
/// assert_eq!(normalize_price(None).display, "₺0,00");
/// assert!(normalize_price(Some("call us")).malformed);
/// ```
#[must_use]
pub fn normalize_price(raw: Option<&str>) -> NormalizedPrice {
    let (amount, malformed) = match raw.map(Money::parse) {
        None | Some(Err(MoneyError::Empty)) => (Money::ZERO, false),
        Some(Ok(amount)) => (amount, false),
        Some(Err(MoneyError::Malformed(_))) => (Money::ZERO, true),
    };

    NormalizedPrice {
        display: amount.display(),
        amount,
        malformed,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_limit_is_one_quadrillion() {
        assert_eq!(Money::LIMIT, dec!(1000000000000000));
    }

    #[test]
    fn test_parse_rejects_amount_above_limit() {
        let huge = "₺79.228.162.514.264.337.593.543.950.335";
        assert!(matches!(Money::parse(huge), Err(MoneyError::Malformed(_))));

        let normalized = normalize_price(Some(huge));
        assert!(normalized.malformed);
        assert_eq!(normalized.amount, Money::ZERO);

        assert_eq!(
            Money::parse("1.000.000.000.000.000").unwrap().amount(),
            Money::LIMIT
        );
        assert!(Money::parse("1.000.000.000.000.000,01").is_err());
    }

    #[test]
    fn test_bounded() {
        assert_eq!(Money::bounded(dec!(12.5)), Some(Money::new(dec!(12.5))));
        assert_eq!(Money::bounded(dec!(-1)), None);
        assert_eq!(Money::bounded(Decimal::MAX), None);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let max = Money::new(Decimal::MAX);
        assert_eq!(max.times(2).amount(), Decimal::MAX);
        assert_eq!((max + Money::new(dec!(1))).amount(), Decimal::MAX);
        let total: Money = [max, max, Money::new(dec!(5))].iter().sum();
        assert_eq!(total.amount(), Decimal::MAX);
    }

    #[test]
    fn test_parse_canonical() {
        assert_eq!(Money::parse("₺1.000,00").unwrap().amount(), dec!(1000));
        assert_eq!(Money::parse("₺360,00").unwrap().amount(), dec!(360));
    }

    #[test]
    fn test_parse_without_glyph_and_with_whitespace() {
        assert_eq!(Money::parse(" 1.250,75 ").unwrap().amount(), dec!(1250.75));
        assert_eq!(Money::parse("1 250,75 ₺").unwrap().amount(), dec!(1250.75));
        assert_eq!(Money::parse("₺\u{a0}99,90").unwrap().amount(), dec!(99.90));
    }

    #[test]
    fn test_parse_strips_thousands_before_decimal_comma() {
        // Converting the comma first would yield 1.00000 instead of 1,000,000.
        assert_eq!(
            Money::parse("1.000.000,00").unwrap().amount(),
            dec!(1000000)
        );
    }

    #[test]
    fn test_parse_integer_amount() {
        assert_eq!(Money::parse("45").unwrap().amount(), dec!(45));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Money::parse(""), Err(MoneyError::Empty));
        assert_eq!(Money::parse("  ₺ "), Err(MoneyError::Empty));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(Money::parse("abc"), Err(MoneyError::Malformed(_))));
        assert!(matches!(Money::parse("-5,00"), Err(MoneyError::Malformed(_))));
        assert!(matches!(Money::parse("1,2,3"), Err(MoneyError::Malformed(_))));
        assert!(matches!(Money::parse("1_000"), Err(MoneyError::Malformed(_))));
        assert!(matches!(Money::parse(",."), Err(MoneyError::Malformed(_))));
    }

    #[test]
    fn test_display_grouping() {
        assert_eq!(Money::new(dec!(0)).display(), "₺0,00");
        assert_eq!(Money::new(dec!(5)).display(), "₺5,00");
        assert_eq!(Money::new(dec!(999.9)).display(), "₺999,90");
        assert_eq!(Money::new(dec!(1000)).display(), "₺1.000,00");
        assert_eq!(Money::new(dec!(123456.78)).display(), "₺123.456,78");
        assert_eq!(Money::new(dec!(1234567)).display(), "₺1.234.567,00");
    }

    #[test]
    fn test_display_rounds_half_away_from_zero() {
        assert_eq!(Money::new(dec!(0.005)).display(), "₺0,01");
        assert_eq!(Money::new(dec!(10.004)).display(), "₺10,00");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            "₺1.000,00",
            "1000,00",
            " 1 000,00 ",
            "₺ 12.345,6",
            "0,5",
            "₺7",
            "1.234.567,89",
        ];
        for input in inputs {
            let once = normalize_price(Some(input)).display;
            let twice = normalize_price(Some(&once)).display;
            assert_eq!(once, twice, "normalizing {input:?} twice changed it");
        }
    }

    #[test]
    fn test_normalize_missing_and_malformed() {
        let missing = normalize_price(None);
        assert_eq!(missing.display, "₺0,00");
        assert!(!missing.malformed);

        let empty = normalize_price(Some(""));
        assert_eq!(empty.amount, Money::ZERO);
        assert!(!empty.malformed);

        let garbage = normalize_price(Some("N/A"));
        assert_eq!(garbage.display, "₺0,00");
        assert!(garbage.malformed);
    }

    #[test]
    fn test_arithmetic() {
        let unit = Money::parse("₺120,00").unwrap();
        assert_eq!((unit * 3).display(), "₺360,00");
        assert_eq!(Money::parse("₺1.000,00").unwrap().split(3).times(3).display(), "₺1.000,00");
        assert_eq!(unit.split(0), unit);

        let total: Money = [unit, unit].iter().sum();
        assert_eq!(total.display(), "₺240,00");
    }
}
