//! Money parsing and arithmetic.
//!
//! Every money and quantity value is a `rust_decimal::Decimal`; binary floats never touch
//! an amount. Rounding is half-up (midpoint away from zero) to two fractional digits.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Number of fractional digits stored for money, quantity and rate columns.
pub const MONEY_SCALE: u32 = 2;

/// Largest value a `NUMERIC(10,2)` money or quantity column holds.
pub const MAX_MONEY: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, 2);

/// Currency markers accepted around user-entered numbers.
///
/// Multi-character markers come first so that `A$`, `C$` and `CN¥` are removed whole
/// instead of leaving a stray `A`, `C` or `CN` behind once `$` / `¥` are gone.
pub const CURRENCY_SYMBOLS: [&str; 9] = ["CN¥", "CHF", "A$", "C$", "$", "₹", "€", "£", "¥"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("{0:?} is not a valid amount")]
    InvalidAmount(String),
    #[error("amount out of range")]
    Overflow,
}

/// Removes every currency marker from `raw`. Thousands separators are left alone.
pub fn strip_currency(raw: &str) -> String {
    CURRENCY_SYMBOLS
        .iter()
        .fold(raw.to_string(), |acc, sym| acc.replace(sym, ""))
}

lazy_static! {
    // sign, digits, optional fraction; no separators or exponents
    static ref PLAIN_DECIMAL: Regex =
        Regex::new(r"^[+-]?[0-9]+(\.[0-9]+)?$").expect("valid decimal regex");
}

/// Strips currency markers and parses what is left as a plain decimal literal.
pub fn parse_amount(raw: &str) -> Result<Decimal, MoneyError> {
    let stripped = strip_currency(raw);
    let trimmed = stripped.trim();
    if !PLAIN_DECIMAL.is_match(trimmed) {
        return Err(MoneyError::InvalidAmount(raw.to_string()));
    }
    Decimal::from_str(trimmed).map_err(|_| MoneyError::InvalidAmount(raw.to_string()))
}

/// True when `value` fits a money column: at most [`MAX_MONEY`] in magnitude.
pub fn within_money_bounds(value: Decimal) -> bool {
    value.abs() <= MAX_MONEY
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// True when `value` carries no more fractional digits than a money column holds.
pub fn fits_money_scale(value: Decimal) -> bool {
    value.normalize().scale() <= MONEY_SCALE
}

/// `quantity * price`, rounded to cents.
pub fn line_amount(quantity: Decimal, price: Decimal) -> Result<Decimal, MoneyError> {
    quantity
        .checked_mul(price)
        .map(round_money)
        .ok_or(MoneyError::Overflow)
}

/// `subtotal * rate / 100`, rounded to cents.
pub fn tax_amount(subtotal: Decimal, rate_percent: Decimal) -> Result<Decimal, MoneyError> {
    subtotal
        .checked_mul(rate_percent)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .map(round_money)
        .ok_or(MoneyError::Overflow)
}
