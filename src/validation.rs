//! Field checks shared by the teacher auth handlers and the auth form client.

use bigdecimal::{BigDecimal, Zero};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{10}$").expect("phone regex is valid"));

/// Largest magnitude a `NUMERIC(12,2)` column holds.
static MONEY_LIMIT: Lazy<BigDecimal> =
    Lazy::new(|| "9999999999.99".parse().expect("money limit is a valid decimal"));

/// Exponent window checked before any arithmetic. A non-zero value outside
/// it is either far above `MONEY_LIMIT` or far below a cent.
const MONEY_SCALES: std::ops::RangeInclusive<i64> = -10..=18;

/// Basic `local@domain.tld` shape.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Exactly ten ASCII digits.
pub fn is_valid_phone(tel_num: &str) -> bool {
    PHONE_RE.is_match(tel_num)
}

/// Present and non-empty.
pub fn truthy_text(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

/// Outcome of reading a numeric form field that must be present and
/// non-zero.
#[derive(Debug, PartialEq)]
pub enum Numeric<T> {
    Missing,
    Invalid,
    OutOfRange,
    Value(T),
}

/// `value` if it fits a `NUMERIC(12,2)` column. Zero is returned in its
/// plain form whatever exponent it was written with.
pub fn money(value: BigDecimal) -> Option<BigDecimal> {
    if value.is_zero() {
        return Some(BigDecimal::zero());
    }
    let (_, scale) = value.as_bigint_and_exponent();
    if !MONEY_SCALES.contains(&scale) || value.abs() > *MONEY_LIMIT {
        return None;
    }
    Some(value)
}

pub fn truthy_integer(value: Option<&str>) -> Numeric<i32> {
    match truthy_text(value) {
        None => Numeric::Missing,
        Some(text) => match text.trim().parse::<i32>() {
            Ok(0) => Numeric::Missing,
            Ok(number) => Numeric::Value(number),
            Err(_) => Numeric::Invalid,
        },
    }
}

pub fn truthy_decimal(value: Option<&str>) -> Numeric<BigDecimal> {
    match truthy_text(value) {
        None => Numeric::Missing,
        Some(text) => match text.trim().parse::<BigDecimal>() {
            Ok(number) if number.is_zero() => Numeric::Missing,
            Ok(number) => match money(number) {
                Some(number) => Numeric::Value(number),
                None => Numeric::OutOfRange,
            },
            Err(_) => Numeric::Invalid,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@school.edu.lk"));
        assert!(!is_valid_email("bad"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@@b.com"));
    }

    #[test]
    fn phone_is_ten_ascii_digits() {
        assert!(is_valid_phone("0771234567"));
        assert!(!is_valid_phone("077123456"));
        assert!(!is_valid_phone("07712345678"));
        assert!(!is_valid_phone("07712345a7"));
        assert!(!is_valid_phone("٠٧٧١٢٣٤٥٦٧"));
    }

    #[test]
    fn zero_and_empty_are_missing() {
        assert_eq!(truthy_integer(Some("0")), Numeric::Missing);
        assert_eq!(truthy_integer(Some("")), Numeric::Missing);
        assert_eq!(truthy_integer(None), Numeric::Missing);
        assert_eq!(truthy_integer(Some("12")), Numeric::Value(12));
        assert_eq!(truthy_integer(Some("1.5")), Numeric::Invalid);

        assert_eq!(truthy_decimal(Some("0.00")), Numeric::Missing);
        assert_eq!(truthy_decimal(Some("abc")), Numeric::Invalid);
        assert_eq!(
            truthy_decimal(Some("12.50")),
            Numeric::Value(BigDecimal::from_str("12.5").unwrap())
        );
    }

    #[test]
    fn decimals_outside_the_money_column_are_out_of_range() {
        for text in [
            "1e9223372036854775807",
            "1e-9223372036854775807",
            "1e40",
            "10000000000",
            "-10000000000",
            "0.0000000000000000001",
        ] {
            assert_eq!(truthy_decimal(Some(text)), Numeric::OutOfRange, "{text}");
        }

        let largest = BigDecimal::from_str("9999999999.99").unwrap();
        assert_eq!(money(largest.clone()), Some(largest));
        assert_eq!(
            truthy_decimal(Some("-12.345")),
            Numeric::Value(BigDecimal::from_str("-12.345").unwrap())
        );
        assert_eq!(
            money(BigDecimal::from_str("0e-30").unwrap()),
            Some(BigDecimal::zero())
        );
    }
}
