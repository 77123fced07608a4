use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

pub const CENT: Decimal = dec!(0.01);

/// Rounding convention for currency amounts written to the worksheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rounding {
    /// 0.125 -> 0.13
    #[default]
    HalfUp,
    /// 0.125 -> 0.12
    HalfEven,
}

impl Rounding {
    fn strategy(self) -> RoundingStrategy {
        match self {
            Rounding::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            Rounding::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }

    /// Round to currency precision, always carrying 2 decimal places
    pub fn to_cents(self, amount: Decimal) -> Decimal {
        let mut cents = amount.round_dp_with_strategy(2, self.strategy());
        cents.rescale(2);
        cents
    }
}

/// Parse a tax rate given either as a fraction (`0.0725`) or a percentage (`7.25%`)
pub fn parse_rate(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    match s.strip_suffix('%') {
        Some(pct) => Decimal::from_str(pct.trim()).ok().map(|r| r / dec!(100)),
        None => Decimal::from_str(s).ok(),
    }
}

pub fn deserialize_rate<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_rate(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid tax rate '{s}'"))),
    }
}

pub fn format_usd(amount: Decimal) -> String {
    if amount < Decimal::ZERO {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_conventions_differ_on_midpoints() {
        assert_eq!(Rounding::HalfUp.to_cents(dec!(10.125)), dec!(10.13));
        assert_eq!(Rounding::HalfEven.to_cents(dec!(10.125)), dec!(10.12));
        assert_eq!(Rounding::HalfUp.to_cents(dec!(10.135)), dec!(10.14));
        assert_eq!(Rounding::HalfEven.to_cents(dec!(10.135)), dec!(10.14));
        assert_eq!(Rounding::HalfUp.to_cents(dec!(20)).to_string(), "20.00");
        assert_eq!(Rounding::HalfUp.to_cents(dec!(-2.345)), dec!(-2.35));
    }

    #[test]
    fn rates_as_fraction_or_percent() {
        assert_eq!(parse_rate("0.0725"), Some(dec!(0.0725)));
        assert_eq!(parse_rate(" 7.25% "), Some(dec!(0.0725)));
        assert_eq!(parse_rate("1%"), Some(dec!(0.01)));
        assert_eq!(parse_rate(""), None);
        assert_eq!(parse_rate("n/a"), None);
    }

    #[test]
    fn usd_formatting() {
        assert_eq!(format_usd(dec!(1234.5)), "$1234.50");
        assert_eq!(format_usd(dec!(-3)), "-$3.00");
    }
}
