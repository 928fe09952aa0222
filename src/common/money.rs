// src/common/money.rs

//! Valores monetários em centavos (inteiros), com `Decimal` apenas nas bordas
//! (JSON e formatação).

use std::fmt;
use std::ops::{Add, Neg, Sub};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::common::error::AppError;

/// Casas decimais da moeda (BRL).
pub const CURRENCY_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, sqlx::Type)]
#[sqlx(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Converte um `Decimal` vindo da borda. Rejeita mais de duas casas decimais
    /// em vez de arredondar silenciosamente.
    pub fn from_decimal(value: Decimal) -> Result<Self, AppError> {
        let normalized = value.normalize();
        if normalized.scale() > CURRENCY_SCALE {
            return Err(AppError::InvalidAmount(format!(
                "{} tem mais de {} casas decimais",
                value, CURRENCY_SCALE
            )));
        }
        normalized
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Money)
            .ok_or_else(|| AppError::InvalidAmount(format!("{} fora do intervalo", value)))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, CURRENCY_SCALE)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// `self * rate`, arredondado para centavos com meio-para-cima.
    pub fn apply_rate(self, rate: Decimal) -> Money {
        let raw = Decimal::from(self.0) * rate;
        let rounded = raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        // rate em [0,1] nunca excede |self|
        Money(rounded.to_i64().unwrap_or(self.0))
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R${}", self.to_decimal())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::from_decimal(value).map_err(serde::de::Error::custom)
    }
}

/// Decomposição de um payout: `gross == net + retention`, sempre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionSplit {
    pub gross: Money,
    pub retention: Money,
    pub net: Money,
}

impl RetentionSplit {
    pub fn compute(gross: Money, rate: Decimal) -> Self {
        let retention = gross.apply_rate(rate);
        Self {
            gross,
            retention,
            net: gross - retention,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_two_decimal_places() {
        assert_eq!(Money::from_decimal(dec!(40.00)).unwrap(), Money::from_cents(4000));
        assert_eq!(Money::from_decimal(dec!(1.2)).unwrap(), Money::from_cents(120));
        assert_eq!(Money::from_decimal(dec!(25)).unwrap(), Money::from_cents(2500));
    }

    #[test]
    fn rejects_sub_centavo_precision() {
        assert!(matches!(
            Money::from_decimal(dec!(1.234)),
            Err(AppError::InvalidAmount(_))
        ));
        // zeros à direita não contam como precisão extra
        assert_eq!(Money::from_decimal(dec!(1.2300)).unwrap(), Money::from_cents(123));
    }

    #[test]
    fn huge_amounts_are_rejected_not_panicking() {
        assert!(matches!(Money::from_decimal(Decimal::MAX), Err(AppError::InvalidAmount(_))));
        assert!(matches!(
            Money::from_decimal(dec!(100000000000000000000)),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(serde_json::from_str::<Money>("1e27").is_err());
        assert_eq!(serde_json::from_str::<Money>("40.5").unwrap(), Money::from_cents(4050));
    }

    #[test]
    fn retention_example_from_payout_flow() {
        let split = RetentionSplit::compute(Money::from_cents(4000), dec!(0.05));
        assert_eq!(split.retention, Money::from_cents(200));
        assert_eq!(split.net, Money::from_cents(3800));
    }

    #[test]
    fn half_centavo_rounds_up() {
        // 0,10 * 0,05 = 0,005 -> 0,01
        let split = RetentionSplit::compute(Money::from_cents(10), dec!(0.05));
        assert_eq!(split.retention, Money::from_cents(1));
        assert_eq!(split.net, Money::from_cents(9));

        // 33,33 * 0,05 = 1,6665 -> 1,67
        let split = RetentionSplit::compute(Money::from_cents(3333), dec!(0.05));
        assert_eq!(split.retention, Money::from_cents(167));
    }

    #[test]
    fn split_always_sums_back_to_gross() {
        for cents in [1_i64, 7, 99, 101, 3333, 12_345, 999_999] {
            for rate in [dec!(0), dec!(0.05), dec!(0.1), dec!(0.3333), dec!(1)] {
                let split = RetentionSplit::compute(Money::from_cents(cents), rate);
                assert_eq!(split.net + split.retention, split.gross, "{cents} @ {rate}");
                assert!(split.retention >= Money::ZERO && split.retention <= split.gross);
            }
        }
    }

    #[test]
    fn serializes_as_decimal() {
        let json = serde_json::to_string(&Money::from_cents(2500)).unwrap();
        assert_eq!(json, "25.0");
        let back: Money = serde_json::from_str("38.5").unwrap();
        assert_eq!(back, Money::from_cents(3850));
    }

    #[test]
    fn displays_in_reais() {
        assert_eq!(Money::from_cents(3800).to_string(), "R$38.00");
    }
}
