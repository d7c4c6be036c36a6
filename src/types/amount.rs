use std::str::FromStr;

use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
    Zero,
}

/// A signed amount parsed from a CSV cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount(pub Decimal);

impl Amount {
    pub fn sign(&self) -> Sign {
        if self.0.is_zero() {
            Sign::Zero
        } else if self.0.is_sign_negative() {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }

    /// Absolute value with trailing zeros stripped, so `100` and `-100.00`
    /// produce the same key.
    pub fn magnitude(&self) -> Decimal {
        self.0.abs().normalize()
    }
}

/// Parses `mantissa` times ten to the power `exp`, failing instead of rounding.
fn parse_scientific(mantissa: &str, exp: &str) -> Option<Decimal> {
    let mut value = Decimal::from_str_exact(mantissa).ok()?;
    if value.is_zero() {
        return Some(Decimal::ZERO);
    }
    let exp: i64 = exp.parse().ok()?;
    let scale = i64::from(value.scale());
    let shifted = scale.checked_sub(exp)?;

    if shifted >= 0 {
        value.set_scale(u32::try_from(shifted).ok()?).ok()?;
    } else {
        value.set_scale(0).ok()?;
        // A non-zero value overflows after at most 29 steps.
        for _ in 0..shifted.unsigned_abs() {
            value = value.checked_mul(Decimal::TEN)?;
        }
    }
    Some(value)
}

impl FromStr for Amount {
    type Err = ();

    /// Exact parse: values that would need rounding to fit a `Decimal` are
    /// rejected, and so are digit separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.contains('_') {
            return Err(());
        }

        let value = match s.split_once(['e', 'E']) {
            Some((mantissa, exp)) => parse_scientific(mantissa, exp).ok_or(())?,
            None => Decimal::from_str_exact(s).map_err(|_| ())?,
        };
        Ok(Amount(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_plain_and_signed_amounts() {
        assert_eq!("100".parse::<Amount>(), Ok(Amount(dec!(100))));
        assert_eq!("-100.50".parse::<Amount>(), Ok(Amount(dec!(-100.50))));
        assert_eq!(" 42 ".parse::<Amount>(), Ok(Amount(dec!(42))));
    }

    #[test]
    fn test_parse_scientific_notation() {
        assert_eq!("1e3".parse::<Amount>(), Ok(Amount(dec!(1000))));
    }

    #[test]
    fn test_parse_scientific_keeps_precision() {
        assert_eq!("1.5E-2".parse::<Amount>(), Ok(Amount(dec!(0.015))));
        assert_eq!("-12.5e1".parse::<Amount>(), Ok(Amount(dec!(-125))));
        assert!("1e40".parse::<Amount>().is_err());
        assert!("1e-29".parse::<Amount>().is_err());
    }

    #[test]
    fn test_parse_rejects_values_that_would_round() {
        assert!("1.000000000000000000000000000001".parse::<Amount>().is_err());
        assert!("-1.000000000000000000000000000002".parse::<Amount>().is_err());
        assert!("79228162514264337593543950336".parse::<Amount>().is_err());
    }

    #[test]
    fn test_parse_rejects_digit_separators() {
        assert!("1_000".parse::<Amount>().is_err());
        assert!("-1_000.50".parse::<Amount>().is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("abc".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
        assert!("   ".parse::<Amount>().is_err());
        assert!("12,50".parse::<Amount>().is_err());
    }

    #[test]
    fn test_sign() {
        assert_eq!(Amount(dec!(5)).sign(), Sign::Positive);
        assert_eq!(Amount(dec!(-5)).sign(), Sign::Negative);
        assert_eq!(Amount(dec!(0)).sign(), Sign::Zero);
        assert_eq!("-0".parse::<Amount>().unwrap().sign(), Sign::Zero);
    }

    #[test]
    fn test_magnitude_ignores_scale_and_sign() {
        assert_eq!(Amount(dec!(100)).magnitude(), Amount(dec!(-100.00)).magnitude());
        assert_ne!(Amount(dec!(100)).magnitude(), Amount(dec!(100.01)).magnitude());
    }
}
