use serde::{Deserialize, Serialize};

use crate::NumericError;

/// Largest decimal exponent whose saturated mantissa (`9.99…e{exp}`) still
/// fits in an `f64`.
pub const MAX_SUPPORTED_EXP: i32 = 307;

/// Smallest decimal exponent kept out of the subnormal range.
pub const MIN_SUPPORTED_EXP: i32 = -307;

/// Significant digits an `f64` can carry through a decimal round-trip.
pub const MAX_PRECISION: usize = 17;

/// What happens to the digits past the P-th significant one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Round half to even on the P-th digit.
    #[default]
    HalfToEven,
    /// Drop them.
    Truncate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NumericConfig {
    /// Number of significant decimal digits retained (P).
    pub precision: usize,
    /// Smallest representable decimal exponent.
    pub min_exp: i32,
    /// Largest representable decimal exponent.
    pub max_exp: i32,
    /// Default: `half_to_even`
    pub rounding: Rounding,
}

impl Default for NumericConfig {
    fn default() -> Self {
        Self {
            precision: 6,
            min_exp: -30,
            max_exp: 30,
            rounding: Rounding::HalfToEven,
        }
    }
}

impl NumericConfig {
    pub fn validate(&self) -> Result<(), NumericError> {
        if self.precision == 0 || self.precision > MAX_PRECISION {
            return Err(NumericError::InvalidConfig(format!(
                "precision must be in 1..={MAX_PRECISION}, got {}",
                self.precision
            )));
        }
        if self.min_exp > self.max_exp {
            return Err(NumericError::InvalidConfig(format!(
                "min_exp ({}) must not exceed max_exp ({})",
                self.min_exp, self.max_exp
            )));
        }
        if self.min_exp < MIN_SUPPORTED_EXP || self.max_exp > MAX_SUPPORTED_EXP {
            return Err(NumericError::InvalidConfig(format!(
                "exponent range [{}, {}] exceeds the supported [{MIN_SUPPORTED_EXP}, {MAX_SUPPORTED_EXP}]",
                self.min_exp, self.max_exp
            )));
        }
        Ok(())
    }

    /// Tokens per encoded value: sign + exponent + P digits.
    pub fn sequence_len(&self) -> usize {
        2 + self.precision
    }

    /// Number of distinct exponent tokens.
    pub fn exponent_span(&self) -> usize {
        (self.max_exp - self.min_exp + 1) as usize
    }

    /// Exponent used by the canonical zero (and NaN) tokenization.
    pub fn neutral_exp(&self) -> i32 {
        0.clamp(self.min_exp, self.max_exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let cfg = NumericConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.sequence_len(), 8);
        assert_eq!(cfg.exponent_span(), 61);
    }

    #[test]
    fn rejects_zero_precision() {
        let cfg = NumericConfig {
            precision: 0,
            ..NumericConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(NumericError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_inverted_range() {
        let cfg = NumericConfig {
            min_exp: 5,
            max_exp: -5,
            ..NumericConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_range_beyond_f64() {
        let cfg = NumericConfig {
            max_exp: 308,
            ..NumericConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn neutral_exp_is_clamped_into_range() {
        let cfg = NumericConfig {
            precision: 3,
            min_exp: 2,
            max_exp: 9,
            ..NumericConfig::default()
        };
        assert_eq!(cfg.neutral_exp(), 2);
        assert_eq!(NumericConfig::default().neutral_exp(), 0);
    }

    #[test]
    fn rounding_from_json() {
        let cfg: NumericConfig = serde_json::from_str(r#"{"rounding":"truncate"}"#).unwrap();
        assert_eq!(cfg.rounding, Rounding::Truncate);
        assert_eq!(cfg.precision, 6);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let json = r#"{"precision":4,"min_exp":-3,"max_exp":3,"base":16}"#;
        assert!(serde_json::from_str::<NumericConfig>(json).is_err());
    }
}
