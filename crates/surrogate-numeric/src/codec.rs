use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::vocab::{NumericToken, NumericVocab, Sign, NAN_ID, NEGATIVE_ID, POSITIVE_ID, ZERO_ID};
use crate::config::Rounding;
use crate::{NumericConfig, NumericError};

/// Which boundary of the exponent range a value was clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClampDirection {
    /// Magnitude above `9.99…e{max_exp}`; saturated to the largest representable magnitude.
    Overflow,
    /// Magnitude below `1e{min_exp}`; raised to the smallest representable magnitude.
    Underflow,
}

/// A fixed-length numeric token sequence plus its clamp flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericEncoding {
    pub tokens: Vec<u32>,
    pub clamped: Option<ClampDirection>,
}

impl NumericEncoding {
    pub fn is_clamped(&self) -> bool {
        self.clamped.is_some()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Sign / exponent / P-digit codec. Holds only configuration, so it is
/// `Send + Sync` and can be shared freely.
#[derive(Debug, Clone)]
pub struct NumericCodec {
    config: NumericConfig,
    vocab: NumericVocab,
}

impl NumericCodec {
    pub fn new(config: NumericConfig) -> Result<Self, NumericError> {
        config.validate()?;
        let vocab = NumericVocab::new(config.min_exp, config.max_exp);
        Ok(Self { config, vocab })
    }

    pub fn config(&self) -> &NumericConfig {
        &self.config
    }

    pub fn vocab(&self) -> &NumericVocab {
        &self.vocab
    }

    /// Encode `value` into `2 + P` token ids.
    ///
    /// Rounding applies [`NumericConfig::rounding`] at the P-th significant
    /// digit of the shortest decimal representation of `value`. Exponents outside the configured
    /// range saturate and set [`NumericEncoding::clamped`].
    pub fn encode(&self, value: f64) -> NumericEncoding {
        let precision = self.config.precision;
        let neutral = self.config.neutral_exp();

        if value.is_nan() {
            return self.assemble(NAN_ID, neutral, &vec![0; precision], None);
        }
        if value == 0.0 {
            return self.assemble(ZERO_ID, neutral, &vec![0; precision], None);
        }

        let sign = if value.is_sign_negative() { NEGATIVE_ID } else { POSITIVE_ID };
        let magnitude = value.abs();

        let (digits, exp, clamped) = if magnitude.is_infinite() {
            (vec![9; precision], self.config.max_exp, Some(ClampDirection::Overflow))
        } else {
            let (digits, exp) = round_significant(magnitude, precision, self.config.rounding);
            if exp > self.config.max_exp {
                (vec![9; precision], self.config.max_exp, Some(ClampDirection::Overflow))
            } else if exp < self.config.min_exp {
                let mut smallest = vec![0; precision];
                smallest[0] = 1;
                (smallest, self.config.min_exp, Some(ClampDirection::Underflow))
            } else {
                (digits, exp, None)
            }
        };

        if let Some(direction) = clamped {
            debug!(value, exponent = exp, ?direction, "numeric value clamped to exponent range");
        }

        self.assemble(sign, exp, &digits, clamped)
    }

    /// Decode a token sequence produced by [`encode`](Self::encode) or by a
    /// generator. Any id outside the alphabet or any token in the wrong slot
    /// is rejected; no value is ever guessed.
    pub fn decode(&self, tokens: &[u32]) -> Result<f64, NumericError> {
        let expected = self.config.sequence_len();
        if tokens.len() != expected {
            return Err(NumericError::malformed(
                tokens.len().min(expected),
                None,
                format!("expected {expected} tokens, got {}", tokens.len()),
            ));
        }

        let parsed = self.parse(tokens)?;

        let sign = match parsed[0] {
            NumericToken::Sign(sign) => Some(sign),
            NumericToken::NotANumber => None,
            _ => return Err(NumericError::malformed(0, Some(tokens[0]), "expected a sign token")),
        };
        let exp = match parsed[1] {
            NumericToken::Exponent(e) => e,
            _ => {
                return Err(NumericError::malformed(1, Some(tokens[1]), "expected an exponent token"))
            }
        };

        let mut digits = Vec::with_capacity(self.config.precision);
        for (offset, token) in parsed[2..].iter().enumerate() {
            match token {
                NumericToken::Digit(d) => digits.push(*d),
                _ => {
                    return Err(NumericError::malformed(
                        offset + 2,
                        Some(tokens[offset + 2]),
                        "expected a digit token",
                    ))
                }
            }
        }

        match sign {
            None | Some(Sign::Zero) => {
                if let Some(pos) = digits.iter().position(|&d| d != 0) {
                    return Err(NumericError::malformed(
                        pos + 2,
                        Some(tokens[pos + 2]),
                        "zero and NaN carry all-zero digits",
                    ));
                }
                Ok(if sign.is_none() { f64::NAN } else { 0.0 })
            }
            Some(sign) => {
                if digits[0] == 0 {
                    return Err(NumericError::malformed(
                        2,
                        Some(tokens[2]),
                        "leading digit of a non-zero value must be non-zero",
                    ));
                }
                compose(sign, &digits, exp)
                    .ok_or_else(|| NumericError::malformed(1, Some(tokens[1]), "value not representable"))
            }
        }
    }

    /// Map ids to tokens, failing on the first id outside the alphabet.
    pub fn parse(&self, tokens: &[u32]) -> Result<Vec<NumericToken>, NumericError> {
        tokens
            .iter()
            .enumerate()
            .map(|(pos, &id)| {
                self.vocab
                    .token(id)
                    .ok_or_else(|| NumericError::malformed(pos, Some(id), "id outside the numeric alphabet"))
            })
            .collect()
    }

    /// Textual form, e.g. `<+><E0><3><1><4>`.
    pub fn render(&self, encoding: &NumericEncoding) -> String {
        encoding
            .tokens
            .iter()
            .filter_map(|&id| self.vocab.token(id))
            .map(|t| t.to_string())
            .collect()
    }

    /// `value` as the codec would reconstruct it.
    pub fn quantize(&self, value: f64) -> f64 {
        let encoding = self.encode(value);
        // encode always yields a well-formed sequence
        self.decode(&encoding.tokens).unwrap_or(f64::NAN)
    }

    fn assemble(
        &self,
        sign_id: u32,
        exp: i32,
        digits: &[u8],
        clamped: Option<ClampDirection>,
    ) -> NumericEncoding {
        let mut tokens = Vec::with_capacity(self.config.sequence_len());
        tokens.push(sign_id);
        tokens.push(self.vocab.exponent_id(exp));
        tokens.extend(digits.iter().map(|&d| d as u32));
        NumericEncoding { tokens, clamped }
    }
}

/// Split `magnitude > 0` into `precision` significant digits and a decimal
/// exponent.
fn round_significant(magnitude: f64, precision: usize, rounding: Rounding) -> (Vec<u8>, i32) {
    let repr = format!("{magnitude:e}");
    let (mantissa, exp) = repr.split_once('e').unwrap_or((repr.as_str(), "0"));
    let mut exp: i32 = exp.parse().unwrap_or(0);
    let mut digits: Vec<u8> = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect();

    if digits.len() <= precision {
        digits.resize(precision, 0);
        return (digits, exp);
    }

    let tail = digits.split_off(precision);
    let round_up = match (rounding, tail[0].cmp(&5)) {
        (Rounding::Truncate, _) => false,
        (Rounding::HalfToEven, Ordering::Greater) => true,
        (Rounding::HalfToEven, Ordering::Less) => false,
        (Rounding::HalfToEven, Ordering::Equal) => {
            tail[1..].iter().any(|&d| d != 0) || digits[precision - 1] % 2 == 1
        }
    };

    if round_up {
        let mut i = precision;
        loop {
            if i == 0 {
                // 99…9 carried out of the leading digit
                digits.insert(0, 1);
                digits.truncate(precision);
                exp += 1;
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    (digits, exp)
}

fn compose(sign: Sign, digits: &[u8], exp: i32) -> Option<f64> {
    let mut text = String::with_capacity(digits.len() + 8);
    if sign == Sign::Negative {
        text.push('-');
    }
    text.extend(digits.iter().map(|&d| char::from(b'0' + d)));
    text.push('e');
    text.push_str(&(exp - (digits.len() as i32 - 1)).to_string());
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_significant_pads_short_values() {
        assert_eq!(round_significant(2.5, 4, Rounding::HalfToEven), (vec![2, 5, 0, 0], 0));
        assert_eq!(round_significant(1e50, 3, Rounding::HalfToEven), (vec![1, 0, 0], 50));
    }

    #[test]
    fn round_significant_half_to_even() {
        assert_eq!(round_significant(2.5, 1, Rounding::HalfToEven), (vec![2], 0));
        assert_eq!(round_significant(3.5, 1, Rounding::HalfToEven), (vec![4], 0));
        assert_eq!(round_significant(0.125, 2, Rounding::HalfToEven), (vec![1, 2], -1));
        assert_eq!(round_significant(0.135, 2, Rounding::HalfToEven), (vec![1, 4], -1));
    }

    #[test]
    fn round_significant_above_half_rounds_up() {
        assert_eq!(round_significant(2.51, 1, Rounding::HalfToEven), (vec![3], 0));
        assert_eq!(round_significant(3.14159, 3, Rounding::HalfToEven), (vec![3, 1, 4], 0));
        assert_eq!(round_significant(2.71828, 3, Rounding::HalfToEven), (vec![2, 7, 2], 0));
    }

    #[test]
    fn round_significant_carries_into_exponent() {
        assert_eq!(round_significant(9.995, 3, Rounding::HalfToEven), (vec![1, 0, 0], 1));
        assert_eq!(round_significant(0.0999999, 2, Rounding::HalfToEven), (vec![1, 0], -1));
    }

    #[test]
    fn truncation_never_rounds_up() {
        let t = Rounding::Truncate;
        assert_eq!(round_significant(3.14159, 3, t), (vec![3, 1, 4], 0));
        assert_eq!(round_significant(2.71828, 3, t), (vec![2, 7, 1], 0));
        assert_eq!(round_significant(9.995, 3, t), (vec![9, 9, 9], 0));
    }

    #[test]
    fn compose_handles_single_digit() {
        assert_eq!(compose(Sign::Positive, &[7], -2), Some(0.07));
        assert_eq!(compose(Sign::Negative, &[3, 1, 4], 0), Some(-3.14));
    }
}
