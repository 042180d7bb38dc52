//! The numeric token alphabet.
//!
//! Token ids are laid out as:
//!
//! | ids | token |
//! |---|---|
//! | `0..=9` | digit `<0>`..`<9>` |
//! | `10` | `<+>` positive sign |
//! | `11` | `<->` negative sign |
//! | `12` | `<0s>` zero sign |
//! | `13` | `<nan>` not-a-number |
//! | `14..` | `<E{min_exp}>`..`<E{max_exp}>` |

use std::fmt;

use serde::{Deserialize, Serialize};

pub const POSITIVE_ID: u32 = 10;
pub const NEGATIVE_ID: u32 = 11;
pub const ZERO_ID: u32 = 12;
pub const NAN_ID: u32 = 13;
pub const EXPONENT_BASE_ID: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    Positive,
    Negative,
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericToken {
    Sign(Sign),
    /// Special sign-slot token for values that are not numbers.
    NotANumber,
    Exponent(i32),
    Digit(u8),
}

impl fmt::Display for NumericToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sign(Sign::Positive) => f.write_str("<+>"),
            Self::Sign(Sign::Negative) => f.write_str("<->"),
            Self::Sign(Sign::Zero) => f.write_str("<0s>"),
            Self::NotANumber => f.write_str("<nan>"),
            Self::Exponent(e) => write!(f, "<E{e}>"),
            Self::Digit(d) => write!(f, "<{d}>"),
        }
    }
}

/// Bidirectional id ↔ token mapping for one exponent range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericVocab {
    min_exp: i32,
    max_exp: i32,
}

impl NumericVocab {
    pub fn new(min_exp: i32, max_exp: i32) -> Self {
        Self { min_exp, max_exp }
    }

    pub fn size(&self) -> usize {
        EXPONENT_BASE_ID as usize + (self.max_exp - self.min_exp + 1) as usize
    }

    /// Id of `token`, or `None` if the token is not part of this alphabet
    /// (digit above 9, exponent outside the range).
    pub fn id(&self, token: NumericToken) -> Option<u32> {
        match token {
            NumericToken::Digit(d) if d <= 9 => Some(d as u32),
            NumericToken::Digit(_) => None,
            NumericToken::Sign(Sign::Positive) => Some(POSITIVE_ID),
            NumericToken::Sign(Sign::Negative) => Some(NEGATIVE_ID),
            NumericToken::Sign(Sign::Zero) => Some(ZERO_ID),
            NumericToken::NotANumber => Some(NAN_ID),
            NumericToken::Exponent(e) if (self.min_exp..=self.max_exp).contains(&e) => {
                Some(self.exponent_id(e))
            }
            NumericToken::Exponent(_) => None,
        }
    }

    pub fn token(&self, id: u32) -> Option<NumericToken> {
        match id {
            0..=9 => Some(NumericToken::Digit(id as u8)),
            POSITIVE_ID => Some(NumericToken::Sign(Sign::Positive)),
            NEGATIVE_ID => Some(NumericToken::Sign(Sign::Negative)),
            ZERO_ID => Some(NumericToken::Sign(Sign::Zero)),
            NAN_ID => Some(NumericToken::NotANumber),
            _ if (id as usize) < self.size() => {
                Some(NumericToken::Exponent(self.min_exp + (id - EXPONENT_BASE_ID) as i32))
            }
            _ => None,
        }
    }

    /// Caller guarantees `exp` lies inside the range.
    pub(crate) fn exponent_id(&self, exp: i32) -> u32 {
        EXPONENT_BASE_ID + (exp - self.min_exp) as u32
    }
}
