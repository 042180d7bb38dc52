//! Fixed-length decimal codec for scalar values.
//!
//! A value is written as one sign token, one exponent token and exactly `P`
//! digit tokens, most significant first:
//!
//! ```text
//!   3.14159  (P = 3)   →   <+> <E0> <3> <1> <4>   →   3.14
//!  -0.00052  (P = 3)   →   <-> <E-4> <5> <2> <0>  →  -0.00052
//!   0.0                →   <0s> <E0> <0> <0> <0>  →   0.0
//! ```
//!
//! The sequence length depends only on `P`, never on the magnitude, so a
//! generator can emit numeric fields at fixed positions. Exponents outside
//! `[min_exp, max_exp]` are clamped and the clamp is reported through
//! [`NumericEncoding::clamped`] rather than hidden.

pub mod codec;
pub mod config;
pub mod error;
pub mod vocab;

pub use codec::{ClampDirection, NumericCodec, NumericEncoding};
pub use config::{NumericConfig, Rounding};
pub use error::NumericError;
pub use vocab::{NumericToken, NumericVocab, Sign};
