//! Hierarchical patch encoder.
//!
//! A stream and its patch sequence become one fixed-size [`Embedding`] in two
//! stages. The local stage runs a small transformer inside each patch and
//! mean-pools it to a patch vector, so nothing crosses patch boundaries. The
//! global stage lets a handful of learned queries cross-attend over the patch
//! vectors, so attention cost grows with the number of patches rather than
//! the number of symbols.

pub mod attention;
pub mod config;
pub mod encoder;
pub mod error;
pub mod global;
pub mod layers;
pub mod local;

pub use config::EncoderConfig;
pub use encoder::{Embedding, HierarchicalEncoder, PaddedPatches};
pub use error::EncoderError;

pub type Result<T> = std::result::Result<T, EncoderError>;
