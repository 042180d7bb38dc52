//! # surrogate-codec
//!
//! Turns raw surrogate-model inputs into model-ready representations.
//!
//! ## Architecture
//!
//! ```text
//! CodecPipeline
//!   ├── NumericCodec          scalar ⇄ sign · exponent · P digits
//!   ├── ByteTokenizer         payload → BOS · bytes · EOS
//!   ├── Arc<EntropyPredictor> stream → entropy trace (bits)
//!   ├── DynamicPatcher        trace  → patch sequence
//!   └── HierarchicalEncoder   patches → fixed-size embedding
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use surrogate_codec::{design_item, CodecConfig, CodecPipeline};
//! use surrogate_entropy::{UniformPredictor, ALPHABET_SIZE};
//!
//! let pipeline = CodecPipeline::new(
//!     CodecConfig::default(),
//!     Arc::new(UniformPredictor::new(ALPHABET_SIZE)),
//! )?;
//! let items = vec![3.14159.into(), design_item(&[0.5, -2.0], Some("task: ant"))];
//! let (results, report) = pipeline.encode_batch(&items);
//! assert_eq!(report.failures, 0);
//! assert_eq!(results.len(), 2);
//! # Ok::<(), surrogate_codec::CodecError>(())
//! ```
//!
//! Configuration comes from JSON ([`CodecConfig::from_json`]) or from
//! `SURROGATE_*` environment variables ([`CodecConfig::from_env`]).

pub mod config;
pub mod design;
pub mod error;
pub mod pipeline;

pub use config::CodecConfig;
pub use design::{describe_bounds, design_item, serialize_design, with_metadata};
pub use error::{CodecError, Result};
pub use pipeline::{BatchReport, CodecPipeline, EncodedItem, RawItem};
