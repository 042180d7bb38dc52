//! Causal next-symbol predictors and the per-position entropy they induce.
//!
//! A payload is tokenized into a [`SymbolStream`] (bytes plus BOS/EOS/PAD),
//! and any [`EntropyPredictor`] turns that stream into an [`EntropyTrace`]:
//! entry `i` is the Shannon entropy, in bits, of the model's prediction for
//! symbol `i` given only symbols `0..i`.

pub mod distribution;
pub mod error;
pub mod ngram;
pub mod predictor;
pub mod recurrent;
pub mod registry;
pub mod symbols;
pub mod tokenizer;

pub use distribution::{Distribution, EntropyTrace};
pub use error::{EntropyError, Result};
pub use ngram::NGramPredictor;
pub use predictor::{entropy_traces, EntropyPredictor, UniformPredictor};
pub use recurrent::RecurrentPredictor;
pub use registry::{PredictorMetadata, PredictorRegistry, REGISTRY};
pub use symbols::{Symbol, SymbolStream, ALPHABET_SIZE, BOS, EOS, PAD};
pub use tokenizer::{ByteTokenizer, TokenizerConfig};
