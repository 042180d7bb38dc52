use thiserror::Error;

use crate::Symbol;

#[derive(Error, Debug)]
pub enum EntropyError {
    #[error("symbol {symbol} at position {position} is outside the alphabet of {alphabet} symbols")]
    InvalidSymbol {
        symbol: Symbol,
        position: usize,
        alphabet: usize,
    },
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("predictor not found: {0}")]
    ModelNotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for EntropyError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EntropyError>;
