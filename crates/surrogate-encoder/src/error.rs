use surrogate_entropy::Symbol;
use surrogate_patcher::PatchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("invalid encoder config: {0}")]
    InvalidConfig(String),

    #[error("symbol {symbol} at position {position} is outside the vocabulary of {vocab_size}")]
    SymbolOutOfRange {
        symbol: Symbol,
        position: usize,
        vocab_size: usize,
    },

    #[error("patch {index} has {len} symbols, the local stage accepts at most {max}")]
    PatchTooLong { index: usize, len: usize, max: usize },

    #[error("batch has {streams} streams but {patches} patch sequences")]
    BatchMismatch { streams: usize, patches: usize },

    #[error("mask has {mask} entries for {rows} patch vectors")]
    MaskMismatch { rows: usize, mask: usize },

    #[error("patch error: {0}")]
    Patches(#[from] PatchError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for EncoderError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
