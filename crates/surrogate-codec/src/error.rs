//! Error types for the codec pipeline.

use surrogate_encoder::EncoderError;
use surrogate_entropy::EntropyError;
use surrogate_numeric::NumericError;
use surrogate_patcher::PatchError;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("numeric codec: {0}")]
    Numeric(#[from] NumericError),

    #[error("entropy model: {0}")]
    Entropy(#[from] EntropyError),

    #[error("patcher: {0}")]
    Patch(#[from] PatchError),

    #[error("encoder: {0}")]
    Encoder(#[from] EncoderError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("config JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
