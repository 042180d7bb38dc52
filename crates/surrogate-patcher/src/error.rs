//! Error type for patch segmentation and patch validation.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatchError {
    #[error("entropy trace has {trace} entries but the stream has {stream} symbols")]
    TraceLengthMismatch { stream: usize, trace: usize },

    #[error("configuration error: {0}")]
    InvalidConfig(String),

    #[error("patch {index} violates tiling: {reason}")]
    TilingViolation { index: usize, reason: String },
}
