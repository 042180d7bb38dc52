use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericError {
    #[error("malformed numeric token at position {position} (id {token:?}): {reason}")]
    MalformedNumericToken {
        position: usize,
        token: Option<u32>,
        reason: String,
    },
    #[error("invalid numeric codec configuration: {0}")]
    InvalidConfig(String),
}

impl NumericError {
    pub(crate) fn malformed(position: usize, token: Option<u32>, reason: impl Into<String>) -> Self {
        Self::MalformedNumericToken {
            position,
            token,
            reason: reason.into(),
        }
    }
}
