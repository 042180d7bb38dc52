use serde::{Deserialize, Serialize};

use crate::{EncoderError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderConfig {
    /// Symbol vocabulary; must cover the tokenizer alphabet.
    pub vocab_size: usize,
    /// Width of patch-local and global hidden states.
    pub d_model: usize,
    /// Transformer blocks in the patch-local stage.
    pub local_layers: usize,
    pub local_heads: usize,
    /// Heads of the pooling cross-attention.
    pub global_heads: usize,
    /// Learned query positions; the embedding is projected from `pooling_queries * d_model`.
    pub pooling_queries: usize,
    pub embedding_dim: usize,
    /// Longest patch the local stage accepts; bounds the rotary table.
    pub max_patch_len: usize,
    pub rope_theta: f32,
    /// Parameter initialization seed.
    pub seed: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            vocab_size: 259,
            d_model: 64,
            local_layers: 2,
            local_heads: 4,
            global_heads: 4,
            pooling_queries: 4,
            embedding_dim: 128,
            max_patch_len: 16,
            rope_theta: 10_000.0,
            seed: 42,
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("vocab_size", self.vocab_size),
            ("d_model", self.d_model),
            ("local_heads", self.local_heads),
            ("global_heads", self.global_heads),
            ("pooling_queries", self.pooling_queries),
            ("embedding_dim", self.embedding_dim),
            ("max_patch_len", self.max_patch_len),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(EncoderError::InvalidConfig(format!("{name} must be positive")));
        }
        for (name, heads) in [("local_heads", self.local_heads), ("global_heads", self.global_heads)] {
            if self.d_model % heads != 0 {
                return Err(EncoderError::InvalidConfig(format!(
                    "d_model {} is not divisible by {name} {heads}",
                    self.d_model
                )));
            }
        }
        if self.local_head_dim() % 2 != 0 {
            return Err(EncoderError::InvalidConfig(format!(
                "rotary embedding needs an even head dim, got {}",
                self.local_head_dim()
            )));
        }
        if !(self.rope_theta.is_finite() && self.rope_theta > 1.0) {
            return Err(EncoderError::InvalidConfig(format!(
                "rope_theta must be finite and > 1, got {}",
                self.rope_theta
            )));
        }
        Ok(())
    }

    pub fn local_head_dim(&self) -> usize {
        self.d_model / self.local_heads
    }

    /// SwiGLU hidden width, `⌊8d/3⌋`.
    pub fn ffn_hidden(&self) -> usize {
        8 * self.d_model / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let cfg = EncoderConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.local_head_dim(), 16);
        assert_eq!(cfg.ffn_hidden(), 170);
    }

    #[test]
    fn rejects_indivisible_heads() {
        let cfg = EncoderConfig { global_heads: 3, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(EncoderError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_odd_head_dim() {
        let cfg = EncoderConfig { d_model: 12, local_heads: 4, global_heads: 4, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_queries() {
        let cfg = EncoderConfig { pooling_queries: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = serde_json::from_str::<EncoderConfig>(r#"{"d_model": 8, "dropout": 0.1}"#);
        assert!(err.is_err());
    }
}
