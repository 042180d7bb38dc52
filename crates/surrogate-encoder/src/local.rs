//! Patch-local stage: each patch is encoded on its own, with rotary positions
//! restarting at zero, and mean-pooled into one `d_model` vector.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use surrogate_entropy::Symbol;
use surrogate_patcher::PatchSequence;

use crate::attention::SelfAttention;
use crate::config::EncoderConfig;
use crate::layers::{expect_dim, trunc_normal, FeedForward, RmsNorm, Rope};
use crate::Result;

/// Pre-norm block: `h = x + attn(norm(x))`, `out = h + ffn(norm(h))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerBlock {
    attention_norm: RmsNorm,
    attention: SelfAttention,
    feed_forward_norm: RmsNorm,
    feed_forward: FeedForward,
}

impl TransformerBlock {
    pub(crate) fn new(rng: &mut StdRng, d_model: usize, heads: usize, hidden: usize) -> Self {
        Self {
            attention_norm: RmsNorm::new(d_model),
            attention: SelfAttention::new(rng, d_model, heads),
            feed_forward_norm: RmsNorm::new(d_model),
            feed_forward: FeedForward::new(rng, d_model, hidden),
        }
    }

    pub(crate) fn check_shape(&self, what: &str, d_model: usize, heads: usize, hidden: usize) -> Result<()> {
        self.attention_norm.check_shape(&format!("{what} attention_norm"), d_model)?;
        self.attention.check_shape(&format!("{what} attention"), d_model, heads)?;
        self.feed_forward_norm.check_shape(&format!("{what} feed_forward_norm"), d_model)?;
        self.feed_forward.check_shape(&format!("{what} feed_forward"), d_model, hidden)
    }

    pub fn forward(&self, x: &Array2<f32>, rope: &Rope) -> Array2<f32> {
        let h = x + &self.attention.forward(&self.attention_norm.forward(x), rope);
        let ff = self.feed_forward.forward(&self.feed_forward_norm.forward(&h));
        h + ff
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalEncoder {
    embedding: Array2<f32>,
    layers: Vec<TransformerBlock>,
    norm: RmsNorm,
    rope: Rope,
}

impl LocalEncoder {
    pub(crate) fn new(rng: &mut StdRng, config: &EncoderConfig) -> Self {
        let d = config.d_model;
        let embedding = trunc_normal(rng, (config.vocab_size, d), (d as f32).powf(-0.5));
        let layers = (0..config.local_layers)
            .map(|_| TransformerBlock::new(rng, d, config.local_heads, config.ffn_hidden()))
            .collect();
        Self {
            embedding,
            layers,
            norm: RmsNorm::new(d),
            rope: Rope::new(config.local_head_dim(), config.max_patch_len, config.rope_theta),
        }
    }

    pub fn d_model(&self) -> usize {
        self.embedding.ncols()
    }

    /// Every parameter against the shape `config` implies.
    pub(crate) fn check_shape(&self, config: &EncoderConfig) -> Result<()> {
        let d = config.d_model;
        expect_dim("local embedding rows", self.embedding.nrows(), config.vocab_size)?;
        expect_dim("local embedding width", self.embedding.ncols(), d)?;
        expect_dim("local layers", self.layers.len(), config.local_layers)?;
        for (i, layer) in self.layers.iter().enumerate() {
            layer.check_shape(&format!("local layer {i}"), d, config.local_heads, config.ffn_hidden())?;
        }
        self.norm.check_shape("local norm", d)?;
        self.rope.check_shape(config.local_head_dim(), config.max_patch_len)
    }

    /// Encodes one patch. Callers have already checked every symbol against
    /// the vocabulary and the patch length against the rotary table.
    pub(crate) fn encode_patch(&self, symbols: &[Symbol]) -> Array1<f32> {
        let indices: Vec<usize> = symbols.iter().map(|&s| s as usize).collect();
        let mut x = self.embedding.select(Axis(0), &indices);
        for layer in &self.layers {
            x = layer.forward(&x, &self.rope);
        }
        self.norm
            .forward(&x)
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.d_model()))
    }

    /// One row per patch, in patch order. Patches are encoded in parallel.
    pub(crate) fn encode_patches(&self, stream: &[Symbol], patches: &PatchSequence) -> Array2<f32> {
        let rows: Vec<Array1<f32>> = patches
            .as_slice()
            .par_iter()
            .map(|p| self.encode_patch(&stream[p.range()]))
            .collect();
        let mut out = Array2::zeros((rows.len(), self.d_model()));
        for (mut dst, src) in out.axis_iter_mut(Axis(0)).zip(&rows) {
            dst.assign(src);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use surrogate_patcher::Patch;

    fn small() -> LocalEncoder {
        let cfg = EncoderConfig {
            d_model: 8,
            local_heads: 2,
            global_heads: 2,
            max_patch_len: 6,
            ..Default::default()
        };
        LocalEncoder::new(&mut StdRng::seed_from_u64(5), &cfg)
    }

    #[test]
    fn patch_vectors_depend_only_on_their_patch() {
        let enc = small();
        let patches = PatchSequence::from_patches(vec![Patch::new(0, 3), Patch::new(3, 5)]);
        let a = enc.encode_patches(&[10, 11, 12, 20, 21], &patches);
        let b = enc.encode_patches(&[10, 11, 12, 99, 98], &patches);
        assert_eq!(a.row(0), b.row(0));
        assert_ne!(a.row(1), b.row(1));
    }

    #[test]
    fn position_restarts_in_each_patch() {
        let enc = small();
        let patches = PatchSequence::from_patches(vec![Patch::new(0, 2), Patch::new(2, 4)]);
        let out = enc.encode_patches(&[7, 8, 7, 8], &patches);
        assert_eq!(out.row(0), out.row(1));
    }

    #[test]
    fn order_inside_patch_matters() {
        let enc = small();
        assert_ne!(enc.encode_patch(&[1, 2, 3]), enc.encode_patch(&[3, 2, 1]));
    }

    #[test]
    fn shape_check_against_config() {
        let enc = small();
        let cfg = EncoderConfig {
            d_model: 8,
            local_heads: 2,
            global_heads: 2,
            max_patch_len: 6,
            ..Default::default()
        };
        enc.check_shape(&cfg).unwrap();
        assert!(enc.check_shape(&EncoderConfig { max_patch_len: 7, ..cfg.clone() }).is_err());
        assert!(enc.check_shape(&EncoderConfig { local_layers: 3, ..cfg }).is_err());
    }

    #[test]
    fn no_patches_no_rows() {
        let enc = small();
        let out = enc.encode_patches(&[], &PatchSequence::default());
        assert_eq!(out.dim(), (0, 8));
    }
}
