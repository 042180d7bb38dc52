//! Global stage: learned pooling queries cross-attend over the patch vectors.
//!
//! ```text
//!   patches + position ─────────────┐
//!   queries (q × d) ──► CrossAttention(patches, mask) ──► + FFN ──► norm
//!                                                                    │
//!                                     embedding ◄── Linear ◄── flatten (q·d)
//! ```
//!
//! Cost is `O(q · patches)`, independent of the symbol count.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::attention::CrossAttention;
use crate::config::EncoderConfig;
use crate::layers::{expect_dim, trunc_normal, FeedForward, Linear, RmsNorm};
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalPooler {
    theta: f32,
    queries: Array2<f32>,
    cross: CrossAttention,
    feed_forward_norm: RmsNorm,
    feed_forward: FeedForward,
    norm: RmsNorm,
    out_proj: Linear,
}

impl GlobalPooler {
    pub(crate) fn new(rng: &mut StdRng, config: &EncoderConfig) -> Self {
        let d = config.d_model;
        let flat = config.pooling_queries * d;
        Self {
            theta: config.rope_theta,
            queries: trunc_normal(rng, (config.pooling_queries, d), (d as f32).powf(-0.5)),
            cross: CrossAttention::new(rng, d, config.global_heads),
            feed_forward_norm: RmsNorm::new(d),
            feed_forward: FeedForward::new(rng, d, config.ffn_hidden()),
            norm: RmsNorm::new(d),
            out_proj: Linear::new(rng, flat, config.embedding_dim, (flat as f32).powf(-0.5), true),
        }
    }

    pub fn embedding_dim(&self) -> usize {
        self.out_proj.d_out()
    }

    pub(crate) fn check_shape(&self, config: &EncoderConfig) -> Result<()> {
        let d = config.d_model;
        expect_dim("pooling queries", self.queries.nrows(), config.pooling_queries)?;
        expect_dim("pooling query width", self.queries.ncols(), d)?;
        self.cross.check_shape("global cross-attention", d, config.global_heads)?;
        self.feed_forward_norm.check_shape("global feed_forward_norm", d)?;
        self.feed_forward.check_shape("global feed_forward", d, config.ffn_hidden())?;
        self.norm.check_shape("global norm", d)?;
        self.out_proj
            .check_shape("global out_proj", config.pooling_queries * d, config.embedding_dim)
    }

    /// Pools `patches` (one row per patch) into an embedding. `mask[j] ==
    /// false` marks row `j` as padding. Zero rows with no mask is valid input
    /// and yields the encoder's default embedding.
    pub fn forward(&self, patches: &Array2<f32>, mask: Option<&[bool]>) -> Array1<f32> {
        let kv = patches + &self.positions(patches.nrows(), patches.ncols());
        let pooled = self.cross.forward(&self.queries, &kv, mask);
        let h = &pooled + &self.feed_forward.forward(&self.feed_forward_norm.forward(&pooled));
        let h = self.norm.forward(&h);
        let flat = Array1::from_iter(h.iter().copied());
        self.out_proj.forward_vec(&flat)
    }

    /// Sinusoidal encoding of patch index `p`: `sin`/`cos` of `p · θ^(-2i/d)`.
    fn positions(&self, n: usize, d: usize) -> Array2<f32> {
        Array2::from_shape_fn((n, d), |(p, c)| {
            let angle = p as f32 * self.theta.powf(-((c / 2 * 2) as f32) / d as f32);
            if c % 2 == 0 {
                angle.sin()
            } else {
                angle.cos()
            }
        })
    }
}
