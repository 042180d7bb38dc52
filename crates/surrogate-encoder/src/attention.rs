//! Multi-head self-attention (patch-local) and masked cross-attention
//! (global pooling).

use ndarray::{s, Array2, ArrayView2};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::layers::{expect_dim, Linear, RmsNorm, Rope};
use crate::Result;

/// Softmax over the entries of `scores` selected by `keep`, written back in
/// place; unselected entries become zero. With nothing selected the whole row
/// is zero, so the attended output is the zero vector.
fn masked_softmax(scores: &mut [f32], keep: impl Fn(usize) -> bool) {
    let max = scores
        .iter()
        .enumerate()
        .filter(|&(j, _)| keep(j))
        .map(|(_, &v)| v)
        .fold(f32::NEG_INFINITY, f32::max);
    if max == f32::NEG_INFINITY {
        scores.iter_mut().for_each(|v| *v = 0.0);
        return;
    }
    let mut sum = 0.0;
    for (j, v) in scores.iter_mut().enumerate() {
        *v = if keep(j) { (*v - max).exp() } else { 0.0 };
        sum += *v;
    }
    scores.iter_mut().for_each(|v| *v /= sum);
}

/// `softmax(q·kᵀ / √d_h) · v` per head. `q` is `(n_q, d)`, `k` and `v` are
/// `(n_k, d)`; `keep(j)` selects the keys a query may see.
fn attend(
    q: ArrayView2<f32>,
    k: ArrayView2<f32>,
    v: ArrayView2<f32>,
    heads: usize,
    keep: impl Fn(usize) -> bool + Copy,
) -> Array2<f32> {
    let (n_q, d) = q.dim();
    let head_dim = d / heads;
    let scale = (head_dim as f32).powf(-0.5);
    let mut out = Array2::zeros((n_q, d));
    for h in 0..heads {
        let (lo, hi) = (h * head_dim, (h + 1) * head_dim);
        let qh = q.slice(s![.., lo..hi]);
        let kh = k.slice(s![.., lo..hi]);
        let vh = v.slice(s![.., lo..hi]);
        let mut scores = qh.dot(&kh.t()) * scale;
        for mut row in scores.rows_mut() {
            if let Some(row) = row.as_slice_mut() {
                masked_softmax(row, keep);
            }
        }
        out.slice_mut(s![.., lo..hi]).assign(&scores.dot(&vh));
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfAttention {
    heads: usize,
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    out_proj: Linear,
}

impl SelfAttention {
    pub(crate) fn new(rng: &mut StdRng, d_model: usize, heads: usize) -> Self {
        let std = (d_model as f32).powf(-0.5);
        Self {
            heads,
            q_proj: Linear::new(rng, d_model, d_model, std, false),
            k_proj: Linear::new(rng, d_model, d_model, std, false),
            v_proj: Linear::new(rng, d_model, d_model, std, false),
            out_proj: Linear::new(rng, d_model, d_model, std, true),
        }
    }

    pub(crate) fn check_shape(&self, what: &str, d_model: usize, heads: usize) -> Result<()> {
        expect_dim(&format!("{what} heads"), self.heads, heads)?;
        self.q_proj.check_shape(&format!("{what} q_proj"), d_model, d_model)?;
        self.k_proj.check_shape(&format!("{what} k_proj"), d_model, d_model)?;
        self.v_proj.check_shape(&format!("{what} v_proj"), d_model, d_model)?;
        self.out_proj.check_shape(&format!("{what} out_proj"), d_model, d_model)
    }

    /// Bidirectional attention over the rows of `x`, rotary-encoded by row.
    pub fn forward(&self, x: &Array2<f32>, rope: &Rope) -> Array2<f32> {
        let mut q = self.q_proj.forward(x);
        let mut k = self.k_proj.forward(x);
        let v = self.v_proj.forward(x);
        rope.apply(&mut q);
        rope.apply(&mut k);
        let mixed = attend(q.view(), k.view(), v.view(), self.heads, |_| true);
        self.out_proj.forward(&mixed)
    }
}

/// Queries attend over a key/value set, optionally masked.
///
/// Both sides are RMS-normalized first and the residual is taken on the
/// normalized queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossAttention {
    heads: usize,
    norm_q: RmsNorm,
    norm_kv: RmsNorm,
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    out_proj: Linear,
}

impl CrossAttention {
    pub(crate) fn new(rng: &mut StdRng, d_model: usize, heads: usize) -> Self {
        let std = (d_model as f32).powf(-0.5);
        Self {
            heads,
            norm_q: RmsNorm::new(d_model),
            norm_kv: RmsNorm::new(d_model),
            q_proj: Linear::new(rng, d_model, d_model, std, false),
            k_proj: Linear::new(rng, d_model, d_model, std, false),
            v_proj: Linear::new(rng, d_model, d_model, std, false),
            out_proj: Linear::new(rng, d_model, d_model, std, true),
        }
    }

    pub(crate) fn check_shape(&self, what: &str, d_model: usize, heads: usize) -> Result<()> {
        expect_dim(&format!("{what} heads"), self.heads, heads)?;
        self.norm_q.check_shape(&format!("{what} norm_q"), d_model)?;
        self.norm_kv.check_shape(&format!("{what} norm_kv"), d_model)?;
        self.q_proj.check_shape(&format!("{what} q_proj"), d_model, d_model)?;
        self.k_proj.check_shape(&format!("{what} k_proj"), d_model, d_model)?;
        self.v_proj.check_shape(&format!("{what} v_proj"), d_model, d_model)?;
        self.out_proj.check_shape(&format!("{what} out_proj"), d_model, d_model)
    }

    /// `mask[j] == false` excludes key `j`. `None` keeps every key.
    pub fn forward(&self, x: &Array2<f32>, kv: &Array2<f32>, mask: Option<&[bool]>) -> Array2<f32> {
        let x = self.norm_q.forward(x);
        let kv = self.norm_kv.forward(kv);
        let q = self.q_proj.forward(&x);
        let k = self.k_proj.forward(&kv);
        let v = self.v_proj.forward(&kv);
        let keep = |j: usize| mask.map_or(true, |m| m.get(j).copied().unwrap_or(false));
        let mixed = attend(q.view(), k.view(), v.view(), self.heads, keep);
        x + self.out_proj.forward(&mixed)
    }
}
