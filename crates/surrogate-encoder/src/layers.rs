//! Dense building blocks shared by the local and global stages.
//!
//! Activations are row-major `(positions, features)`; a [`Linear`] stores its
//! weight as `(in, out)` so a forward pass is a single `x · W`.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::{EncoderError, Result};

/// `N(0, std²)` truncated to `±3·std`, by rejection.
pub(crate) fn trunc_normal(rng: &mut StdRng, shape: (usize, usize), std: f32) -> Array2<f32> {
    Array2::from_shape_fn(shape, |_| loop {
        let z: f32 = rng.sample(StandardNormal);
        if z.abs() <= 3.0 {
            break z * std;
        }
    })
}

/// Shape check for parameters that arrived through deserialization.
pub(crate) fn expect_dim(what: &str, got: usize, want: usize) -> Result<()> {
    if got == want {
        return Ok(());
    }
    Err(EncoderError::InvalidConfig(format!(
        "{what} has size {got}, the config implies {want}"
    )))
}

pub(crate) fn silu(x: f32) -> f32 {
    x / (1.0 + (-x).exp())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Linear {
    weight: Array2<f32>,
    bias: Option<Array1<f32>>,
}

impl Linear {
    pub(crate) fn new(rng: &mut StdRng, d_in: usize, d_out: usize, std: f32, bias: bool) -> Self {
        Self {
            weight: trunc_normal(rng, (d_in, d_out), std),
            bias: bias.then(|| Array1::zeros(d_out)),
        }
    }

    pub fn d_out(&self) -> usize {
        self.weight.ncols()
    }

    pub(crate) fn check_shape(&self, what: &str, d_in: usize, d_out: usize) -> Result<()> {
        expect_dim(&format!("{what} input"), self.weight.nrows(), d_in)?;
        expect_dim(&format!("{what} output"), self.weight.ncols(), d_out)?;
        match &self.bias {
            Some(b) => expect_dim(&format!("{what} bias"), b.len(), d_out),
            None => Ok(()),
        }
    }

    pub fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        let y = x.dot(&self.weight);
        match &self.bias {
            Some(b) => y + b,
            None => y,
        }
    }

    pub fn forward_vec(&self, x: &Array1<f32>) -> Array1<f32> {
        let y = x.dot(&self.weight);
        match &self.bias {
            Some(b) => y + b,
            None => y,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmsNorm {
    weight: Array1<f32>,
    eps: f32,
}

impl RmsNorm {
    pub fn new(dim: usize) -> Self {
        Self {
            weight: Array1::ones(dim),
            eps: 1e-6,
        }
    }

    pub(crate) fn check_shape(&self, what: &str, dim: usize) -> Result<()> {
        expect_dim(what, self.weight.len(), dim)
    }

    pub fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        let mut out = x.clone();
        for mut row in out.axis_iter_mut(Axis(0)) {
            let ms = row.iter().map(|v| v * v).sum::<f32>() / row.len().max(1) as f32;
            let inv = (ms + self.eps).sqrt().recip();
            row.zip_mut_with(&self.weight, |v, &w| *v *= inv * w);
        }
        out
    }
}

/// SwiGLU: `W2 · (silu(x·W1) ⊙ x·W3)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedForward {
    w1: Linear,
    w3: Linear,
    w2: Linear,
}

impl FeedForward {
    pub(crate) fn new(rng: &mut StdRng, d_model: usize, hidden: usize) -> Self {
        let in_std = (d_model as f32).powf(-0.5);
        let out_std = (hidden as f32).powf(-0.5);
        Self {
            w1: Linear::new(rng, d_model, hidden, in_std, false),
            w3: Linear::new(rng, d_model, hidden, in_std, false),
            w2: Linear::new(rng, hidden, d_model, out_std, false),
        }
    }

    pub(crate) fn check_shape(&self, what: &str, d_model: usize, hidden: usize) -> Result<()> {
        self.w1.check_shape(&format!("{what} w1"), d_model, hidden)?;
        self.w3.check_shape(&format!("{what} w3"), d_model, hidden)?;
        self.w2.check_shape(&format!("{what} w2"), hidden, d_model)
    }

    pub fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        let mut gate = self.w1.forward(x);
        let up = self.w3.forward(x);
        gate.zip_mut_with(&up, |g, &u| *g = silu(*g) * u);
        self.w2.forward(&gate)
    }
}

/// Rotary position table for positions `0..max_len`.
///
/// Pairs `(2i, 2i+1)` inside each head are rotated by `pos · θ^(-2i/head_dim)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rope {
    cos: Array2<f32>,
    sin: Array2<f32>,
    head_dim: usize,
}

impl Rope {
    pub fn new(head_dim: usize, max_len: usize, theta: f32) -> Self {
        let half = head_dim / 2;
        let angle = |pos: usize, i: usize| {
            pos as f32 * theta.powf(-((2 * i) as f32) / head_dim as f32)
        };
        Self {
            cos: Array2::from_shape_fn((max_len, half), |(p, i)| angle(p, i).cos()),
            sin: Array2::from_shape_fn((max_len, half), |(p, i)| angle(p, i).sin()),
            head_dim,
        }
    }

    pub fn max_len(&self) -> usize {
        self.cos.nrows()
    }

    pub(crate) fn check_shape(&self, head_dim: usize, max_len: usize) -> Result<()> {
        expect_dim("rotary head dim", self.head_dim, head_dim)?;
        for table in [&self.cos, &self.sin] {
            expect_dim("rotary positions", table.nrows(), max_len)?;
            expect_dim("rotary frequencies", table.ncols(), head_dim / 2)?;
        }
        Ok(())
    }

    /// Rotates every head of `x` in place; row `p` is position `p`.
    pub fn apply(&self, x: &mut Array2<f32>) {
        let half = self.head_dim / 2;
        for (pos, mut row) in x.axis_iter_mut(Axis(0)).enumerate().take(self.max_len()) {
            let row = match row.as_slice_mut() {
                Some(r) => r,
                None => continue,
            };
            for head in row.chunks_exact_mut(self.head_dim) {
                for i in 0..half {
                    let (c, s) = (self.cos[[pos, i]], self.sin[[pos, i]]);
                    let (a, b) = (head[2 * i], head[2 * i + 1]);
                    head[2 * i] = a * c - b * s;
                    head[2 * i + 1] = a * s + b * c;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn trunc_normal_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(0);
        let w = trunc_normal(&mut rng, (64, 64), 0.5);
        assert!(w.iter().all(|v| v.abs() <= 1.5));
        let mean = w.mean().unwrap();
        assert!(mean.abs() < 0.05);
    }

    #[test]
    fn rmsnorm_gives_unit_rms() {
        let n = RmsNorm::new(4);
        let y = n.forward(&array![[2.0, -2.0, 2.0, -2.0], [0.0, 0.0, 0.0, 0.0]]);
        for v in y.row(0) {
            assert!((v.abs() - 1.0).abs() < 1e-4);
        }
        assert!(y.row(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn linear_bias_starts_at_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let l = Linear::new(&mut rng, 3, 2, 0.1, true);
        let y = l.forward(&Array2::zeros((5, 3)));
        assert_eq!(y.dim(), (5, 2));
        assert!(y.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn shape_checks_name_the_mismatch() {
        let mut rng = StdRng::seed_from_u64(4);
        let l = Linear::new(&mut rng, 3, 2, 0.1, true);
        l.check_shape("proj", 3, 2).unwrap();
        let err = l.check_shape("proj", 4, 2).unwrap_err();
        assert!(err.to_string().contains("proj input"), "{err}");

        let rope = Rope::new(4, 8, 10_000.0);
        rope.check_shape(4, 8).unwrap();
        assert!(rope.check_shape(4, 16).is_err());
        assert!(RmsNorm::new(5).check_shape("norm", 6).is_err());
    }

    #[test]
    fn swiglu_shape() {
        let mut rng = StdRng::seed_from_u64(2);
        let ff = FeedForward::new(&mut rng, 8, 21);
        assert_eq!(ff.forward(&Array2::ones((3, 8))).dim(), (3, 8));
    }

    #[test]
    fn rope_is_identity_at_position_zero_and_preserves_norm() {
        let rope = Rope::new(4, 8, 10_000.0);
        let mut x = Array2::from_shape_fn((3, 8), |(r, c)| (r * 8 + c) as f32 * 0.1);
        let before = x.clone();
        rope.apply(&mut x);
        assert_eq!(x.row(0), before.row(0));
        for r in 0..3 {
            let n0: f32 = before.row(r).iter().map(|v| v * v).sum();
            let n1: f32 = x.row(r).iter().map(|v| v * v).sum();
            assert!((n0 - n1).abs() < 1e-3);
        }
        assert_ne!(x.row(1), before.row(1));
    }
}
