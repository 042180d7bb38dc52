use std::ops::Deref;

use crate::{EntropyError, Result, Symbol};

/// A next-symbol probability distribution over the predictor's alphabet.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    probs: Vec<f32>,
}

impl Distribution {
    /// Numerically stable softmax over `logits`.
    pub fn from_logits(logits: &[f32]) -> Self {
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut probs: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
        let sum: f32 = probs.iter().sum();
        if sum > 0.0 && sum.is_finite() {
            probs.iter_mut().for_each(|p| *p /= sum);
        }
        Self { probs }
    }

    /// Normalizes non-negative weights into a distribution.
    pub fn from_weights(weights: Vec<f32>) -> Result<Self> {
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(EntropyError::InvalidDistribution(
                "weights must be finite and non-negative".into(),
            ));
        }
        let sum: f32 = weights.iter().sum();
        if sum <= 0.0 {
            return Err(EntropyError::InvalidDistribution("weights sum to zero".into()));
        }
        Ok(Self {
            probs: weights.into_iter().map(|w| w / sum).collect(),
        })
    }

    pub fn uniform(size: usize) -> Self {
        Self {
            probs: vec![1.0 / size as f32; size],
        }
    }

    pub fn prob(&self, symbol: Symbol) -> f32 {
        self.probs.get(symbol as usize).copied().unwrap_or(0.0)
    }

    /// Shannon entropy in bits. Zero-probability symbols contribute nothing.
    pub fn entropy_bits(&self) -> f32 {
        let h: f32 = self
            .probs
            .iter()
            .filter(|&&p| p > 0.0)
            .map(|&p| -p * p.log2())
            .sum();
        h.max(0.0)
    }
}

impl Deref for Distribution {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.probs
    }
}

/// Per-position entropy, in bits, aligned index-for-index with its stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntropyTrace(Vec<f32>);

impl EntropyTrace {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn mean(&self) -> Option<f32> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.iter().sum::<f32>() / self.0.len() as f32)
        }
    }
}

impl Deref for EntropyTrace {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for EntropyTrace {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}
