//! Small Elman recurrent predictor over the symbol alphabet.
//!
//! `h_t = tanh(E[x_t] + h_{t-1} W_hh + b_h)` and the next-symbol logits are
//! `h_t W_hy + b_y`. The hidden vector is the fold state, so a full trace
//! costs one step per symbol.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::{Distribution, EntropyError, EntropyPredictor, Result, Symbol};

/// Deserialized weights go through [`RecurrentPredictor::from_parameters`],
/// so a blob whose arrays do not fit together fails to load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RecurrentParams")]
pub struct RecurrentPredictor {
    embed: Array2<f32>,
    w_hh: Array2<f32>,
    b_h: Array1<f32>,
    w_hy: Array2<f32>,
    b_y: Array1<f32>,
}

/// Wire form of [`RecurrentPredictor`]; same fields, same order.
#[derive(Deserialize)]
struct RecurrentParams {
    embed: Array2<f32>,
    w_hh: Array2<f32>,
    b_h: Array1<f32>,
    w_hy: Array2<f32>,
    b_y: Array1<f32>,
}

impl TryFrom<RecurrentParams> for RecurrentPredictor {
    type Error = EntropyError;

    fn try_from(p: RecurrentParams) -> Result<Self> {
        Self::from_parameters(p.embed, p.w_hh, p.b_h, p.w_hy, p.b_y)
    }
}

impl RecurrentPredictor {
    /// Random weights drawn from `N(0, 1/hidden)`; same seed, same model.
    pub fn new(alphabet: usize, hidden: usize, seed: u64) -> Result<Self> {
        if alphabet == 0 || hidden == 0 {
            return Err(EntropyError::DimensionMismatch {
                expected: 1,
                got: alphabet.min(hidden),
            });
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let std = (hidden as f32).recip().sqrt();
        let mut sample = |shape: (usize, usize)| {
            Array2::from_shape_fn(shape, |_| rng.sample::<f32, _>(StandardNormal) * std)
        };
        Ok(Self {
            embed: sample((alphabet, hidden)),
            w_hh: sample((hidden, hidden)),
            b_h: Array1::zeros(hidden),
            w_hy: sample((hidden, alphabet)),
            b_y: Array1::zeros(alphabet),
        })
    }

    /// Assembles a predictor from trained weights, checking every shape.
    pub fn from_parameters(
        embed: Array2<f32>,
        w_hh: Array2<f32>,
        b_h: Array1<f32>,
        w_hy: Array2<f32>,
        b_y: Array1<f32>,
    ) -> Result<Self> {
        let (alphabet, hidden) = embed.dim();
        let checks = [
            (hidden, w_hh.nrows()),
            (hidden, w_hh.ncols()),
            (hidden, b_h.len()),
            (hidden, w_hy.nrows()),
            (alphabet, w_hy.ncols()),
            (alphabet, b_y.len()),
        ];
        if let Some(&(expected, got)) = checks.iter().find(|(e, g)| e != g) {
            return Err(EntropyError::DimensionMismatch { expected, got });
        }
        Ok(Self {
            embed,
            w_hh,
            b_h,
            w_hy,
            b_y,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.w_hh.nrows()
    }
}

impl EntropyPredictor for RecurrentPredictor {
    type State = Array1<f32>;

    fn alphabet_size(&self) -> usize {
        self.embed.nrows()
    }

    fn initial_state(&self) -> Self::State {
        Array1::zeros(self.hidden_size())
    }

    fn advance(&self, state: &mut Self::State, symbol: Symbol) {
        // Out-of-alphabet symbols contribute no input, only the recurrence.
        let mut pre = state.dot(&self.w_hh) + &self.b_h;
        let symbol = symbol as usize;
        if symbol < self.embed.nrows() {
            pre += &self.embed.row(symbol);
        }
        *state = pre.mapv(f32::tanh);
    }

    fn predict(&self, state: &Self::State) -> Distribution {
        let logits = state.dot(&self.w_hy) + &self.b_y;
        Distribution::from_logits(logits.as_slice().unwrap_or(&[]))
    }
}
