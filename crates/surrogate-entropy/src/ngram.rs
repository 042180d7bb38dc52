//! Count-based n-gram predictor with add-alpha smoothing and back-off.
//!
//! Counts are kept for every context length from `0` to `order`. At query time
//! the longest observed suffix of the history is used; unseen contexts back off
//! to shorter ones, ending at the unigram table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Distribution, EntropyError, EntropyPredictor, Result, Symbol};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "NGramParams")]
pub struct NGramPredictor {
    order: usize,
    alpha: f32,
    alphabet: usize,
    counts: HashMap<Vec<Symbol>, Vec<u32>>,
}

#[derive(Deserialize)]
struct NGramParams {
    order: usize,
    alpha: f32,
    alphabet: usize,
    counts: HashMap<Vec<Symbol>, Vec<u32>>,
}

impl TryFrom<NGramParams> for NGramPredictor {
    type Error = EntropyError;

    /// Every count row must span the alphabet and every context must fit the order.
    fn try_from(p: NGramParams) -> Result<Self> {
        let mut model = Self::new(p.order, p.alpha, p.alphabet)?;
        for (context, row) in &p.counts {
            if row.len() != p.alphabet {
                return Err(EntropyError::DimensionMismatch {
                    expected: p.alphabet,
                    got: row.len(),
                });
            }
            if context.len() > p.order {
                return Err(EntropyError::DimensionMismatch {
                    expected: p.order,
                    got: context.len(),
                });
            }
        }
        model.counts = p.counts;
        Ok(model)
    }
}

impl NGramPredictor {
    pub fn new(order: usize, alpha: f32, alphabet: usize) -> Result<Self> {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(EntropyError::InvalidDistribution(format!(
                "smoothing alpha must be finite and non-negative, got {alpha}"
            )));
        }
        if alphabet == 0 {
            return Err(EntropyError::DimensionMismatch { expected: 1, got: 0 });
        }
        Ok(Self {
            order,
            alpha,
            alphabet,
            counts: HashMap::new(),
        })
    }

    /// Accumulates counts from `corpus`; may be called repeatedly.
    pub fn fit<S: AsRef<[Symbol]>>(&mut self, corpus: &[S]) -> Result<()> {
        let mut observed = 0usize;
        for stream in corpus {
            let stream = stream.as_ref();
            for (i, &next) in stream.iter().enumerate() {
                if next as usize >= self.alphabet {
                    return Err(EntropyError::InvalidSymbol {
                        symbol: next,
                        position: i,
                        alphabet: self.alphabet,
                    });
                }
                for k in 0..=self.order.min(i) {
                    let row = self
                        .counts
                        .entry(stream[i - k..i].to_vec())
                        .or_insert_with(|| vec![0; self.alphabet]);
                    row[next as usize] += 1;
                }
                observed += 1;
            }
        }
        debug!(
            order = self.order,
            streams = corpus.len(),
            symbols = observed,
            contexts = self.counts.len(),
            "n-gram counts updated"
        );
        Ok(())
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn contexts(&self) -> usize {
        self.counts.len()
    }
}

impl EntropyPredictor for NGramPredictor {
    /// The last `order` symbols seen.
    type State = Vec<Symbol>;

    fn alphabet_size(&self) -> usize {
        self.alphabet
    }

    fn initial_state(&self) -> Self::State {
        Vec::with_capacity(self.order)
    }

    fn advance(&self, state: &mut Self::State, symbol: Symbol) {
        if self.order == 0 {
            return;
        }
        if state.len() == self.order {
            state.remove(0);
        }
        state.push(symbol);
    }

    fn predict(&self, state: &Self::State) -> Distribution {
        let row = (0..=state.len())
            .filter_map(|skip| self.counts.get(&state[skip..]))
            .find(|row| row.iter().any(|&c| c > 0));
        match row {
            Some(row) => {
                let weights = row.iter().map(|&c| c as f32 + self.alpha).collect();
                Distribution::from_weights(weights)
                    .unwrap_or_else(|_| Distribution::uniform(self.alphabet))
            }
            None => Distribution::uniform(self.alphabet),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfitted_model_is_uniform() {
        let m = NGramPredictor::new(2, 1.0, 4).unwrap();
        assert!((m.entropy_at(&[1, 2]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn deterministic_context_has_low_entropy() {
        let mut m = NGramPredictor::new(1, 0.0, 4).unwrap();
        m.fit(&[vec![0, 1, 0, 1, 0, 1, 0, 1]]).unwrap();
        // After a 0 the model has only ever seen a 1.
        assert_eq!(m.entropy_at(&[0]), 0.0);
        assert_eq!(m.distribution_at(&[0]).prob(1), 1.0);
    }

    #[test]
    fn unseen_context_backs_off_to_unigram() {
        let mut m = NGramPredictor::new(2, 0.0, 4).unwrap();
        m.fit(&[vec![0, 1, 0, 1]]).unwrap();
        let d = m.distribution_at(&[3, 3]);
        assert!((d.prob(0) - 0.5).abs() < 1e-6);
        assert!((d.prob(1) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn smoothing_keeps_every_symbol_possible() {
        let mut m = NGramPredictor::new(1, 0.5, 3).unwrap();
        m.fit(&[vec![0, 0, 0]]).unwrap();
        let d = m.distribution_at(&[0]);
        assert!(d.iter().all(|&p| p > 0.0));
    }

    #[test]
    fn rejects_out_of_alphabet_symbols() {
        let mut m = NGramPredictor::new(1, 1.0, 4).unwrap();
        assert!(matches!(
            m.fit(&[vec![0, 9]]),
            Err(EntropyError::InvalidSymbol { symbol: 9, position: 1, .. })
        ));
        assert!(NGramPredictor::new(1, -1.0, 4).is_err());
    }

    #[test]
    fn deserialization_checks_count_rows() {
        let mut counts: HashMap<Vec<Symbol>, Vec<u32>> = HashMap::new();
        counts.insert(vec![1], vec![1, 2, 3]);
        let bytes = bincode::serialize(&(1usize, 0.5f32, 4usize, counts)).unwrap();
        assert!(bincode::deserialize::<NGramPredictor>(&bytes).is_err());
    }

    #[test]
    fn trace_matches_prefix_queries() {
        let mut m = NGramPredictor::new(2, 0.1, 8).unwrap();
        let corpus = vec![vec![1, 2, 3, 1, 2, 4, 1, 2, 3]];
        m.fit(&corpus).unwrap();
        let stream = [1, 2, 3, 5, 1, 2];
        let trace = m.entropy_trace(&stream);
        for i in 0..stream.len() {
            assert!((trace[i] - m.entropy_at(&stream[..i])).abs() < 1e-6);
        }
    }
}
