use rayon::prelude::*;

use crate::{Distribution, EntropyTrace, Symbol, SymbolStream};

/// A causal next-symbol model used as an uncertainty oracle.
///
/// Implementations expose their incremental state so that a whole entropy
/// trace is one left-to-right fold: predict from the state, then advance the
/// state with the symbol that was actually observed. The prediction for
/// position `i` therefore only ever sees symbols `0..i`.
///
/// Parameters are read-only once constructed; every method takes `&self`.
pub trait EntropyPredictor: Send + Sync {
    /// Per-stream accumulator carried across positions.
    type State: Clone + Send;

    fn alphabet_size(&self) -> usize;

    /// State before any symbol has been observed.
    fn initial_state(&self) -> Self::State;

    /// Fold one observed symbol into the state.
    fn advance(&self, state: &mut Self::State, symbol: Symbol);

    /// Distribution over the next symbol given everything folded so far.
    fn predict(&self, state: &Self::State) -> Distribution;

    fn distribution_at(&self, prefix: &[Symbol]) -> Distribution {
        let state = prefix.iter().fold(self.initial_state(), |mut state, &symbol| {
            self.advance(&mut state, symbol);
            state
        });
        self.predict(&state)
    }

    /// Entropy (bits) of the next-symbol distribution after `prefix`.
    fn entropy_at(&self, prefix: &[Symbol]) -> f32 {
        self.distribution_at(prefix).entropy_bits()
    }

    /// `entropy_at(&stream[..i])` for every `i in 0..stream.len()`, in one pass.
    fn entropy_trace(&self, stream: &[Symbol]) -> EntropyTrace {
        let (_, trace) = stream.iter().fold(
            (self.initial_state(), Vec::with_capacity(stream.len())),
            |(mut state, mut trace), &symbol| {
                trace.push(self.predict(&state).entropy_bits());
                self.advance(&mut state, symbol);
                (state, trace)
            },
        );
        EntropyTrace::new(trace)
    }
}

/// Entropy traces for independent streams, one rayon task per stream.
pub fn entropy_traces<P>(predictor: &P, streams: &[SymbolStream]) -> Vec<EntropyTrace>
where
    P: EntropyPredictor + ?Sized,
{
    streams
        .par_iter()
        .map(|stream| predictor.entropy_trace(stream))
        .collect()
}

/// Fixed distribution regardless of context. Useful as a baseline and in tests.
#[derive(Debug, Clone)]
pub struct UniformPredictor {
    alphabet: usize,
}

impl UniformPredictor {
    pub fn new(alphabet: usize) -> Self {
        Self { alphabet }
    }
}

impl EntropyPredictor for UniformPredictor {
    type State = ();

    fn alphabet_size(&self) -> usize {
        self.alphabet
    }

    fn initial_state(&self) -> Self::State {}

    fn advance(&self, _state: &mut Self::State, _symbol: Symbol) {}

    fn predict(&self, _state: &Self::State) -> Distribution {
        Distribution::uniform(self.alphabet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ALPHABET_SIZE;

    #[test]
    fn uniform_trace_is_flat() {
        let p = UniformPredictor::new(ALPHABET_SIZE);
        let trace = p.entropy_trace(&[1, 2, 3]);
        assert_eq!(trace.len(), 3);
        let expected = (ALPHABET_SIZE as f32).log2();
        assert!(trace.iter().all(|h| (h - expected).abs() < 1e-3));
    }

    #[test]
    fn empty_stream_has_empty_trace() {
        let p = UniformPredictor::new(4);
        assert!(p.entropy_trace(&[]).is_empty());
    }

    #[test]
    fn batch_traces_keep_order() {
        let p = UniformPredictor::new(4);
        let streams = vec![
            SymbolStream::from_bytes(b"a"),
            SymbolStream::from_bytes(b"abc"),
            SymbolStream::default(),
        ];
        let traces = entropy_traces(&p, &streams);
        let lens: Vec<usize> = traces.iter().map(|t| t.len()).collect();
        assert_eq!(lens, vec![1, 3, 0]);
    }
}
