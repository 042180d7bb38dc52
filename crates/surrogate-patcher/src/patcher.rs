//! **DynamicPatcher** turns an entropy trace into variable-length patches.
//!
//! ```text
//!   entropy   0.2 0.3 1.8 0.1 0.4 0.2 0.1 2.0 0.3 0.2 0.1 0.1
//!   signal            ▲                   ▲            (global, τ = 1.5)
//!   m = 5     [0 ······ 3)[3 ············ 8)[8 ······· 12)
//!   m = 4     [0 ······ 3)[3 ········ 7)[7 8)[8 ······· 12)
//! ```
//!
//! A single left-to-right pass. The current patch closes after position `i`
//! when the threshold signal fires at `i`, when it reaches `max_patch_len`, or
//! at the end of the stream. Every patch is therefore non-empty, at most
//! `max_patch_len` long, and the patches tile `[0, N)` exactly.

use rayon::prelude::*;
use surrogate_entropy::{EntropyTrace, Symbol, SymbolStream};
use tracing::trace;

use crate::config::PatcherConfig;
use crate::error::PatchError;
use crate::patch::{Patch, PatchSequence};

#[derive(Debug, Clone)]
pub struct DynamicPatcher {
    config: PatcherConfig,
}

impl DynamicPatcher {
    pub fn new(config: PatcherConfig) -> Result<Self, PatchError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PatcherConfig {
        &self.config
    }

    /// Segments `stream` given its entropy trace. The two must be aligned
    /// index for index.
    pub fn segment(&self, stream: &[Symbol], trace: &[f32]) -> Result<PatchSequence, PatchError> {
        if stream.len() != trace.len() {
            return Err(PatchError::TraceLengthMismatch {
                stream: stream.len(),
                trace:  trace.len(),
            });
        }
        Ok(self.segment_trace(trace))
    }

    /// Segmentation depends only on the trace; this skips the length check.
    pub fn segment_trace(&self, trace: &[f32]) -> PatchSequence {
        let max = self.config.max_patch_len;
        let n = trace.len();
        let mut patches = Vec::with_capacity(n / max + 1);
        let mut start = 0;

        for i in 0..n {
            let len = i - start + 1;
            if i + 1 == n || len == max || self.config.threshold.fires(trace, i) {
                patches.push(Patch::new(start, i + 1));
                start = i + 1;
            }
        }

        let seq = PatchSequence::from_patches(patches);
        debug_assert!(
            seq.verify_tiling(n, max).is_ok(),
            "patcher produced a non-tiling sequence for {n} symbols"
        );
        trace!(
            symbols = n,
            patches = seq.len(),
            mode = self.config.threshold.name(),
            "segmented stream"
        );
        seq
    }

    /// Segments independent streams in parallel. Output order matches input.
    pub fn segment_batch(
        &self,
        streams: &[SymbolStream],
        traces: &[EntropyTrace],
    ) -> Result<Vec<PatchSequence>, PatchError> {
        if streams.len() != traces.len() {
            return Err(PatchError::TraceLengthMismatch {
                stream: streams.len(),
                trace:  traces.len(),
            });
        }
        streams
            .par_iter()
            .zip(traces.par_iter())
            .map(|(stream, trace)| self.segment(stream, trace))
            .collect()
    }
}

/// One-shot segmentation with an explicit config.
pub fn segment(
    stream: &[Symbol],
    trace: &[f32],
    config: &PatcherConfig,
) -> Result<PatchSequence, PatchError> {
    DynamicPatcher::new(config.clone())?.segment(stream, trace)
}
