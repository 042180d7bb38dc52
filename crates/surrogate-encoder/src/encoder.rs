use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use surrogate_entropy::{Symbol, SymbolStream};
use surrogate_patcher::PatchSequence;
use tracing::debug;

use crate::config::EncoderConfig;
use crate::global::GlobalPooler;
use crate::local::LocalEncoder;
use crate::{EncoderError, Result};

/// Fixed-size output vector for one stream.
pub type Embedding = Array1<f32>;

/// Ragged patch vectors padded to the longest sequence in a batch.
///
/// Padding rows are the zero vector (the "empty patch") and are `false` in
/// `mask`; the global stage never attends to them.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedPatches {
    /// `(batch, max_patches, d_model)`
    pub vectors: Array3<f32>,
    /// `(batch, max_patches)`, `true` for real patches.
    pub mask: Array2<bool>,
}

impl PaddedPatches {
    pub fn from_rows(rows: &[Array2<f32>], d_model: usize) -> Self {
        let max = rows.iter().map(|r| r.nrows()).max().unwrap_or(0);
        let mut vectors = Array3::zeros((rows.len(), max, d_model));
        let mut mask = Array2::from_elem((rows.len(), max), false);
        for (b, r) in rows.iter().enumerate() {
            let n = r.nrows();
            vectors
                .index_axis_mut(Axis(0), b)
                .slice_mut(ndarray::s![..n, ..])
                .assign(r);
            mask.row_mut(b).slice_mut(ndarray::s![..n]).fill(true);
        }
        Self { vectors, mask }
    }

    pub fn batch_size(&self) -> usize {
        self.vectors.len_of(Axis(0))
    }

    pub fn max_patches(&self) -> usize {
        self.vectors.len_of(Axis(1))
    }

    pub fn item(&self, b: usize) -> (ArrayView2<'_, f32>, Vec<bool>) {
        (self.vectors.index_axis(Axis(0), b), self.mask.row(b).to_vec())
    }
}

/// Two-level encoder: patch-local transformer, then cross-attention pooling
/// over the patch vectors.
///
/// Parameters are immutable after construction; one instance can serve any
/// number of threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchicalEncoder {
    config: EncoderConfig,
    local: LocalEncoder,
    global: GlobalPooler,
}

impl HierarchicalEncoder {
    /// Freshly initialized parameters, deterministic in `config.seed`.
    pub fn new(config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let local = LocalEncoder::new(&mut rng, &config);
        let global = GlobalPooler::new(&mut rng, &config);
        Ok(Self { config, local, global })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn embedding_dim(&self) -> usize {
        self.global.embedding_dim()
    }

    /// Checks a caller-supplied patch sequence against `stream`.
    pub fn validate(&self, stream: &[Symbol], patches: &PatchSequence) -> Result<()> {
        patches.verify_tiling(stream.len(), usize::MAX)?;
        let max = self.config.max_patch_len;
        if let Some((index, p)) = patches.iter().enumerate().find(|(_, p)| p.len() > max) {
            return Err(EncoderError::PatchTooLong { index, len: p.len(), max });
        }
        let vocab_size = self.config.vocab_size;
        if let Some((position, &symbol)) =
            stream.iter().enumerate().find(|&(_, &s)| s as usize >= vocab_size)
        {
            return Err(EncoderError::SymbolOutOfRange { symbol, position, vocab_size });
        }
        Ok(())
    }

    /// Patch vectors for one stream, `(patches, d_model)`.
    pub fn local_stage(&self, stream: &[Symbol], patches: &PatchSequence) -> Result<Array2<f32>> {
        self.validate(stream, patches)?;
        Ok(self.local.encode_patches(stream, patches))
    }

    /// Pools patch vectors; `mask` marks padding rows as `false`.
    pub fn global_stage(&self, vectors: &Array2<f32>, mask: Option<&[bool]>) -> Result<Embedding> {
        if vectors.ncols() != self.config.d_model {
            return Err(EncoderError::InvalidConfig(format!(
                "patch vectors have width {}, expected d_model {}",
                vectors.ncols(),
                self.config.d_model
            )));
        }
        if let Some(mask) = mask {
            if mask.len() != vectors.nrows() {
                return Err(EncoderError::MaskMismatch {
                    rows: vectors.nrows(),
                    mask: mask.len(),
                });
            }
        }
        Ok(self.global.forward(vectors, mask))
    }

    pub fn encode(&self, stream: &[Symbol], patches: &PatchSequence) -> Result<Embedding> {
        let vectors = self.local_stage(stream, patches)?;
        Ok(self.global.forward(&vectors, None))
    }

    /// The embedding of an empty stream: the pooling queries attending over
    /// an empty key set.
    pub fn default_embedding(&self) -> Embedding {
        self.global
            .forward(&Array2::zeros((0, self.config.d_model)), None)
    }

    /// Encodes a ragged batch; row `b` of the result is the embedding of
    /// `streams[b]`. The first invalid item fails the whole call.
    pub fn encode_batch(&self, streams: &[SymbolStream], patches: &[PatchSequence]) -> Result<Array2<f32>> {
        if streams.len() != patches.len() {
            return Err(EncoderError::BatchMismatch {
                streams: streams.len(),
                patches: patches.len(),
            });
        }
        let rows = streams
            .par_iter()
            .zip(patches.par_iter())
            .map(|(s, p)| self.local_stage(s, p))
            .collect::<Result<Vec<_>>>()?;
        let padded = PaddedPatches::from_rows(&rows, self.config.d_model);
        debug!(
            batch = padded.batch_size(),
            max_patches = padded.max_patches(),
            "encoding padded batch"
        );
        Ok(self.pool_padded(&padded))
    }

    /// Global stage over an already padded batch.
    pub fn pool_padded(&self, padded: &PaddedPatches) -> Array2<f32> {
        let embeddings: Vec<Embedding> = (0..padded.batch_size())
            .into_par_iter()
            .map(|b| {
                let (vectors, mask) = padded.item(b);
                self.global.forward(&vectors.to_owned(), Some(mask.as_slice()))
            })
            .collect();
        let mut out = Array2::zeros((embeddings.len(), self.embedding_dim()));
        for (mut dst, src) in out.axis_iter_mut(Axis(0)).zip(&embeddings) {
            dst.assign(src);
        }
        out
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decodes parameters written by [`HierarchicalEncoder::to_bytes`] and
    /// checks every array against the embedded config.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let encoder: Self = bincode::deserialize(bytes)?;
        encoder.config.validate()?;
        encoder.local.check_shape(&encoder.config)?;
        encoder.global.check_shape(&encoder.config)?;
        Ok(encoder)
    }
}
