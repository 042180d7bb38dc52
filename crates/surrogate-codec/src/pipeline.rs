//! Batch codec: scalars through the numeric codec, payloads through the
//! entropy model, the patcher and the hierarchical encoder.
//!
//! ```text
//!   RawItem::Scalar ─────► NumericCodec ─────────────────────────────► Numeric
//!
//!   RawItem::Payload ─► ByteTokenizer ─► EntropyPredictor ─► DynamicPatcher
//!                                                                │
//!                 Embedding ◄── global stage (padded batch) ◄── local stage
//! ```
//!
//! Every stage before the global one runs per item, in parallel across the
//! batch. The global stage sees the surviving payloads as one padded batch.

use std::sync::Arc;
use std::time::Instant;

use ndarray::Array2;
use rayon::prelude::*;
use surrogate_encoder::{Embedding, HierarchicalEncoder, PaddedPatches};
use surrogate_entropy::{entropy_traces, ByteTokenizer, EntropyPredictor, SymbolStream, ALPHABET_SIZE};
use surrogate_numeric::{NumericCodec, NumericEncoding};
use surrogate_patcher::{DynamicPatcher, PatchSequence};
use tracing::{debug, info};

use crate::config::CodecConfig;
use crate::error::{CodecError, Result};

/// One input to [`CodecPipeline::encode_batch`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    Scalar(f64),
    Payload(Vec<u8>),
}

impl From<f64> for RawItem {
    fn from(value: f64) -> Self {
        RawItem::Scalar(value)
    }
}

impl From<Vec<u8>> for RawItem {
    fn from(bytes: Vec<u8>) -> Self {
        RawItem::Payload(bytes)
    }
}

impl From<&[u8]> for RawItem {
    fn from(bytes: &[u8]) -> Self {
        RawItem::Payload(bytes.to_vec())
    }
}

impl From<String> for RawItem {
    fn from(text: String) -> Self {
        RawItem::Payload(text.into_bytes())
    }
}

impl From<&str> for RawItem {
    fn from(text: &str) -> Self {
        RawItem::Payload(text.as_bytes().to_vec())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EncodedItem {
    Numeric(NumericEncoding),
    Embedding {
        embedding: Embedding,
        patches: PatchSequence,
    },
}

impl EncodedItem {
    pub fn as_numeric(&self) -> Option<&NumericEncoding> {
        match self {
            EncodedItem::Numeric(enc) => Some(enc),
            EncodedItem::Embedding { .. } => None,
        }
    }

    pub fn as_embedding(&self) -> Option<&Embedding> {
        match self {
            EncodedItem::Embedding { embedding, .. } => Some(embedding),
            EncodedItem::Numeric(_) => None,
        }
    }
}

/// Summary of one [`CodecPipeline::encode_batch`] call.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub items: usize,
    pub scalars: usize,
    pub payloads: usize,
    /// Patches across all successfully encoded payloads.
    pub patches: usize,
    /// Scalars whose exponent was clamped to the configured range.
    pub clamped: usize,
    pub failures: usize,
    /// Wall-clock duration of the batch in milliseconds.
    pub duration_ms: u64,
}

/// Owns one instance of every stage. The predictor is shared, typically
/// handed out by a [`surrogate_entropy::PredictorRegistry`].
pub struct CodecPipeline<P: EntropyPredictor> {
    config: CodecConfig,
    numeric: NumericCodec,
    tokenizer: ByteTokenizer,
    predictor: Arc<P>,
    patcher: DynamicPatcher,
    encoder: HierarchicalEncoder,
}

impl<P: EntropyPredictor> CodecPipeline<P> {
    /// Validates `config` and builds every stage; encoder parameters are
    /// freshly initialized from `config.encoder.seed`.
    pub fn new(config: CodecConfig, predictor: Arc<P>) -> Result<Self> {
        config.validate()?;
        let encoder = HierarchicalEncoder::new(config.encoder.clone())?;
        Self::with_encoder(config, predictor, encoder)
    }

    /// Like [`CodecPipeline::new`] with already trained encoder parameters.
    /// The encoder's own config replaces `config.encoder`.
    pub fn with_encoder(mut config: CodecConfig, predictor: Arc<P>, encoder: HierarchicalEncoder) -> Result<Self> {
        config.encoder = encoder.config().clone();
        config.validate()?;
        if predictor.alphabet_size() < ALPHABET_SIZE {
            return Err(CodecError::Config(format!(
                "predictor alphabet ({}) cannot hold the {ALPHABET_SIZE}-symbol alphabet",
                predictor.alphabet_size()
            )));
        }
        Ok(Self {
            numeric: NumericCodec::new(config.numeric.clone())?,
            tokenizer: ByteTokenizer::new(config.tokenizer.clone()),
            patcher: DynamicPatcher::new(config.patcher.clone())?,
            predictor,
            encoder,
            config,
        })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn numeric(&self) -> &NumericCodec {
        &self.numeric
    }

    pub fn encoder(&self) -> &HierarchicalEncoder {
        &self.encoder
    }

    pub fn encode_scalar(&self, value: f64) -> NumericEncoding {
        self.numeric.encode(value)
    }

    pub fn decode_numeric(&self, tokens: &[u32]) -> Result<f64> {
        Ok(self.numeric.decode(tokens)?)
    }

    pub fn tokenize(&self, payload: &[u8]) -> SymbolStream {
        self.tokenizer.encode(payload)
    }

    /// Patch sequence the pipeline would use for `payload`.
    pub fn segment(&self, payload: &[u8]) -> Result<(SymbolStream, PatchSequence)> {
        let stream = self.tokenizer.encode(payload);
        let trace = self.predictor.entropy_trace(&stream);
        let patches = self.patcher.segment(&stream, &trace)?;
        Ok((stream, patches))
    }

    pub fn encode_payload(&self, payload: &[u8]) -> Result<(Embedding, PatchSequence)> {
        let (stream, patches) = self.segment(payload)?;
        let embedding = self.encoder.encode(&stream, &patches)?;
        Ok((embedding, patches))
    }

    /// Encodes a mixed batch. Results line up with `items`; a failing item
    /// does not affect the others.
    pub fn encode_batch(&self, items: &[RawItem]) -> (Vec<Result<EncodedItem>>, BatchReport) {
        let t0 = Instant::now();
        let mut report = BatchReport {
            items: items.len(),
            ..Default::default()
        };

        let mut slots: Vec<Option<Result<EncodedItem>>> = Vec::with_capacity(items.len());
        let mut payloads: Vec<(usize, SymbolStream)> = Vec::new();
        for (i, item) in items.iter().enumerate() {
            match item {
                RawItem::Scalar(value) => {
                    report.scalars += 1;
                    let enc = self.numeric.encode(*value);
                    if enc.is_clamped() {
                        report.clamped += 1;
                    }
                    slots.push(Some(Ok(EncodedItem::Numeric(enc))));
                }
                RawItem::Payload(bytes) => {
                    report.payloads += 1;
                    payloads.push((i, self.tokenizer.encode(bytes)));
                    slots.push(None);
                }
            }
        }
        debug!(items = report.items, payloads = report.payloads, "encoding batch");

        let (positions, streams): (Vec<usize>, Vec<SymbolStream>) = payloads.into_iter().unzip();
        let traces = entropy_traces(self.predictor.as_ref(), &streams);
        let staged: Vec<Result<(PatchSequence, Array2<f32>)>> = streams
            .par_iter()
            .zip(traces.par_iter())
            .map(|(stream, trace)| -> Result<(PatchSequence, Array2<f32>)> {
                let patches = self.patcher.segment(stream, trace)?;
                let vectors = self.encoder.local_stage(stream, &patches)?;
                Ok((patches, vectors))
            })
            .collect();

        let mut pooled = Vec::new();
        let mut rows = Vec::new();
        for (slot, result) in positions.into_iter().zip(staged) {
            match result {
                Ok((patches, vectors)) => {
                    pooled.push((slot, patches));
                    rows.push(vectors);
                }
                Err(e) => slots[slot] = Some(Err(e)),
            }
        }

        let padded = PaddedPatches::from_rows(&rows, self.encoder.config().d_model);
        let embeddings = self.encoder.pool_padded(&padded);
        for ((slot, patches), embedding) in pooled.into_iter().zip(embeddings.outer_iter()) {
            report.patches += patches.len();
            slots[slot] = Some(Ok(EncodedItem::Embedding {
                embedding: embedding.to_owned(),
                patches,
            }));
        }

        let results: Vec<Result<EncodedItem>> = slots.into_iter().flatten().collect();
        debug_assert_eq!(results.len(), items.len());
        report.failures = results.iter().filter(|r| r.is_err()).count();
        report.duration_ms = t0.elapsed().as_millis() as u64;

        info!(
            items = report.items,
            scalars = report.scalars,
            payloads = report.payloads,
            patches = report.patches,
            clamped = report.clamped,
            failures = report.failures,
            duration_ms = report.duration_ms,
            "codec batch complete"
        );
        (results, report)
    }
}
