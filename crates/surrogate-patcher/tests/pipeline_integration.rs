//! Integration tests for predictor → patcher.
//!
//! Real predictors produce the traces here, so these cover the same path the
//! codec pipeline takes for every payload item.

use surrogate_entropy::{
    entropy_traces, ByteTokenizer, EntropyPredictor, NGramPredictor, RecurrentPredictor,
    ALPHABET_SIZE,
};
use surrogate_patcher::{
    segment_on_whitespace, DynamicPatcher, PatchSequence, PatcherConfig, ThresholdMode,
};

fn payloads() -> Vec<&'static str> {
    vec![
        "x0: 0.5, x1: 1.25, x2: -3.0",
        "",
        "x0: 12.0. HPOB algorithm 5971 on dataset 10093",
        "a",
    ]
}

#[test]
fn predicted_traces_tile_for_every_mode() {
    let tok = ByteTokenizer::default();
    let streams: Vec<_> = payloads().iter().map(|p| tok.encode_str(p)).collect();
    let rnn = RecurrentPredictor::new(ALPHABET_SIZE, 16, 42).unwrap();
    let traces = entropy_traces(&rnn, &streams);

    for threshold in [
        ThresholdMode::Global { threshold: 7.5 },
        ThresholdMode::Relative { delta: 0.05 },
    ] {
        for max_patch_len in [1, 3, 8] {
            let patcher = DynamicPatcher::new(PatcherConfig { max_patch_len, threshold }).unwrap();
            let batch = patcher.segment_batch(&streams, &traces).unwrap();
            for (stream, seq) in streams.iter().zip(&batch) {
                seq.verify_tiling(stream.len(), max_patch_len).unwrap();
            }
        }
    }
}

#[test]
fn trained_model_gives_longer_patches_on_familiar_text() {
    let tok = ByteTokenizer::default();
    let text = "x0: 0.5, x1: 0.5, x2: 0.5, x3: 0.5";
    let mut model = NGramPredictor::new(4, 1e-3, ALPHABET_SIZE).unwrap();
    model.fit(&[tok.encode_str(text)]).unwrap();

    let patcher = DynamicPatcher::new(PatcherConfig {
        max_patch_len: 64,
        threshold: ThresholdMode::Global { threshold: 2.0 },
    })
    .unwrap();

    let familiar = tok.encode_str(text);
    let novel = tok.encode(&[9, 201, 33, 180, 77, 5, 250, 61, 140, 12, 99, 3]);
    let a = patcher.segment(&familiar, &model.entropy_trace(&familiar)).unwrap();
    let b = patcher.segment(&novel, &model.entropy_trace(&novel)).unwrap();

    let mean = |s: &PatchSequence, n: usize| n as f32 / s.len() as f32;
    assert!(mean(&a, familiar.len()) > mean(&b, novel.len()));
}

#[test]
fn whitespace_and_entropy_patching_agree_on_ids_length() {
    let tok = ByteTokenizer::default();
    let stream = tok.encode_str("x0: 1.5, x1: 2.25");
    let ws = segment_on_whitespace(&stream, 6);
    assert_eq!(ws.patch_ids().len(), stream.len());
    assert_eq!(PatchSequence::from_start_mask(&ws.start_mask()).unwrap(), ws);
}
