//! Integration tests for predictor persistence and shared lookup.
//!
//! Parameters are written to a temporary bincode blob, loaded back through the
//! registry and evaluated from several threads at once.

use std::sync::Arc;

use surrogate_entropy::{
    entropy_traces, ByteTokenizer, EntropyError, EntropyPredictor, NGramPredictor,
    PredictorRegistry, RecurrentPredictor, ALPHABET_SIZE,
};

// ─────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────

fn corpus() -> Vec<surrogate_entropy::SymbolStream> {
    let tok = ByteTokenizer::default();
    ["x0: 0.5, x1: 1.25", "x0: -3.0, x1: 0.125", "x0: 7.75, x1: 2.0"]
        .iter()
        .map(|s| tok.encode_str(s))
        .collect()
}

// ─────────────────────────────────────────────────────
// Load / save
// ─────────────────────────────────────────────────────

#[test]
fn recurrent_blob_round_trips_through_registry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rnn.bin");

    let original = RecurrentPredictor::new(ALPHABET_SIZE, 12, 99).unwrap();
    std::fs::write(&path, bincode::serialize(&original).unwrap()).unwrap();

    let reg = PredictorRegistry::<RecurrentPredictor>::new();
    let loaded = reg.load_file("rnn", &path).unwrap();

    let stream = ByteTokenizer::default().encode_str("hello");
    assert_eq!(original.entropy_trace(&stream), loaded.entropy_trace(&stream));
    assert_eq!(reg.list()[0].path.as_deref(), Some(path.as_path()));
}

#[test]
fn ngram_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ngram.bin");

    let mut model = NGramPredictor::new(2, 0.05, ALPHABET_SIZE).unwrap();
    model.fit(&corpus()).unwrap();

    let reg = PredictorRegistry::new();
    reg.insert("trained", model);
    reg.save_file("trained", &path).unwrap();

    let fresh = PredictorRegistry::<NGramPredictor>::new();
    let loaded = fresh.load_file("copy", &path).unwrap();
    let stream = ByteTokenizer::default().encode_str("x0: 1.0");
    let want = reg.get("trained").unwrap().entropy_trace(&stream);
    assert_eq!(loaded.entropy_trace(&stream), want);
}

#[test]
fn missing_or_corrupt_blob_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let reg = PredictorRegistry::<RecurrentPredictor>::new();

    let missing = reg.load_file("nope", dir.path().join("absent.bin"));
    assert!(matches!(missing, Err(EntropyError::Io(_))));

    let junk = dir.path().join("junk.bin");
    std::fs::write(&junk, [1u8, 2, 3]).unwrap();
    assert!(matches!(
        reg.load_file("junk", &junk),
        Err(EntropyError::Serialization(_))
    ));
    assert!(reg.names().is_empty());
}

#[test]
fn blob_with_mismatched_shapes_is_rejected() {
    use ndarray::{Array1, Array2};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad-shapes.bin");
    let hidden_mismatch = (
        Array2::<f32>::zeros((ALPHABET_SIZE, 4)),
        Array2::<f32>::zeros((3, 3)),
        Array1::<f32>::zeros(4),
        Array2::<f32>::zeros((4, ALPHABET_SIZE)),
        Array1::<f32>::zeros(ALPHABET_SIZE),
    );
    std::fs::write(&path, bincode::serialize(&hidden_mismatch).unwrap()).unwrap();

    let reg = PredictorRegistry::<RecurrentPredictor>::new();
    assert!(matches!(
        reg.load_file("bad", &path),
        Err(EntropyError::Serialization(_))
    ));
    assert!(reg.names().is_empty());
}

// ─────────────────────────────────────────────────────
// Sharing
// ─────────────────────────────────────────────────────

#[test]
fn trained_model_is_less_surprised_by_its_corpus() {
    let mut model = NGramPredictor::new(3, 1e-4, ALPHABET_SIZE).unwrap();
    let data = corpus();
    model.fit(&data).unwrap();

    let seen = model.entropy_trace(&data[0]).mean().unwrap();
    let noise = ByteTokenizer::default().encode(&[200, 13, 77, 180, 3, 250, 99, 41]);
    let unseen = model.entropy_trace(&noise).mean().unwrap();
    assert!(seen < unseen, "seen={seen} unseen={unseen}");
}

#[test]
fn shared_predictor_across_threads() {
    let reg = Arc::new(PredictorRegistry::new());
    reg.insert("rnn", RecurrentPredictor::new(ALPHABET_SIZE, 8, 5).unwrap());
    let streams = corpus();
    let expected = entropy_traces(reg.get("rnn").unwrap().as_ref(), &streams);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let reg = Arc::clone(&reg);
            let streams = streams.clone();
            std::thread::spawn(move || {
                let p = reg.get("rnn").unwrap();
                entropy_traces(p.as_ref(), &streams)
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), expected);
    }
}
