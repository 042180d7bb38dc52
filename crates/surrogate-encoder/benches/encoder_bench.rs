use criterion::{black_box, criterion_group, criterion_main, Criterion};
use surrogate_encoder::{EncoderConfig, HierarchicalEncoder};
use surrogate_entropy::SymbolStream;
use surrogate_patcher::{DynamicPatcher, PatchSequence, PatcherConfig, ThresholdMode};

fn fixture(len: usize) -> (SymbolStream, PatchSequence) {
    let bytes: Vec<u8> = (0..len).map(|i| b'a' + (i * 7 % 26) as u8).collect();
    let stream = SymbolStream::from_bytes(&bytes);
    let trace: Vec<f32> = (0..len).map(|i| ((i as f32) * 0.37).sin().abs() * 3.0).collect();
    let patcher = DynamicPatcher::new(PatcherConfig {
        max_patch_len: 16,
        threshold: ThresholdMode::Global { threshold: 2.5 },
    })
    .unwrap();
    let patches = patcher.segment_trace(&trace);
    (stream, patches)
}

fn bench_encode_512(c: &mut Criterion) {
    let enc = HierarchicalEncoder::new(EncoderConfig::default()).unwrap();
    let (stream, patches) = fixture(512);
    c.bench_function("encode_512", |b| {
        b.iter(|| enc.encode(black_box(&stream), black_box(&patches)))
    });
}

fn bench_encode_batch_16x256(c: &mut Criterion) {
    let enc = HierarchicalEncoder::new(EncoderConfig::default()).unwrap();
    let (streams, patches): (Vec<_>, Vec<_>) = (0..16).map(|i| fixture(128 + i * 16)).unzip();
    c.bench_function("encode_batch_16x256", |b| {
        b.iter(|| enc.encode_batch(black_box(&streams), black_box(&patches)))
    });
}

fn bench_default_embedding(c: &mut Criterion) {
    let enc = HierarchicalEncoder::new(EncoderConfig::default()).unwrap();
    c.bench_function("default_embedding", |b| b.iter(|| enc.default_embedding()));
}

criterion_group!(benches, bench_encode_512, bench_encode_batch_16x256, bench_default_embedding);
criterion_main!(benches);
