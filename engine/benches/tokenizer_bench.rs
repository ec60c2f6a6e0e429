use criterion::{criterion_group, criterion_main, Criterion};
use engine::tokenizer::stems;

fn bench_stems(c: &mut Criterion) {
    let text = "The quick brown fox jumps over the lazy dog. ".repeat(500);
    c.bench_function("stems_paragraphs", |b| b.iter(|| stems(&text)));
}

criterion_group!(benches, bench_stems);
criterion_main!(benches);
