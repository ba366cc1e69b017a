use criterion::{Criterion, criterion_group, criterion_main};
use recall::Document;
use recall::embeddings::{ChunkUnit, ChunkingConfig, chunk_document};
use std::hint::black_box;

const PARAGRAPH: &str = "Retrieval augmented generation looks up relevant passages before \
    answering. Each passage is embedded once and stored with its source. At query time the \
    question is embedded too, and the nearest passages are handed to the model! Does overlap \
    help? Usually, because a sentence split across windows still appears whole in one of them.\n\n";

pub fn criterion_benchmark(c: &mut Criterion) {
    let document = Document::with_id("bench", PARAGRAPH.repeat(200));

    for unit in [ChunkUnit::Chars, ChunkUnit::Words, ChunkUnit::Sentences] {
        let config = ChunkingConfig {
            chunk_size: match unit {
                ChunkUnit::Chars => 1000,
                ChunkUnit::Words => 200,
                ChunkUnit::Sentences => 8,
            },
            overlap: match unit {
                ChunkUnit::Chars => 200,
                ChunkUnit::Words => 40,
                ChunkUnit::Sentences => 2,
            },
            unit,
        };
        c.bench_function(&format!("chunking_{:?}", unit).to_lowercase(), |b| {
            b.iter(|| chunk_document(black_box(&document), black_box(&config)));
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
