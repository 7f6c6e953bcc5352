use criterion::{criterion_group, criterion_main, Criterion};
use red::{Budget, CompilerBuilder, Flags, Style};

const HAYSTACK: &str = include_str!("./input_1.txt");

fn compile_benchmark(c: &mut Criterion) {
    c.bench_function("compile_word_and_number_patterns", |b| {
        b.iter(|| {
            let program = CompilerBuilder::new()
                .budget(Budget::unlimited())
                .add(r"[a-zA-Z_][a-zA-Z0-9_]*", 1, Flags::empty())
                .add(r"[0-9]+", 2, Flags::empty())
                .add(r"[ \t\r\n]+", 3, Flags::empty())
                .compile()
                .unwrap();
            std::hint::black_box(program);
        });
    });
}

fn match_benchmark(c: &mut Criterion) {
    let program = CompilerBuilder::new()
        .budget(Budget::unlimited())
        .add(r"[a-zA-Z_][a-zA-Z0-9_]*", 1, Flags::empty())
        .add(r"[0-9]+", 2, Flags::empty())
        .add(r"[ \t\r\n]+", 3, Flags::empty())
        .compile()
        .unwrap();

    c.bench_function("scan_haystack", |b| {
        b.iter(|| {
            let mut pos = 0usize;
            let bytes = HAYSTACK.as_bytes();
            let mut count = 0usize;
            while pos < bytes.len() {
                let outcome = program.match_at(&bytes[pos..], Style::Last);
                if outcome.is_match() && outcome.end > 0 {
                    pos += outcome.end;
                    count += 1;
                } else {
                    pos += 1;
                }
            }
            std::hint::black_box(count);
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(50);
    targets = compile_benchmark, match_benchmark
}

criterion_main!(benches);
