//! Criterion benchmarks for per-byte newline translation.
//!
//! The relay translates every byte individually, so this is the hot path
//! between two readiness events.
//!
//! Run with:
//! ```bash
//! cargo bench --package serialtalk-core --bench translate_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serialtalk_core::{InboundCarriageReturn, OutboundNewline, TranslationPolicy};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn text_payload() -> Vec<u8> {
    b"AT+CGMI\nOK\r\nAT+CSQ\n+CSQ: 21,99\r\n"
        .iter()
        .copied()
        .cycle()
        .take(4096)
        .collect()
}

fn policies() -> [(&'static str, TranslationPolicy); 3] {
    [
        ("none", TranslationPolicy::default()),
        (
            "expand",
            TranslationPolicy {
                outbound: OutboundNewline::CrLf,
                inbound: InboundCarriageReturn::CrLf,
            },
        ),
        (
            "replace",
            TranslationPolicy {
                outbound: OutboundNewline::Cr,
                inbound: InboundCarriageReturn::Lf,
            },
        ),
    ]
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_outbound(c: &mut Criterion) {
    let payload = text_payload();
    let mut group = c.benchmark_group("outbound");
    for (name, policy) in policies() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &payload, |b, data| {
            b.iter(|| {
                let mut written = 0usize;
                for &byte in data {
                    written += policy.outbound(black_box(byte)).as_slice().len();
                }
                written
            })
        });
    }
    group.finish();
}

fn bench_inbound(c: &mut Criterion) {
    let payload = text_payload();
    let mut group = c.benchmark_group("inbound");
    for (name, policy) in policies() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &payload, |b, data| {
            b.iter(|| {
                let mut written = 0usize;
                for &byte in data {
                    written += policy.inbound(black_box(byte)).as_slice().len();
                }
                written
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_outbound, bench_inbound);
criterion_main!(benches);
