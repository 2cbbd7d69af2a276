// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the prepress-engine crate: spread scoring on a
// large page list and a full validate() run with the null probe.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use prepress_core::{
    Binding, FileType, OrderOptions, PreflightConfig, SizeMm, SpreadWeights, ValidationOptions,
};
use prepress_document::SamplePdf;
use prepress_engine::spread::{SpreadSignals, classify};
use prepress_engine::{NullProbe, Preflight, ToolLimiter};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Measure and score 2000 pages, the configured page limit.
fn bench_spread_scoring(c: &mut Criterion) {
    let order = OrderOptions {
        size: SizeMm::new(216.0, 303.0),
        page_count: 4000,
        binding: Binding::Perfect,
        bleed: 3.0,
        paper_thickness: None,
    };
    let pages = vec![SizeMm::new(432.0, 303.0); 2000];
    let weights = SpreadWeights::default();

    c.bench_function("spread measure+classify (2000 pages)", |b| {
        b.iter(|| {
            let signals = SpreadSignals::measure(black_box(&pages), &order);
            black_box(classify(&signals, &weights));
        });
    });
}

/// Full pipeline on a 32-page file with every auxiliary feature present.
fn bench_validate(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let engine = Preflight::new(PreflightConfig::default(), NullProbe, ToolLimiter::new(2));
    let data = SamplePdf::new()
        .pages_mm(32, 216.0, 303.0)
        .separation("PANTONE 485 C")
        .blend_mode("Multiply")
        .image(300, 300, 25.4, 25.4)
        .build()
        .expect("sample PDF should serialise");
    let options = ValidationOptions {
        file_type: FileType::Content,
        order_options: OrderOptions {
            size: SizeMm::new(210.0, 297.0),
            page_count: 32,
            binding: Binding::Saddle,
            bleed: 3.0,
            paper_thickness: None,
        },
        max_file_size: None,
        max_pages: None,
    };

    c.bench_function("validate (32 pages, null probe)", |b| {
        b.iter(|| black_box(runtime.block_on(engine.validate(black_box(&data), &options))));
    });
}

criterion_group!(benches, bench_spread_scoring, bench_validate);
criterion_main!(benches);
