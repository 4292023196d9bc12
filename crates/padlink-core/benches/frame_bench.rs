//! Criterion benchmarks for the padlink frame codec and negotiation.
//!
//! A client streams state frames every few milliseconds, so decoding has to
//! stay far below that.
//!
//! Run with:
//! ```bash
//! cargo bench --package padlink-core --bench frame_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use padlink_core::{AliasTable, ControlValue, Layout};

// ── Layout fixtures ───────────────────────────────────────────────────────────

const LAYOUTS: &[(&str, &str)] = &[
    ("minimal", "j1,b1"),
    ("gamepad", "t1,t2,a1,a2,b1,b2,b3,b4,b5,b6,b9,b10,dp"),
    (
        "wheel",
        "k1,pa,pb,pt,mx,my,mz,b1,b2,b3,b4,b5,b6,b7,b8,b9,b10,b11,b12,b13,b14,b15,b16",
    ),
];

fn frame_for(layout: &Layout) -> Vec<u8> {
    let values: Vec<ControlValue> = layout
        .capabilities()
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if c.is_axis() {
                ControlValue::Axis((i as u16 * 1021) & 0x7FFF)
            } else {
                ControlValue::Button(i % 2 == 0)
            }
        })
        .collect();
    layout.frame_format().encode(&values).expect("encode fixture")
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_decode(c: &mut Criterion) {
    let aliases = AliasTable::builtin();
    let mut group = c.benchmark_group("decode");
    for (name, negotiation) in LAYOUTS {
        let layout = Layout::negotiate(negotiation.as_bytes(), &aliases).expect("layout");
        let format = layout.frame_format();
        let frame = frame_for(&layout);
        group.bench_with_input(BenchmarkId::from_parameter(name), &frame, |b, frame| {
            b.iter(|| format.decode(black_box(frame)).expect("decode"))
        });
    }
    group.finish();
}

fn bench_negotiate(c: &mut Criterion) {
    let aliases = AliasTable::builtin();
    let mut group = c.benchmark_group("negotiate");
    for (name, negotiation) in LAYOUTS {
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            negotiation,
            |b, negotiation| {
                b.iter(|| Layout::negotiate(black_box(negotiation.as_bytes()), &aliases))
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_decode, bench_negotiate);
criterion_main!(benches);
