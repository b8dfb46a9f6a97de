//! Benchmarks for the per-frame CPU work.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use organism::draw::DrawList;
use organism::spatial::{SpatialConfig, SpatialIndex};
use organism::{InputEvent, MemoryGraph, Organism, OrganismConfig, Vec2};

const DT: f32 = 1.0 / 60.0;

fn scattered(count: usize) -> Vec<Vec2> {
    (0..count)
        .map(|i| {
            let t = i as f32 * 0.618_034;
            Vec2::new((t * 997.0) % 800.0, (t * 613.0) % 600.0)
        })
        .collect()
}

fn bench_spatial(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial");

    for count in [100, 500, 1000] {
        let points = scattered(count);

        group.bench_with_input(BenchmarkId::new("rebuild", count), &points, |b, points| {
            let mut index = SpatialIndex::new(SpatialConfig::default());
            b.iter(|| {
                index.clear();
                for (i, &p) in points.iter().enumerate() {
                    index.insert(p, i);
                }
                black_box(index.len())
            })
        });

        group.bench_with_input(BenchmarkId::new("query", count), &points, |b, points| {
            let mut index = SpatialIndex::new(SpatialConfig::default());
            for (i, &p) in points.iter().enumerate() {
                index.insert(p, i);
            }
            let mut out = Vec::new();
            b.iter(|| {
                for &p in points.iter().step_by(10) {
                    index.query_into(p, 40.0, &mut out);
                    black_box(out.len());
                }
            })
        });
    }

    group.finish();
}

fn bench_organism(c: &mut Criterion) {
    let mut group = c.benchmark_group("organism");

    group.bench_function("update", |b| {
        let graph = MemoryGraph::builtin().unwrap();
        let mut org =
            Organism::with_seed(graph, OrganismConfig::default(), 800.0, 600.0, 7).unwrap();
        org.start();
        let mut frame = 0u32;
        b.iter(|| {
            frame = frame.wrapping_add(1);
            let t = frame as f32 * 0.02;
            org.handle_input(InputEvent::PointerMove {
                pos: Vec2::new(400.0 + 180.0 * t.cos(), 300.0 + 120.0 * t.sin()),
            });
            org.update(black_box(DT));
        })
    });

    group.bench_function("draw", |b| {
        let graph = MemoryGraph::builtin().unwrap();
        let mut org =
            Organism::with_seed(graph, OrganismConfig::default(), 800.0, 600.0, 7).unwrap();
        org.start();
        for _ in 0..120 {
            org.update(DT);
        }
        let mut canvas = DrawList::new(800.0, 600.0);
        b.iter(|| {
            org.draw(&mut canvas);
            black_box(canvas.commands().len())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_spatial, bench_organism);
criterion_main!(benches);
