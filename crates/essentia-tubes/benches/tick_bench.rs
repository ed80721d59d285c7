//! Criterion benchmarks for the tube network tick.
//!
//! - `columns`: 64 jar/tube/reservoir columns, 8 tubes each.
//! - `buffer_grid`: a 16x16 sheet of tubes fed by buffered sources.

use criterion::{Criterion, criterion_group, criterion_main};
use essentia_core::event::NullSink;
use essentia_core::grid::{Face, GridPos};
use essentia_core::test_utils::*;
use essentia_tubes::{EssentiaWorld, TubeNode};

// ===========================================================================
// World builders
// ===========================================================================

fn build_columns() -> EssentiaWorld {
    let mut world = EssentiaWorld::default();
    for x in 0..8 {
        for z in 0..8 {
            let (x, z) = (x * 2, z * 2);
            world.place_container(GridPos::new(x, 0, z), jar()).unwrap();
            for y in 1..=8 {
                world
                    .place_tube(GridPos::new(x, y, z), TubeNode::standard())
                    .unwrap();
            }
            world
                .place_container(GridPos::new(x, 9, z), reservoir_with(aer(), 500))
                .unwrap();
        }
    }
    world
}

fn build_buffer_grid() -> EssentiaWorld {
    let mut world = EssentiaWorld::default();
    for x in 0..16 {
        for z in 0..16 {
            world
                .place_tube(GridPos::new(x, 1, z), TubeNode::standard())
                .unwrap();
        }
    }
    for x in 0..16 {
        let buffer = GridPos::new(x, 1, -1);
        world
            .place_tube(buffer, TubeNode::new_buffer().with_cargo(aer()))
            .unwrap();
        world
            .place_bellows(buffer.offset(Face::North), Face::South)
            .unwrap();
        world
            .place_container(GridPos::new(x, 0, 15), jar())
            .unwrap();
    }
    world
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_columns(c: &mut Criterion) {
    let mut group = c.benchmark_group("columns");
    group.sample_size(50);

    let mut world = build_columns();
    group.bench_function("64_columns_8_tubes", |b| {
        b.iter(|| world.tick(&mut NullSink));
    });

    group.finish();
}

fn bench_buffer_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_grid");
    group.sample_size(30);

    let mut world = build_buffer_grid();
    group.bench_function("16x16_sheet", |b| {
        b.iter(|| world.tick(&mut NullSink));
    });

    group.finish();
}

criterion_group!(benches, bench_columns, bench_buffer_grid);
criterion_main!(benches);
