//! Registry benchmarks using criterion.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sparse_ecs::{Entity, Prototype, Registry, exists, not};

#[derive(Clone, Copy, Debug, Default)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Debug, Default)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Debug, Default)]
struct Frozen;

fn populate(registry: &mut Registry, count: usize) -> Vec<Entity> {
    (0..count)
        .map(|i| {
            let e = registry.create_entity().unwrap();
            registry.assign_component(e, Position::default());
            if i % 2 == 0 {
                registry.assign_component(
                    e,
                    Velocity {
                        x: 1.0,
                        y: 0.5,
                        z: 0.0,
                    },
                );
            }
            if i % 8 == 0 {
                registry.assign_component(e, Frozen);
            }
            e
        })
        .collect()
}

fn spawn_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");

    for count in [1, 100, 1000, 10000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("empty", count), &count, |b, &count| {
            b.iter(|| {
                let mut registry = Registry::new();
                for _ in 0..count {
                    black_box(registry.create_entity().unwrap());
                }
            });
        });

        group.bench_with_input(
            BenchmarkId::new("with_position", count),
            &count,
            |b, &count| {
                b.iter(|| {
                    let mut registry = Registry::new();
                    for _ in 0..count {
                        let e = registry.create_entity().unwrap();
                        registry.assign_component(e, Position::default());
                        black_box(e);
                    }
                });
            },
        );

        let proto = Prototype::new()
            .component(Position::default())
            .component(Velocity::default());
        group.bench_with_input(
            BenchmarkId::new("from_prototype", count),
            &count,
            |b, &count| {
                b.iter(|| {
                    let mut registry = Registry::new();
                    for _ in 0..count {
                        black_box(registry.create_entity_from(&proto).unwrap());
                    }
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("recycle", count), &count, |b, &count| {
            let mut registry = Registry::new();
            b.iter(|| {
                let spawned: Vec<_> = (0..count)
                    .map(|_| registry.create_entity().unwrap())
                    .collect();
                for e in spawned {
                    registry.destroy_entity(e);
                }
            });
        });
    }

    group.finish();
}

fn component_access_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("component_access");

    let mut registry = Registry::new();
    let entities = populate(&mut registry, 10000);

    group.throughput(Throughput::Elements(entities.len() as u64));

    group.bench_function("get_component", |b| {
        b.iter(|| {
            for &e in &entities {
                black_box(registry.get_component::<Position>(e).unwrap());
            }
        });
    });

    group.bench_function("find_component_sparse", |b| {
        b.iter(|| {
            for &e in &entities {
                black_box(registry.find_component::<Velocity>(e));
            }
        });
    });

    group.bench_function("get_components_pair", |b| {
        b.iter(|| {
            for &e in &entities {
                black_box(registry.find_components::<(Position, Velocity)>(e));
            }
        });
    });

    group.finish();
}

fn iteration_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration");

    for count in [100, 1000, 10000] {
        let mut registry = Registry::new();
        populate(&mut registry, count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("joined", count), &count, |b, _| {
            b.iter(|| {
                registry.for_joined_components::<(Position, Velocity), _>(|_, (pos, vel)| {
                    pos.x += vel.x;
                    pos.y += vel.y;
                    pos.z += vel.z;
                });
            });
        });

        group.bench_with_input(BenchmarkId::new("joined_filtered", count), &count, |b, _| {
            b.iter(|| {
                registry.for_joined_components_filtered::<(Position, Velocity), _, _>(
                    !exists::<Frozen>(),
                    |_, (pos, vel)| {
                        pos.x += vel.x;
                    },
                );
            });
        });

        group.bench_with_input(BenchmarkId::new("each_entity", count), &count, |b, _| {
            b.iter(|| {
                let mut seen = 0usize;
                registry
                    .for_each_entity_filtered(not(exists::<Velocity>()), |_| seen += 1)
                    .unwrap();
                black_box(seen);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    spawn_benchmarks,
    component_access_benchmarks,
    iteration_benchmarks
);
criterion_main!(benches);
