//! Benchmarks for ring lookups and membership changes.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use hashloop::{HashKind, Ring, RingConfig};

fn populated_ring(nodes: usize, hasher: HashKind) -> Ring<String> {
    let ring = Ring::with_config(&RingConfig::fixed(160).with_hasher(hasher));
    ring.set((0..nodes).map(|i| format!("cache-{i}")));
    ring
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    for hasher in [HashKind::Crc32, HashKind::Fnv1a, HashKind::Blake3] {
        let ring = populated_ring(64, hasher);
        group.bench_with_input(BenchmarkId::from_parameter(hasher), &ring, |b, ring| {
            let mut i = 0u32;
            b.iter(|| {
                i = i.wrapping_add(1);
                ring.get(&i.to_le_bytes())
            });
        });
    }
    group.finish();
}

fn bench_get_n(c: &mut Criterion) {
    let ring = populated_ring(64, HashKind::Crc32);
    let mut group = c.benchmark_group("get_n");
    for n in [2usize, 3, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut i = 0u32;
            b.iter(|| {
                i = i.wrapping_add(1);
                ring.get_n(&i.to_le_bytes(), n)
            });
        });
    }
    group.finish();
}

fn bench_add_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_remove");
    for nodes in [8usize, 64, 256] {
        let ring = populated_ring(nodes, HashKind::Crc32);
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &ring, |b, ring| {
            b.iter(|| {
                ring.add("extra".to_string());
                ring.remove("extra");
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_get, bench_get_n, bench_add_remove);
criterion_main!(benches);
