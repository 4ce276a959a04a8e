use core::hash::BuildHasher;
use core::hint::black_box;

use criterion::Criterion;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use robin_hash::HashMap;
use robin_hash::RobinMap;
use siphasher::sip::SipHasher;

#[derive(Clone, Default)]
struct SipBuilder;

impl BuildHasher for SipBuilder {
    type Hasher = SipHasher;

    fn build_hasher(&self) -> Self::Hasher {
        SipHasher::new_with_keys(0x5155_3044, 0x1BAD_B002)
    }
}

const SIZES: &[usize] = &[
    ((1 << 10) as f32 * 0.87) as usize,
    ((1 << 15) as f32 * 0.87) as usize,
    ((1 << 19) as f32 * 0.87) as usize,
];

fn keys_for(size: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(size as u64);
    let mut keys = Vec::with_capacity(size);
    while keys.len() < size {
        let key: u64 = rng.random();
        if key != 0 {
            keys.push(key);
        }
    }
    keys
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for &size in SIZES {
        let keys = keys_for(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("robin_hash_sentinel/{}", size), |b| {
            b.iter(|| {
                let mut map: HashMap<u64, u64> = HashMap::new();
                for &key in &keys {
                    map.insert(key, key);
                }
                black_box(map)
            })
        });

        group.bench_function(format!("robin_hash_sentinel_preallocated/{}", size), |b| {
            b.iter(|| {
                let mut map: HashMap<u64, u64> = HashMap::with_capacity(size);
                for &key in &keys {
                    map.insert(key, key);
                }
                black_box(map)
            })
        });

        group.bench_function(format!("robin_hash_robin/{}", size), |b| {
            b.iter(|| {
                let mut map: RobinMap<u64, u64, SipBuilder> = RobinMap::new();
                for &key in &keys {
                    map.insert(key, key);
                }
                black_box(map)
            })
        });

        group.bench_function(format!("hashbrown/{}", size), |b| {
            b.iter(|| {
                let mut map: hashbrown::HashMap<u64, u64, SipBuilder> =
                    hashbrown::HashMap::with_hasher(SipBuilder);
                for &key in &keys {
                    map.insert(key, key);
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

fn bench_lookup_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_hit");

    for &size in SIZES {
        let keys = keys_for(size);
        group.throughput(Throughput::Elements(size as u64));

        let mut sentinel: HashMap<u64, u64> = HashMap::with_capacity(size);
        let mut robin: RobinMap<u64, u64, SipBuilder> = RobinMap::with_capacity(size);
        let mut brown: hashbrown::HashMap<u64, u64, SipBuilder> =
            hashbrown::HashMap::with_capacity_and_hasher(size, SipBuilder);
        for &key in &keys {
            sentinel.insert(key, key);
            robin.insert(key, key);
            brown.insert(key, key);
        }

        group.bench_function(format!("robin_hash_sentinel/{}", size), |b| {
            b.iter(|| {
                let mut hits = 0u64;
                for &key in &keys {
                    if sentinel.contains_key(black_box(key)) {
                        hits += 1;
                    }
                }
                black_box(hits)
            })
        });

        group.bench_function(format!("robin_hash_robin/{}", size), |b| {
            b.iter(|| {
                let mut hits = 0u64;
                for key in &keys {
                    if robin.contains_key(black_box(key)) {
                        hits += 1;
                    }
                }
                black_box(hits)
            })
        });

        group.bench_function(format!("hashbrown/{}", size), |b| {
            b.iter(|| {
                let mut hits = 0u64;
                for key in &keys {
                    if brown.contains_key(black_box(key)) {
                        hits += 1;
                    }
                }
                black_box(hits)
            })
        });
    }

    group.finish();
}

fn bench_lookup_miss(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_miss");

    for &size in SIZES {
        let keys = keys_for(size);
        let missing: Vec<u64> = keys.iter().map(|k| k.wrapping_add(1) | 1).collect();
        group.throughput(Throughput::Elements(size as u64));

        let mut sentinel: HashMap<u64, u64> = HashMap::with_capacity(size);
        let mut robin: RobinMap<u64, u64, SipBuilder> = RobinMap::with_capacity(size);
        for &key in &keys {
            sentinel.insert(key, key);
            robin.insert(key, key);
        }

        group.bench_function(format!("robin_hash_sentinel/{}", size), |b| {
            b.iter(|| {
                let mut hits = 0u64;
                for &key in &missing {
                    if sentinel.contains_key(black_box(key)) {
                        hits += 1;
                    }
                }
                black_box(hits)
            })
        });

        group.bench_function(format!("robin_hash_robin/{}", size), |b| {
            b.iter(|| {
                let mut hits = 0u64;
                for key in &missing {
                    if robin.contains_key(black_box(key)) {
                        hits += 1;
                    }
                }
                black_box(hits)
            })
        });
    }

    group.finish();
}

fn bench_insert_remove_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");

    for &size in SIZES {
        let keys = keys_for(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("robin_hash_sentinel/{}", size), |b| {
            let mut map: HashMap<u64, u64> = HashMap::with_capacity(size);
            for &key in &keys {
                map.insert(key, key);
            }
            b.iter(|| {
                for &key in &keys {
                    map.remove(key);
                    map.insert(key, key);
                }
                black_box(map.len())
            })
        });

        group.bench_function(format!("robin_hash_robin/{}", size), |b| {
            let mut map: RobinMap<u64, u64, SipBuilder> = RobinMap::with_capacity(size);
            for &key in &keys {
                map.insert(key, key);
            }
            b.iter(|| {
                for key in &keys {
                    map.remove(key);
                    map.insert(*key, *key);
                }
                black_box(map.len())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_lookup_hit,
    bench_lookup_miss,
    bench_insert_remove_churn
);
criterion_main!(benches);
