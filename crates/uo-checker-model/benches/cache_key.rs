// SPDX-License-Identifier: Apache-2.0

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use uo_checker_model::{canonical_prefecture, CacheKey};

fn bench_cache_key(c: &mut Criterion) {
    c.bench_function("cache_key_kanji", |b| {
        b.iter(|| CacheKey::new(black_box("兵庫県"), black_box("サバ")))
    });
    c.bench_function("cache_key_romaji_with_macron", |b| {
        b.iter(|| CacheKey::new(black_box("Hyōgo Prefecture"), black_box("Horse Mackerel")))
    });
    c.bench_function("canonical_prefecture_unknown", |b| {
        b.iter(|| canonical_prefecture(black_box("Springfield")))
    });
}

criterion_group!(benches, bench_cache_key);
criterion_main!(benches);
