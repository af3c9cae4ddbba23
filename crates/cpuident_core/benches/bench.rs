use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cpuident_core::{
    decode::{decode_brand, decode_cache_entry, decode_extended_features, decode_features, decode_stepping, decode_vendor},
    identify_with, invoke::leaf, NativeInvoker, RawLeafResult, TableInvoker,
};

const LEAF0: RawLeafResult = RawLeafResult::new(0x16, 0x756E_6547, 0x6C65_746E, 0x4965_6E69);
const LEAF1: RawLeafResult = RawLeafResult::new(0x0005_06E3, 0x0210_0800, 0x7FFA_FBBF, 0xBFEB_FBFF);
const LEAF4: RawLeafResult = RawLeafResult::new(0x1C03_C163, 0x03C0_003F, 0x1FFF, 6);
const LEAF7: RawLeafResult = RawLeafResult::new(0, 0x029C_6FBF, 0x4000_0000, 0xBC00_0400);
const BRAND: [RawLeafResult; 3] = [
    RawLeafResult::new(0x6574_6E49, 0x2952_286C, 0x726F_4320, 0x4D54_2865),
    RawLeafResult::new(0x3769_2029, 0x3037_362D, 0x4320_4B30, 0x4020_5550),
    RawLeafResult::new(0x302E_3420, 0x7A48_4730, 0, 0),
];

fn decode_benchmark(c: &mut Criterion) {
    c.bench_function("decode: vendor", |b| b.iter(|| decode_vendor(black_box(LEAF0))));
    c.bench_function("decode: stepping", |b| b.iter(|| decode_stepping(black_box(LEAF1))));
    c.bench_function("decode: features", |b| b.iter(|| decode_features(black_box(LEAF1))));
    c.bench_function("decode: extended features", |b| b.iter(|| decode_extended_features(black_box(LEAF7))));
    c.bench_function("decode: cache entry", |b| b.iter(|| decode_cache_entry(black_box(LEAF4))));
    c.bench_function("decode: brand", |b| b.iter(|| decode_brand(black_box(&BRAND))));
}

fn aggregate_benchmark(c: &mut Criterion) {
    let table = TableInvoker::new()
        .with(leaf::VENDOR, 0, LEAF0)
        .with(leaf::VERSION_AND_FEATURES, 0, LEAF1)
        .with(leaf::CACHE_PARAMETERS, 0, LEAF4)
        .with(leaf::EXTENDED_FEATURES, 0, LEAF7)
        .with(leaf::EXTENDED_MAX, 0, RawLeafResult::new(0x8000_0008, 0, 0, 0))
        .with(leaf::BRAND_STRING[0], 0, BRAND[0])
        .with(leaf::BRAND_STRING[1], 0, BRAND[1])
        .with(leaf::BRAND_STRING[2], 0, BRAND[2]);

    c.bench_function("aggregate: table", |b| b.iter(|| identify_with(black_box(&table))));

    if let Ok(native) = NativeInvoker::new() {
        c.bench_function("aggregate: native", |b| b.iter(|| identify_with(&native)));
    }
}

criterion_group!(benches, decode_benchmark, aggregate_benchmark);
criterion_main!(benches);
