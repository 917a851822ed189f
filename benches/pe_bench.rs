//! Benchmarks for PE header decoding.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Cursor;
use win32_surface::pe::PeHeaders;

#[path = "../tests/common/mod.rs"]
mod common;

use common::ImageBuilder;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("pe_parse");

    let images = [
        ("native32", ImageBuilder::dll32().build()),
        ("native64", ImageBuilder::dll64().build()),
        ("managed", ImageBuilder::dll32().managed(0x1).build()),
    ];
    for (name, image) in images.iter() {
        group.throughput(Throughput::Bytes(image.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), image, |b, image| {
            b.iter(|| PeHeaders::parse(black_box(image)))
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let image = ImageBuilder::dll64().managed(0x1).build();
    let headers = PeHeaders::parse(&image).unwrap();

    c.bench_function("pe_kind", |b| b.iter(|| black_box(&headers).kind()));
    c.bench_function("pe_read_cursor", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(&image[..]));
            PeHeaders::read(&mut cursor)
        })
    });
}

criterion_group!(benches, bench_parse, bench_classify);
criterion_main!(benches);
