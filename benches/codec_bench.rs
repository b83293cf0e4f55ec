use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pixjoin::container;
use pixjoin::pixel::PixelCodec;
use pixjoin::{Item, PngSurface, TextScheme};
use serde_json::json;

fn bench_items() -> Vec<Item> {
    let mut items = Vec::new();
    for i in 0..64 {
        items.push(Item::blob(format!("blob_{i}.bin"), vec![i as u8; 16 * 1024]));
        items.push(Item::string(format!("note_{i}.txt"), "asdas asd asd啥地方 ".repeat(64)));
        items.push(Item::json(format!("obj_{i}.json"), json!({ "id": i, "tags": ["a", "b", "c"] })));
    }
    items
}

fn bench_container(c: &mut Criterion) {
    let items = bench_items();
    let buf = container::join(&items, None).unwrap().bytes;

    c.bench_function("join_192_items", |b| b.iter(|| container::join(black_box(&items), None).unwrap()));
    c.bench_function("split_192_items", |b| b.iter(|| container::split(black_box(&buf), None).unwrap()));
    c.bench_function("split_filtered", |b| {
        b.iter(|| container::split(black_box(&buf), Some(&["obj_7.json"])).unwrap())
    });
}

fn bench_text(c: &mut Criterion) {
    let text = "asdas asd asd啥地方 😀".repeat(4096);
    let legacy = TextScheme::Legacy.encode(&text);

    c.bench_function("legacy_encode_64k_chars", |b| b.iter(|| TextScheme::Legacy.encode(black_box(&text))));
    c.bench_function("legacy_decode_64k_chars", |b| b.iter(|| TextScheme::Legacy.decode(black_box(&legacy)).unwrap()));
}

fn bench_pixel(c: &mut Criterion) {
    let payload = vec![42u8; 1024 * 1024];
    let codec = PixelCodec::default();
    let frame = codec.pack(&payload, "bench.bin").unwrap();

    c.bench_function("pack_1mb", |b| b.iter(|| codec.pack(black_box(&payload), "bench.bin").unwrap()));
    c.bench_function("unpack_1mb", |b| b.iter(|| PixelCodec::unpack(black_box(&frame)).unwrap()));
    c.bench_function("png_encode_1mb", |b| {
        let mut surface = PngSurface::new();
        b.iter(|| codec.encode(&mut surface, black_box(&payload), "bench.bin").unwrap())
    });
}

criterion_group!(benches, bench_container, bench_text, bench_pixel);
criterion_main!(benches);
