use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageBuffer, Rgb};
use jpegtrim::processing::{decode_jpeg, encode_jpeg, resize_to_width};
use std::path::Path;

fn sample_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    }))
}

fn benchmark_resize(c: &mut Criterion) {
    let image = sample_image(2000, 1500);
    c.bench_function("resize 2000x1500 -> 640 (lanczos3)", |b| {
        b.iter(|| resize_to_width(black_box(&image), 640, Path::new("bench.jpg")).unwrap())
    });
}

fn benchmark_pipeline(c: &mut Criterion) {
    let path = Path::new("bench.jpg");
    let source = encode_jpeg(&sample_image(1600, 1200), 95, path).unwrap();
    c.bench_function("decode+resize+encode 1600x1200 -> 800", |b| {
        b.iter(|| {
            let image = decode_jpeg(black_box(&source), path).unwrap();
            let resized = resize_to_width(&image, 800, path).unwrap();
            encode_jpeg(&resized, 85, path).unwrap()
        })
    });
}

criterion_group!(benches, benchmark_resize, benchmark_pipeline);
criterion_main!(benches);
