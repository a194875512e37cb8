//! Benchmarks for the resize pipeline.
//!
//! Run with: cargo bench -p resizer-core

use std::io::{Cursor, Write};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use resizer_core::config::{Config, LimitsConfig};
use resizer_core::pipeline::{ImageDecoder, PadTransform};
use resizer_core::{JobRequest, Pipeline, TransformParams};

fn params() -> TransformParams {
    TransformParams::new(900, 1200, 0.15)
}

fn benchmark_pad_upscale(c: &mut Criterion) {
    let img = DynamicImage::new_rgb8(640, 640);
    let transform = PadTransform::new(&params());

    c.bench_function("pad_640_to_900x1200", |b| {
        b.iter(|| {
            let _ = transform.pad(black_box(&img));
        })
    });
}

fn benchmark_pad_downscale(c: &mut Criterion) {
    let img = DynamicImage::new_rgb8(3000, 2800);
    let transform = PadTransform::new(&params());

    c.bench_function("pad_3000x2800_to_900x1200", |b| {
        b.iter(|| {
            let _ = transform.pad(black_box(&img));
        })
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.png");
    RgbImage::from_pixel(1024, 1024, Rgb([10, 120, 200]))
        .save(&path)
        .unwrap();
    let decoder = ImageDecoder::new(LimitsConfig::default());

    c.bench_function("decode_png_1024", |b| {
        b.iter(|| {
            let _ = decoder.decode(black_box(&path));
        })
    });
}

fn benchmark_archive_job(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.paths.work_dir = dir.path().join("work");
    config.paths.output_dir = dir.path().join("outgoing");
    let pipeline = Pipeline::new(config);

    let mut encoded = Cursor::new(Vec::new());
    RgbImage::from_pixel(400, 400, Rgb([90, 90, 90]))
        .write_to(&mut encoded, ImageFormat::Jpeg)
        .unwrap();
    let encoded = encoded.into_inner();

    c.bench_function("archive_job_8_images", |b| {
        b.iter(|| {
            let archive = dir.path().join("bench.zip");
            let mut zip = zip::ZipWriter::new(std::fs::File::create(&archive).unwrap());
            for i in 0..8 {
                zip.start_file(format!("img{i}.jpg"), zip::write::FileOptions::default())
                    .unwrap();
                zip.write_all(&encoded).unwrap();
            }
            zip.finish().unwrap();

            let _ = pipeline.run(black_box(JobRequest::new(archive, params())));
        })
    });
}

criterion_group!(
    benches,
    benchmark_pad_upscale,
    benchmark_pad_downscale,
    benchmark_decode,
    benchmark_archive_job
);
criterion_main!(benches);
