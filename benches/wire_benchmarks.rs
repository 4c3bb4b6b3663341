// ABOUTME: Benchmarks for the wire codec's request decode path and the replace pipeline's compositing

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use facedetect::vision::{replace_faces, ImageCodec, JpegCodec, Rect};
use facedetect::wire::{read_request, write_request, Request};
use std::time::Duration;

fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let codec = JpegCodec;
    codec.encode(&image::DynamicImage::new_rgb8(width, height)).unwrap()
}

fn bench_decode_request(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("decode_request");
    for size in [1_000usize, 50_000, 500_000] {
        let image = vec![0xFFu8; size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &image, |b, image| {
            b.iter(|| {
                runtime.block_on(async {
                    let (mut client, mut server) = tokio::io::duplex(size + 1024);
                    let request = Request::detect(Bytes::from(image.clone()));
                    write_request(&mut client, &request).await.unwrap();
                    black_box(read_request(&mut server, 0).await.unwrap());
                })
            })
        });
    }
    group.finish();
}

fn bench_replace_faces(c: &mut Criterion) {
    let codec = JpegCodec;
    let primary = sample_jpeg(256, 256);
    let secondary = sample_jpeg(64, 64);
    let faces = vec![Rect { x: 20, y: 20, width: 64, height: 64 }];

    c.bench_function("replace_faces_single_face", |b| {
        b.iter(|| black_box(replace_faces(&codec, &faces, &primary, &secondary).unwrap()))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_decode_request, bench_replace_faces
}
criterion_main!(benches);
