// Keying throughput at common capture sizes

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hue_key::{BackgroundImage, Compositor, Frame, HueClass, KeyConfig};
use image::{Rgba, RgbaImage};

/// Frame with horizontal bands of blue, red, yellow and gray
fn banded_frame(width: u32, height: u32) -> Frame {
    let bands = [
        [20, 30, 220, 255],
        [220, 40, 30, 255],
        [230, 220, 20, 255],
        [90, 90, 90, 255],
    ];
    let mut frame = Frame::blank(width, height);
    for y in 0..height {
        let color = bands[(y * 4 / height.max(1)) as usize % 4];
        for x in 0..width {
            frame.set_pixel(x, y, color);
        }
    }
    frame
}

fn background(width: u32, height: u32, value: u8) -> Arc<BackgroundImage> {
    let image = RgbaImage::from_pixel(width, height, Rgba([value, value / 2, 255 - value, 255]));
    Arc::new(BackgroundImage::from_rgba(image, "bench").expect("non-empty background"))
}

fn benchmark_compositor(c: &mut Criterion) {
    let mut group = c.benchmark_group("compositor");

    let config = KeyConfig::new()
        .with_background(HueClass::Blue, background(1920, 1080, 40))
        .with_background(HueClass::Red, background(1280, 720, 120))
        .with_background(HueClass::Yellow, background(800, 800, 200));

    for (width, height) in [(640, 480), (1080, 1440)] {
        let frame = banded_frame(width, height);
        let mut compositor = Compositor::new();
        // Fit backgrounds once outside the measured loop
        compositor.process(&frame, &config).expect("first pass");

        group.throughput(Throughput::Elements(width as u64 * height as u64));
        group.bench_with_input(
            BenchmarkId::new("process", format!("{}x{}", width, height)),
            &frame,
            |b, frame| {
                b.iter(|| {
                    let outputs = compositor.process(black_box(frame), &config).expect("process");
                    black_box(outputs.combined().data.len());
                });
            },
        );
    }

    group.finish();
}

fn benchmark_cover_fit(c: &mut Criterion) {
    let image = RgbaImage::from_pixel(1920, 1080, Rgba([10, 20, 30, 255]));
    c.bench_function("cover_fit_1920x1080_to_1080x1440", |b| {
        b.iter(|| hue_key::keying::cover_fit(black_box(&image), 1080, 1440).expect("fit"));
    });
}

criterion_group!(benches, benchmark_compositor, benchmark_cover_fit);
criterion_main!(benches);
