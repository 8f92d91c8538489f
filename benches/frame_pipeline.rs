//! Frame Pipeline Benchmarks
//!
//! Measures overlay placement and software compositing per camera frame at
//! common capture resolutions.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{Rgba, RgbaImage};
use tryon_overlay::capture::VideoFrame;
use tryon_overlay::compositor::{Compositor, SoftwareSurface};
use tryon_overlay::landmarks::{HandLandmark, LANDMARK_COUNT, RING_FINGER_MCP, RING_FINGER_PIP};
use tryon_overlay::overlay::{FramePipeline, OverlayImage, SmoothingState};
use tryon_overlay::LandmarkSet;

/// Camera frame with a gradient pattern
fn generate_frame(width: u32, height: u32) -> VideoFrame {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            ((x * 255) / width.max(1)) as u8,
            ((y * 255) / height.max(1)) as u8,
            128,
            255,
        ])
    });
    VideoFrame::from_rgba(0, image)
}

/// Ring artwork: opaque band with a transparent centre
fn generate_ring(size: u32) -> OverlayImage {
    let centre = size as f32 / 2.0;
    let pixels = RgbaImage::from_fn(size, size, |x, y| {
        let d = ((x as f32 - centre).powi(2) + (y as f32 - centre).powi(2)).sqrt();
        if d > centre * 0.6 && d < centre {
            Rgba([212, 175, 55, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    OverlayImage::from_pixels("bench-ring", pixels)
}

fn hand(joint_y: f64) -> LandmarkSet {
    let mut points = vec![HandLandmark::new(0.5, 0.9); LANDMARK_COUNT];
    points[RING_FINGER_MCP] = HandLandmark::new(0.45, 0.6);
    points[RING_FINGER_PIP] = HandLandmark::new(0.47, joint_y);
    LandmarkSet::from_points(points).expect("21 points")
}

/// Placement only: geometry, scale and smoothing
fn bench_pipeline_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_step");
    let pipeline = FramePipeline::default();
    let hands = [hand(0.45), hand(0.47), hand(0.43)];

    group.bench_function("tracking", |b| {
        let mut state = SmoothingState::new();
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % hands.len();
            black_box(pipeline.step(&mut state, Some(black_box(&hands[i])), 1280.0, 720.0, 1.0))
        })
    });

    group.bench_function("hand_lost", |b| {
        let mut state = SmoothingState::new();
        b.iter(|| black_box(pipeline.step(&mut state, None, 1280.0, 720.0, 1.0)))
    });

    group.finish();
}

/// Full composite onto the software surface
fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    group.sample_size(20);

    let resolutions = [(640, 480, "480p"), (1280, 720, "720p")];
    let compositor = Compositor::default();
    let pipeline = FramePipeline::default();
    let ring = generate_ring(128);

    for (width, height, name) in resolutions {
        let frame = generate_frame(width, height);
        let mut state = SmoothingState::new();
        let placement = pipeline.step(
            &mut state,
            Some(&hand(0.45)),
            f64::from(width),
            f64::from(height),
            1.0,
        );

        group.throughput(Throughput::Elements(u64::from(width * height)));

        group.bench_with_input(BenchmarkId::new("frame_only", name), &frame, |b, frame| {
            let mut surface = SoftwareSurface::new(width, height);
            b.iter(|| black_box(compositor.render(&mut surface, black_box(frame), None, None)))
        });

        group.bench_with_input(BenchmarkId::new("with_ring", name), &frame, |b, frame| {
            let mut surface = SoftwareSurface::new(width, height);
            b.iter(|| {
                black_box(compositor.render(
                    &mut surface,
                    black_box(frame),
                    placement.as_ref(),
                    Some(&ring),
                ))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pipeline_step, bench_render);
criterion_main!(benches);
