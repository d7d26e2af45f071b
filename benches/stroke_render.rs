use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ink_layers::ink::capture::{CaptureConfig, StrokeCapture};
use ink_layers::ink::model::{Color, CommittedLayer, Point, PointerKind, StrokeStyle};
use ink_layers::ink::pointer::PointerSample;
use ink_layers::ink::render::{CachedLayer, LayerBuffer};

const SIZE: (u32, u32) = (1024, 768);

fn build_layer(strokes: u32, points: i32, width: u32) -> CommittedLayer {
    let mut capture = StrokeCapture::new(CaptureConfig {
        commit_style: StrokeStyle {
            width,
            color: Color::rgb(0, 0, 0),
        },
        ..CaptureConfig::default()
    });
    let mut layer = CommittedLayer::default();
    for i in 0..strokes {
        let y = (i as i32 * 7) % SIZE.1 as i32;
        let x0 = (i as i32 * 13) % 200;
        capture.handle(&PointerSample::down(i, PointerKind::Pen, (x0, y)), &mut layer);
        for p in 1..points {
            let point = (x0 + p * 8, y + (p % 5) * 3);
            capture.handle(&PointerSample::update(i, PointerKind::Pen, point), &mut layer);
        }
        capture.handle(&PointerSample::up(i, PointerKind::Pen, (x0 + points * 8, y)), &mut layer);
    }
    layer
}

fn bench_committed_rebuild(c: &mut Criterion) {
    let layer = build_layer(200, 60, 3);
    let mut cache = CachedLayer::new(Color::rgba(1, 0, 0, 255));
    c.bench_function("committed_rebuild_200_strokes", |b| {
        b.iter(|| {
            cache.invalidate();
            black_box(cache.refresh(
                layer.strokes(),
                layer.revision(),
                SIZE,
                Point::new(0, 0),
            ))
        })
    });
}

fn bench_committed_cached(c: &mut Criterion) {
    let layer = build_layer(200, 60, 3);
    let mut cache = CachedLayer::new(Color::rgba(1, 0, 0, 255));
    cache.refresh(layer.strokes(), layer.revision(), SIZE, Point::new(0, 0));
    c.bench_function("committed_unchanged_revision", |b| {
        b.iter(|| {
            black_box(cache.refresh(
                layer.strokes(),
                layer.revision(),
                SIZE,
                Point::new(0, 0),
            ))
        })
    });
}

fn bench_wide_strokes(c: &mut Criterion) {
    let layer = build_layer(50, 60, 16);
    let mut buffer = LayerBuffer::new(SIZE, Color::rgba(1, 0, 0, 255));
    c.bench_function("draw_wide_strokes", |b| {
        b.iter(|| {
            buffer.clear_all();
            for stroke in layer.strokes() {
                buffer.draw_stroke(black_box(stroke), Point::new(0, 0), None);
            }
        })
    });
}

fn bench_present(c: &mut Criterion) {
    let layer = build_layer(100, 40, 3);
    let mut buffer = LayerBuffer::new(SIZE, Color::rgba(1, 0, 0, 255));
    for stroke in layer.strokes() {
        buffer.draw_stroke(stroke, Point::new(0, 0), None);
    }
    let mut bgra = vec![0u8; (SIZE.0 * SIZE.1 * 4) as usize];
    c.bench_function("copy_to_bgra_full", |b| {
        b.iter(|| buffer.copy_to_bgra(black_box(&mut bgra), None))
    });
}

criterion_group!(
    benches,
    bench_committed_rebuild,
    bench_committed_cached,
    bench_wide_strokes,
    bench_present
);
criterion_main!(benches);
