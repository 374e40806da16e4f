use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lottie_core::animator::{Animator, KeyframeAnimator};
use lottie_data::{EasingHandle, Keyframe};

fn keyframes(count: usize) -> Vec<Keyframe<Vec<f32>>> {
    (0..count)
        .map(|i| Keyframe {
            t: i as f32,
            s: Some(vec![i as f32, (i * 2) as f32]),
            e: None,
            i: Some(EasingHandle { x: 0.4, y: 1.0 }),
            o: Some(EasingHandle { x: 0.6, y: 0.0 }),
            to: None,
            ti: None,
            h: false,
        })
        .collect()
}

fn bench_keyframe_animator(c: &mut Criterion) {
    let mut group = c.benchmark_group("KeyframeAnimator");

    // 10,000 eased keyframes.
    let count = 10_000;

    for &frame in &[100.5f32, 5000.5, 9990.5] {
        let animator = KeyframeAnimator::new(keyframes(count), |_| {}).expect("valid keyframes");
        group.bench_with_input(BenchmarkId::new("value_at", frame), &frame, |b, &f| {
            b.iter(|| animator.value_at(black_box(f)))
        });
    }

    let mut animator = KeyframeAnimator::new(keyframes(count), |v: &Vec<f32>| {
        black_box(v);
    })
    .expect("valid keyframes");
    group.bench_function("tick_forward", |b| {
        let mut t = 0.0f32;
        b.iter(|| {
            animator.tick(t);
            t = (t + 0.25) % count as f32;
        })
    });

    // Scattered seeks defeat the cached segment.
    let seeks: Vec<f32> = (0..64).map(|i| ((i * 7919) % count) as f32 + 0.5).collect();
    group.bench_function("tick_seek", |b| {
        b.iter(|| {
            for &t in &seeks {
                animator.tick(t);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_keyframe_animator);
criterion_main!(benches);
