use quadscope_core::path::{visual_distance, PathSampler};
use quadscope_core::{BigDec, Camera, PrecisionContext};

fn cam(level: f64, x: f64, y: f64) -> Camera {
    let ctx = PrecisionContext::for_level(100.0);
    Camera::from_parts(
        level,
        BigDec::from_f64(x, ctx.digits()),
        BigDec::from_f64(y, ctx.digits()),
        0.0,
    )
    .unwrap()
}

fn deep_dive_path() -> Vec<Camera> {
    vec![
        cam(0.0, 0.5, 0.5),
        cam(10.0, 0.52, 0.52),
        cam(25.0, 0.5201, 0.5201),
        cam(50.0, 0.520105, 0.520105),
    ]
}

/// Instantaneous speeds across `samples` uniform progress steps.
fn speeds(sampler: &PathSampler, samples: usize) -> Vec<f64> {
    let mut prev = sampler.camera_at_progress(0.0);
    let mut out = Vec::with_capacity(samples);
    for i in 1..=samples {
        let here = sampler.camera_at_progress(i as f64 / samples as f64);
        out.push(visual_distance(&prev, &here));
        prev = here;
    }
    out
}

// ============================================================================
// Constant visual speed
// ============================================================================

#[test]
fn speed_is_constant_across_the_dive() {
    let sampler = PathSampler::build(&deep_dive_path()).unwrap();
    let speeds = speeds(&sampler, 1000);

    let mean = speeds.iter().sum::<f64>() / speeds.len() as f64;
    assert!(mean > 0.0);
    let variance =
        speeds.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / speeds.len() as f64;
    let cov = variance.sqrt() / mean;
    assert!(
        cov < 0.05,
        "speed coefficient of variation {:.4} exceeds 5%",
        cov
    );
}

#[test]
fn playback_never_stalls() {
    let sampler = PathSampler::build(&deep_dive_path()).unwrap();
    let speeds = speeds(&sampler, 1000);
    let mean = speeds.iter().sum::<f64>() / speeds.len() as f64;
    let min = speeds.iter().cloned().fold(f64::INFINITY, f64::min);
    assert!(
        min >= 0.5 * mean,
        "slowest step {:.6} under half the mean {:.6}",
        min,
        mean
    );
}

// ============================================================================
// Safety bounds
// ============================================================================

#[test]
fn samples_stay_inside_the_padded_keyframe_box() {
    let keyframes = deep_dive_path();
    let sampler = PathSampler::build(&keyframes).unwrap();

    let xs: Vec<f64> = keyframes.iter().map(|k| k.x.to_f64()).collect();
    let ys: Vec<f64> = keyframes.iter().map(|k| k.y.to_f64()).collect();
    let (min_x, max_x) = bounds(&xs);
    let (min_y, max_y) = bounds(&ys);
    let pad_x = (max_x - min_x) * 0.1;
    let pad_y = (max_y - min_y) * 0.1;

    for i in 0..=1000 {
        let here = sampler.camera_at_progress(i as f64 / 1000.0);
        let x = here.x.to_f64();
        let y = here.y.to_f64();
        assert!(
            x >= min_x - pad_x && x <= max_x + pad_x,
            "x {} escapes [{}, {}] at progress {}",
            x,
            min_x - pad_x,
            max_x + pad_x,
            i
        );
        assert!(y >= min_y - pad_y && y <= max_y + pad_y);
    }
}

fn bounds(values: &[f64]) -> (f64, f64) {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

// ============================================================================
// Corner curvature
// ============================================================================

#[test]
fn corners_bend_the_path_near_keyframes() {
    // Pan, then zoom: the direction change at the middle keyframe must
    // be rounded, so a sample late in the pan segment already deviates
    // from the straight chord.
    let keyframes = vec![
        cam(0.0, 0.2, 0.5),
        cam(0.0, 0.35, 0.5),
        cam(0.0, 0.5, 0.5),
        cam(4.0, 0.5, 0.5),
        cam(8.0, 0.5, 0.5),
    ];
    let sampler = PathSampler::build(&keyframes).unwrap();
    let stops = sampler.stops().to_vec();

    // 95% of the way from keyframe 1 to keyframe 2 by arc distance.
    let distance = stops[1] + 0.95 * (stops[2] - stops[1]);
    let here = sampler.camera_at_distance(distance);

    // Straight-line interpolation between the two keyframes (both at
    // level 0, so plain linear position).
    let straight_x = 0.35 + 0.95 * (0.5 - 0.35);
    let dx = here.x.to_f64() - straight_x;
    let dy = here.y.to_f64() - 0.5;
    let dl = here.global_level;
    let deviation = (dx * dx + dy * dy + dl * dl).sqrt();
    assert!(
        deviation >= 1e-4,
        "expected a filleted corner, deviation {}",
        deviation
    );
}

// ============================================================================
// Endpoint idempotence
// ============================================================================

#[test]
fn progress_endpoints_hit_the_keyframes() {
    let keyframes = deep_dive_path();
    let sampler = PathSampler::build(&keyframes).unwrap();

    let first = sampler.camera_at_progress(0.0);
    assert_eq!(first.x, keyframes[0].x);
    assert_eq!(first.y, keyframes[0].y);
    assert_eq!(first.global_level, keyframes[0].global_level);

    let last = sampler.camera_at_progress(1.0);
    let target = keyframes.last().unwrap();
    assert!((last.global_level - target.global_level).abs() < 1e-9);
    let dx = last.x.sub(&target.x).to_f64().abs();
    let dy = last.y.sub(&target.y).to_f64().abs();
    assert!(dx < 1e-12 && dy < 1e-12, "endpoint drift dx={} dy={}", dx, dy);
}

#[test]
fn stops_divide_the_timeline_consistently() {
    let sampler = PathSampler::build(&deep_dive_path()).unwrap();
    let stops = sampler.stops();

    // Sampling exactly at a stop distance lands near its keyframe.
    let at_stop = sampler.camera_at_distance(stops[1]);
    assert!(
        (at_stop.global_level - 10.0).abs() < 0.5,
        "stop 1 should sit near the level-10 keyframe, got {}",
        at_stop.global_level
    );
}
