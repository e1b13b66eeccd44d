use pairs_quant::analytics::{align_closes, hedge_ratio, spread, AlignedPair};
use pairs_quant::model::series::Point;

fn leg_a(n: u64) -> Vec<Point<f64>> {
    (0..n)
        .map(|i| Point::new(i * 1_000, 100.0 + 5.0 * (i as f64 * 0.3).sin() + i as f64 * 0.1))
        .collect()
}

#[test]
/// B = k * A regressed as A ~ B must give beta = 1 / k.
fn recovers_inverse_of_scale_factor() {
    let a = leg_a(200);
    for k in [2.0, 0.25, -1.5, 37.0] {
        let b: Vec<Point<f64>> = a
            .iter()
            .map(|p| Point::new(p.timestamp_ms, k * p.value))
            .collect();
        let pairs = align_closes(&a, &b);
        assert_eq!(pairs.len(), 200);
        let beta = hedge_ratio(&pairs).expect("beta should be available");
        assert!((beta - 1.0 / k).abs() < 1e-9, "k={} beta={}", k, beta);

        let s = spread(&pairs, beta);
        assert!(s.iter().all(|p| p.value.abs() < 1e-6));
    }
}

#[test]
fn constant_leg_b_is_unavailable() {
    let a = leg_a(50);
    let b: Vec<Point<f64>> = a.iter().map(|p| Point::new(p.timestamp_ms, 42.0)).collect();
    assert_eq!(hedge_ratio(&align_closes(&a, &b)), None);
}

#[test]
fn misaligned_points_are_dropped_not_interpolated() {
    let a = vec![
        Point::new(0, 10.0),
        Point::new(1_000, 12.0),
        Point::new(2_000, 14.0),
        Point::new(3_000, 16.0),
    ];
    // B misses t=1000 and has an extra t=2500.
    let b = vec![
        Point::new(0, 5.0),
        Point::new(2_000, 7.0),
        Point::new(2_500, 99.0),
        Point::new(3_000, 8.0),
    ];
    let pairs = align_closes(&a, &b);
    let stamps: Vec<u64> = pairs.iter().map(|p| p.timestamp_ms).collect();
    assert_eq!(stamps, vec![0, 2_000, 3_000]);

    // A = 2B on the joined set.
    let beta = hedge_ratio(&pairs).unwrap();
    assert!((beta - 2.0).abs() < 1e-12);
    let s = spread(&pairs, beta);
    assert_eq!(s.len(), 3);
    assert_eq!(s[1].timestamp_ms, 2_000);
}

#[test]
fn single_joined_point_is_unavailable() {
    let pairs = vec![AlignedPair {
        timestamp_ms: 0,
        a: 1.0,
        b: 1.0,
    }];
    assert_eq!(hedge_ratio(&pairs), None);
}
