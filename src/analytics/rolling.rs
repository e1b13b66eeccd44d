use super::hedge::AlignedPair;
use crate::model::series::{Point, SparseSeries};

pub fn sample_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample (N-1) standard deviation. `None` below two values or when every
/// value is identical.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 || is_constant(values) {
        return None;
    }
    let mean = sample_mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    let std = (ss / (values.len() - 1) as f64).sqrt();
    (std > 0.0 && std.is_finite()).then_some(std)
}

/// Pearson correlation of two equal-length samples.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 || is_constant(a) || is_constant(b) {
        return None;
    }
    let mean_a = sample_mean(a)?;
    let mean_b = sample_mean(b)?;
    let mut sab = 0.0;
    let mut saa = 0.0;
    let mut sbb = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        sab += dx * dy;
        saa += dx * dx;
        sbb += dy * dy;
    }
    let denom = (saa * sbb).sqrt();
    if denom <= 0.0 || !denom.is_finite() {
        return None;
    }
    Some((sab / denom).clamp(-1.0, 1.0))
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

/// Trailing-window z-score of each point against the window that ends on it.
///
/// The first `window - 1` points and zero-variance windows are `None`.
pub fn rolling_zscore(series: &[Point<f64>], window: usize) -> SparseSeries {
    let values: Vec<f64> = series.iter().map(|p| p.value).collect();
    series
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let z = trailing(&values, i, window).and_then(|w| {
                let mean = sample_mean(w)?;
                let std = sample_std(w)?;
                Some((p.value - mean) / std)
            });
            Point::new(p.timestamp_ms, z)
        })
        .collect()
}

/// Trailing-window Pearson correlation between the two legs.
pub fn rolling_correlation(pairs: &[AlignedPair], window: usize) -> SparseSeries {
    let a: Vec<f64> = pairs.iter().map(|p| p.a).collect();
    let b: Vec<f64> = pairs.iter().map(|p| p.b).collect();
    pairs
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let corr = match (trailing(&a, i, window), trailing(&b, i, window)) {
                (Some(wa), Some(wb)) => pearson(wa, wb),
                _ => None,
            };
            Point::new(p.timestamp_ms, corr)
        })
        .collect()
}

fn trailing(values: &[f64], end: usize, window: usize) -> Option<&[f64]> {
    if window == 0 || end + 1 < window {
        return None;
    }
    Some(&values[end + 1 - window..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<Point<f64>> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Point::new(i as u64 * 1_000, v))
            .collect()
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(sample_std(&[1.0]), None);
        assert_eq!(sample_std(&[3.3, 3.3, 3.3]), None);
    }

    #[test]
    fn zscore_leading_points_undefined() {
        let z = rolling_zscore(&series(&[1.0, 2.0, 3.0, 4.0, 6.0]), 3);
        assert_eq!(z.len(), 5);
        assert_eq!(z[0].value, None);
        assert_eq!(z[1].value, None);
        // window [1,2,3]: mean 2, std 1
        assert!((z[2].value.unwrap() - 1.0).abs() < 1e-12);
        // window [2,3,4]
        assert!((z[3].value.unwrap() - 1.0).abs() < 1e-12);
        // window [3,4,6]: mean 13/3, std sqrt(7/3)
        let expected = (6.0 - 13.0 / 3.0) / (7.0f64 / 3.0).sqrt();
        assert!((z[4].value.unwrap() - expected).abs() < 1e-12);
        assert_eq!(z[4].timestamp_ms, 4_000);
    }

    #[test]
    fn zscore_flat_window_is_undefined_not_fatal() {
        let z = rolling_zscore(&series(&[5.0, 5.0, 5.0, 6.0]), 3);
        assert_eq!(z[2].value, None);
        assert!(z[3].value.is_some());
    }

    #[test]
    fn zscore_window_longer_than_series() {
        let z = rolling_zscore(&series(&[1.0, 2.0]), 5);
        assert!(z.iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn correlation_of_linear_legs() {
        let pairs: Vec<AlignedPair> = (0..10)
            .map(|i| {
                let b = (i * i) as f64;
                AlignedPair { timestamp_ms: i, a: 2.0 * b + 1.0, b }
            })
            .collect();
        let corr = rolling_correlation(&pairs, 4);
        assert!(corr[..3].iter().all(|p| p.value.is_none()));
        assert!(corr[3..]
            .iter()
            .all(|p| (p.value.unwrap() - 1.0).abs() < 1e-12));

        let inverse: Vec<AlignedPair> = pairs
            .iter()
            .map(|p| AlignedPair { a: -p.a, ..*p })
            .collect();
        let corr = rolling_correlation(&inverse, 4);
        assert!((corr[9].value.unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_known_value() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 1.0, 4.0, 3.0];
        // sab = 3, saa = sbb = 5
        assert!((pearson(&a, &b).unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(pearson(&a, &[1.0, 1.0, 1.0, 1.0]), None);
    }
}
