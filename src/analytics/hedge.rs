use crate::model::series::{Point, Series};

/// Closes of both legs at a timestamp present in both series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedPair {
    pub timestamp_ms: u64,
    pub a: f64,
    pub b: f64,
}

/// Inner join of two ascending series on timestamp. Unmatched points are dropped.
pub fn align_closes(a: &[Point<f64>], b: &[Point<f64>]) -> Vec<AlignedPair> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (ta, tb) = (a[i].timestamp_ms, b[j].timestamp_ms);
        if ta == tb {
            out.push(AlignedPair {
                timestamp_ms: ta,
                a: a[i].value,
                b: b[j].value,
            });
            i += 1;
            j += 1;
        } else if ta < tb {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// OLS slope of `A = alpha + beta * B`; the intercept is discarded.
///
/// `None` with fewer than two points or when B does not vary.
pub fn hedge_ratio(pairs: &[AlignedPair]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let first_b = pairs[0].b;
    if pairs.iter().all(|p| p.b == first_b) {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|p| p.a).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|p| p.b).sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for p in pairs {
        let db = p.b - mean_b;
        sxy += db * (p.a - mean_a);
        sxx += db * db;
    }
    if sxx <= 0.0 {
        return None;
    }
    let beta = sxy / sxx;
    beta.is_finite().then_some(beta)
}

/// `A[t] - beta * B[t]` over the joined timestamps.
pub fn spread(pairs: &[AlignedPair], beta: f64) -> Series {
    pairs
        .iter()
        .map(|p| Point::new(p.timestamp_ms, p.a - beta * p.b))
        .collect()
}
