/// Computes the arithmetic mean of a slice of values. Returns `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Returns a sorted copy of `values`.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Linear-interpolated percentile (`q` in 0..=100) of an already sorted slice.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median of unsorted values. Returns `None` for empty input.
pub fn median(values: &[f64]) -> Option<f64> {
    percentile_sorted(&sorted(values), 50.0)
}

/// Rounds `value` to `places` decimal places.
///
/// Rounding is decided on the exact binary value, so `1.45` (stored just
/// below 1.45) rounds down to `1.4`.
pub fn round_to(value: f64, places: usize) -> f64 {
    format!("{value:.places$}").parse().unwrap_or(value)
}

/// Equal-width histogram with exactly `bins` bins spanning `[min, max]`.
///
/// Returns `(edges, counts)` where `edges.len() == bins + 1`. The last bin is
/// closed on the right. When every value is equal the range is widened by 0.5
/// on each side. Returns `None` for empty input or zero bins.
pub fn histogram(values: &[f64], bins: usize) -> Option<(Vec<f64>, Vec<usize>)> {
    if values.is_empty() || bins == 0 {
        return None;
    }

    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = hi - lo;
    let edges: Vec<f64> = (0..=bins)
        .map(|i| lo + width * i as f64 / bins as f64)
        .collect();

    let mut counts = vec![0usize; bins];
    for &v in values {
        let mut idx = (((v - lo) / width) * bins as f64) as usize;
        idx = idx.min(bins - 1);
        // Float error in the scaled index can land one bin off the edges.
        while idx > 0 && v < edges[idx] {
            idx -= 1;
        }
        while idx < bins - 1 && v >= edges[idx + 1] {
            idx += 1;
        }
        counts[idx] += 1;
    }

    Some((edges, counts))
}
