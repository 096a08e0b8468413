//! Descriptive statistics over `f64` slices, as used by the rating module.

/// Arithmetic mean. `None` when `data` is empty.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation (denominator `n`). `None` when `data` is empty.
pub fn population_std_dev(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let sq_sum: f64 = data.iter().map(|&x| (x - m) * (x - m)).sum();
    Some((sq_sum / data.len() as f64).sqrt())
}

/// The `p`-th quantile via R-7 linear interpolation, the default method in
/// R, NumPy, and pandas. Sorts a copy of the input.
/// `None` when `data` is empty or `p` is outside `[0, 1]`.
pub fn quantile(data: &[f64], p: f64) -> Option<f64> {
    if data.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
    quantile_sorted(&sorted, p)
}

/// R-7 quantile on pre-sorted data. Avoids re-sorting when several
/// quantiles are taken from the same column.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();

    if j + 1 >= n {
        Some(sorted[n - 1])
    } else {
        Some((1.0 - g) * sorted[j] + g * sorted[j + 1])
    }
}
