//! Small numeric helpers shared by the fitters and renderers.

/// Round `v` to `decimals` decimal places (half away from zero).
pub fn round_to(v: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (v * scale).round() / scale
}

/// `n` evenly spaced samples over `[start, end]` (both ends included).
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n as f64 - 1.0);
            let mut xs: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            xs[n - 1] = end;
            xs
        }
    }
}

/// Min/max of a slice, ignoring non-finite values.
pub fn finite_bounds(values: &[f64]) -> Option<(f64, f64)> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values.iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    (lo <= hi).then_some((lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_two_decimals() {
        assert_eq!(round_to(1.234_9, 2), 1.23);
        assert_eq!(round_to(-1.235_1, 2), -1.24);
        assert_eq!(round_to(7.0, 1), 7.0);
    }

    #[test]
    fn linspace_includes_both_ends() {
        let xs = linspace(-30.0, 30.0, 1000);
        assert_eq!(xs.len(), 1000);
        assert_eq!(xs[0], -30.0);
        assert!((xs[999] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn finite_bounds_skips_nan() {
        assert_eq!(finite_bounds(&[3.0, f64::NAN, -1.0]), Some((-1.0, 3.0)));
        assert_eq!(finite_bounds(&[]), None);
    }
}
