//! Small descriptive statistics over `f32` slices.
//!
//! All helpers return `None` on empty input instead of NaN.

/// Arithmetic mean.
pub fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f32>() / values.len() as f32)
}

/// Population standard deviation.
pub fn std_dev(values: &[f32]) -> Option<f32> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f32>() / values.len() as f32;
    Some(var.sqrt())
}

/// Median (average of the two middle values for even lengths).
pub fn median(values: &[f32]) -> Option<f32> {
    percentile(values, 50.0)
}

/// Linear-interpolated percentile, `p` in [0, 100].
pub fn percentile(values: &[f32], p: f32) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f32;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Remove the mean in place.
pub fn detrend_mean(values: &mut [f32]) {
    if let Some(m) = mean(values) {
        values.iter_mut().for_each(|v| *v -= m);
    }
}

/// Least-squares line fit, returns `(slope, intercept)`.
pub fn linear_fit(x: &[f32], y: &[f32]) -> Option<(f32, f32)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mx = x[..n].iter().sum::<f32>() / n as f32;
    let my = y[..n].iter().sum::<f32>() / n as f32;
    let mut sxy = 0.0f32;
    let mut sxx = 0.0f32;
    for i in 0..n {
        sxy += (x[i] - mx) * (y[i] - my);
        sxx += (x[i] - mx).powi(2);
    }
    if sxx <= f32::EPSILON {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

/// `Some(v)` only when `v` is finite.
#[inline]
pub fn finite(v: f32) -> Option<f32> {
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_std() {
        let std = std_dev(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_relative_eq!(std, std::f32::consts::SQRT_2, epsilon = 0.001);
    }

    #[test]
    fn test_median_even_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_percentile_quartiles() {
        let v: Vec<f32> = (1..=9).map(|i| i as f32).collect();
        assert_relative_eq!(percentile(&v, 25.0).unwrap(), 3.0);
        assert_relative_eq!(percentile(&v, 75.0).unwrap(), 7.0);
    }

    #[test]
    fn test_linear_fit() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let (slope, intercept) = linear_fit(&x, &y).unwrap();
        assert_relative_eq!(slope, 2.0, epsilon = 1e-5);
        assert_relative_eq!(intercept, 1.0, epsilon = 1e-5);
        assert!(linear_fit(&[1.0, 1.0], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn test_detrend() {
        let mut v = [1.0, 2.0, 3.0, 4.0, 5.0];
        detrend_mean(&mut v);
        assert_relative_eq!(mean(&v).unwrap(), 0.0, epsilon = 1e-6);
    }
}
