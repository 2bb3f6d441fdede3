//! Threshold peak picking with a refractory spacing.

use super::stats;

/// Local maxima above `mean + threshold_std * std`, at least `min_gap`
/// samples apart. Within the spacing the larger peak wins.
pub fn detect_peaks(signal: &[f32], threshold_std: f32, min_gap: usize) -> Vec<usize> {
    let n = signal.len();
    if n < 3 {
        return Vec::new();
    }
    let mean = stats::mean(signal).unwrap_or(0.0);
    let std = stats::std_dev(signal).unwrap_or(0.0);
    if std <= f32::EPSILON {
        return Vec::new();
    }
    let threshold = mean + threshold_std * std;

    let mut peaks: Vec<usize> = Vec::new();
    for i in 1..n - 1 {
        let v = signal[i];
        if v <= threshold || v <= signal[i - 1] || v < signal[i + 1] {
            continue;
        }
        match peaks.last_mut() {
            Some(last) if i - *last < min_gap => {
                if v > signal[*last] {
                    *last = i;
                }
            }
            _ => peaks.push(i),
        }
    }
    peaks
}

/// Mean spacing between peaks and its coefficient of variation, in samples.
pub fn peak_intervals(peaks: &[usize]) -> Option<(f32, f32)> {
    if peaks.len() < 2 {
        return None;
    }
    let intervals: Vec<f32> = peaks.windows(2).map(|w| (w[1] - w[0]) as f32).collect();
    let mean = stats::mean(&intervals)?;
    if mean <= 0.0 {
        return None;
    }
    let cv = stats::std_dev(&intervals).unwrap_or(0.0) / mean;
    Some((mean, cv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_refractory_spacing_keeps_larger_peak() {
        let mut signal = vec![0.0f32; 200];
        signal[50] = 1.0;
        signal[60] = 2.0;
        signal[150] = 1.5;
        assert_eq!(detect_peaks(&signal, 0.5, 45), vec![60, 150]);
    }

    #[test]
    fn test_flat_signal() {
        assert!(detect_peaks(&[1.0; 50], 0.5, 5).is_empty());
    }

    #[test]
    fn test_intervals() {
        let (mean, cv) = peak_intervals(&[10, 20, 30, 40]).unwrap();
        assert_relative_eq!(mean, 10.0);
        assert_relative_eq!(cv, 0.0);
        assert!(peak_intervals(&[5]).is_none());
    }
}
