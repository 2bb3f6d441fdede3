//! Cycle-to-cycle perturbation: jitter and shimmer
//!
//! Successive pitch periods are located by cross-correlating one period of
//! waveform against the signal a candidate period later (search range
//! ±20% of the frame period, sub-sample refined). Jitter is the relative
//! average perturbation (RAP) of those period lengths, shimmer the RAP of
//! each period's peak-to-peak amplitude.

/// Period lengths (samples) and peak-to-peak amplitudes of aligned cycles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodTrack {
    pub periods: Vec<f32>,
    pub amplitudes: Vec<f32>,
}

/// Search tolerance around the nominal period
const SEARCH_FRACTION: f32 = 0.2;

fn normalized_correlation(a: &[f32], b: &[f32]) -> f32 {
    let (mut ab, mut aa, mut bb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        ab += x * y;
        aa += x * x;
        bb += y * y;
    }
    let denom = (aa * bb).sqrt();
    if denom <= f32::EPSILON {
        0.0
    } else {
        ab / denom
    }
}

/// Walk the frame period by period starting at the first sample.
pub fn track_periods(samples: &[f32], nominal_period: f32) -> PeriodTrack {
    let mut track = PeriodTrack::default();
    if !nominal_period.is_finite() || nominal_period < 4.0 {
        return track;
    }
    let n = samples.len();
    let width = nominal_period.round() as usize;
    let lo = ((nominal_period * (1.0 - SEARCH_FRACTION)).floor() as usize).max(2);
    let hi = (nominal_period * (1.0 + SEARCH_FRACTION)).ceil() as usize;

    let mut pos = 0.0f32;
    loop {
        let start = pos.round() as usize;
        if start + hi + 1 + width > n {
            break;
        }
        let reference = &samples[start..start + width];
        let scores: Vec<f32> = (lo - 1..=hi + 1)
            .map(|lag| normalized_correlation(reference, &samples[start + lag..start + lag + width]))
            .collect();

        // scores[j] holds lag lo - 1 + j; the edges are only used for refinement
        let mut best_j = 1;
        for j in 1..scores.len() - 1 {
            if scores[j] > scores[best_j] {
                best_j = j;
            }
        }
        if scores[best_j] < 0.5 {
            break;
        }
        let denom = scores[best_j - 1] - 2.0 * scores[best_j] + scores[best_j + 1];
        let delta = if denom.abs() > f32::EPSILON {
            (0.5 * (scores[best_j - 1] - scores[best_j + 1]) / denom).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        let period = (lo - 1 + best_j) as f32 + delta;

        let end = (pos + period).round() as usize;
        let cycle = &samples[start..end.min(n)];
        let max = cycle.iter().copied().fold(f32::MIN, f32::max);
        let min = cycle.iter().copied().fold(f32::MAX, f32::min);

        track.periods.push(period);
        track.amplitudes.push(max - min);
        pos += period;
    }
    track
}

/// Relative average perturbation in percent (3-point running average).
pub fn relative_average_perturbation(values: &[f32]) -> Option<f32> {
    if values.len() < 3 {
        return None;
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    if mean <= f32::EPSILON {
        return None;
    }
    let perturbation: f32 = values
        .windows(3)
        .map(|w| (w[1] - (w[0] + w[1] + w[2]) / 3.0).abs())
        .sum::<f32>()
        / (values.len() - 2) as f32;
    let rap = 100.0 * perturbation / mean;
    rap.is_finite().then_some(rap)
}

/// Jitter and shimmer (percent) for one frame.
pub fn jitter_shimmer(samples: &[f32], nominal_period: f32) -> (Option<f32>, Option<f32>) {
    let track = track_periods(samples, nominal_period);
    (
        relative_average_perturbation(&track.periods),
        relative_average_perturbation(&track.amplitudes),
    )
}
