//! FFT power spectrum
//!
//! Zero-padded magnitude-squared spectrum with band queries and parabolic
//! peak refinement. Callers apply their own window before computing.

use ndarray::Array1;
use num_complex::Complex32;
use rustfft::FftPlanner;
use std::f32::consts::PI;
use std::ops::RangeInclusive;

/// Create Hamming window coefficients.
pub fn hamming_window(size: usize) -> Array1<f32> {
    if size < 2 {
        return Array1::ones(size);
    }
    let mut window = Array1::zeros(size);
    for i in 0..size {
        window[i] = 0.54 - 0.46 * ((2.0 * PI * i as f32) / ((size - 1) as f32)).cos();
    }
    window
}

/// Multiply a signal by a Hamming window in place.
pub fn apply_hamming(signal: &mut [f32]) {
    let window = hamming_window(signal.len());
    for (s, w) in signal.iter_mut().zip(window.iter()) {
        *s *= w;
    }
}

/// A located spectral peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    /// Integer bin of the maximum
    pub bin: usize,
    /// Sub-bin position after parabolic interpolation
    pub refined_bin: f32,
    /// Power at the integer bin
    pub power: f32,
}

/// One-sided power spectrum.
#[derive(Debug, Clone)]
pub struct Spectrum {
    /// `|X[k]|^2` for k in `0..fft_size / 2 + 1`
    pub power: Vec<f32>,
    /// Frequency spacing between bins (Hz)
    pub bin_hz: f32,
    /// Transform length after zero-padding
    pub fft_size: usize,
}

impl Spectrum {
    /// Compute the spectrum of `signal` zero-padded to at least `min_fft_size`
    /// (rounded up to a power of two and never shorter than the signal).
    pub fn compute(signal: &[f32], sample_rate: f32, min_fft_size: usize) -> Option<Self> {
        let mut planner = FftPlanner::new();
        Self::compute_with(&mut planner, signal, sample_rate, min_fft_size)
    }

    /// Same as [`Spectrum::compute`] reusing a caller-owned planner.
    pub fn compute_with(
        planner: &mut FftPlanner<f32>,
        signal: &[f32],
        sample_rate: f32,
        min_fft_size: usize,
    ) -> Option<Self> {
        let n = signal.len();
        if n < 2 || sample_rate <= 0.0 {
            return None;
        }
        let fft_size = n.max(min_fft_size).next_power_of_two();

        let mut buffer: Vec<Complex32> = signal
            .iter()
            .map(|&s| Complex32::new(s, 0.0))
            .chain(std::iter::repeat(Complex32::new(0.0, 0.0)).take(fft_size - n))
            .collect();

        let fft = planner.plan_fft_forward(fft_size);
        fft.process(&mut buffer);

        let half = fft_size / 2 + 1;
        let power = buffer.iter().take(half).map(|c| c.norm_sqr()).collect();

        Some(Self {
            power,
            bin_hz: sample_rate / fft_size as f32,
            fft_size,
        })
    }

    /// Rescale to a one-sided power spectral density (units^2 / Hz).
    ///
    /// `window_energy` is the sum of squared window coefficients applied
    /// before the transform (equal to the sample count for no window).
    pub fn into_density(mut self, sample_rate: f32, window_energy: f32) -> Self {
        let scale = 1.0 / (sample_rate * window_energy.max(f32::EPSILON));
        let last = self.power.len() - 1;
        for (k, p) in self.power.iter_mut().enumerate() {
            let one_sided = if k == 0 || k == last { 1.0 } else { 2.0 };
            *p *= scale * one_sided;
        }
        self
    }

    /// Frequency (Hz) at a (possibly fractional) bin.
    #[inline]
    pub fn frequency_of(&self, bin: f32) -> f32 {
        bin * self.bin_hz
    }

    /// Inclusive bin range covering `[min_hz, max_hz]`, clipped to the spectrum.
    pub fn band_bins(&self, min_hz: f32, max_hz: f32) -> Option<RangeInclusive<usize>> {
        if max_hz <= min_hz {
            return None;
        }
        let last = self.power.len() - 1;
        let lo = (min_hz / self.bin_hz).ceil().max(0.0) as usize;
        let hi = ((max_hz / self.bin_hz).floor() as usize).min(last);
        (lo <= hi).then_some(lo..=hi)
    }

    /// Integrated power in `[min_hz, max_hz)` (sum of bins times bin width).
    pub fn band_power(&self, min_hz: f32, max_hz: f32) -> f32 {
        self.power
            .iter()
            .enumerate()
            .filter(|(k, _)| {
                let f = *k as f32 * self.bin_hz;
                f >= min_hz && f < max_hz
            })
            .map(|(_, p)| p)
            .sum::<f32>()
            * self.bin_hz
    }

    /// Strongest bin inside `[min_hz, max_hz]` with parabolic refinement.
    pub fn peak_in_band(&self, min_hz: f32, max_hz: f32) -> Option<SpectralPeak> {
        let bins = self.band_bins(min_hz, max_hz)?;
        let mut peak_bin = *bins.start();
        let mut max_power = f32::MIN;
        for k in bins {
            if self.power[k] > max_power {
                max_power = self.power[k];
                peak_bin = k;
            }
        }
        if max_power <= 0.0 {
            return None;
        }
        Some(SpectralPeak {
            bin: peak_bin,
            refined_bin: self.refine(peak_bin),
            power: max_power,
        })
    }

    /// Largest power within one bin of `hz`.
    pub fn power_near(&self, hz: f32) -> f32 {
        let center = (hz / self.bin_hz).round() as isize;
        (center - 1..=center + 1)
            .filter(|k| *k >= 0 && (*k as usize) < self.power.len())
            .map(|k| self.power[k as usize])
            .fold(0.0, f32::max)
    }

    /// Parabolic interpolation for sub-bin accuracy.
    fn refine(&self, peak_bin: usize) -> f32 {
        if peak_bin == 0 || peak_bin + 1 >= self.power.len() {
            return peak_bin as f32;
        }
        let y_m1 = self.power[peak_bin - 1];
        let y_0 = self.power[peak_bin];
        let y_p1 = self.power[peak_bin + 1];
        let denom = y_m1 - 2.0 * y_0 + y_p1;
        if denom.abs() > 1e-12 {
            let delta = 0.5 * (y_m1 - y_p1) / denom;
            if delta.is_finite() && delta.abs() <= 1.0 {
                return peak_bin as f32 + delta;
            }
        }
        peak_bin as f32
    }
}
