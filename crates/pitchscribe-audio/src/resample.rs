//! Sample-rate conversion.
//!
//! Linear interpolation, preceded by a windowed-sinc low-pass when the target
//! rate is lower than the source rate so content above the new Nyquist
//! frequency does not fold back into the pitch range.

use std::f64::consts::PI;

/// Half-width of the anti-aliasing filter in taps.
const FILTER_HALF_TAPS: usize = 32;

/// Cutoff as a fraction of the target Nyquist frequency.
const CUTOFF_RATIO: f64 = 0.95;

/// Resample mono audio from `from_rate` to `to_rate`.
///
/// The output holds `ceil(len * to_rate / from_rate)` samples.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return Vec::new();
    }

    if from_rate == to_rate {
        return samples.to_vec();
    }

    if to_rate < from_rate {
        let cutoff = CUTOFF_RATIO * to_rate as f64 / from_rate as f64;
        let filtered = low_pass(samples, cutoff);
        resample_linear(&filtered, from_rate, to_rate)
    } else {
        resample_linear(samples, from_rate, to_rate)
    }
}

/// Resample audio using linear interpolation.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as u64 * to_rate as u64).div_ceil(from_rate as u64) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < samples.len() {
            let s0 = samples[src_idx];
            let s1 = samples[src_idx + 1];
            s0 + (s1 - s0) * frac
        } else {
            samples[src_idx.min(samples.len() - 1)]
        };

        output.push(sample);
    }

    output
}

/// Hann-windowed sinc low-pass. `cutoff` is relative to the source Nyquist
/// frequency (0, 1].
fn low_pass(samples: &[f32], cutoff: f64) -> Vec<f32> {
    let kernel = sinc_kernel(cutoff);
    let half = FILTER_HALF_TAPS as isize;
    let len = samples.len() as isize;

    (0..len)
        .map(|n| {
            let mut acc = 0.0f64;
            for (k, &h) in kernel.iter().enumerate() {
                let idx = n + k as isize - half;
                if (0..len).contains(&idx) {
                    acc += h * samples[idx as usize] as f64;
                }
            }
            acc as f32
        })
        .collect()
}

/// Filter taps normalized to unit DC gain.
fn sinc_kernel(cutoff: f64) -> Vec<f64> {
    let taps = 2 * FILTER_HALF_TAPS + 1;
    let mut kernel: Vec<f64> = (0..taps)
        .map(|k| {
            let m = k as f64 - FILTER_HALF_TAPS as f64;
            let sinc = if m == 0.0 {
                cutoff
            } else {
                (PI * cutoff * m).sin() / (PI * m)
            };
            let window = 0.5 - 0.5 * (2.0 * PI * k as f64 / (taps - 1) as f64).cos();
            sinc * window
        })
        .collect();

    let sum: f64 = kernel.iter().sum();
    for h in &mut kernel {
        *h /= sum;
    }
    kernel
}
