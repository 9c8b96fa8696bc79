//! YIN pitch tracker.
//!
//! For each frame the difference function
//! `d(tau) = sum_j (x[j] - x[j + tau])^2` is computed from two energy terms
//! and one FFT cross-correlation, then turned into the cumulative mean
//! normalized difference (CMND). Local CMND minima are the candidate
//! periods; the first minimum under the absolute threshold ends the search,
//! which keeps multiples of the true period out of the candidate set.

use std::fmt;
use std::sync::Arc;

use pitchscribe_track::{PitchTrack, UNVOICED};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::viterbi::{decode_argmax, decode_viterbi, Candidate, FrameCandidates, TransitionCosts};
use super::{PitchError, PitchModel};
use crate::decode::MODEL_SAMPLE_RATE;

/// Frame hop in samples (10 ms at 16 kHz).
pub const DEFAULT_HOP_LENGTH: usize = 160;

/// Analysis frame length in samples.
pub const DEFAULT_FRAME_LENGTH: usize = 1024;

/// How per-frame candidates become a pitch track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decoding {
    /// Minimum-cost path across all frames.
    #[default]
    Viterbi,
    /// Best candidate of each frame on its own.
    Argmax,
}

/// Tracker parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct YinConfig {
    pub sample_rate: u32,
    /// Analysis frame length; the integration window is half of it.
    pub frame_length: usize,
    pub hop_length: usize,
    /// Lowest detectable frequency (C1).
    pub fmin: f64,
    /// Highest detectable frequency (B6).
    pub fmax: f64,
    /// Absolute CMND threshold ending the candidate search.
    pub threshold: f64,
    /// Candidates kept per frame.
    pub max_candidates: usize,
    /// Frames quieter than this RMS level are silent.
    pub silence_rms: f64,
    /// Observation cost of the unvoiced state on non-silent frames.
    pub unvoiced_cost: f64,
    pub transitions: TransitionCosts,
    pub decoding: Decoding,
}

impl Default for YinConfig {
    fn default() -> Self {
        Self {
            sample_rate: MODEL_SAMPLE_RATE,
            frame_length: DEFAULT_FRAME_LENGTH,
            hop_length: DEFAULT_HOP_LENGTH,
            fmin: 32.70,
            fmax: 1975.53,
            threshold: 0.15,
            max_candidates: 4,
            silence_rms: 1e-4,
            unvoiced_cost: 0.35,
            transitions: TransitionCosts::default(),
            decoding: Decoding::Viterbi,
        }
    }
}

/// YIN-based [`PitchModel`].
///
/// Holds only immutable planned FFTs, so a single instance can serve
/// concurrent callers.
pub struct YinTracker {
    config: YinConfig,
    tau_min: usize,
    tau_max: usize,
    fft_len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for YinTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YinTracker")
            .field("config", &self.config)
            .field("tau_min", &self.tau_min)
            .field("tau_max", &self.tau_max)
            .finish()
    }
}

impl YinTracker {
    /// Build a tracker, validating the configuration.
    pub fn new(config: YinConfig) -> Result<Self, PitchError> {
        if config.sample_rate == 0 {
            return Err(PitchError::InvalidConfig("sample rate must be positive".into()));
        }
        if config.hop_length == 0 {
            return Err(PitchError::InvalidConfig("hop length must be positive".into()));
        }
        if config.frame_length < 8 || config.frame_length % 2 != 0 {
            return Err(PitchError::InvalidConfig(format!(
                "frame length must be even and at least 8, got {}",
                config.frame_length
            )));
        }
        if !(config.fmin > 0.0 && config.fmin < config.fmax) {
            return Err(PitchError::InvalidConfig(format!(
                "frequency range {}..{} Hz is empty",
                config.fmin, config.fmax
            )));
        }
        if config.max_candidates == 0 {
            return Err(PitchError::InvalidConfig("max candidates must be positive".into()));
        }

        let rate = config.sample_rate as f64;
        let window = config.frame_length / 2;
        let tau_min = ((rate / config.fmax).floor() as usize).max(2);
        let tau_max = (rate / config.fmin).ceil() as usize;
        if tau_max + 1 > window {
            return Err(PitchError::InvalidConfig(format!(
                "fmin {} Hz needs a period of {} samples, frame length {} allows {}",
                config.fmin,
                tau_max,
                config.frame_length,
                window - 1
            )));
        }
        if tau_min + 2 > tau_max {
            return Err(PitchError::InvalidConfig(format!(
                "fmax {} Hz is too close to fmin {} Hz",
                config.fmax, config.fmin
            )));
        }

        let fft_len = (config.frame_length + window).next_power_of_two();
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        Ok(Self {
            config,
            tau_min,
            tau_max,
            fft_len,
            forward,
            inverse,
        })
    }

    pub fn config(&self) -> &YinConfig {
        &self.config
    }

    /// Number of frames produced for `len` samples (centered framing).
    pub fn frame_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            1 + len / self.config.hop_length
        }
    }

    /// Candidate periods for every frame.
    pub fn analyze(&self, samples: &[f32]) -> Vec<(FrameCandidates, f64)> {
        let mut scratch = Scratch::new(self);
        (0..self.frame_count(samples.len()))
            .map(|i| {
                scratch.load_frame(samples, i * self.config.hop_length, self.config.frame_length);
                self.analyze_frame(&mut scratch)
            })
            .collect()
    }

    /// Candidates and confidence for the frame held in `scratch.frame`.
    fn analyze_frame(&self, scratch: &mut Scratch) -> (FrameCandidates, f64) {
        let n = self.config.frame_length;
        let window = n / 2;
        let frame = &scratch.frame;

        let energy: f64 = frame.iter().map(|x| x * x).sum();
        if (energy / n as f64).sqrt() < self.config.silence_rms {
            return (
                FrameCandidates {
                    candidates: Vec::new(),
                    unvoiced_cost: 0.0,
                },
                0.0,
            );
        }

        // Prefix sums of squared samples for the sliding energy term
        scratch.cumulative[0] = 0.0;
        for (j, x) in frame.iter().enumerate() {
            scratch.cumulative[j + 1] = scratch.cumulative[j] + x * x;
        }

        // Cross-correlation of the first window against the whole frame
        for (j, slot) in scratch.full.iter_mut().enumerate() {
            *slot = Complex::new(if j < n { frame[j] } else { 0.0 }, 0.0);
        }
        for (j, slot) in scratch.head.iter_mut().enumerate() {
            *slot = Complex::new(if j < window { frame[j] } else { 0.0 }, 0.0);
        }
        self.forward
            .process_with_scratch(&mut scratch.full, &mut scratch.fft_scratch);
        self.forward
            .process_with_scratch(&mut scratch.head, &mut scratch.fft_scratch);
        for (a, b) in scratch.full.iter_mut().zip(&scratch.head) {
            *a *= b.conj();
        }
        self.inverse
            .process_with_scratch(&mut scratch.full, &mut scratch.fft_scratch);

        let scale = 1.0 / self.fft_len as f64;
        let e0 = scratch.cumulative[window];
        let cmnd = &mut scratch.cmnd;
        cmnd[0] = 1.0;
        let mut running = 0.0;
        for tau in 1..=self.tau_max {
            let e_tau = scratch.cumulative[tau + window] - scratch.cumulative[tau];
            let r = scratch.full[tau].re * scale;
            let d = (e0 + e_tau - 2.0 * r).max(0.0);
            running += d;
            cmnd[tau] = if running > 0.0 {
                d * tau as f64 / running
            } else {
                1.0
            };
        }

        let candidates = self.pick_candidates(cmnd);
        let best = candidates
            .iter()
            .map(|c| c.cost)
            .fold(f64::INFINITY, f64::min);
        let confidence = if best.is_finite() {
            (1.0 - best).clamp(0.0, 1.0)
        } else {
            0.0
        };

        (
            FrameCandidates {
                candidates,
                unvoiced_cost: self.config.unvoiced_cost,
            },
            confidence,
        )
    }

    fn pick_candidates(&self, cmnd: &[f64]) -> Vec<Candidate> {
        let rate = self.config.sample_rate as f64;
        let mut candidates = Vec::new();

        for tau in self.tau_min..self.tau_max {
            let (prev, here, next) = (cmnd[tau - 1], cmnd[tau], cmnd[tau + 1]);
            if !(here < prev && here <= next) {
                continue;
            }

            let period = tau as f64 + parabolic_offset(prev, here, next);
            candidates.push(Candidate {
                frequency: rate / period,
                cost: here,
            });

            if here < self.config.threshold {
                break;
            }
        }

        candidates.sort_by(|a, b| a.cost.total_cmp(&b.cost));
        candidates.truncate(self.config.max_candidates);
        candidates
    }
}

/// Vertex offset of the parabola through three equally spaced points.
fn parabolic_offset(prev: f64, here: f64, next: f64) -> f64 {
    let denom = prev - 2.0 * here + next;
    if denom.abs() < f64::EPSILON {
        0.0
    } else {
        (0.5 * (prev - next) / denom).clamp(-0.5, 0.5)
    }
}

/// Per-call working buffers.
struct Scratch {
    frame: Vec<f64>,
    cumulative: Vec<f64>,
    full: Vec<Complex<f64>>,
    head: Vec<Complex<f64>>,
    fft_scratch: Vec<Complex<f64>>,
    cmnd: Vec<f64>,
}

impl Scratch {
    fn new(tracker: &YinTracker) -> Self {
        let n = tracker.config.frame_length;
        let scratch_len = tracker
            .forward
            .get_inplace_scratch_len()
            .max(tracker.inverse.get_inplace_scratch_len());
        Self {
            frame: vec![0.0; n],
            cumulative: vec![0.0; n + 1],
            full: vec![Complex::new(0.0, 0.0); tracker.fft_len],
            head: vec![Complex::new(0.0, 0.0); tracker.fft_len],
            fft_scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            cmnd: vec![1.0; tracker.tau_max + 1],
        }
    }

    /// Copy the frame centered at `center`, zero-padding past either end.
    fn load_frame(&mut self, samples: &[f32], center: usize, frame_length: usize) {
        let half = frame_length / 2;
        for (j, slot) in self.frame.iter_mut().enumerate() {
            *slot = (center + j)
                .checked_sub(half)
                .and_then(|idx| samples.get(idx))
                .map(|&s| s as f64)
                .unwrap_or(0.0);
        }
    }
}

impl PitchModel for YinTracker {
    fn name(&self) -> &str {
        match self.config.decoding {
            Decoding::Viterbi => "yin-viterbi",
            Decoding::Argmax => "yin-argmax",
        }
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn hop_seconds(&self) -> f64 {
        self.config.hop_length as f64 / self.config.sample_rate as f64
    }

    fn predict(&self, samples: &[f32], sample_rate: u32) -> Result<PitchTrack, PitchError> {
        if sample_rate != self.config.sample_rate {
            return Err(PitchError::SampleRate {
                expected: self.config.sample_rate,
                actual: sample_rate,
            });
        }
        if let Some(idx) = samples.iter().position(|s| !s.is_finite()) {
            return Err(PitchError::NonFiniteSample(idx));
        }

        let (frames, confidence): (Vec<FrameCandidates>, Vec<f64>) =
            self.analyze(samples).into_iter().unzip();

        let path = match self.config.decoding {
            Decoding::Viterbi => decode_viterbi(&frames, &self.config.transitions),
            Decoding::Argmax => decode_argmax(&frames),
        };

        let hop = self.hop_seconds();
        let times = (0..path.len()).map(|i| i as f64 * hop).collect();
        let frequencies = path.into_iter().map(|f| f.unwrap_or(UNVOICED)).collect();

        PitchTrack::new(times, frequencies, confidence)
            .map_err(|e| PitchError::InvalidConfig(e.to_string()))
    }
}
