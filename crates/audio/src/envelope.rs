use std::f32::consts::TAU;

use cadence_domain::AnalysisConfig;

/// Levels below this are flushed to zero so long silences never sit in
/// denormal range.
const DENORMAL_FLOOR: f32 = 1.0e-20;

/// Rectifies, smooths and decimates a mono stream into an amplitude envelope.
///
/// Filter state and the partially filled decimation period survive across
/// calls, so the envelope is identical however the input is chunked.
#[derive(Clone, Debug)]
pub struct EnvelopeTracker {
    coefficient: f32,
    factor: usize,
    level: f32,
    sum: f32,
    filled: usize,
}

impl EnvelopeTracker {
    pub fn new(sample_rate: u32, cutoff_hz: f32, factor: usize) -> Self {
        let coefficient = 1.0 - (-TAU * cutoff_hz / sample_rate as f32).exp();
        Self {
            coefficient: coefficient.clamp(f32::MIN_POSITIVE, 1.0),
            factor: factor.max(1),
            level: 0.0,
            sum: 0.0,
            filled: 0,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.sample_rate,
            config.tuning.envelope_cutoff_hz,
            config.decimation_factor(),
        )
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Input samples buffered towards the next envelope value.
    pub fn buffered(&self) -> usize {
        self.filled
    }

    /// Current smoothed level at the input rate.
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
        self.sum = 0.0;
        self.filled = 0;
    }

    /// Consumes one mono sample and returns an envelope value once per
    /// decimation period.
    #[inline]
    pub fn push(&mut self, sample: f32) -> Option<f32> {
        self.level += self.coefficient * (sample.abs() - self.level);
        if self.level < DENORMAL_FLOOR {
            self.level = 0.0;
        }
        self.sum += self.level;
        self.filled += 1;
        if self.filled < self.factor {
            return None;
        }
        let value = self.sum / self.factor as f32;
        self.sum = 0.0;
        self.filled = 0;
        Some(value)
    }

    /// Runs a whole slice through the tracker, handing each envelope value to `sink`.
    pub fn process(&mut self, samples: &[f32], mut sink: impl FnMut(f32)) {
        for &sample in samples {
            if let Some(value) = self.push(sample) {
                sink(value);
            }
        }
    }
}
