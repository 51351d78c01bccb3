use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::tempo::bpm_to_lag;
use crate::DomainError;

/// Slowest tempo the tracker accepts as a lower bound. Keeps the envelope
/// history bounded to about a minute of decimated samples.
pub const MIN_SUPPORTED_BPM: f32 = 1.0;

/// Knobs for the analysis pipeline. The defaults converge on click tracks and
/// typical popular music within a few seconds.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerTuning {
    /// Desired envelope rate after decimation, in Hz.
    pub target_envelope_rate: f32,
    /// Cutoff of the one-pole envelope smoother, in Hz.
    pub envelope_cutoff_hz: f32,
    /// Time constant of the periodicity decay, in seconds.
    pub correlation_window_secs: f32,
    /// Time constant of the envelope mean tracker, in seconds.
    pub mean_window_secs: f32,
    /// How often a fresh tempo estimate is taken, in seconds of audio.
    pub estimate_interval_secs: f32,
    /// Weight of a new estimate in the moving average, 0..=1.
    pub smoothing: f32,
    /// Relative distance below which a new estimate is treated as drift.
    pub jump_tolerance: f32,
    /// Consecutive out-of-tolerance estimates needed before the tempo jumps.
    pub jump_confirmations: u32,
    /// Peaks scoring within this fraction of the best are considered tied.
    pub tie_tolerance: f32,
    /// Reward for energy at 1x, 2x, 3x and 4x the candidate lag.
    pub harmonic_weights: [f32; 4],
    /// Penalty for energy at 1/2 and 1/3 of the candidate lag.
    pub subharmonic_penalties: [f32; 2],
    /// 0 scores peaks by the comb response alone, 1 by the harmonic template alone.
    pub template_blend: f32,
    /// Beats per bar. The comb filter also looks for the period at this
    /// multiple of each candidate lag, then at successive doublings.
    pub beats_per_bar: u32,
    /// 0 is neutral, 1 fully applies a bias towards tempi around 130 bpm.
    pub perceptual_weighting: f32,
    /// Share of the envelope's power that must be fluctuation rather than a
    /// steady level before any tempo is reported.
    pub min_modulation: f32,
    /// How far the winning comb peak must rise above its surroundings, as
    /// a fraction of envelope energy.
    pub min_prominence: f32,
    /// Decayed envelope energy at or below this counts as silence.
    pub silence_floor: f32,
}

impl Default for TrackerTuning {
    fn default() -> Self {
        Self {
            target_envelope_rate: 250.0,
            envelope_cutoff_hz: 10.0,
            correlation_window_secs: 6.0,
            mean_window_secs: 3.0,
            estimate_interval_secs: 0.25,
            smoothing: 0.3,
            jump_tolerance: 0.08,
            jump_confirmations: 4,
            tie_tolerance: 0.05,
            harmonic_weights: [1.0, 0.25, 0.10, 0.05],
            subharmonic_penalties: [0.10, 0.03],
            template_blend: 0.35,
            beats_per_bar: 4,
            perceptual_weighting: 0.0,
            min_modulation: 0.02,
            min_prominence: 0.2,
            silence_floor: 1.0e-20,
        }
    }
}

impl TrackerTuning {
    pub fn validate(&self) -> Result<(), DomainError> {
        let positive = [
            ("target_envelope_rate", self.target_envelope_rate),
            ("envelope_cutoff_hz", self.envelope_cutoff_hz),
            ("correlation_window_secs", self.correlation_window_secs),
            ("mean_window_secs", self.mean_window_secs),
            ("estimate_interval_secs", self.estimate_interval_secs),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(DomainError::invalid_config(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        let unit = [
            ("smoothing", self.smoothing),
            ("jump_tolerance", self.jump_tolerance),
            ("tie_tolerance", self.tie_tolerance),
            ("template_blend", self.template_blend),
            ("perceptual_weighting", self.perceptual_weighting),
            ("min_modulation", self.min_modulation),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(DomainError::invalid_config(format!(
                    "{name} must lie in 0..=1, got {value}"
                )));
            }
        }
        if !(2..=16).contains(&self.beats_per_bar) {
            return Err(DomainError::invalid_config(format!(
                "beats_per_bar must lie in 2..=16, got {}",
                self.beats_per_bar
            )));
        }
        let non_negative = [
            ("min_prominence", self.min_prominence),
            ("silence_floor", self.silence_floor),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(DomainError::invalid_config(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        if self.smoothing == 0.0 {
            return Err(DomainError::invalid_config("smoothing must be non-zero"));
        }
        let weights = self
            .harmonic_weights
            .iter()
            .chain(self.subharmonic_penalties.iter());
        for weight in weights {
            if !(weight.is_finite() && *weight >= 0.0) {
                return Err(DomainError::invalid_config(
                    "harmonic weights and penalties must be non-negative",
                ));
            }
        }
        Ok(())
    }
}

/// Immutable description of the incoming stream and the tempo range to search.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub min_bpm: f32,
    pub max_bpm: f32,
    #[serde(default)]
    pub tuning: TrackerTuning,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            min_bpm: 40.0,
            max_bpm: 300.0,
            tuning: TrackerTuning::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn new(
        sample_rate: u32,
        channels: u16,
        min_bpm: f32,
        max_bpm: f32,
    ) -> Result<Self, DomainError> {
        Self::with_tuning(sample_rate, channels, min_bpm, max_bpm, TrackerTuning::default())
    }

    pub fn with_tuning(
        sample_rate: u32,
        channels: u16,
        min_bpm: f32,
        max_bpm: f32,
        tuning: TrackerTuning,
    ) -> Result<Self, DomainError> {
        let config = Self {
            sample_rate,
            channels,
            min_bpm,
            max_bpm,
            tuning,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| DomainError::Serialization(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.sample_rate == 0 {
            return Err(DomainError::invalid_config("sample rate must be positive"));
        }
        if self.channels == 0 {
            return Err(DomainError::invalid_config("channel count must be positive"));
        }
        if !(self.min_bpm.is_finite() && self.max_bpm.is_finite()) {
            return Err(DomainError::invalid_config("tempo bounds must be finite"));
        }
        if self.min_bpm < MIN_SUPPORTED_BPM {
            return Err(DomainError::invalid_config(format!(
                "minimum tempo must be at least {MIN_SUPPORTED_BPM} bpm"
            )));
        }
        if self.min_bpm >= self.max_bpm {
            return Err(DomainError::invalid_config(format!(
                "minimum tempo {} must be below maximum tempo {}",
                self.min_bpm, self.max_bpm
            )));
        }
        self.tuning.validate()
    }

    pub fn bpm_range(&self) -> RangeInclusive<f32> {
        self.min_bpm..=self.max_bpm
    }

    /// Input samples folded into one envelope value.
    pub fn decimation_factor(&self) -> usize {
        let factor = self.sample_rate as f32 / self.tuning.target_envelope_rate;
        (factor.floor() as usize).max(1)
    }

    /// Envelope samples per second.
    pub fn envelope_rate(&self) -> f64 {
        self.sample_rate as f64 / self.decimation_factor() as f64
    }

    /// Lags, in envelope samples, covering the tempo range. The range always
    /// holds at least three lags so a peak can be interpolated.
    pub fn lag_range(&self) -> RangeInclusive<usize> {
        let rate = self.envelope_rate();
        let lag_min = (bpm_to_lag(self.max_bpm as f64, rate).floor() as usize).max(1);
        let lag_max = (bpm_to_lag(self.min_bpm as f64, rate).ceil() as usize).max(lag_min + 2);
        lag_min..=lag_max
    }

    /// Longest lag the periodicity table correlates: one bar past the slowest
    /// tempo, so the comb filter can weigh bar-length repetition.
    pub fn correlation_reach(&self) -> usize {
        let beats = self.tuning.beats_per_bar as usize;
        let lag_max = *self.lag_range().end();
        lag_max * beats + beats
    }

    /// Envelope samples between successive tempo estimates.
    pub fn estimate_interval(&self) -> usize {
        let samples = self.envelope_rate() * self.tuning.estimate_interval_secs as f64;
        (samples.round() as usize).max(1)
    }
}
