use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Converts a tempo into a beat period measured in samples at `rate` Hz.
pub fn bpm_to_lag(bpm: f64, rate: f64) -> f64 {
    rate * 60.0 / bpm
}

/// Converts a (possibly fractional) beat period in samples back into BPM.
pub fn lag_to_bpm(lag: f64, rate: f64) -> f64 {
    rate * 60.0 / lag
}

/// A consistent view of the tracker's published state.
///
/// `bpm == 0.0` means the tempo is not yet determined; `beats` stays at zero
/// until it is.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TempoReading {
    pub bpm: f32,
    pub beats: u64,
    /// Peak prominence of the winning lag, 0..=1.
    pub confidence: f32,
}

impl TempoReading {
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.bpm > 0.0
    }

    pub fn seconds_per_beat(&self) -> Option<f64> {
        self.is_known().then(|| 60.0 / self.bpm as f64)
    }
}

/// A whole-number tempo, as reported by consensus over several readings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bpm(u32);

impl Bpm {
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::validation("bpm must be positive"));
        }
        Ok(Self(value))
    }

    /// Rounds a raw estimate to the nearest whole BPM, half away from zero.
    pub fn from_estimate(bpm: f32) -> Result<Self, DomainError> {
        if !bpm.is_finite() {
            return Err(DomainError::validation("bpm must be finite"));
        }
        let rounded = bpm.round();
        if rounded < 1.0 || rounded > u32::MAX as f32 {
            return Err(DomainError::validation(format!(
                "bpm {bpm} does not round to a positive tempo"
            )));
        }
        Self::new(rounded as u32)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_multiple_of(&self, other: u32) -> bool {
        other != 0 && (self.0 % other == 0 || other % self.0 == 0)
    }
}
