pub mod config;
pub mod error;
pub mod tempo;

pub use crate::config::{AnalysisConfig, TrackerTuning, MIN_SUPPORTED_BPM};
pub use crate::error::DomainError;
pub use crate::tempo::{bpm_to_lag, lag_to_bpm, Bpm, TempoReading};
