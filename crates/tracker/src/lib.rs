pub mod analysis;
pub mod beats;
pub mod consensus;
pub mod engine;
pub mod error;
pub mod estimator;
pub mod periodicity;

pub use analysis::{AnalysisEvent, BpmAnalysis};
pub use beats::BeatCounter;
pub use consensus::BpmConsensus;
pub use engine::{TempoReadout, TempoTracker};
pub use error::AnalysisError;
pub use estimator::{TempoEstimator, TempoState};
pub use periodicity::PeriodicityAccumulator;

pub use cadence_audio::SampleBlock;
pub use cadence_domain::{AnalysisConfig, Bpm, DomainError, TempoReading, TrackerTuning};
