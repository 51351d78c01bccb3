use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use cadence_domain::{AnalysisConfig, Bpm};

use crate::consensus::BpmConsensus;
use crate::engine::TempoTracker;
use crate::error::AnalysisError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub enum AnalysisEvent {
    /// Fraction of the input consumed, 0..=1.
    Progress(f64),
    Complete { bpm: Bpm },
}

impl AnalysisEvent {
    pub fn progress(&self) -> f64 {
        match self {
            AnalysisEvent::Progress(value) => *value,
            AnalysisEvent::Complete { .. } => 1.0,
        }
    }
}

/// Runs a complete recording through a [`TempoTracker`] the way a live
/// stream would arrive, polling the tempo periodically and stopping early
/// once the readings agree.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BpmAnalysis {
    /// Seconds of audio per block fed to the tracker.
    pub buffer_duration: f64,
    /// Seconds of audio between consensus readings.
    pub check_interval: f64,
    pub matches_required: Option<usize>,
}

impl Default for BpmAnalysis {
    fn default() -> Self {
        Self {
            buffer_duration: 0.2,
            check_interval: 4.0,
            matches_required: None,
        }
    }
}

impl BpmAnalysis {
    pub const MIN_BUFFER_DURATION: f64 = 0.1;

    pub fn new(buffer_duration: f64) -> Self {
        Self {
            buffer_duration: buffer_duration.max(Self::MIN_BUFFER_DURATION),
            ..Default::default()
        }
    }

    pub fn with_check_interval(mut self, seconds: f64) -> Self {
        self.check_interval = seconds;
        self
    }

    pub fn with_matches_required(mut self, matches: usize) -> Self {
        self.matches_required = Some(matches);
        self
    }

    pub fn analyze(
        &self,
        config: &AnalysisConfig,
        samples: &[f32],
    ) -> Result<Bpm, AnalysisError> {
        self.analyze_with_events(config, samples, |_| {})
    }

    #[instrument(skip(self, config, samples, on_event), fields(sample_count = samples.len()))]
    pub fn analyze_with_events(
        &self,
        config: &AnalysisConfig,
        samples: &[f32],
        mut on_event: impl FnMut(AnalysisEvent),
    ) -> Result<Bpm, AnalysisError> {
        let mut tracker = TempoTracker::new(config.clone())?;
        let channels = config.channels as usize;
        let total_frames = samples.len() / channels;
        if total_frames == 0 {
            return Err(AnalysisError::EmptyInput);
        }

        let rate = config.sample_rate as f64;
        let buffer_duration = self.buffer_duration.max(Self::MIN_BUFFER_DURATION);
        let frames_per_buffer = ((buffer_duration * rate) as usize).clamp(1, total_frames);
        let check_frames = ((self.check_interval.max(buffer_duration) * rate) as usize).max(1);
        let mut consensus = BpmConsensus::new(self.matches_required);

        let mut consumed = 0usize;
        let mut since_check = 0usize;
        for block in samples.chunks(frames_per_buffer * channels) {
            on_event(AnalysisEvent::Progress(consumed as f64 / total_frames as f64));
            tracker.process(block);
            let frames = block.len() / channels;
            consumed += frames;
            since_check += frames;

            if since_check >= check_frames {
                since_check = 0;
                if let Ok(bpm) = Bpm::from_estimate(tracker.bpm()) {
                    debug!(bpm = bpm.value(), at_frame = consumed, "tempo reading");
                    if consensus.push(bpm) {
                        info!(bpm = bpm.value(), readings = consensus.readings().len(), "tempo settled early");
                        on_event(AnalysisEvent::Complete { bpm });
                        return Ok(bpm);
                    }
                }
            }
        }
        on_event(AnalysisEvent::Progress(1.0));

        let bpm = consensus
            .choose()
            .or_else(|| Bpm::from_estimate(tracker.bpm()).ok())
            .ok_or(AnalysisError::NoTempo)?;
        info!(bpm = bpm.value(), readings = ?consensus.readings(), "tempo analysis complete");
        on_event(AnalysisEvent::Complete { bpm });
        Ok(bpm)
    }
}
