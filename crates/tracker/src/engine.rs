use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use cadence_audio::{Downmixer, EnvelopeTracker, SampleBlock};
use cadence_domain::{AnalysisConfig, DomainError, TempoReading};

use crate::beats::BeatCounter;
use crate::estimator::TempoEstimator;
use crate::periodicity::PeriodicityAccumulator;

/// Cloneable, thread-safe view of a tracker's latest reading.
///
/// The producer publishes `{bpm, beats, confidence}` as one unit at the end
/// of every `process` call, so readers never see a torn pair.
#[derive(Clone, Debug, Default)]
pub struct TempoReadout {
    shared: Arc<Mutex<TempoReading>>,
}

impl TempoReadout {
    pub fn snapshot(&self) -> TempoReading {
        *self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bpm(&self) -> f32 {
        self.snapshot().bpm
    }

    pub fn beats(&self) -> u64 {
        self.snapshot().beats
    }

    fn publish(&self, reading: TempoReading) {
        *self.shared.lock().unwrap_or_else(PoisonError::into_inner) = reading;
    }
}

/// Everything downstream of the downmixer, advanced one mono sample at a time.
struct AnalysisChain {
    envelope: EnvelopeTracker,
    periodicity: PeriodicityAccumulator,
    estimator: TempoEstimator,
    beats: BeatCounter,
    envelope_rate: f64,
    estimate_interval: usize,
    since_estimate: usize,
}

impl AnalysisChain {
    fn new(config: &AnalysisConfig) -> Self {
        Self {
            envelope: EnvelopeTracker::from_config(config),
            periodicity: PeriodicityAccumulator::from_config(config),
            estimator: TempoEstimator::new(config),
            beats: BeatCounter::new(),
            envelope_rate: config.envelope_rate(),
            estimate_interval: config.estimate_interval(),
            since_estimate: 0,
        }
    }

    #[inline]
    fn push_sample(&mut self, sample: f32) {
        let Some(value) = self.envelope.push(sample) else {
            return;
        };
        self.periodicity.push(value);

        self.since_estimate += 1;
        if self.since_estimate >= self.estimate_interval {
            self.since_estimate = 0;
            self.estimator.update(&self.periodicity);
        }

        self.beats.advance(self.estimator.bpm(), self.envelope_rate);
    }

    fn reading(&self) -> TempoReading {
        let state = self.estimator.state();
        TempoReading {
            bpm: state.bpm as f32,
            beats: self.beats.beats(),
            confidence: state.confidence,
        }
    }

    fn reset(&mut self) {
        self.envelope.reset();
        self.periodicity.reset();
        self.estimator.reset();
        self.beats.reset();
        self.since_estimate = 0;
    }
}

/// Streaming tempo tracker.
///
/// Feed it sample blocks of any size from a single producer thread; query
/// the tempo from anywhere through [`TempoTracker::readout`].
pub struct TempoTracker {
    config: AnalysisConfig,
    downmixer: Downmixer,
    chain: AnalysisChain,
    readout: TempoReadout,
}

impl TempoTracker {
    pub fn new(config: AnalysisConfig) -> Result<Self, DomainError> {
        config.validate()?;
        let downmixer = Downmixer::new(config.channels)?;
        let chain = AnalysisChain::new(&config);
        debug!(
            sample_rate = config.sample_rate,
            channels = config.channels,
            min_bpm = config.min_bpm,
            max_bpm = config.max_bpm,
            decimation = config.decimation_factor(),
            "tempo tracker created"
        );
        Ok(Self {
            config,
            downmixer,
            chain,
            readout: TempoReadout::default(),
        })
    }

    /// Shorthand for a tracker with default tuning.
    pub fn create(
        sample_rate: u32,
        channels: u16,
        min_bpm: f32,
        max_bpm: f32,
    ) -> Result<Self, DomainError> {
        Self::new(AnalysisConfig::new(sample_rate, channels, min_bpm, max_bpm)?)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Ingests interleaved samples.
    pub fn process(&mut self, samples: &[f32]) {
        self.process_block(SampleBlock::Interleaved(samples));
    }

    pub fn process_block(&mut self, block: SampleBlock<'_>) {
        self.downmixer
            .downmix(block, |sample| self.chain.push_sample(sample));
        self.readout.publish(self.chain.reading());
    }

    /// Smoothed tempo, 0 until enough audio has been seen.
    pub fn bpm(&self) -> f32 {
        self.readout.bpm()
    }

    /// Beats counted since the tempo became known.
    pub fn beats(&self) -> u64 {
        self.readout.beats()
    }

    pub fn reading(&self) -> TempoReading {
        self.readout.snapshot()
    }

    /// A handle for reading the tempo from another thread.
    pub fn readout(&self) -> TempoReadout {
        self.readout.clone()
    }

    /// Distinct tempi behind the latest estimate, strongest first.
    pub fn tempo_candidates(&self) -> &[f32] {
        self.chain.estimator.candidates()
    }

    /// Returns to the freshly constructed state, keeping the config.
    pub fn reset(&mut self) {
        self.downmixer.reset();
        self.chain.reset();
        self.readout.publish(TempoReading::unknown());
        debug!("tempo tracker reset");
    }
}
