use std::ops::RangeInclusive;

use ringbuf::{HeapRb, Rb};

use cadence_domain::AnalysisConfig;

/// Default silence threshold on decayed envelope energy.
pub const SILENCE_FLOOR: f64 = 1.0e-20;

/// Decaying autocorrelation of the envelope, from the fastest tempo's lag
/// out to a bar past the slowest one.
///
/// Each envelope sample costs one multiply-add per lag: the new sample is
/// correlated against the value exactly `lag` samples earlier and added to a
/// score that fades with the correlation window. Lags whose history has not
/// arrived yet are skipped and start accumulating as soon as it has.
pub struct PeriodicityAccumulator {
    /// Mean-removed envelope, newest last. Holds `reach + 1` values.
    history: HeapRb<f64>,
    capacity: usize,
    /// Scores indexed by `lag - lag_min`, up to `reach`.
    scores: Vec<f64>,
    lag_min: usize,
    lag_max: usize,
    decay: f64,
    mean: f64,
    mean_weight: f64,
    seen: u64,
    /// Decayed energy of the mean-removed envelope.
    energy: f64,
    /// Decayed energy of the raw envelope.
    power: f64,
    silence_floor: f64,
}

impl PeriodicityAccumulator {
    /// `lags` is the tempo range; scores are kept out to `reach`, which is
    /// raised to the end of `lags` if shorter. A zero `mean_weight` disables
    /// mean removal.
    pub fn new(lags: RangeInclusive<usize>, reach: usize, decay: f64, mean_weight: f64) -> Self {
        let lag_min = (*lags.start()).max(1);
        let lag_max = (*lags.end()).max(lag_min);
        let reach = reach.max(lag_max);
        let capacity = reach + 1;
        Self {
            history: HeapRb::new(capacity),
            capacity,
            scores: vec![0.0; reach - lag_min + 1],
            lag_min,
            lag_max,
            decay: decay.clamp(0.0, 1.0),
            mean: 0.0,
            mean_weight: mean_weight.clamp(0.0, 1.0),
            seen: 0,
            energy: 0.0,
            power: 0.0,
            silence_floor: SILENCE_FLOOR,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        let rate = config.envelope_rate();
        let decay = (-1.0 / (rate * config.tuning.correlation_window_secs as f64)).exp();
        let mean_weight = 1.0 - (-1.0 / (rate * config.tuning.mean_window_secs as f64)).exp();
        Self::new(config.lag_range(), config.correlation_reach(), decay, mean_weight)
            .with_silence_floor(config.tuning.silence_floor as f64)
    }

    pub fn with_silence_floor(mut self, floor: f64) -> Self {
        self.silence_floor = floor.max(0.0);
        self
    }

    /// Appends one envelope value and folds it into every lag's score.
    pub fn push(&mut self, value: f32) {
        let value = value as f64;
        if self.mean_weight > 0.0 {
            // plain running average until the window has filled once
            let weight = self.mean_weight.max(1.0 / (self.seen + 1) as f64);
            self.mean += weight * (value - self.mean);
        }
        self.seen += 1;
        let current = value - self.mean;
        self.history.push_overwrite(current);
        self.energy = self.energy * self.decay + current * current;
        self.power = self.power * self.decay + value * value;

        let decay = self.decay;
        let mut past = self.history.iter().rev().skip(self.lag_min);
        for score in self.scores.iter_mut() {
            *score *= decay;
            if let Some(earlier) = past.next() {
                *score += current * earlier;
            }
        }
    }

    pub fn lag_min(&self) -> usize {
        self.lag_min
    }

    /// Slowest tempo's lag.
    pub fn lag_max(&self) -> usize {
        self.lag_max
    }

    /// Longest lag scored.
    pub fn reach(&self) -> usize {
        self.lag_min + self.scores.len() - 1
    }

    /// Longest lag with any history behind it yet.
    pub fn available_reach(&self) -> usize {
        self.history.len().saturating_sub(1).min(self.reach())
    }

    /// Scores for every lag from `lag_min` to `reach`.
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Scores restricted to the tempo range.
    pub fn tempo_scores(&self) -> &[f64] {
        &self.scores[..=self.lag_max - self.lag_min]
    }

    pub fn score_at(&self, lag: usize) -> Option<f64> {
        lag.checked_sub(self.lag_min)
            .and_then(|index| self.scores.get(index))
            .copied()
    }

    /// Envelope samples currently held, at most `reach + 1`.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// True once the slowest tempo's lag has a full history behind it.
    pub fn is_ready(&self) -> bool {
        self.history.len() > self.lag_max
    }

    /// Decayed energy of the mean-removed envelope.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Fraction of the envelope's decayed power that is fluctuation around
    /// its mean. Near 0 for a steady level, near 1 for sparse pulses.
    pub fn modulation(&self) -> f64 {
        if self.power > 0.0 {
            (self.energy / self.power).min(1.0)
        } else {
            0.0
        }
    }

    pub fn is_silent(&self) -> bool {
        self.energy <= self.silence_floor
    }

    pub fn reset(&mut self) {
        self.history = HeapRb::new(self.capacity);
        self.scores.iter_mut().for_each(|score| *score = 0.0);
        self.mean = 0.0;
        self.seen = 0;
        self.energy = 0.0;
        self.power = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pulse_train(period: usize, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| match i % period {
                0 => 1.0,
                1 => 0.5,
                _ => 0.0,
            })
            .collect()
    }

    #[test]
    fn peaks_at_the_pulse_period() {
        let mut acc = PeriodicityAccumulator::new(10..=40, 40, 0.999, 0.01);
        for value in pulse_train(25, 600) {
            acc.push(value);
        }
        assert!(acc.is_ready());
        let (best, _) = acc
            .scores()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(best + acc.lag_min(), 25);
    }

    #[test]
    fn lags_wait_for_history() {
        let mut acc = PeriodicityAccumulator::new(4..=8, 8, 1.0, 0.0);
        for _ in 0..6 {
            acc.push(1.0);
        }
        assert_eq!(acc.history_len(), 6);
        assert!(!acc.is_ready());
        // lags 4 and 5 have seen two and one products, the rest nothing yet
        assert_relative_eq!(acc.score_at(4).unwrap(), 2.0);
        assert_relative_eq!(acc.score_at(5).unwrap(), 1.0);
        assert_eq!(acc.score_at(6), Some(0.0));
        assert_eq!(acc.score_at(8), Some(0.0));
        assert_eq!(acc.score_at(9), None);
        assert_eq!(acc.score_at(3), None);

        for _ in 0..3 {
            acc.push(1.0);
        }
        assert!(acc.is_ready());
        assert_eq!(acc.history_len(), 9);
        assert_relative_eq!(acc.score_at(8).unwrap(), 1.0);
    }

    #[test]
    fn silence_leaves_a_flat_table() {
        let mut acc = PeriodicityAccumulator::new(10..=40, 40, 0.99, 0.01);
        for _ in 0..500 {
            acc.push(0.0);
        }
        assert!(acc.is_ready());
        assert!(acc.is_silent());
        assert!(acc.scores().iter().all(|&score| score == 0.0));
    }

    #[test]
    fn old_contributions_fade() {
        let mut acc = PeriodicityAccumulator::new(2..=4, 4, 0.5, 0.0);
        for _ in 0..5 {
            acc.push(1.0);
        }
        let before = acc.score_at(2).unwrap();
        for _ in 0..20 {
            acc.push(0.0);
        }
        assert!(acc.score_at(2).unwrap() < before * 1.0e-5);
    }

    #[test]
    fn reset_clears_history() {
        let mut acc = PeriodicityAccumulator::new(2..=4, 4, 0.9, 0.1);
        for value in pulse_train(3, 20) {
            acc.push(value);
        }
        acc.reset();
        assert_eq!(acc.history_len(), 0);
        assert!(acc.is_silent());
        assert!(acc.scores().iter().all(|&score| score == 0.0));
    }

    #[test]
    fn scores_extend_past_the_tempo_range() {
        let mut acc = PeriodicityAccumulator::new(10..=20, 80, 0.999, 0.01);
        assert_eq!(acc.lag_max(), 20);
        assert_eq!(acc.reach(), 80);
        assert_eq!(acc.tempo_scores().len(), 11);
        for value in pulse_train(15, 30) {
            acc.push(value);
        }
        // ready for the tempo range long before the bar-length lags fill
        assert!(acc.is_ready());
        assert_eq!(acc.available_reach(), 29);
        for value in pulse_train(15, 200) {
            acc.push(value);
        }
        assert_eq!(acc.available_reach(), 80);
        let at_bar = acc.score_at(60).unwrap();
        let off_bar = acc.score_at(52).unwrap();
        assert!(at_bar > off_bar);
    }

    #[test]
    fn steady_level_has_no_modulation() {
        let mut acc = PeriodicityAccumulator::new(10..=40, 40, 0.99, 0.01);
        for _ in 0..2_000 {
            acc.push(0.3);
        }
        assert!(acc.modulation() < 1.0e-3, "modulation {}", acc.modulation());

        let mut pulses = PeriodicityAccumulator::new(10..=40, 40, 0.99, 0.01);
        for value in pulse_train(25, 2_000) {
            pulses.push(value);
        }
        assert!(pulses.modulation() > 0.5, "modulation {}", pulses.modulation());
    }

    #[test]
    fn silence_floor_is_adjustable() {
        let mut acc = PeriodicityAccumulator::new(2..=4, 4, 0.9, 0.1).with_silence_floor(1.0);
        for value in pulse_train(3, 20) {
            acc.push(value * 0.01);
        }
        assert!(acc.energy() > 0.0);
        assert!(acc.is_silent());
    }
}
