use tracing::debug;

use cadence_domain::{lag_to_bpm, AnalysisConfig, TrackerTuning};

use crate::periodicity::PeriodicityAccumulator;

/// Tempo the perceptual weighting favours.
const PERCEPTUAL_CENTRE_BPM: f64 = 130.0;

/// Highest lag multiple consulted when refining a comb peak.
const MAX_REFINE_MULTIPLE: usize = 16;

/// Multiples within this fraction of the strongest take part in refinement.
const REFINE_KEEP_RATIO: f64 = 0.9;

/// Smoothed tempo and the bookkeeping used to damp octave flicker.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TempoState {
    /// Smoothed estimate in BPM, 0 while unknown.
    pub bpm: f64,
    pub confidence: f32,
    /// Consecutive estimates that disagreed with `bpm` by more than the jump tolerance.
    pub pending_jumps: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Peak {
    score: f64,
    index: usize,
}

/// Turns the periodicity table into a single smoothed BPM value.
///
/// Each estimate runs the table through a comb filter that averages the
/// autocorrelation at the beat lag, the bar lag and its doublings, scores
/// the result against a harmonic template and picks a peak. Inputs with no
/// real pulse (a steady level, a held tone, broadband noise) fail the
/// modulation or prominence checks and leave the tempo unknown.
#[derive(Clone, Debug)]
pub struct TempoEstimator {
    rate: f64,
    min_bpm: f64,
    max_bpm: f64,
    beats_per_bar: usize,
    tuning: TrackerTuning,
    /// Comb filter output in raw score units, indexed by `lag - lag_min`.
    response: Vec<f64>,
    /// `response` rescaled to 0..=1 and perceptually weighted.
    comb: Vec<f64>,
    template: Vec<f64>,
    peaks: Vec<Peak>,
    candidates: Vec<f32>,
    state: TempoState,
}

impl TempoEstimator {
    pub fn new(config: &AnalysisConfig) -> Self {
        let lags = config.lag_range();
        let len = lags.end() - lags.start() + 1;
        Self {
            rate: config.envelope_rate(),
            min_bpm: config.min_bpm as f64,
            max_bpm: config.max_bpm as f64,
            beats_per_bar: config.tuning.beats_per_bar.max(2) as usize,
            tuning: config.tuning.clone(),
            response: vec![0.0; len],
            comb: vec![0.0; len],
            template: vec![0.0; len],
            peaks: Vec::with_capacity(len / 2 + 1),
            candidates: Vec::with_capacity(len / 2 + 1),
            state: TempoState::default(),
        }
    }

    pub fn state(&self) -> TempoState {
        self.state
    }

    /// Current smoothed tempo, 0 while unknown.
    pub fn bpm(&self) -> f64 {
        self.state.bpm
    }

    /// Distinct tempi from the latest accepted estimate, strongest first.
    pub fn candidates(&self) -> &[f32] {
        &self.candidates
    }

    pub fn reset(&mut self) {
        self.state = TempoState::default();
        self.candidates.clear();
        self.peaks.clear();
    }

    /// Takes a fresh reading from the table and folds it into the smoothed
    /// tempo. Returns the updated tempo, or `None` when the table is not
    /// ready or shows no clear periodicity. A rejected reading leaves the
    /// previous tempo in place.
    pub fn update(&mut self, table: &PeriodicityAccumulator) -> Option<f64> {
        if !table.is_ready() || table.is_silent() {
            return None;
        }
        if table.modulation() < self.tuning.min_modulation as f64 {
            return None;
        }
        if table.tempo_scores().len() != self.response.len() {
            return None;
        }
        let scores = table.scores();
        let lag_min = table.lag_min();
        let reach = table.available_reach();

        self.comb_filter(scores, lag_min, reach);
        self.comb.copy_from_slice(&self.response);
        unity_normalise(&mut self.comb);
        self.apply_perceptual_weighting(lag_min);
        self.score_template(lag_min);
        self.collect_peaks();

        let winner = self.pick_winner(scores, lag_min, reach)?;
        let prominence = self.prominence(lag_min, winner.index, table.energy());
        if prominence < self.tuning.min_prominence as f64 {
            return None;
        }

        self.candidates.clear();
        for peak in &self.peaks {
            let bpm = self.refined_bpm(scores, lag_min, reach, peak.index) as f32;
            let gross = (bpm * 2.0).round();
            if !self
                .candidates
                .iter()
                .any(|&seen| (seen * 2.0).round() == gross)
            {
                self.candidates.push(bpm);
            }
        }

        let raw = self.refined_bpm(scores, lag_min, reach, winner.index);
        self.state.confidence = prominence.min(1.0) as f32;
        Some(self.smooth(raw))
    }

    fn comb_filter(&mut self, scores: &[f64], lag_min: usize, reach: usize) {
        let beats = self.beats_per_bar;
        for (index, slot) in self.response.iter_mut().enumerate() {
            let mut total = 0.0;
            let mut count = 0usize;
            for (_, base, width) in Multiples::new(lag_min + index, beats) {
                if base < lag_min || base + width - 1 > reach {
                    break;
                }
                let window = &scores[base - lag_min..base - lag_min + width];
                total += window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                count += 1;
            }
            *slot = if count > 0 { total / count as f64 } else { 0.0 };
        }
    }

    fn apply_perceptual_weighting(&mut self, lag_min: usize) {
        let amount = self.tuning.perceptual_weighting as f64;
        if amount <= 0.0 {
            return;
        }
        for (index, value) in self.comb.iter_mut().enumerate() {
            let bpm = lag_to_bpm((lag_min + index) as f64, self.rate);
            *value *= perceptual_weight(bpm, amount);
        }
    }

    fn score_template(&mut self, lag_min: usize) {
        let blend = self.tuning.template_blend as f64;
        let [w1, w2, w3, w4] = self.tuning.harmonic_weights.map(f64::from);
        let [p2, p3] = self.tuning.subharmonic_penalties.map(f64::from);
        let comb = &self.comb;
        for (index, slot) in self.template.iter_mut().enumerate() {
            let lag = lag_min + index;
            let near = |target: usize| near_lag(comb, lag_min, target);
            let mut harmonic = comb[index] * w1
                + near(lag * 2) * w2
                + near(lag * 3) * w3
                + near(lag * 4) * w4;
            harmonic -= near((lag / 2).max(1)) * p2;
            harmonic -= near((lag / 3).max(1)) * p3;
            *slot = comb[index] * (1.0 - blend) + harmonic.max(0.0) * blend;
        }
        unity_normalise(&mut self.template);
    }

    /// Interior local maxima of the template, strongest first. With none, a
    /// template that peaks at either end of the range means the pulse lies
    /// beyond it, and that end stands in for it.
    fn collect_peaks(&mut self) {
        self.peaks.clear();
        let template = &self.template;
        for index in 1..template.len().saturating_sub(1) {
            if template[index] > template[index - 1] && template[index] > template[index + 1] {
                self.peaks.push(Peak {
                    score: template[index],
                    index,
                });
            }
        }
        if self.peaks.is_empty() {
            let last = template.len().saturating_sub(1);
            if let Some((index, &score)) = template
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
            {
                if index == 0 || index == last {
                    self.peaks.push(Peak { score, index });
                }
            }
        }
        self.peaks.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    /// Among peaks tied with the best, prefers the one nearest the current tempo.
    fn pick_winner(&self, scores: &[f64], lag_min: usize, reach: usize) -> Option<Peak> {
        let best = *self.peaks.first()?;
        if self.state.bpm <= 0.0 {
            return Some(best);
        }
        let floor = best.score - self.tuning.tie_tolerance as f64 * best.score.abs();
        let distance = |peak: &Peak| {
            (self.refined_bpm(scores, lag_min, reach, peak.index) - self.state.bpm).abs()
        };
        self.peaks
            .iter()
            .take_while(|peak| peak.score >= floor)
            .min_by(|a, b| distance(a).total_cmp(&distance(b)))
            .copied()
    }

    /// Height of the comb response at `index` over the higher of the lowest
    /// points within a quarter lag either side, relative to envelope energy.
    fn prominence(&self, lag_min: usize, index: usize, energy: f64) -> f64 {
        if energy <= 0.0 {
            return 0.0;
        }
        let span = ((lag_min + index) / 4).max(2);
        let left = &self.response[index.saturating_sub(span)..index];
        let right_end = (index + 1 + span).min(self.response.len());
        let right = &self.response[index + 1..right_end];
        let floor = [left, right]
            .iter()
            .filter(|side| !side.is_empty())
            .map(|side| side.iter().copied().fold(f64::INFINITY, f64::min))
            .fold(f64::NEG_INFINITY, f64::max);
        if floor.is_finite() {
            ((self.response[index] - floor) / energy).max(0.0)
        } else {
            0.0
        }
    }

    /// Tempo behind the comb peak at `index`: a weighted consensus of the
    /// strongest multiples of the lag, snapped to the nearest raw peak and
    /// clamped to the configured range.
    fn refined_bpm(&self, scores: &[f64], lag_min: usize, reach: usize, index: usize) -> f64 {
        let seed = lag_min + index;
        let guess = consensus_lag(scores, lag_min, reach, seed, self.beats_per_bar);
        let lag_max = lag_min + self.response.len() - 1;
        let lag = fundamental_lag(scores, lag_min, lag_max, reach, guess);
        lag_to_bpm(lag, self.rate).clamp(self.min_bpm, self.max_bpm)
    }

    fn smooth(&mut self, raw: f64) -> f64 {
        let state = &mut self.state;
        if state.bpm <= 0.0 {
            debug!(bpm = raw, "tempo established");
            state.bpm = raw;
            state.pending_jumps = 0;
        } else if (raw - state.bpm).abs() / state.bpm <= self.tuning.jump_tolerance as f64 {
            state.bpm += self.tuning.smoothing as f64 * (raw - state.bpm);
            state.pending_jumps = 0;
        } else {
            state.pending_jumps += 1;
            if state.pending_jumps >= self.tuning.jump_confirmations {
                debug!(from = state.bpm, to = raw, "tempo jump confirmed");
                state.bpm = raw;
                state.pending_jumps = 0;
            }
        }
        state.bpm = state.bpm.clamp(self.min_bpm, self.max_bpm);
        state.bpm
    }
}

/// Windows of the autocorrelation that count towards a lag: the lag itself,
/// then `beats_per_bar` times it, then successive doublings. Wider multiples
/// take a wider window to absorb tempo jitter. Yields
/// `(multiple, first_lag, width)`.
struct Multiples {
    lag: usize,
    beats_per_bar: usize,
    multiple: usize,
}

impl Multiples {
    fn new(lag: usize, beats_per_bar: usize) -> Self {
        Self {
            lag,
            beats_per_bar: beats_per_bar.max(2),
            multiple: 1,
        }
    }
}

impl Iterator for Multiples {
    type Item = (usize, usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let multiple = self.multiple;
        self.multiple = if multiple == 1 {
            self.beats_per_bar
        } else {
            multiple.checked_mul(2)?
        };
        if multiple == 1 {
            return Some((1, self.lag, 1));
        }
        let base = self.lag.checked_mul(multiple)? - multiple / 4;
        Some((multiple, base, multiple / 4 + multiple / 2))
    }
}

/// Weighted agreement between the peaks found at each multiple of `seed`,
/// each divided back down to a single beat. Multiples close to the seed and
/// close to the strongest response count most.
fn consensus_lag(
    scores: &[f64],
    lag_min: usize,
    reach: usize,
    seed: usize,
    beats_per_bar: usize,
) -> f64 {
    let mut found = [(0.0f64, 0.0f64); 8];
    let mut len = 0;
    let mut strongest = 0.0f64;
    for (multiple, base, width) in Multiples::new(seed, beats_per_bar) {
        if multiple > MAX_REFINE_MULTIPLE
            || base < lag_min
            || base + width - 1 > reach
            || len == found.len()
        {
            break;
        }
        let mut at = base;
        for lag in base..base + width {
            if scores[lag - lag_min] > scores[at - lag_min] {
                at = lag;
            }
        }
        let peak = scores[at - lag_min];
        if peak > 0.0 {
            let refined = parabolic_offset(scores, lag_min, reach, at) + at as f64;
            found[len] = (refined / multiple as f64, peak);
            len += 1;
            strongest = strongest.max(peak);
        }
    }

    let seed = seed as f64;
    let keep = strongest * REFINE_KEEP_RATIO;
    let (weighted, total) = found[..len]
        .iter()
        .filter(|(_, peak)| *peak >= keep)
        .fold((0.0, 0.0), |(weighted, total), &(lag, peak)| {
            let weight = peak / (1.0 + (lag - seed).abs());
            (weighted + lag * weight, total + weight)
        });
    if total > 0.0 {
        weighted / total
    } else {
        seed
    }
}

/// Snaps `guess` to the strongest raw score within two lags, interpolated,
/// never leaving the tempo range.
fn fundamental_lag(scores: &[f64], lag_min: usize, lag_max: usize, reach: usize, guess: f64) -> f64 {
    let centre = guess.round().max(0.0) as usize;
    let low = centre.saturating_sub(2).max(lag_min);
    let high = (centre + 2).min(lag_max).min(reach.saturating_sub(1));
    if low > high {
        return guess;
    }
    let mut peak = low;
    for lag in low..=high {
        if scores[lag - lag_min] > scores[peak - lag_min] {
            peak = lag;
        }
    }
    peak as f64 + parabolic_offset(scores, lag_min, reach, peak)
}

/// Sub-lag offset of a local maximum from the parabola through its
/// neighbours, 0 when `lag` is not a strict local maximum.
fn parabolic_offset(scores: &[f64], lag_min: usize, reach: usize, lag: usize) -> f64 {
    if lag <= lag_min || lag + 1 > reach {
        return 0.0;
    }
    let index = lag - lag_min;
    let (left, centre, right) = (scores[index - 1], scores[index], scores[index + 1]);
    if centre > left && centre > right {
        let denominator = left - 2.0 * centre + right;
        if denominator != 0.0 {
            return 0.5 * (left - right) / denominator;
        }
    }
    0.0
}

/// Bias towards tempi near 130 bpm, blended with a neutral 1 by `amount`.
fn perceptual_weight(bpm: f64, amount: f64) -> f64 {
    let deviation = (PERCEPTUAL_CENTRE_BPM - bpm).abs();
    let width = if bpm < PERCEPTUAL_CENTRE_BPM { 100.0 } else { 80.0 };
    let biased = (1.0 - (deviation / width).powf(2.4)).max(0.0);
    1.0 + (biased - 1.0) * amount.clamp(0.0, 1.0)
}

/// Strongest comb response within one lag of `target`, 0 outside the table.
fn near_lag(comb: &[f64], lag_min: usize, target: usize) -> f64 {
    (target.saturating_sub(1)..=target + 1)
        .filter_map(|lag| lag.checked_sub(lag_min))
        .filter_map(|index| comb.get(index))
        .copied()
        .fold(0.0, f64::max)
}

/// Rescales `values` onto 0..=1. A flat slice is left untouched.
fn unity_normalise(values: &mut [f64]) {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if max > min {
        let scale = 1.0 / (max - min);
        values.iter_mut().for_each(|v| *v = (*v - min) * scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn config() -> AnalysisConfig {
        AnalysisConfig::new(44_100, 1, 60.0, 180.0).unwrap()
    }

    /// Feeds a synthetic envelope with one pulse every `period` samples.
    fn table_for_period(config: &AnalysisConfig, period: f64, samples: usize) -> PeriodicityAccumulator {
        let mut table = PeriodicityAccumulator::from_config(config);
        for i in 0..samples {
            let phase = (i as f64 / period).fract() * period;
            let distance = phase.min(period - phase);
            table.push((-distance * distance / 4.0).exp() as f32);
        }
        table
    }

    fn table_from(config: &AnalysisConfig, envelope: impl IntoIterator<Item = f32>) -> PeriodicityAccumulator {
        let mut table = PeriodicityAccumulator::from_config(config);
        envelope.into_iter().for_each(|value| table.push(value));
        table
    }

    #[test]
    fn unready_table_gives_nothing() {
        let config = config();
        let table = table_for_period(&config, 125.0, 100);
        let mut estimator = TempoEstimator::new(&config);
        assert_eq!(estimator.update(&table), None);
        assert_eq!(estimator.bpm(), 0.0);
    }

    #[test]
    fn finds_fractional_period() {
        let config = config();
        let rate = config.envelope_rate();
        let period = rate * 60.0 / 120.0;
        let table = table_for_period(&config, period, 2_000);
        let mut estimator = TempoEstimator::new(&config);
        let bpm = estimator.update(&table).unwrap();
        assert_abs_diff_eq!(bpm, 120.0, epsilon = 1.0);
        assert!(!estimator.candidates().is_empty());
        assert_abs_diff_eq!(estimator.candidates()[0], 120.0, epsilon = 1.0);
        assert!(estimator.state().confidence > 0.0);
    }

    #[test]
    fn prefers_the_fundamental_over_its_double() {
        let config = config();
        let rate = config.envelope_rate();
        // 90 bpm: its double period (45 bpm) is out of range but 180 bpm is in
        let period = rate * 60.0 / 90.0;
        let table = table_for_period(&config, period, 3_000);
        let mut estimator = TempoEstimator::new(&config);
        let bpm = estimator.update(&table).unwrap();
        assert_abs_diff_eq!(bpm, 90.0, epsilon = 1.0);
    }

    #[test]
    fn steady_level_is_not_a_tempo() {
        let config = config();
        let mut estimator = TempoEstimator::new(&config);
        let table = table_from(&config, std::iter::repeat(0.3).take(2_000));
        assert_eq!(estimator.update(&table), None);

        // a level that settles slowly still has no pulse in it
        let table = table_from(&config, (0..2_000).map(|i| 0.3 * (1.0 - (-(i as f32) / 400.0).exp())));
        assert_eq!(estimator.update(&table), None);
        assert_eq!(estimator.bpm(), 0.0);
        assert!(estimator.candidates().is_empty());
    }

    #[test]
    fn weak_periodicity_is_rejected() {
        let config = config();
        let rate = config.envelope_rate();
        let period = rate * 60.0 / 120.0;
        // a faint ripple on a loud level: modulated, but barely
        let table = table_from(
            &config,
            (0..2_000).map(|i| {
                let phase = (i as f64 / period).fract();
                0.5 + 0.02 * (std::f64::consts::TAU * phase).cos() as f32
            }),
        );
        let mut estimator = TempoEstimator::new(&config);
        assert!(table.modulation() < config.tuning.min_modulation as f64);
        assert_eq!(estimator.update(&table), None);

        let strict = AnalysisConfig::with_tuning(
            44_100,
            1,
            60.0,
            180.0,
            TrackerTuning {
                min_prominence: 5.0,
                ..Default::default()
            },
        )
        .unwrap();
        let table = table_for_period(&strict, period, 2_000);
        let mut estimator = TempoEstimator::new(&strict);
        assert_eq!(estimator.update(&table), None);
    }

    #[test]
    fn comb_response_counts_the_bar() {
        let config = config();
        let lag_min = *config.lag_range().start();
        let reach = config.correlation_reach();
        let mut scores = vec![0.0; reach - lag_min + 1];
        // beat at lag 100 and its bar at 400
        scores[100 - lag_min] = 1.0;
        scores[400 - lag_min] = 1.0;
        let mut estimator = TempoEstimator::new(&config);
        // beat, bar and the empty double bar at 800
        estimator.comb_filter(&scores, lag_min, reach);
        assert_abs_diff_eq!(estimator.response[100 - lag_min], 2.0 / 3.0);
        // lag 200 only sees its own empty slot and the bar at 800
        assert_abs_diff_eq!(estimator.response[200 - lag_min], 0.0);

        // with only half the history, the bar multiple is not consulted yet
        estimator.comb_filter(&scores, lag_min, 399);
        assert_abs_diff_eq!(estimator.response[100 - lag_min], 1.0);
        scores[100 - lag_min] = 0.0;
        estimator.comb_filter(&scores, lag_min, reach);
        assert_abs_diff_eq!(estimator.response[100 - lag_min], 1.0 / 3.0);
    }

    #[test]
    fn multiples_follow_the_bar_then_double() {
        let windows: Vec<_> = Multiples::new(10, 4).take(4).collect();
        assert_eq!(windows, vec![(1, 10, 1), (4, 39, 3), (8, 78, 6), (16, 156, 12)]);
        let waltz: Vec<_> = Multiples::new(10, 3).take(3).map(|(m, _, _)| m).collect();
        assert_eq!(waltz, vec![1, 3, 6]);
    }

    #[test]
    fn consensus_averages_agreeing_multiples() {
        let lag_min = 50;
        let reach = 500;
        let mut scores = vec![0.0; reach - lag_min + 1];
        // beat a little past 100, bar at 401
        for (lag, value) in [(100, 1.0), (101, 0.6), (400, 0.5), (401, 1.0), (402, 0.5)] {
            scores[lag - lag_min] = value;
        }
        let lag = consensus_lag(&scores, lag_min, reach, 100, 4);
        assert!(lag > 100.2 && lag < 100.26, "lag {lag}");
        assert_abs_diff_eq!(consensus_lag(&vec![0.0; 451], lag_min, reach, 100, 4), 100.0);
    }

    #[test]
    fn perceptual_weight_is_neutral_at_zero() {
        assert_eq!(perceptual_weight(60.0, 0.0), 1.0);
        assert_abs_diff_eq!(perceptual_weight(130.0, 1.0), 1.0);
        assert!(perceptual_weight(60.0, 1.0) < perceptual_weight(120.0, 1.0));
        assert!(perceptual_weight(220.0, 1.0) < perceptual_weight(140.0, 1.0));
        assert_eq!(perceptual_weight(300.0, 1.0), 0.0);
    }

    #[test]
    fn tied_peaks_go_to_the_one_nearest_the_current_tempo() {
        let config = config();
        let lag_min = *config.lag_range().start();
        let reach = config.correlation_reach();
        let mut scores = vec![0.0; reach - lag_min + 1];
        for (centre, height) in [(100, 1.0), (160, 0.6), (200, 0.9)] {
            scores[centre - lag_min - 1] = height / 2.0;
            scores[centre - lag_min] = height;
            scores[centre - lag_min + 1] = height / 2.0;
        }
        let fast = lag_to_bpm(100.0, config.envelope_rate());
        let slow = lag_to_bpm(200.0, config.envelope_rate());
        let middle = lag_to_bpm(160.0, config.envelope_rate());

        let mut estimator = TempoEstimator::new(&config);
        estimator.peaks = vec![
            Peak { score: 1.0, index: 100 - lag_min },
            Peak { score: 0.97, index: 200 - lag_min },
            Peak { score: 0.80, index: 160 - lag_min },
        ];
        let pick = |estimator: &TempoEstimator| {
            let peak = estimator.pick_winner(&scores, lag_min, reach).unwrap();
            estimator.refined_bpm(&scores, lag_min, reach, peak.index)
        };

        // nothing established yet: the strongest wins
        assert_abs_diff_eq!(pick(&estimator), fast, epsilon = 0.5);

        // within tie tolerance, the weaker peak wins when it is closer
        estimator.state.bpm = slow + 1.0;
        assert_abs_diff_eq!(pick(&estimator), slow, epsilon = 0.5);

        // a closer peak outside the tie tolerance is never considered
        estimator.state.bpm = middle;
        assert_abs_diff_eq!(pick(&estimator), slow, epsilon = 0.5);
    }

    #[test]
    fn smoothing_damps_drift_and_confirms_jumps() {
        let mut estimator = TempoEstimator::new(&config());
        assert_eq!(estimator.smooth(120.0), 120.0);
        let drifted = estimator.smooth(124.0);
        assert!(drifted > 120.0 && drifted < 124.0);

        let before = estimator.bpm();
        for _ in 0..3 {
            assert_eq!(estimator.smooth(60.0), before);
        }
        assert_eq!(estimator.state().pending_jumps, 3);
        assert_eq!(estimator.smooth(60.0), 60.0);
        assert_eq!(estimator.state().pending_jumps, 0);
    }

    #[test]
    fn smoothed_value_stays_in_range() {
        let mut estimator = TempoEstimator::new(&config());
        assert_eq!(estimator.smooth(500.0), 180.0);
    }

    #[test]
    fn unity_normalise_handles_flat_input() {
        let mut flat = vec![-2.0; 4];
        unity_normalise(&mut flat);
        assert_eq!(flat, vec![-2.0; 4]);

        let mut ramp = vec![1.0, 2.0, 3.0];
        unity_normalise(&mut ramp);
        assert_eq!(ramp, vec![0.0, 0.5, 1.0]);
    }
}
