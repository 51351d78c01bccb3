/// Integrates elapsed envelope time against the current tempo.
///
/// The count only ever grows: a tempo change alters the period going
/// forward, never beats already counted.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BeatCounter {
    /// Fraction of the current beat already elapsed, 0..1.
    phase: f64,
    beats: u64,
    /// Envelope samples integrated since the tempo became known.
    elapsed: u64,
}

impl BeatCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beats(&self) -> u64 {
        self.beats
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Advances by one envelope sample at `rate` Hz. A non-positive tempo
    /// means "not yet known" and leaves the counter untouched.
    #[inline]
    pub fn advance(&mut self, bpm: f64, rate: f64) {
        if !(bpm > 0.0 && rate > 0.0) {
            return;
        }
        self.elapsed += 1;
        self.phase += bpm / (60.0 * rate);
        while self.phase >= 1.0 {
            self.beats += 1;
            self.phase -= 1.0;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_until_tempo_known() {
        let mut counter = BeatCounter::new();
        for _ in 0..1_000 {
            counter.advance(0.0, 250.0);
        }
        assert_eq!(counter.beats(), 0);
        assert_eq!(counter.elapsed(), 0);
    }

    #[test]
    fn counts_beats_at_constant_tempo() {
        let mut counter = BeatCounter::new();
        // ten seconds at 120 bpm
        for _ in 0..2_500 {
            counter.advance(120.0, 250.0);
        }
        assert!((19..=20).contains(&counter.beats()));
        assert_eq!(counter.elapsed(), 2_500);
    }

    #[test]
    fn tempo_change_only_affects_future_beats() {
        let mut counter = BeatCounter::new();
        for _ in 0..1_000 {
            counter.advance(120.0, 250.0);
        }
        let before = counter.beats();
        let mut last = before;
        for _ in 0..1_000 {
            counter.advance(60.0, 250.0);
            assert!(counter.beats() >= last);
            last = counter.beats();
        }
        // four more seconds at 60 bpm
        assert!((before + 3..=before + 4).contains(&counter.beats()));
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut counter = BeatCounter::new();
        for _ in 0..500 {
            counter.advance(240.0, 250.0);
        }
        assert!(counter.beats() > 0);
        counter.reset();
        assert_eq!(counter, BeatCounter::default());
    }
}
