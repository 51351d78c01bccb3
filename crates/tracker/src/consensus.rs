use cadence_domain::Bpm;

pub const DEFAULT_MATCHES_REQUIRED: usize = 4;

/// Collects periodic whole-number readings and settles on the most likely one.
#[derive(Clone, Debug)]
pub struct BpmConsensus {
    readings: Vec<Bpm>,
    matches_required: usize,
}

impl Default for BpmConsensus {
    fn default() -> Self {
        Self::new(None)
    }
}

impl BpmConsensus {
    pub fn new(matches_required: Option<usize>) -> Self {
        Self {
            readings: Vec::new(),
            matches_required: matches_required
                .unwrap_or(DEFAULT_MATCHES_REQUIRED)
                .max(1),
        }
    }

    pub fn matches_required(&self) -> usize {
        self.matches_required
    }

    pub fn readings(&self) -> &[Bpm] {
        &self.readings
    }

    pub fn count_of(&self, bpm: Bpm) -> usize {
        self.readings.iter().filter(|&&seen| seen == bpm).count()
    }

    /// Records a reading. Returns true once this value has been seen often
    /// enough to be trusted.
    pub fn push(&mut self, bpm: Bpm) -> bool {
        self.readings.push(bpm);
        self.count_of(bpm) >= self.matches_required
    }

    /// The most repeated reading, earliest first on ties. Falls back to the
    /// first reading when nothing repeats.
    pub fn choose(&self) -> Option<Bpm> {
        let first = *self.readings.first()?;
        let mut best: Option<(Bpm, usize)> = None;
        for &bpm in &self.readings {
            let count = self.count_of(bpm);
            if count > 1 && best.map_or(true, |(_, top)| count > top) {
                best = Some((bpm, count));
            }
        }
        Some(best.map_or(first, |(bpm, _)| bpm))
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}
