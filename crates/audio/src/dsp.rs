use cadence_domain::DomainError;

/// A caller-owned block of samples, borrowed for a single call.
#[derive(Clone, Copy, Debug)]
pub enum SampleBlock<'a> {
    /// Frames laid out as `[l, r, l, r, ...]`.
    Interleaved(&'a [f32]),
    /// One slice per channel.
    Planar(&'a [&'a [f32]]),
}

impl<'a> SampleBlock<'a> {
    pub fn len(&self) -> usize {
        match self {
            SampleBlock::Interleaved(samples) => samples.len(),
            SampleBlock::Planar(planes) => planes.iter().map(|plane| plane.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[inline]
fn sanitize(sample: f32) -> f32 {
    if sample.is_finite() {
        sample
    } else {
        0.0
    }
}

/// Averages every frame down to a single analysis channel.
///
/// Interleaved input that ends mid-frame is held until the rest of the frame
/// arrives with the next block.
#[derive(Clone, Debug)]
pub struct Downmixer {
    channels: usize,
    pending: Vec<f32>,
}

impl Downmixer {
    pub fn new(channels: u16) -> Result<Self, DomainError> {
        if channels == 0 {
            return Err(DomainError::invalid_config("channel count must be positive"));
        }
        let channels = channels as usize;
        Ok(Self {
            channels,
            pending: Vec::with_capacity(channels),
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Samples waiting for the rest of their frame.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// Feeds every completed mono sample to `sink`, in order.
    pub fn downmix(&mut self, block: SampleBlock<'_>, mut sink: impl FnMut(f32)) {
        match block {
            SampleBlock::Interleaved(samples) => self.downmix_interleaved(samples, &mut sink),
            SampleBlock::Planar(planes) => Self::downmix_planar(planes, &mut sink),
        }
    }

    fn downmix_interleaved(&mut self, samples: &[f32], sink: &mut impl FnMut(f32)) {
        if self.channels == 1 {
            samples.iter().for_each(|&sample| sink(sanitize(sample)));
            return;
        }

        let mut rest = samples;
        if !self.pending.is_empty() {
            let needed = (self.channels - self.pending.len()).min(rest.len());
            self.pending.extend_from_slice(&rest[..needed]);
            rest = &rest[needed..];
            if self.pending.len() < self.channels {
                return;
            }
            sink(self.mean(&self.pending));
            self.pending.clear();
        }

        let mut frames = rest.chunks_exact(self.channels);
        for frame in frames.by_ref() {
            sink(self.mean(frame));
        }
        self.pending.extend_from_slice(frames.remainder());
    }

    fn downmix_planar(planes: &[&[f32]], sink: &mut impl FnMut(f32)) {
        if planes.is_empty() {
            return;
        }
        let frames = planes.iter().map(|plane| plane.len()).min().unwrap_or(0);
        let scale = 1.0 / planes.len() as f32;
        for index in 0..frames {
            let sum: f32 = planes.iter().map(|plane| sanitize(plane[index])).sum();
            sink(sum * scale);
        }
    }

    fn mean(&self, frame: &[f32]) -> f32 {
        frame.iter().map(|&sample| sanitize(sample)).sum::<f32>() / self.channels as f32
    }
}
