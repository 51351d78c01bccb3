pub mod dsp;
pub mod envelope;
pub mod synth;

pub use dsp::{Downmixer, SampleBlock};
pub use envelope::EnvelopeTracker;
