//! Synthetic test signals.

/// Renders an interleaved click track: a short decaying burst on every beat,
/// with the first beat of each bar accented.
pub fn click_track(bpm: f64, sample_rate: u32, channels: u16, seconds: f64) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    let rate = sample_rate as f64;
    let frames = (rate * seconds).max(0.0) as usize;
    let mut samples = vec![0.0f32; frames * channels];
    if bpm <= 0.0 || frames == 0 {
        return samples;
    }

    let beat_interval = ((60.0 / bpm) * rate).max(1.0);
    let click_length = ((rate * 0.015) as usize).max(1);
    let decay = rate * 0.003;

    let mut beat = 0usize;
    loop {
        let onset = (beat as f64 * beat_interval).round() as usize;
        if onset >= frames {
            break;
        }
        let accent = if beat % 4 == 0 { 1.0 } else { 0.75 };
        for offset in 0..click_length.min(frames - onset) {
            let value = (accent * (-(offset as f64) / decay).exp()) as f32;
            let frame = (onset + offset) * channels;
            samples[frame..frame + channels]
                .iter_mut()
                .for_each(|sample| *sample += value);
        }
        beat += 1;
    }
    samples
}
