use std::path::PathBuf;

use anyhow::Context;
use cadence_audio::synth::click_track;
use cadence_tracker::{AnalysisConfig, BpmConsensus, Bpm, TempoTracker};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Stream a synthetic click track through the tempo tracker"
)]
struct Cli {
    /// Tempo of the generated click track
    #[arg(long, default_value_t = 120.0)]
    bpm: f64,
    /// Seconds of audio to generate
    #[arg(long, default_value_t = 20.0)]
    seconds: f64,
    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,
    #[arg(long, default_value_t = 2)]
    channels: u16,
    #[arg(long, default_value_t = 40.0)]
    min_bpm: f32,
    #[arg(long, default_value_t = 300.0)]
    max_bpm: f32,
    /// Frames per block handed to the tracker
    #[arg(long, default_value_t = 512)]
    block: usize,
    /// JSON analysis config; overrides the stream and tempo flags
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct ProbeLine {
    seconds: f64,
    bpm: f32,
    beats: u64,
    confidence: f32,
    candidates: Vec<f32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("read config {:?}", path))?;
            AnalysisConfig::from_json(&json)?
        }
        None => AnalysisConfig::new(cli.sample_rate, cli.channels, cli.min_bpm, cli.max_bpm)?,
    };
    info!(?config, source_bpm = cli.bpm, "probing tracker");

    let samples = click_track(cli.bpm, config.sample_rate, config.channels, cli.seconds);
    let mut tracker = TempoTracker::new(config.clone())?;
    let mut consensus = BpmConsensus::default();
    let block = cli.block.max(1) * config.channels as usize;
    let frames_per_second = config.sample_rate as usize * config.channels as usize;

    let mut consumed = 0usize;
    let mut next_report = frames_per_second;
    for chunk in samples.chunks(block) {
        tracker.process(chunk);
        consumed += chunk.len();
        if consumed >= next_report {
            next_report += frames_per_second;
            let reading = tracker.reading();
            if let Ok(bpm) = Bpm::from_estimate(reading.bpm) {
                consensus.push(bpm);
            }
            let line = ProbeLine {
                seconds: consumed as f64 / frames_per_second as f64,
                bpm: reading.bpm,
                beats: reading.beats,
                confidence: reading.confidence,
                candidates: tracker.tempo_candidates().iter().take(4).copied().collect(),
            };
            println!("{}", serde_json::to_string(&line)?);
        }
    }

    match consensus.choose() {
        Some(bpm) => info!(bpm = bpm.value(), "consensus"),
        None => info!("no tempo detected"),
    }
    Ok(())
}
