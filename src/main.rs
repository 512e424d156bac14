use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use log::info;

use ppe_compliance_rs::config::Config;
use ppe_compliance_rs::integration::{
    CompliancePipeline, ErrorPolicy, ReplayRecording, SimulatedObserver,
};

/// Track people in a recorded stream and report sticky PPE compliance per frame.
#[derive(Parser, Debug)]
#[command(name = "ppe-monitor", version, about)]
struct Cli {
    /// Path to the YAML config
    #[arg(short, long, default_value = "config/config.yaml")]
    config: PathBuf,

    /// What to do when a frame fails
    #[arg(long, value_enum, default_value_t = OnError::Abort)]
    on_error: OnError,

    /// One JSON record per line instead of pretty-printed output
    #[arg(long)]
    compact: bool,

    /// Seed for the simulated observer
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OnError {
    Abort,
    Skip,
}

impl From<OnError> for ErrorPolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Abort => ErrorPolicy::Abort,
            OnError::Skip => ErrorPolicy::SkipFrame,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;

    if let Some(model_path) = &config.person_detector.model_path {
        if !model_path.exists() {
            bail!("person detector model not found: {}", model_path.display());
        }
    }

    let recording = ReplayRecording::open(&config.video_stream)
        .with_context(|| format!("opening stream {}", config.video_stream.display()))?;
    let [width, height] = config.frame_size;
    let (mut frames, detector) = recording.into_parts(width, height);

    let observer =
        SimulatedObserver::with_view_dependent_items(cli.seed, config.view_dependent_items.iter().cloned());
    let mut pipeline = CompliancePipeline::from_config(detector, observer, &config);

    info!(
        "monitoring {} for {:?}, detector every {} frame(s)",
        config.video_stream.display(),
        config.ppe_items,
        config.run_detection_every_n_frames
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let compact = cli.compact;
    let summary = pipeline.run(&mut frames, cli.on_error.into(), |report| {
        if compact {
            serde_json::to_writer(&mut out, report)?;
        } else {
            serde_json::to_writer_pretty(&mut out, report)?;
        }
        writeln!(out)?;
        Ok(())
    })?;
    out.flush().context("flushing output")?;

    if summary.frames_skipped > 0 {
        info!("{} frame(s) skipped", summary.frames_skipped);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["ppe-monitor"]);
        assert_eq!(cli.config, PathBuf::from("config/config.yaml"));
        assert_eq!(cli.on_error, OnError::Abort);
        assert!(!cli.compact);
    }

    #[test]
    fn test_skip_policy() {
        let cli = Cli::parse_from(["ppe-monitor", "--on-error", "skip", "--compact"]);
        assert_eq!(ErrorPolicy::from(cli.on_error), ErrorPolicy::SkipFrame);
        assert!(cli.compact);
    }
}
