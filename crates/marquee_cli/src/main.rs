//! Marquee CLI
//!
//! Host for the timeline engine: validates scene files and evaluates them at
//! single clock values, as frame-accurate sequences, or along an arbitrary
//! scrub path.

mod scene_file;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marquee_animation::{Frame, Scene, TimelineCoordinator};
use scene_file::SceneFile;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Marquee - timeline animation engine for lyric and caption scenes")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scene file and list configuration issues
    Check {
        /// Scene file path
        scene: PathBuf,
    },

    /// Evaluate a scene at one clock value
    Frame {
        /// Scene file path
        scene: PathBuf,

        /// Clock value in milliseconds
        #[arg(long, allow_hyphen_values = true)]
        at: f64,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Evaluate a frame-accurate sequence, one JSON frame per line
    Export {
        /// Scene file path
        scene: PathBuf,

        /// First clock value in milliseconds
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        from: f64,

        /// Last clock value in milliseconds (inclusive)
        #[arg(long)]
        to: f64,

        /// Frames per second
        #[arg(long, default_value = "60")]
        fps: f64,
    },

    /// Evaluate a clock sequence on one session and compare every frame
    /// with a fresh session at the same clock
    Scrub {
        /// Scene file path
        scene: PathBuf,

        /// Comma-separated clock values in milliseconds
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        clock: Vec<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Check { scene } => check(scene)?,
        Commands::Frame { scene, at, pretty } => frame(scene, at, pretty)?,
        Commands::Export { scene, from, to, fps } => export(scene, from, to, fps)?,
        Commands::Scrub { scene, clock } => scrub(scene, &clock)?,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load(path: PathBuf) -> Result<(SceneFile, Scene)> {
    let file = SceneFile::load(&path)?;
    let scene = file.build();
    tracing::info!(path = %path.display(), entities = scene.len(), "scene loaded");
    Ok((file, scene))
}

fn check(path: PathBuf) -> Result<()> {
    let (_, scene) = load(path.clone())?;
    let errors: Vec<String> = scene.errors().map(ToString::to_string).collect();

    if errors.is_empty() {
        println!("{}: {} entities, no issues", path.display(), scene.len());
        return Ok(());
    }

    for error in &errors {
        println!("{error}");
    }
    anyhow::bail!(
        "{}: {} of {} entities have configuration issues",
        path.display(),
        errors.len(),
        scene.len()
    )
}

fn frame(path: PathBuf, at: f64, pretty: bool) -> Result<()> {
    let (file, scene) = load(path)?;
    let mut timeline = TimelineCoordinator::new(file.engine);
    let frame = timeline.evaluate(&scene, at);

    let json = if pretty {
        serde_json::to_string_pretty(&frame)
    } else {
        serde_json::to_string(&frame)
    }
    .context("Failed to serialize frame")?;
    println!("{json}");
    Ok(())
}

fn export(path: PathBuf, from: f64, to: f64, fps: f64) -> Result<()> {
    if !(fps > 0.0 && fps.is_finite()) {
        anyhow::bail!("--fps must be a positive number, got {fps}");
    }
    if !(from.is_finite() && to.is_finite()) || to < from {
        anyhow::bail!("invalid export range {from}..={to}");
    }

    let (file, scene) = load(path)?;
    let mut timeline = TimelineCoordinator::new(file.engine);
    let frame_ms = 1000.0 / fps;
    let count = ((to - from) / frame_ms).floor() as u64 + 1;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for index in 0..count {
        // Multiply rather than accumulate so frame times do not drift
        let now = from + index as f64 * frame_ms;
        let frame = timeline.evaluate(&scene, now);
        serde_json::to_writer(&mut out, &frame).context("Failed to serialize frame")?;
        writeln!(out)?;
    }
    out.flush()?;

    tracing::info!(frames = count, "export finished");
    Ok(())
}

fn scrub(path: PathBuf, clocks: &[f64]) -> Result<()> {
    let (file, scene) = load(path)?;
    let mut session = TimelineCoordinator::new(file.engine.clone());

    let mut mismatches = 0;
    for &now in clocks {
        let played = session.evaluate(&scene, now);
        let fresh = TimelineCoordinator::new(file.engine.clone()).evaluate(&scene, now);
        let differing = differing_entities(&played, &fresh);

        if differing.is_empty() {
            println!("{now}: ok ({} instructions)", played.instructions.len());
        } else {
            mismatches += 1;
            println!("{now}: MISMATCH in {}", differing.join(", "));
        }
    }

    if mismatches > 0 {
        anyhow::bail!(
            "{mismatches} of {} clock values differ from a fresh session",
            clocks.len()
        );
    }
    Ok(())
}

/// Entities whose instruction differs between two frames of the same clock
fn differing_entities(a: &Frame, b: &Frame) -> Vec<String> {
    let mut differing: Vec<String> = a
        .instructions
        .iter()
        .filter(|instruction| b.get(instruction.entity.as_str()) != Some(*instruction))
        .map(|instruction| instruction.entity.to_string())
        .collect();
    differing.extend(
        b.instructions
            .iter()
            .filter(|instruction| a.get(instruction.entity.as_str()).is_none())
            .map(|instruction| instruction.entity.to_string()),
    );
    differing
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn scrub_clock_list_is_comma_separated() {
        let cli = Cli::parse_from(["marquee", "scrub", "demo.toml", "--clock", "0,500,-200,1000"]);
        match cli.command {
            Commands::Scrub { clock, .. } => assert_eq!(clock, vec![0.0, 500.0, -200.0, 1000.0]),
            _ => panic!("expected scrub"),
        }
    }

    #[test]
    fn demo_scene_scrubs_cleanly() {
        let file = SceneFile::parse(include_str!("../scenes/demo.toml")).unwrap();
        let scene = file.build();
        assert_eq!(scene.errors().count(), 0);

        let mut session = TimelineCoordinator::new(file.engine.clone());
        for now in [0.0, 500.0, 1000.0, 200.0, 1000.0, 4800.0, 2500.0] {
            let played = session.evaluate(&scene, now);
            let fresh = TimelineCoordinator::new(file.engine.clone()).evaluate(&scene, now);
            assert!(differing_entities(&played, &fresh).is_empty(), "at {now}");
        }
    }
}
