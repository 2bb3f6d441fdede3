use clap::{Parser, Subcommand};
use std::path::PathBuf;

use biosense_core::synthetic::{FaceParams, SyntheticFace, SyntheticVoice, VoiceParams};
use biosense_core::{BiosenseConfig, ChannelSink, SessionController, SessionError};

#[derive(Parser)]
#[command(name = "biosense", about = "Biometric signal processing harness")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session against synthetic face video and voice
    Simulate {
        #[arg(long, default_value_t = 30.0)]
        seconds: f32,
        #[arg(long, default_value_t = 72.0)]
        bpm: f32,
        /// Voice fundamental (Hz); 0 for silence
        #[arg(long, default_value_t = 150.0)]
        f0: f32,
        /// Per-pixel sensor noise sigma
        #[arg(long, default_value_t = 2.0)]
        noise: f32,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the diagnostic trace as JSON when done
        #[arg(long)]
        trace: bool,
    },
    /// Print the effective configuration as TOML
    Config {
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

/// Explicit file, or built-in defaults; `BIOSENSE_*` overrides apply to both.
fn load_config(path: Option<&PathBuf>) -> Result<BiosenseConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = BiosenseConfig::from_file(path)?;
            config.apply_env_overrides()?;
            config.validate()?;
            config
        }
        None => BiosenseConfig::load_layered(None, None)?,
    };
    Ok(config)
}

fn simulate(
    seconds: f32,
    bpm: f32,
    f0: f32,
    noise: f32,
    config: Option<PathBuf>,
    trace: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config.as_ref())?;
    if trace {
        config.diagnostics.enabled = true;
    }
    let fps = config.conditioner.sample_rate;

    let face = SyntheticFace::new(FaceParams {
        fps,
        bpm,
        noise,
        duration_s: Some(seconds),
        ..FaceParams::default()
    });
    let voice = SyntheticVoice::aligned_to(
        VoiceParams {
            f0: f0.max(1.0),
            silent: f0 <= 0.0,
            duration_s: Some(seconds),
            ..VoiceParams::default()
        },
        fps,
    );

    let (sink, snapshots) = ChannelSink::new();
    let mut session = SessionController::new(config, face, voice, sink)?;
    let ticks = (seconds * fps).ceil() as usize;
    log::info!("simulating {:.1}s at {} fps, {} BPM, F0 {} Hz", seconds, fps, bpm, f0);

    for _ in 0..ticks {
        match session.tick() {
            Ok(_) => {}
            Err(SessionError::Stopped) => break,
            Err(e) => return Err(e.into()),
        }
        // Drain every tick so the single-slot channel never fills
        while let Ok(snapshot) = snapshots.try_recv() {
            println!("{}", serde_json::to_string(&snapshot)?);
        }
    }
    session.stop();

    let stats = session.stats();
    log::info!(
        "frames {}/{} accepted, {} cycles, {} snapshots, {} dropped",
        stats.frames_accepted,
        stats.frames_seen,
        stats.cycles,
        stats.snapshots_emitted,
        stats.snapshots_dropped
    );
    if trace {
        eprintln!("{}", session.trace().to_json()?);
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Simulate {
            seconds,
            bpm,
            f0,
            noise,
            config,
            trace,
        } => simulate(seconds, bpm, f0, noise, config, trace)?,
        Commands::Config { path } => {
            let config = load_config(path.as_ref())?;
            print!("{}", config.to_toml_string()?);
        }
    }
    Ok(())
}
