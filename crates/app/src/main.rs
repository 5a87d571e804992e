use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dualtrack_core::{AppConfig, FrameRecorder, MediaTrack, ScheduledEvent, Session, SLOT_COUNT};
use tracing_subscriber::EnvFilter;

const DEMO_SAMPLE_RATE: u32 = 44_100;
const DEMO_TONES: [f32; 2] = [220.0, 660.0];

fn main() -> dualtrack_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            track_a,
            track_b,
            session,
        } => {
            let config = load_config(&session)?;
            tracing::info!(?track_a, ?track_b, "loading tracks");
            let tracks = [
                MediaTrack::from_path(&track_a)?.with_looping(config.playback.loop_tracks),
                MediaTrack::from_path(&track_b)?.with_looping(config.playback.loop_tracks),
            ];
            run_session(&config, tracks, &session)
        }
        Commands::Demo { session } => {
            let config = load_config(&session)?;
            tracing::info!(tones = ?DEMO_TONES, "synthesising demo tracks");
            let seconds = session.seconds.max(1.0) as f32;
            let tracks = [
                MediaTrack::sine(DEMO_TONES[0], seconds, DEMO_SAMPLE_RATE)?
                    .with_looping(config.playback.loop_tracks),
                MediaTrack::sine(DEMO_TONES[1], seconds, DEMO_SAMPLE_RATE)?
                    .with_looping(config.playback.loop_tracks),
            ];
            run_session(&config, tracks, &session)
        }
    }
}

fn load_config(session: &SessionArgs) -> dualtrack_core::Result<AppConfig> {
    match &session.config {
        Some(path) => {
            tracing::info!(?path, "reading configuration");
            AppConfig::from_path(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn run_session(
    config: &AppConfig,
    tracks: [MediaTrack; SLOT_COUNT],
    session: &SessionArgs,
) -> dualtrack_core::Result<()> {
    let mut recorder = FrameRecorder::create(&session.output)?;
    let mut player = Session::new(config, tracks, session.actions.clone())?;
    let frames = player.run(session.seconds, &mut recorder)?;
    tracing::info!(frames, output = ?session.output, "session finished");
    Ok(())
}

/// Session length: finite and non-negative, so the frame loop and the demo
/// tones stay bounded.
fn parse_seconds(raw: &str) -> Result<f64, String> {
    let seconds: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid number of seconds `{raw}`"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err("seconds must be a finite, non-negative number".to_string());
    }
    Ok(seconds)
}

fn parse_event(raw: &str) -> Result<ScheduledEvent, String> {
    raw.parse().map_err(|err: dualtrack_core::DualTrackError| err.to_string())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Dual-track player with a frame-driven visualiser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play two audio files (WAV, MP3, FLAC, AAC/M4A, AIFF, ALAC) through a
    /// scripted session and record the frames.
    Render {
        /// Track loaded into slot A, which starts playing immediately.
        #[arg(long)]
        track_a: PathBuf,
        /// Track loaded into slot B.
        #[arg(long)]
        track_b: PathBuf,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Same as `render`, using two synthetic tones instead of files.
    Demo {
        #[command(flatten)]
        session: SessionArgs,
    },
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Optional JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Session length in seconds.
    #[arg(long, default_value_t = 10.0, value_parser = parse_seconds)]
    seconds: f64,
    /// Scripted action as SECONDS:ACTION, where ACTION is play, stop or switch.
    #[arg(short, long = "action", value_parser = parse_event)]
    actions: Vec<ScheduledEvent>,
    /// Output path for the recorded frames (JSON lines).
    #[arg(short, long)]
    output: PathBuf,
}
