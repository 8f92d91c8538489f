//! tryon-replay - Virtual Try-On replay runner
//!
//! Drives a try-on session from a recorded camera feed and writes every
//! composited frame to disk.

use anyhow::{Context, Result};
use clap::Parser;
use image::RgbaImage;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, trace, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

use tryon_overlay::capture::{Recording, ReplayCamera, ReplayDetector};
use tryon_overlay::compositor::SoftwareSurface;
use tryon_overlay::config::Config;
use tryon_overlay::session::FrameCallback;
use tryon_overlay::{SessionPhase, TryOnProps, TryOnView};

/// Command-line arguments for tryon-replay
#[derive(Parser, Debug)]
#[command(name = "tryon-replay")]
#[command(version, about = "Virtual ring try-on over a recorded camera feed", long_about = None)]
pub struct Args {
    /// Configuration file path (defaults to the user config dir, if present)
    #[arg(short, long, env = "TRYON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Recording to replay (JSON: frame images plus hand landmarks)
    #[arg(short, long)]
    pub recording: PathBuf,

    /// Ring artwork (path or file:// URL)
    #[arg(short, long, env = "TRYON_OVERLAY")]
    pub overlay: String,

    /// Directory for composited frames (nothing is written if omitted)
    #[arg(short = 'O', long)]
    pub output: Option<PathBuf>,

    /// Initial manual scale (1.0 = 100%)
    #[arg(short, long)]
    pub scale: Option<f64>,

    /// Surface width override
    #[arg(long)]
    pub width: Option<u32>,

    /// Surface height override
    #[arg(long)]
    pub height: Option<u32>,

    /// Pace frames at the recording's frame rate
    #[arg(long)]
    pub realtime: bool,

    /// Simulate a refused camera permission
    #[arg(long)]
    pub deny_access: bool,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Write logs to file (in addition to stdout)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", tryon_overlay::utils::format_user_error(&e));
            return Err(e);
        }
    };

    let _log_guard = init_logging(&args, &config)?;

    info!("════════════════════════════════════════════════════════");
    info!("  tryon-replay v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {} {}", env!("BUILD_DATE"), env!("BUILD_TIME"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");
    debug!("Config: {:?}", config);

    if let Err(e) = run(&args, config).await {
        eprintln!("{}", tryon_overlay::utils::format_user_error(&e));
        return Err(e);
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let path = Config::default_path();
            if path.exists() {
                Config::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?
            } else {
                Config::default_config()
            }
        }
    };

    let surface_size = match (args.width, args.height) {
        (None, None) => None,
        (width, height) => Some((
            width.unwrap_or(config.surface.width),
            height.unwrap_or(config.surface.height),
        )),
    };
    let config = config.with_overrides(
        surface_size,
        args.log_format.clone(),
        args.log_file.clone(),
    );
    config.validate().context("Invalid config after CLI overrides")?;

    Ok(config)
}

async fn run(args: &Args, config: Config) -> Result<()> {
    let recording = Arc::new(Recording::load(&args.recording).context("Failed to load recording")?);
    info!(
        "Replaying {} frames at {}x{}",
        recording.len(),
        recording.width,
        recording.height
    );

    let mut camera = ReplayCamera::new(Arc::clone(&recording)).with_realtime(args.realtime);
    if args.deny_access {
        camera = camera.with_access_denied();
    }
    let detector = ReplayDetector::new(Arc::clone(&recording));
    let surface = Arc::new(Mutex::new(SoftwareSurface::new(
        config.surface.width,
        config.surface.height,
    )));

    let mut view = TryOnView::new(
        TryOnProps::new(args.overlay.clone()).with_on_close(|| info!("Try-on closed")),
        Arc::new(camera),
        Arc::new(detector),
        surface,
        Arc::new(config),
    );

    let writer = match &args.output {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
            let (queue, rx) = FrameQueue::new(FRAME_QUEUE_CAPACITY);
            let dropped = queue.dropped_counter();
            let callback: FrameCallback<SoftwareSurface> =
                Arc::new(move |id: u64, surface: &SoftwareSurface| {
                    queue.offer(id, surface);
                });
            view = view.with_frame_callback(callback);
            Some((tokio::spawn(write_frames(dir.clone(), rx)), dropped))
        }
        None => None,
    };

    if let Some(scale) = args.scale {
        let applied = view.controls().set(scale);
        info!("Manual scale set to {} ({})", applied, view.controls().percent_label());
    }

    let mut status = view.status();
    view.mount();

    let ended = tokio::select! {
        result = status.wait_for(|s| s.phase == SessionPhase::Error) => {
            result.ok().and_then(|s| s.failure.clone())
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            None
        }
    };

    let state = view.session_state();
    let label = view.controls().percent_label();
    view.unmount();
    drop(view);

    let (written, dropped) = match writer {
        Some((task, dropped)) => (
            task.await.context("Frame writer task failed")?,
            dropped.load(Ordering::Relaxed),
        ),
        None => (0, 0),
    };

    if let Some(state) = state {
        let stats = &state.stats;
        println!();
        println!("Try-on replay summary");
        println!("  Frames processed:  {}", stats.frames_processed);
        println!("  Frames with hand:  {}", stats.frames_with_hand);
        println!("  Frames faulted:    {}", stats.frames_faulted);
        println!("  Detection rate:    {:.1}%", stats.detection_rate() * 100.0);
        println!("  Manual scale:      {}", label);
        println!("  Frames written:    {}", written);
        println!("  Frames dropped:    {}", dropped);
    }

    match ended {
        Some(failure) if !failure.stream_ended => {
            warn!("Session failed: {}", failure.message);
            Err(anyhow::anyhow!(failure.detail))
        }
        _ => Ok(()),
    }
}

/// Composited frames waiting for the writer
const FRAME_QUEUE_CAPACITY: usize = 8;

/// Bounded hand-off from the render callback to the PNG writer
///
/// The render path never waits on disk: when the writer falls behind the
/// frame is dropped and counted instead of queued.
struct FrameQueue {
    tx: mpsc::Sender<(u64, RgbaImage)>,
    dropped: Arc<AtomicU64>,
}

impl FrameQueue {
    fn new(capacity: usize) -> (Self, mpsc::Receiver<(u64, RgbaImage)>) {
        let (tx, rx) = mpsc::channel(capacity);
        let queue = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (queue, rx)
    }

    fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }

    /// Queue a copy of the surface; returns false if the frame was not queued
    fn offer(&self, id: u64, surface: &SoftwareSurface) -> bool {
        // Reserve first so a full queue costs no snapshot
        match self.tx.try_reserve() {
            Ok(permit) => {
                permit.send((id, surface.snapshot()));
                true
            }
            Err(TrySendError::Full(())) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 {
                    warn!("Frame writer is falling behind, dropping frames");
                } else {
                    trace!("Dropped frame {} ({} total)", id, dropped);
                }
                false
            }
            // Receiver only goes away on shutdown
            Err(TrySendError::Closed(())) => false,
        }
    }
}

async fn write_frames(dir: PathBuf, mut rx: mpsc::Receiver<(u64, RgbaImage)>) -> usize {
    let mut written = 0;
    while let Some((id, frame)) = rx.recv().await {
        let path = dir.join(format!("frame_{id:05}.png"));
        match tokio::task::spawn_blocking(move || frame.save(&path).map(|_| path)).await {
            Ok(Ok(path)) => {
                written += 1;
                trace!("Wrote {}", path.display());
            }
            Ok(Err(e)) => warn!("Failed to write frame {}: {}", id, e),
            Err(e) => warn!("Frame writer task failed: {}", e),
        }
    }
    written
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn init_logging(
    args: &Args,
    config: &Config,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let log_level = match args.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "tryon_overlay={level},tryon_replay={level},warn",
            level = log_level
        ))
    });

    let mut layers: Vec<BoxedLayer> = Vec::new();
    layers.push(match config.logging.format.as_str() {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        "compact" => tracing_subscriber::fmt::layer().compact().boxed(),
        _ => tracing_subscriber::fmt::layer().pretty().boxed(),
    });

    // If log file is specified, write to both stdout and file
    let mut guard = None;
    if let Some(path) = &config.logging.file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        let (writer, file_guard) = tracing_appender::non_blocking(file);
        guard = Some(file_guard);

        layers.push(match config.logging.format.as_str() {
            "json" => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
            _ => tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();

    if let Some(path) = &config.logging.file {
        info!("Logging to file: {}", path.display());
    }

    Ok(guard)
}
