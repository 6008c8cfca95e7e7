//! Command-line front end for the photo/video editing service.
//!
//! Each editing command runs one session through a
//! [`JobController`]: upload, submit, wait, download.

pub mod config;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgGroup, Args, Parser, Subcommand};
use tokio::sync::broadcast;

use editkit_client::upload::{ProgressFn, UploadProgress};
use editkit_client::{ApiError, ControllerError, EditorApi, JobController, JobEvent};
use editkit_core::media::MediaKind;
use editkit_core::notification::{Notification, Severity};
use editkit_core::params::{
    PhotoEffects, PhotoFilter, QualityPreset, Resolution, TransformParameters, VideoTransform,
    DEFAULT_TARGET_MB, ENHANCER_NEUTRAL,
};
use editkit_core::types::Dimensions;

use crate::config::{validate_api_url, ClientConfig, ConfigError};

/// How long the reporter may take to print what is left once the
/// controller is gone.
const REPORTER_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Photo and video editing client
#[derive(Parser, Debug)]
#[command(name = "editkit", version)]
#[command(about = "Upload media, apply edits remotely, and download the result")]
pub struct Cli {
    /// Service root URL (overrides EDITKIT_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Milliseconds between status checks (overrides EDITKIT_POLL_INTERVAL_MS)
    #[arg(long, global = true, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Give up after this many status checks (overrides EDITKIT_POLL_MAX_ATTEMPTS)
    #[arg(long, global = true, value_name = "N")]
    pub max_attempts: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the service is up
    Health,
    /// Show supported filters, presets and formats
    Info,
    /// Apply filters, enhancements and geometry edits to a photo
    Photo(PhotoArgs),
    /// Upscale a video to 1080p, 4k or 8k
    Upscale(UpscaleArgs),
    /// Shrink, trim or rescale a video
    Resize(ResizeArgs),
}

#[derive(Args, Debug)]
pub struct PhotoArgs {
    pub file: PathBuf,

    /// Convolution filter, e.g. blur, sharpen, edge-enhance
    #[arg(long)]
    pub filter: Option<PhotoFilter>,

    #[arg(long, default_value_t = ENHANCER_NEUTRAL)]
    pub brightness: f64,

    #[arg(long, default_value_t = ENHANCER_NEUTRAL)]
    pub contrast: f64,

    #[arg(long, default_value_t = ENHANCER_NEUTRAL)]
    pub color: f64,

    #[arg(long, default_value_t = ENHANCER_NEUTRAL)]
    pub sharpness: f64,

    /// Counter-clockwise rotation in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub rotate: f64,

    #[arg(long)]
    pub flip_horizontal: bool,

    #[arg(long)]
    pub flip_vertical: bool,

    /// Resize to WIDTHxHEIGHT
    #[arg(long, value_name = "WxH", value_parser = parse_dimensions)]
    pub resize: Option<Dimensions>,

    /// Where to save the result
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl PhotoArgs {
    pub fn effects(&self) -> PhotoEffects {
        PhotoEffects {
            filter: self.filter,
            brightness: self.brightness,
            contrast: self.contrast,
            color: self.color,
            sharpness: self.sharpness,
            rotate: self.rotate,
            flip_horizontal: self.flip_horizontal,
            flip_vertical: self.flip_vertical,
            resize: self.resize,
        }
    }
}

#[derive(Args, Debug)]
pub struct UpscaleArgs {
    pub file: PathBuf,

    /// 1080p, 4k or 8k
    #[arg(long, default_value = "1080p")]
    pub resolution: Resolution,

    /// high, medium or fast
    #[arg(long, default_value = "high")]
    pub quality: QualityPreset,

    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["target_mb", "trim_start", "width"])
))]
pub struct ResizeArgs {
    pub file: PathBuf,

    /// Re-encode to roughly this many megabytes
    #[arg(long, value_name = "MB")]
    pub target_mb: Option<f64>,

    /// Keep the video from this many seconds in
    #[arg(long, value_name = "SECS")]
    pub trim_start: Option<f64>,

    /// Keep this many seconds (default: to the end)
    #[arg(long, value_name = "SECS", requires = "trim_start")]
    pub trim_duration: Option<f64>,

    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Stretch to exactly WIDTHxHEIGHT instead of fitting inside it
    #[arg(long)]
    pub ignore_aspect: bool,

    #[arg(long, default_value = "medium")]
    pub quality: QualityPreset,

    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl ResizeArgs {
    pub fn transform(&self) -> VideoTransform {
        if let (Some(width), Some(height)) = (self.width, self.height) {
            VideoTransform::ResizeDimensions {
                width,
                height,
                maintain_aspect: !self.ignore_aspect,
                quality: self.quality,
            }
        } else if let Some(start_time) = self.trim_start {
            VideoTransform::Trim {
                start_time,
                duration: self.trim_duration,
            }
        } else {
            VideoTransform::ResizeFileSize {
                target_mb: self.target_mb.unwrap_or(DEFAULT_TARGET_MB),
            }
        }
    }
}

fn parse_dimensions(s: &str) -> Result<Dimensions, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width = w.trim().parse().map_err(|_| format!("invalid width '{w}'"))?;
    let height = h.trim().parse().map_err(|_| format!("invalid height '{h}'"))?;
    Ok(Dimensions { width, height })
}

/// Default output path: `processed_<name>` next to the input.
pub fn default_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("processed_{name}"))
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error("Interrupted")]
    Interrupted,
}

impl Cli {
    /// Environment configuration with this invocation's flags applied.
    pub fn config(&self) -> Result<ClientConfig, CliError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(url) = &self.api_url {
            config.api_url = validate_api_url("--api-url", url)?;
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll.interval = Duration::from_millis(ms.max(1));
        }
        if let Some(n) = self.max_attempts {
            config.poll.max_attempts = Some(n.max(1));
        }
        Ok(config)
    }
}

/// Execute one command.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config()?;
    let api = EditorApi::with_timeout(config.api_url.clone(), config.request_timeout)?;
    tracing::debug!(api_url = %config.api_url, "Using editing service");

    match cli.command {
        Command::Health => {
            let health = api.health().await?;
            println!("{} {} ({})", health.service, health.version, health.status);
        }
        Command::Info => {
            let info = api.info().await?;
            let photo = info.photo_processing;
            let video = info.video_processing;
            println!("Photo filters:     {}", photo.filters.join(", "));
            println!(
                "Photo enhancers:   {} (range {}-{})",
                photo.enhancers.join(", "),
                photo.enhancer_range.0,
                photo.enhancer_range.1
            );
            println!("Photo formats:     {}", photo.supported_formats.join(", "));
            println!("Video resolutions: {}", video.resolutions.join(", "));
            println!("Video quality:     {}", video.quality_presets.join(", "));
            println!("Video resize:      {}", video.resize_types.join(", "));
            println!("Video formats:     {}", video.supported_formats.join(", "));
        }
        Command::Photo(args) => {
            let output = args.output.clone().unwrap_or_else(|| default_output(&args.file));
            edit(api, &config, &args.file, MediaKind::Photo, args.effects().into(), &output).await?;
        }
        Command::Upscale(args) => {
            let params = VideoTransform::Upscale {
                resolution: args.resolution,
                quality: args.quality,
            };
            let output = args.output.clone().unwrap_or_else(|| default_output(&args.file));
            edit(api, &config, &args.file, MediaKind::Video, params.into(), &output).await?;
        }
        Command::Resize(args) => {
            let output = args.output.clone().unwrap_or_else(|| default_output(&args.file));
            edit(api, &config, &args.file, MediaKind::Video, args.transform().into(), &output)
                .await?;
        }
    }
    Ok(())
}

/// Run one editing session end to end.
async fn edit(
    api: EditorApi,
    config: &ClientConfig,
    input: &Path,
    kind: MediaKind,
    params: TransformParameters,
    output: &Path,
) -> Result<(), CliError> {
    let controller = JobController::new(Arc::new(api), config.poll.clone());
    let reporter = spawn_reporter(&controller);

    let result = drive(&controller, input, kind, params, output).await;

    controller.shutdown().await;
    // Closes the channels; the reporter prints what is buffered and exits.
    drop(controller);
    if tokio::time::timeout(REPORTER_FLUSH_TIMEOUT, reporter)
        .await
        .is_err()
    {
        tracing::warn!("Reporter did not finish after shutdown");
    }
    result
}

async fn drive(
    controller: &JobController,
    input: &Path,
    kind: MediaKind,
    params: TransformParameters,
    output: &Path,
) -> Result<(), CliError> {
    let info = controller.upload(input, kind, Some(upload_reporter())).await?;
    let job = controller.submit(&info.handle, params).await?;

    let status = tokio::select! {
        status = controller.wait_for_terminal() => status?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(job_id = %job, "Interrupted, no longer waiting for the job");
            controller.cancel_polling().await;
            return Err(CliError::Interrupted);
        }
    };
    tracing::debug!(job_id = %status.job, "Job finished");

    let artifact = controller.retrieve_artifact(&job).await?;
    let bytes = controller.download(&artifact, output).await?;
    println!("Saved {} ({bytes} bytes)", output.display());
    Ok(())
}

/// Upload callback that logs once per 10% step.
fn upload_reporter() -> ProgressFn {
    let last_step = AtomicU64::new(u64::MAX);
    Arc::new(move |progress: UploadProgress| {
        let percent = (progress.fraction() * 100.0) as u64;
        if last_step.swap(percent / 10, Ordering::Relaxed) != percent / 10 {
            tracing::info!(sent = progress.sent, total = progress.total, percent, "Uploading");
        }
    })
}

/// Print notifications to stderr until the controller is dropped.
fn spawn_reporter(controller: &JobController) -> tokio::task::JoinHandle<()> {
    let notifications = controller.notifications();
    let events = controller.subscribe();

    tokio::spawn(async move {
        report(notifications, events, std::io::stderr()).await;
    })
}

/// Write notifications to `out` and log job progress. Returns `out`
/// once both channels are closed and drained.
async fn report<W: Write>(
    mut notifications: broadcast::Receiver<Notification>,
    mut events: broadcast::Receiver<JobEvent>,
    mut out: W,
) -> W {
    loop {
        tokio::select! {
            Ok(note) = notifications.recv() => {
                let written = match note.severity {
                    Severity::Error => writeln!(out, "error: {}", note.message),
                    Severity::Success | Severity::Info => writeln!(out, "{}", note.message),
                };
                if let Err(e) = written {
                    tracing::debug!(error = %e, "Could not print notification");
                }
            }
            Ok(event) = events.recv() => {
                if let JobEvent::Progress { job, state, percent, .. } = event {
                    tracing::info!(job_id = %job, %state, percent, "Processing");
                }
            }
            else => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use editkit_client::Notifier;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn photo_flags_build_effects() {
        let cli = parse(&[
            "editkit",
            "photo",
            "cat.jpg",
            "--filter",
            "edge-enhance",
            "--brightness",
            "1.3",
            "--rotate",
            "-90",
            "--resize",
            "800x600",
            "--flip-vertical",
        ]);
        let Command::Photo(args) = cli.command else {
            panic!("expected photo command");
        };
        let effects = args.effects();
        assert_eq!(effects.filter, Some(PhotoFilter::EdgeEnhance));
        assert_eq!(effects.brightness, 1.3);
        assert_eq!(effects.contrast, 1.0);
        assert_eq!(effects.rotate, -90.0);
        assert!(effects.flip_vertical);
        assert_eq!(
            effects.resize,
            Some(Dimensions {
                width: 800,
                height: 600
            })
        );
    }

    #[test]
    fn upscale_defaults_to_1080p_high() {
        let cli = parse(&["editkit", "upscale", "clip.mp4"]);
        let Command::Upscale(args) = cli.command else {
            panic!("expected upscale command");
        };
        assert_eq!(args.resolution, Resolution::Hd1080);
        assert_eq!(args.quality, QualityPreset::High);
    }

    #[test]
    fn resize_modes() {
        let cli = parse(&["editkit", "resize", "c.mp4", "--target-mb", "20"]);
        let Command::Resize(args) = cli.command else {
            panic!("expected resize command");
        };
        assert_eq!(args.transform(), VideoTransform::ResizeFileSize { target_mb: 20.0 });

        let cli = parse(&["editkit", "resize", "c.mp4", "--trim-start", "5"]);
        let Command::Resize(args) = cli.command else {
            panic!("expected resize command");
        };
        assert_eq!(
            args.transform(),
            VideoTransform::Trim {
                start_time: 5.0,
                duration: None
            }
        );

        let Command::Resize(args) = parse(&[
            "editkit", "resize", "c.mp4", "--width", "640", "--height", "360", "--ignore-aspect",
        ])
        .command
        else {
            panic!("expected resize command");
        };
        assert_eq!(
            args.transform(),
            VideoTransform::ResizeDimensions {
                width: 640,
                height: 360,
                maintain_aspect: false,
                quality: QualityPreset::Medium,
            }
        );
    }

    #[test]
    fn resize_requires_exactly_one_mode() {
        assert!(Cli::try_parse_from(["editkit", "resize", "c.mp4"]).is_err());
        assert!(Cli::try_parse_from([
            "editkit", "resize", "c.mp4", "--target-mb", "5", "--trim-start", "1"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["editkit", "resize", "c.mp4", "--width", "640"]).is_err());
    }

    #[test]
    fn unknown_resolution_is_rejected() {
        let parsed = Cli::try_parse_from(["editkit", "upscale", "c.mp4", "--resolution", "720p"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn dimensions_parser() {
        assert_eq!(
            parse_dimensions("1920X1080").unwrap(),
            Dimensions {
                width: 1920,
                height: 1080
            }
        );
        assert!(parse_dimensions("1920").is_err());
        assert!(parse_dimensions("axb").is_err());
    }

    #[test]
    fn default_output_prefixes_file_name() {
        assert_eq!(
            default_output(Path::new("/tmp/media/cat.jpg")),
            PathBuf::from("/tmp/media/processed_cat.jpg")
        );
    }

    #[tokio::test]
    async fn reporter_prints_buffered_notifications_before_exiting() {
        let notifier = Notifier::default();
        let notifications = notifier.subscribe();
        let (event_tx, events) = broadcast::channel(8);

        notifier.info("Job J1 submitted");
        notifier.error("Processing failed: decode error");
        drop(notifier);
        drop(event_tx);

        let out = report(notifications, events, Vec::new()).await;
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Job J1 submitted\nerror: Processing failed: decode error\n"
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["editkit", "health", "--api-url", "http://svc:5000/"]);
        assert_eq!(cli.api_url.as_deref(), Some("http://svc:5000/"));
    }
}
