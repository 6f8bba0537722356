//! hue-key command line
//!
//! Keys an image sequence (or, with the `camera` feature, a live camera) and
//! writes the detection, masked and combined views as PNG sequences.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use hue_key::keying::KeyOutputs;
use hue_key::telemetry::{init_logging, LogConfig};
use hue_key::{
    BackgroundGallery, BackgroundImage, EmptyMaskMode, FrameSink, HueClass, ImageSequence,
    KeySession, KeySettings, OutputLayout, PngSequenceSink, Sensitivity, SessionStats,
    SharedKeyConfig,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Key a directory of images
    Process {
        /// Directory of input frames (png, jpg, bmp)
        #[arg(short, long)]
        input: PathBuf,
        /// Directory receiving the output PNGs
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        keying: KeyingArgs,
    },
    /// List capture devices
    #[cfg(feature = "camera")]
    Cameras,
    /// Key frames from a camera
    #[cfg(feature = "camera")]
    Live {
        /// Directory receiving the output PNGs
        #[arg(short, long)]
        output: PathBuf,
        /// Camera index (overrides the settings file)
        #[arg(short, long)]
        camera: Option<u32>,
        /// Stop after this many frames
        #[arg(short, long)]
        frames: Option<u64>,
        /// Capture size preset (overrides the settings file)
        #[arg(short, long, value_enum)]
        resolution: Option<ResolutionArg>,
        #[command(flatten)]
        keying: KeyingArgs,
    },
}

/// Keying options shared by every subcommand
#[derive(Args)]
struct KeyingArgs {
    /// `.huekey` XML settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,
    /// Background for blue regions (repeat to build a gallery)
    #[arg(long = "blue-bg")]
    blue_bg: Vec<PathBuf>,
    /// Background for red regions (repeat to build a gallery)
    #[arg(long = "red-bg")]
    red_bg: Vec<PathBuf>,
    /// Background for yellow regions (repeat to build a gallery)
    #[arg(long = "yellow-bg")]
    yellow_bg: Vec<PathBuf>,
    /// Blue sensitivity (0-100)
    #[arg(long)]
    blue: Option<i64>,
    /// Red sensitivity (0-100)
    #[arg(long)]
    red: Option<i64>,
    /// Yellow sensitivity (0-100)
    #[arg(long)]
    yellow: Option<i64>,
    /// What masked views show without a background
    #[arg(long, value_enum)]
    empty_mask: Option<EmptyMaskArg>,
    /// Which views are written per frame
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,
    /// Target frame rate, 0 for unpaced (overrides the settings file)
    #[arg(long)]
    fps: Option<u32>,
    /// Advance every gallery to its next background after this many frames
    #[arg(long)]
    rotate_every: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmptyMaskArg {
    Black,
    Video,
}

impl From<EmptyMaskArg> for EmptyMaskMode {
    fn from(arg: EmptyMaskArg) -> Self {
        match arg {
            EmptyMaskArg::Black => EmptyMaskMode::Black,
            EmptyMaskArg::Video => EmptyMaskMode::Video,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutArg {
    Combined,
    Gallery,
    All,
}

impl From<LayoutArg> for OutputLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Combined => OutputLayout::Combined,
            LayoutArg::Gallery => OutputLayout::Gallery,
            LayoutArg::All => OutputLayout::All,
        }
    }
}

#[cfg(feature = "camera")]
#[derive(Clone, Copy, ValueEnum)]
enum ResolutionArg {
    PortraitHd,
    Standard,
}

/// Everything needed to start keying, after settings and flags are merged
struct Prepared {
    settings: KeySettings,
    shared: SharedKeyConfig,
    galleries: [BackgroundGallery; 3],
    fps: u32,
    rotate_every: Option<u64>,
}

impl KeyingArgs {
    fn backgrounds(&self, class: HueClass) -> &[PathBuf] {
        match class {
            HueClass::Blue => &self.blue_bg,
            HueClass::Red => &self.red_bg,
            HueClass::Yellow => &self.yellow_bg,
        }
    }

    fn sensitivity(&self, class: HueClass) -> Option<i64> {
        match class {
            HueClass::Blue => self.blue,
            HueClass::Red => self.red,
            HueClass::Yellow => self.yellow,
        }
    }

    /// Load settings, apply flag overrides and decode backgrounds
    fn prepare(&self) -> Result<Prepared> {
        let mut settings = match &self.settings {
            Some(path) => KeySettings::load_from_file(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => KeySettings::default(),
        };

        if let Some(mode) = self.empty_mask {
            settings.empty_mask = mode.into();
        }
        if let Some(layout) = self.layout {
            settings.output_layout = layout.into();
        }

        let mut config = settings
            .key_config()
            .context("failed to load backgrounds from settings")?;

        let mut galleries: [BackgroundGallery; 3] = Default::default();
        for class in HueClass::ALL {
            let gallery = &mut galleries[class.index()];
            if let Some(background) = config.background(class) {
                gallery.add(background.clone());
            }
            for path in self.backgrounds(class) {
                let image = BackgroundImage::open(path).with_context(|| {
                    format!("failed to load {} background {}", class, path.display())
                })?;
                gallery.add(Arc::new(image));
            }
            config.set_background(class, gallery.selected().cloned());

            if let Some(value) = self.sensitivity(class) {
                config.set_sensitivity(class, Sensitivity::saturating(value));
            }
        }

        for class in HueClass::ALL {
            tracing::info!(
                class = %class,
                sensitivity = config.sensitivity(class).value(),
                backgrounds = galleries[class.index()].len(),
                "Class configured"
            );
        }

        Ok(Prepared {
            fps: self.fps.unwrap_or(settings.target_fps),
            rotate_every: self.rotate_every.filter(|n| *n > 0),
            settings,
            shared: SharedKeyConfig::new(config),
            galleries,
        })
    }
}

/// Sink wrapper that steps each gallery's selection every `every` frames
struct GalleryRotator<S> {
    inner: S,
    shared: SharedKeyConfig,
    galleries: [BackgroundGallery; 3],
    every: Option<u64>,
}

impl<S: FrameSink> FrameSink for GalleryRotator<S> {
    fn write(&mut self, index: u64, outputs: &KeyOutputs) -> hue_key::Result<()> {
        self.inner.write(index, outputs)?;

        let Some(every) = self.every else {
            return Ok(());
        };
        if (index + 1) % every != 0 {
            return Ok(());
        }
        for class in HueClass::ALL {
            let gallery = &mut self.galleries[class.index()];
            if gallery.len() < 2 {
                continue;
            }
            let next = gallery.selected_index().map_or(0, |idx| (idx + 1) % gallery.len());
            gallery.select(next);
            self.shared.set_background(class, gallery.selected().cloned());
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::with_verbosity(cli.verbose);
    if let Some(path) = &cli.log_file {
        log_config = log_config.with_file(path);
    }
    let _log_guard = init_logging(&log_config)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            tracing::info!("Interrupted, finishing current frame");
            running.store(false, Ordering::Release);
        })
        .context("failed to install Ctrl-C handler")?;
    }

    match cli.command {
        Commands::Process {
            input,
            output,
            keying,
        } => {
            let mut prepared = keying.prepare()?;
            // Offline input runs unpaced unless asked otherwise
            prepared.fps = keying.fps.unwrap_or(0);
            let source = ImageSequence::open(&input)
                .with_context(|| format!("failed to open input directory {}", input.display()))?;
            let stats = run_session(prepared, Box::new(source), &output, &running, None)?;
            report(&stats);
        }
        #[cfg(feature = "camera")]
        Commands::Cameras => {
            let cameras = hue_key::camera::list_cameras();
            if cameras.is_empty() {
                println!("No cameras found");
            }
            for camera in cameras {
                println!("{}: {}", camera.index, camera.name);
            }
        }
        #[cfg(feature = "camera")]
        Commands::Live {
            output,
            camera,
            frames,
            resolution,
            keying,
        } => {
            let mut prepared = keying.prepare()?;
            if let Some(resolution) = resolution {
                prepared.settings.capture_preset = match resolution {
                    ResolutionArg::PortraitHd => hue_key::settings::CapturePreset::PortraitHd,
                    ResolutionArg::Standard => hue_key::settings::CapturePreset::Standard,
                };
            }
            let index = camera.unwrap_or(prepared.settings.camera_index);
            let capture =
                hue_key::camera::CameraCapture::new(index, prepared.settings.capture_resolution())
                    .with_context(|| format!("failed to open camera {}", index))?;
            let stats = run_session(prepared, Box::new(capture), &output, &running, frames)?;
            report(&stats);
        }
    }

    Ok(())
}

fn run_session(
    prepared: Prepared,
    source: Box<dyn hue_key::FrameSource>,
    output: &Path,
    running: &AtomicBool,
    max_frames: Option<u64>,
) -> Result<SessionStats> {
    let Prepared {
        settings,
        shared,
        galleries,
        fps,
        rotate_every,
    } = prepared;

    let sink = PngSequenceSink::new(output, settings.output_layout)
        .with_context(|| format!("failed to create output directory {}", output.display()))?;
    let mut sink = GalleryRotator {
        inner: sink,
        shared: shared.clone(),
        galleries,
        every: rotate_every,
    };

    let mut session = KeySession::new(shared);
    session.attach_source(source);
    let stats = session
        .run(running, fps, max_frames, &mut sink)
        .context("keying session failed")?;
    Ok(stats)
}

fn report(stats: &SessionStats) {
    println!(
        "Keyed {} frames ({} idle polls), avg {:.2} ms, p95 {:.2} ms",
        stats.processed, stats.idle, stats.timing.avg_ms, stats.timing.p95_ms
    );
}
