mod metrics;
mod pipeline;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use reframe_core::{GpuBackend, RenderStrategy, ReframeConfig};
use reframe_render::{ComputeDevice, GpuDevice};

const DEFAULT_CONFIG: &str = "reframe.toml";

#[derive(Parser)]
#[command(
    name = "reframe",
    version,
    about = "Reframe: run a pixel shader over every frame of a video",
    long_about = concat!(
        "Reframe splits a video into frames, transforms every pixel on one thread,\n",
        "on a CPU worker pool or on the GPU, and encodes the result back into a video."
    )
)]
struct Cli {
    /// Config file (default: ./reframe.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a directory of frame_<n> images into another directory
    Render {
        /// Directory holding the input frames
        #[arg()]
        input: PathBuf,

        /// Directory for the transformed frames (created if missing)
        #[arg()]
        output: PathBuf,

        /// Execution strategy: sequential, parallel or gpu
        #[arg(short, long, default_value = "parallel")]
        strategy: String,

        /// Worker count for parallel and gpu (default: available parallelism)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Compute backend for the gpu strategy: wgpu or emulated
        #[arg(long)]
        backend: Option<String>,

        /// Kernel lane count (default: sized per frame)
        #[arg(long)]
        lanes: Option<u32>,

        /// Check every output against the host transform of its input
        #[arg(long)]
        verify: bool,
    },

    /// Probe, extract, render and re-encode a video
    Run {
        /// Source video
        #[arg()]
        video: PathBuf,

        /// Execution strategy: sequential, parallel or gpu
        #[arg(short, long, default_value = "parallel")]
        strategy: String,

        /// Output video (default: output/<name>.mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker count for parallel and gpu (default: available parallelism)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Compute backend for the gpu strategy: wgpu or emulated
        #[arg(long)]
        backend: Option<String>,

        /// Keep the extracted and rendered frames
        #[arg(long)]
        keep_temp: bool,
    },

    /// Display version, tool and GPU adapter info
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            input,
            output,
            strategy,
            workers,
            backend,
            lanes,
            verify,
        } => {
            apply_overrides(&mut config, workers, backend.as_deref(), lanes)?;
            config.render.verify |= verify;
            cmd_render(&config, &input, &output, strategy.parse()?)
        }
        Commands::Run {
            video,
            strategy,
            output,
            workers,
            backend,
            keep_temp,
        } => {
            apply_overrides(&mut config, workers, backend.as_deref(), None)?;
            config.pipeline.keep_temp |= keep_temp;
            cmd_run(&config, &video, strategy.parse()?, output)
        }
        Commands::Info => cmd_info(&config),
    }
}

/// Load `path`, or `reframe.toml` from the working directory when it exists.
fn load_config(path: Option<&Path>) -> Result<ReframeConfig> {
    let path = match path {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG).exists() => Path::new(DEFAULT_CONFIG),
        None => return Ok(ReframeConfig::default()),
    };
    let config = ReframeConfig::load_from_file(path)
        .with_context(|| format!("failed to load config: {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn apply_overrides(
    config: &mut ReframeConfig,
    workers: Option<usize>,
    backend: Option<&str>,
    lanes: Option<u32>,
) -> Result<()> {
    if let Some(workers) = workers {
        if workers == 0 {
            anyhow::bail!("--workers must be at least 1");
        }
        config.render.workers = workers;
    }
    if let Some(backend) = backend {
        config.gpu.backend = backend.parse()?;
    }
    if let Some(lanes) = lanes {
        config.gpu.lanes = lanes;
    }
    Ok(())
}

fn cmd_render(
    config: &ReframeConfig,
    input: &Path,
    output: &Path,
    strategy: RenderStrategy,
) -> Result<()> {
    println!("🎬 Reframe Render");
    println!("   Input:     {}", input.display());
    println!("   Output:    {}", output.display());
    println!("   Strategy:  {}", strategy);

    let summary = pipeline::render_dir(config, input, output, strategy)?;

    println!();
    println!(
        "✓ {} of {} frames rendered in {:.1}ms",
        summary.processed, summary.frames, summary.elapsed_ms
    );
    if summary.failed > 0 {
        println!("   Skipped:   {} (see log)", summary.failed);
    }
    if config.render.verify {
        println!("   Verified:  outputs match the host transform");
    }
    Ok(())
}

fn cmd_run(
    config: &ReframeConfig,
    video: &Path,
    strategy: RenderStrategy,
    output: Option<PathBuf>,
) -> Result<()> {
    let start = Instant::now();
    println!("🎬 Reframe Run");
    println!("   Source:    {}", video.display());
    println!("   Strategy:  {}", strategy);

    let output = pipeline::run(config, video, strategy, output)?;

    println!();
    println!(
        "✓ Wrote {} in {:.2}s",
        output.display(),
        start.elapsed().as_secs_f64()
    );
    println!("   Metrics:   {}", config.pipeline.metrics_path.display());
    Ok(())
}

fn cmd_info(config: &ReframeConfig) -> Result<()> {
    println!("🎬 Reframe");
    println!("   Version:   {}", env!("CARGO_PKG_VERSION"));
    println!("   Workers:   {}", config.render.worker_count());
    println!(
        "   FFmpeg:    {}",
        if reframe_encode::FfmpegEncoder::is_available() {
            "available ✓"
        } else {
            "NOT FOUND ✗"
        }
    );
    println!(
        "   FFprobe:   {}",
        if reframe_encode::probe::is_available() {
            "available ✓"
        } else {
            "NOT FOUND ✗"
        }
    );
    match config.gpu.backend {
        GpuBackend::Emulated => println!("   GPU:       host emulator (configured)"),
        GpuBackend::Wgpu => match GpuDevice::init() {
            Ok(device) => println!("   GPU:       {}", device.name()),
            Err(e) => println!("   GPU:       unavailable ({})", e),
        },
    }
    Ok(())
}
