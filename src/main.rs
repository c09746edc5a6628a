mod app;
mod braille;
mod config;
mod particle;
mod present;
mod rng;
mod scheduler;
mod settings;
mod simulation;
mod store;
mod surface;
mod terminal;
#[cfg(test)]
mod test_support;
mod ui;
mod walk;

use anyhow::{anyhow, Context};
use app::{App, FrameStats};
use clap::Parser;
use config::AppConfig;
use particle::Vec2;
use simulation::Simulation;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use surface::{HeadlessSurface, Surface, SurfaceError};
use terminal::TerminalSurface;
use tracing::info;
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

#[derive(Parser, Debug, Default)]
#[command(name = "dla-walkers")]
#[command(about = "Parallel random-walk particle simulation drawn in the terminal")]
struct Args {
    // === Configuration ===
    /// Load settings from this JSON file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to this file and exit
    #[arg(long = "save-config")]
    save_config: Option<PathBuf>,

    // === Plane ===
    /// Width of the simulation plane
    #[arg(long, allow_negative_numbers = true)]
    width: Option<f32>,

    /// Height of the simulation plane
    #[arg(long, allow_negative_numbers = true)]
    height: Option<f32>,

    // === Population ===
    /// Number of free particles
    #[arg(short = 'p', long)]
    particles: Option<usize>,

    /// Number of cluster particles
    #[arg(long = "cluster-particles")]
    cluster_particles: Option<usize>,

    /// Where free particles start, as "x,y"
    #[arg(long = "spawn", value_parser = parse_point)]
    spawn: Option<Vec2>,

    // === Movement Parameters ===
    /// Distance scale of one walk step
    #[arg(long = "step-size", allow_negative_numbers = true)]
    step_size: Option<f32>,

    /// Walk steps per tick for free particles
    #[arg(long)]
    steps: Option<u32>,

    /// Walk steps per tick for cluster particles (0 = inert)
    #[arg(long = "cluster-steps")]
    cluster_steps: Option<u32>,

    // === Execution ===
    /// Worker threads, also the number of chunks per pass
    #[arg(long)]
    workers: Option<usize>,

    /// Fixed RNG seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    // === Presentation ===
    /// Target frame rate (0 = unpaced)
    #[arg(long)]
    fps: Option<u32>,

    /// Edge length of a drawn particle, in simulation units
    #[arg(long = "point-size")]
    point_size: Option<f32>,

    /// Run without a terminal surface
    #[arg(long)]
    headless: bool,

    /// Stop after this many ticks
    #[arg(long)]
    ticks: Option<u64>,

    /// Append logs to this file
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn parse_point(s: &str) -> Result<Vec2, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got \"{s}\""))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f32>()
            .map_err(|err| format!("invalid coordinate \"{v}\": {err}"))
    };
    Ok(Vec2::new(parse(x)?, parse(y)?))
}

/// CLI flags win over whatever the config file says
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    let settings = &mut config.settings;
    if let Some(width) = args.width {
        settings.width = width;
    }
    if let Some(height) = args.height {
        settings.height = height;
    }
    if let Some(count) = args.particles {
        settings.initial_free_count = count;
    }
    if let Some(count) = args.cluster_particles {
        settings.initial_cluster_count = count;
    }
    if let Some(spawn) = args.spawn {
        settings.free_spawn = spawn;
    }
    if let Some(step_size) = args.step_size {
        settings.step_size = step_size;
    }
    if let Some(steps) = args.steps {
        settings.free_steps_per_tick = steps;
    }
    if let Some(steps) = args.cluster_steps {
        settings.cluster_steps_per_tick = steps;
    }
    if let Some(workers) = args.workers {
        settings.worker_count = workers;
    }
    if args.seed.is_some() {
        settings.rng_seed = args.seed;
    }

    if let Some(fps) = args.fps {
        config.target_fps = fps;
    }
    if let Some(point_size) = args.point_size {
        config.point_size = point_size;
    }
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    if let Some(path) = explicit {
        return AppConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()));
    }
    match AppConfig::default_path().filter(|path| path.exists()) {
        Some(path) => AppConfig::load_from_file(&path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

/// The terminal surface owns stdout, so without a log file the terminal
/// run discards logs
fn init_tracing(log_file: Option<&Path>, headless: bool) -> anyhow::Result<()> {
    let writer = match log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None if headless => BoxMakeWriter::new(io::stderr),
        None => BoxMakeWriter::new(io::sink),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none() && headless)
        .try_init()
        .map_err(|err| anyhow!(err))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref(), args.headless)?;

    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config
        .settings
        .validate()
        .context("invalid simulation settings")?;

    if let Some(path) = &args.save_config {
        config
            .save_to_file(path)
            .with_context(|| format!("saving config to {}", path.display()))?;
        info!(path = %path.display(), "configuration saved");
        return Ok(());
    }

    let headless = args.headless;
    let stats = launch(&config, args.ticks, |config| {
        let surface: Box<dyn Surface> = if headless {
            Box::new(HeadlessSurface::new(args.ticks))
        } else {
            Box::new(TerminalSurface::open(
                config.settings.bounds(),
                &config.title,
                config.target_fps,
            )?)
        };
        Ok(surface)
    })?;
    info!(
        ticks = stats.ticks,
        failed = stats.failed_passes,
        "shut down cleanly"
    );
    Ok(())
}

/// Open the surface, then build the simulation and run it. If the surface
/// cannot be opened no simulation state is created.
fn launch<F>(
    config: &AppConfig,
    tick_limit: Option<u64>,
    open_surface: F,
) -> anyhow::Result<FrameStats>
where
    F: FnOnce(&AppConfig) -> Result<Box<dyn Surface>, SurfaceError>,
{
    let mut surface = open_surface(config).context("failed to open surface")?;

    let simulation =
        Simulation::new(config.settings.clone()).context("failed to start simulation")?;
    let settings = simulation.settings();
    info!(
        free = settings.initial_free_count,
        cluster = settings.initial_cluster_count,
        workers = simulation.worker_count(),
        width = settings.width,
        height = settings.height,
        "simulation ready"
    );

    let mut app = App::new(simulation, config.point_size);
    app.tick_limit = tick_limit;
    app.run(surface.as_mut()).context("frame loop failed")
}
