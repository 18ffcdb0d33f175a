mod config;
mod export;
mod scene;
mod viewer;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use vpt_engine::device::GpuInit;
use vpt_engine::logging::{init_logging, LoggingConfig};
use vpt_engine::renderer::RendererKind;
use vpt_engine::shaders::ShaderLibrary;
use vpt_engine::tonemap::ToneMapperKind;
use vpt_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use crate::config::StudioConfig;
use crate::export::ExportJob;
use crate::viewer::Viewer;

#[derive(Debug, Parser)]
#[command(name = "vpt-studio", version, about = "Progressive volume path tracing viewer")]
struct Cli {
    /// JSON settings file; flags below override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Volume to load (`.vol` or `.dat`).
    #[arg(long, global = true)]
    volume: Option<PathBuf>,

    /// Environment map image.
    #[arg(long, global = true)]
    environment: Option<PathBuf>,

    /// mip, iso, eam, lao, mcs, mcm, fov, dos or depth.
    #[arg(long, global = true)]
    renderer: Option<RendererKind>,

    /// artistic, range, reinhard, reinhard2, uncharted2 or aces.
    #[arg(long, global = true)]
    tone_mapper: Option<ToneMapperKind>,

    #[arg(long, global = true)]
    resolution: Option<u32>,

    /// JSON program manifest replacing built-in shaders.
    #[arg(long, global = true)]
    shaders: Option<PathBuf>,

    /// env_logger filter, e.g. `vpt_engine=debug`.
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render an animation without opening a window.
    Export {
        /// JSON `{ type, startTime, endTime, frameTime, fps }`.
        #[arg(long)]
        options: PathBuf,

        /// Output directory (images) or file (video).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Use the recording backend instead of a GPU.
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    fn studio_config(&self) -> Result<StudioConfig> {
        let mut config = match &self.config {
            Some(path) => StudioConfig::load(path)?,
            None => StudioConfig::default(),
        };
        if let Some(volume) = &self.volume {
            config.volume = Some(volume.clone());
        }
        if let Some(environment) = &self.environment {
            config.environment = Some(environment.clone());
        }
        if let Some(renderer) = self.renderer {
            config.context.renderer = renderer;
        }
        if let Some(tone_mapper) = self.tone_mapper {
            config.context.tone_mapper = tone_mapper;
        }
        if let Some(resolution) = self.resolution {
            config.context.resolution = resolution;
        }
        if let Some(log) = &self.log {
            config.log = Some(log.clone());
        }
        Ok(config)
    }

    fn shader_library(&self) -> Result<ShaderLibrary> {
        Ok(match &self.shaders {
            Some(path) => ShaderLibrary::load(path)?,
            None => ShaderLibrary::builtin(),
        })
    }
}

fn main() {
    if let Err(e) = run() {
        log::error!("{e:#}");
        eprintln!("vpt-studio: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.studio_config()?;
    init_logging(LoggingConfig {
        env_filter: config.log.clone(),
        ..LoggingConfig::default()
    });
    let shaders = cli.shader_library()?;

    match cli.command {
        Some(Command::Export {
            options,
            out,
            dry_run,
        }) => {
            let job = ExportJob {
                options: ExportJob::load_options(&options)?,
                out,
                dry_run,
            };
            let written = job.run(&config, shaders)?;
            log::info!("animation written to {}", written.display());
            Ok(())
        }
        None => {
            let runtime = RuntimeConfig {
                title: format!("vpt-studio · {}", config.context.renderer),
                initial_size: LogicalSize::new(768.0, 768.0),
            };
            Runtime::run(runtime, GpuInit::default(), Viewer::new(config, shaders))
        }
    }
}
