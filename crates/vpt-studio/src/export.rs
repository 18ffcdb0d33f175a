use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use vpt_engine::backend::{Backend, RecordingBackend, WgpuBackend};
use vpt_engine::device::{GpuInit, HeadlessGpu};
use vpt_engine::export::{suggested_export_name, AnimationOptions};
use vpt_engine::shaders::ShaderLibrary;
use vpt_engine::time::Ticker;

use crate::config::StudioConfig;
use crate::scene::{log_events, open_context};

/// Headless animation export.
pub struct ExportJob {
    pub options: AnimationOptions,
    /// Defaults to a timestamped name in the working directory.
    pub out: Option<PathBuf>,
    /// Run on the recording backend: no GPU, frames are placeholders.
    pub dry_run: bool,
}

impl ExportJob {
    pub fn load_options(path: &Path) -> Result<AnimationOptions> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read animation options {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("invalid animation options {}", path.display()))
    }

    pub fn run(&self, config: &StudioConfig, shaders: ShaderLibrary) -> Result<PathBuf> {
        let kind = self.options.validate()?;
        let out = match &self.out {
            Some(out) => out.clone(),
            None => PathBuf::from(suggested_export_name(kind, time::OffsetDateTime::now_utc())),
        };

        if self.dry_run {
            self.record(RecordingBackend::new(), config, &out)?;
        } else {
            let gpu = pollster::block_on(HeadlessGpu::new(GpuInit::default()))?;
            let info = gpu.adapter_info();
            log::info!("{} ({:?})", info.name, info.backend);
            let backend = WgpuBackend::new(gpu.device().clone(), gpu.queue().clone(), Arc::new(shaders));
            self.record(backend, config, &out)?;
        }
        Ok(out)
    }

    fn record<B: Backend + 'static>(&self, backend: B, config: &StudioConfig, out: &Path) -> Result<()> {
        let mut context = open_context(backend, config)?;
        let mut ticker = Ticker::new();
        let result = context
            .record_animation(&mut ticker, &self.options, out)
            .with_context(|| format!("export to {} failed", out.display()));
        log_events(&mut context);
        context.destroy()?;
        result
    }
}
