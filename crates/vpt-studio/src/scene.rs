use anyhow::{Context, Result};
use vpt_engine::backend::Backend;
use vpt_engine::context::{ContextEvent, RenderingContext};
use vpt_engine::volume::open_volume;

use crate::config::StudioConfig;

/// Creates a context on `backend` and loads the configured volume and
/// environment map.
pub fn open_context<B: Backend>(backend: B, config: &StudioConfig) -> Result<RenderingContext<B>> {
    let mut context = RenderingContext::new(backend, config.context.clone())
        .context("failed to create rendering context")?;

    if let Some(path) = &config.volume {
        let mut reader = open_volume(path)?;
        context
            .set_volume(reader.as_mut())
            .with_context(|| format!("failed to load volume {}", path.display()))?;
    }

    if let Some(path) = &config.environment {
        let image = image::open(path)
            .with_context(|| format!("failed to open environment map {}", path.display()))?
            .to_rgba8();
        context.set_environment_map(image.width(), image.height(), image.as_raw())?;
    }

    log_events(&mut context);
    Ok(context)
}

pub fn log_events<B: Backend>(context: &mut RenderingContext<B>) {
    for event in context.drain_events() {
        match event {
            ContextEvent::VolumeProgress(p) => log::debug!("volume {:.0}%", p * 100.0),
            ContextEvent::VolumeLoaded { dimensions } => {
                log::info!("volume loaded: {}x{}x{}", dimensions.x, dimensions.y, dimensions.z)
            }
            ContextEvent::AnimationProgress(p) => log::info!("export {:.0}%", p * 100.0),
            ContextEvent::RendererChanged(kind) => log::info!("renderer: {kind}"),
            ContextEvent::ToneMapperChanged(kind) => log::info!("tone mapper: {kind}"),
        }
    }
}
