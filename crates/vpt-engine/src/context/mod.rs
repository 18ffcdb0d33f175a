//! The rendering context: one backend, the active renderer and tone mapper,
//! and the scene state they share.
//!
//! A frame is `renderer.render` → `tone_mapper.render` → a blit of the tone
//! mapped image to the screen target → `submit`. The context owns the volume,
//! the environment texture and the camera and lends them to the renderer for
//! each call; renderers never destroy them.

mod config;
mod event;

pub use config::ContextConfig;
pub use event::ContextEvent;

use std::path::Path;
use std::time::Instant;

use image::RgbaImage;

use crate::backend::{Backend, DrawCall, DrawTarget, Filter, ProgramId, TexelFormat, TextureHandle, TextureSpec};
use crate::camera::{OrbitCameraAnimator, PerspectiveCamera, Transform};
use crate::error::{Error, Result};
use crate::export::{AnimationOptions, Recorder};
use crate::params::ParamValue;
use crate::renderer::{FrameInputs, Renderer, RendererKind};
use crate::time::{Ticker, TickerHandle};
use crate::tonemap::{ToneMapper, ToneMapperKind};
use crate::volume::{load_volume, Volume, VolumeReader};

const BLIT: ProgramId = ProgramId("blit.quad");
/// Blends the environment behind pixels no path has reached yet.
const BLIT_FOV: ProgramId = ProgramId("blit.quad_fov");

#[derive(Debug)]
struct Scene<T> {
    volume: Volume<T>,
    environment: T,
    camera: PerspectiveCamera,
    volume_transform: Transform,
}

impl<T> Scene<T> {
    fn inputs(&self) -> FrameInputs<'_, T> {
        FrameInputs {
            volume: &self.volume,
            environment: &self.environment,
            camera: &self.camera,
            volume_transform: &self.volume_transform,
        }
    }
}

pub struct RenderingContext<B: Backend> {
    backend: B,
    filter: Filter,
    scene: Scene<B::Texture>,
    /// Camera revision the current accumulation was started with.
    camera_revision: u64,
    animator: OrbitCameraAnimator,
    renderer: Renderer<B::Texture>,
    tone_mapper: ToneMapper<B::Texture>,
    render_handle: Option<TickerHandle>,
    events: Vec<ContextEvent>,
}

impl<B: Backend> RenderingContext<B> {
    /// Creates the context with an empty volume, a white 1×1 environment and
    /// the configured renderer and tone mapper, already reset.
    pub fn new(mut backend: B, config: ContextConfig) -> Result<Self> {
        let volume = Volume::empty(&mut backend, config.filter)?;

        let spec = TextureSpec::new_2d("environment", 1, 1, TexelFormat::Rgba8Unorm);
        let environment = backend.create_texture(&spec)?;
        backend.write_texture(&environment, spec.full_region(), &[255; 4])?;

        let animator = OrbitCameraAnimator {
            distance: 2.0,
            pitch: 0.0,
            ..OrbitCameraAnimator::default()
        };
        let mut camera = PerspectiveCamera::default();
        camera.set_transform(animator.transform_at(0.0));

        let scene = Scene {
            volume,
            environment,
            camera,
            volume_transform: Transform::default(),
        };

        let mut renderer = Renderer::new(&mut backend, config.renderer, config.resolution)?;
        renderer.reset(&mut backend, scene.inputs())?;
        let mut tone_mapper = ToneMapper::new(&mut backend, config.tone_mapper, config.resolution)?;
        tone_mapper.set_texture(renderer.texture()?.clone());

        log::info!(
            "rendering context ready: {} / {} at {}",
            config.renderer,
            config.tone_mapper,
            config.resolution
        );
        Ok(Self {
            backend,
            filter: config.filter,
            camera_revision: scene.camera.revision(),
            scene,
            animator,
            renderer,
            tone_mapper,
            render_handle: None,
            events: Vec::new(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn renderer(&self) -> &Renderer<B::Texture> {
        &self.renderer
    }

    pub fn tone_mapper(&self) -> &ToneMapper<B::Texture> {
        &self.tone_mapper
    }

    pub fn volume(&self) -> &Volume<B::Texture> {
        &self.scene.volume
    }

    pub fn environment(&self) -> &B::Texture {
        &self.scene.environment
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.scene.camera
    }

    /// Camera changes reset the renderer at the start of the next frame.
    pub fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.scene.camera
    }

    pub fn animator(&self) -> &OrbitCameraAnimator {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut OrbitCameraAnimator {
        &mut self.animator
    }

    /// Places the camera where the animator puts it at time `t`.
    pub fn animate_camera(&mut self, t: f32) {
        self.animator.update(&mut self.scene.camera, t);
    }

    pub fn resolution(&self) -> u32 {
        self.renderer.resolution()
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn is_rendering(&self) -> bool {
        self.render_handle.is_some()
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ContextEvent> + '_ {
        self.events.drain(..)
    }

    /// Canvas size changed; only the camera aspect follows it.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.scene.camera.set_aspect(width as f32 / height as f32);
    }

    fn reset_renderer(&mut self) -> Result<()> {
        self.camera_revision = self.scene.camera.revision();
        self.renderer.reset(&mut self.backend, self.scene.inputs())
    }

    // ── scene ─────────────────────────────────────────────────────────────

    /// Streams a volume onto the GPU, replacing the current one.
    ///
    /// Queues a [`ContextEvent::VolumeProgress`] after every slab. On failure
    /// the previous volume stays bound.
    pub fn set_volume<R: VolumeReader + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        let events = &mut self.events;
        let volume = load_volume(&mut self.backend, reader, self.filter, |p| {
            events.push(ContextEvent::VolumeProgress(p))
        })?;

        let old = std::mem::replace(&mut self.scene.volume, volume);
        old.destroy(&mut self.backend);
        self.events.push(ContextEvent::VolumeLoaded {
            dimensions: self.scene.volume.metadata().dimensions,
        });
        self.reset_renderer()
    }

    /// Replaces the environment with tightly packed RGBA8 texels.
    pub fn set_environment_map(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<()> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(Error::Environment(format!(
                "{width}x{height} needs {expected} bytes, got {}",
                rgba.len()
            )));
        }

        let current = self.scene.environment.spec();
        if current.width != width || current.height != height {
            let spec = TextureSpec::new_2d("environment", width, height, TexelFormat::Rgba8Unorm);
            let texture = self.backend.create_texture(&spec)?;
            let old = std::mem::replace(&mut self.scene.environment, texture);
            self.backend.destroy_texture(&old);
        }
        let region = self.scene.environment.spec().full_region();
        self.backend.write_texture(&self.scene.environment, region, rgba)?;
        self.reset_renderer()
    }

    pub fn set_filter(&mut self, filter: Filter) -> Result<()> {
        self.filter = filter;
        self.scene.volume.set_filter(filter);
        self.reset_renderer()
    }

    // ── renderer / tone mapper ────────────────────────────────────────────

    /// Switches the rendering algorithm by tag. Unknown tags fail before any
    /// state changes.
    pub fn choose_renderer(&mut self, tag: &str) -> Result<()> {
        let kind: RendererKind = tag.parse()?;
        self.set_renderer(kind)
    }

    pub fn set_renderer(&mut self, kind: RendererKind) -> Result<()> {
        let resolution = self.resolution();
        let mut renderer = Renderer::new(&mut self.backend, kind, resolution)?;
        if let Err(e) = renderer.reset(&mut self.backend, self.scene.inputs()) {
            renderer.destroy(&mut self.backend, false)?;
            return Err(e);
        }
        self.camera_revision = self.scene.camera.revision();

        let mut old = std::mem::replace(&mut self.renderer, renderer);
        old.destroy(&mut self.backend, false)?;
        self.tone_mapper.set_texture(self.renderer.texture()?.clone());

        log::info!("renderer switched from {} to {kind}", old.kind());
        self.events.push(ContextEvent::RendererChanged(kind));
        Ok(())
    }

    pub fn choose_tone_mapper(&mut self, tag: &str) -> Result<()> {
        let kind: ToneMapperKind = tag.parse()?;
        self.set_tone_mapper(kind)
    }

    pub fn set_tone_mapper(&mut self, kind: ToneMapperKind) -> Result<()> {
        let resolution = self.resolution();
        let mut tone_mapper = ToneMapper::new(&mut self.backend, kind, resolution)?;
        tone_mapper.set_texture(self.renderer.texture()?.clone());

        let mut old = std::mem::replace(&mut self.tone_mapper, tone_mapper);
        old.destroy(&mut self.backend)?;

        log::info!("tone mapper switched from {} to {kind}", old.kind());
        self.events.push(ContextEvent::ToneMapperChanged(kind));
        Ok(())
    }

    /// Resizes the renderer and the tone mapper; the tone mapper is pointed at
    /// the renderer's new output.
    pub fn set_resolution(&mut self, resolution: u32) -> Result<()> {
        self.renderer
            .set_resolution(&mut self.backend, self.scene.inputs(), resolution)?;
        self.tone_mapper.set_resolution(&mut self.backend, resolution)?;
        self.tone_mapper.set_texture(self.renderer.texture()?.clone());
        Ok(())
    }

    /// Returns whether the change restarted accumulation.
    pub fn set_renderer_parameter(&mut self, name: &str, value: ParamValue) -> Result<bool> {
        self.renderer
            .set_parameter(&mut self.backend, self.scene.inputs(), name, value)
    }

    /// Tone mapping runs after accumulation, so this never resets.
    pub fn set_tone_mapper_parameter(&mut self, name: &str, value: ParamValue) -> Result<()> {
        self.tone_mapper.set_parameter(name, value)
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Renders one progressive frame and blits it to the screen target.
    ///
    /// GPU errors reported since the previous frame are logged, not returned.
    pub fn render(&mut self) -> Result<()> {
        if self.scene.camera.revision() != self.camera_revision {
            self.reset_renderer()?;
        }

        self.renderer.render(&mut self.backend, self.scene.inputs())?;
        self.tone_mapper.render(&mut self.backend)?;

        let image = self.tone_mapper.texture()?;
        let with_environment = [image, &self.scene.environment];
        let (program, inputs) = match self.renderer.kind() {
            RendererKind::Fov => (BLIT_FOV, &with_environment[..]),
            _ => (BLIT, &with_environment[..1]),
        };
        self.backend
            .draw(&DrawCall::fullscreen("blit", program, DrawTarget::Screen).inputs(inputs))?;
        self.backend.submit();

        for message in self.backend.take_diagnostics() {
            log::error!("gpu: {message}");
        }
        Ok(())
    }

    /// Reads the tone-mapped image back.
    pub fn read_output(&mut self) -> Result<RgbaImage> {
        let texture = self.tone_mapper.texture()?.clone();
        let resolution = self.tone_mapper.resolution();
        let pixels = self.backend.read_rgba8(&texture)?;
        RgbaImage::from_raw(resolution, resolution, pixels)
            .ok_or_else(|| Error::Gpu("tone mapper readback has the wrong size".to_string()))
    }

    /// Releases every GPU resource the context owns.
    pub fn destroy(&mut self) -> Result<()> {
        self.renderer.destroy(&mut self.backend, false)?;
        self.tone_mapper.destroy(&mut self.backend)?;
        self.scene.volume.destroy(&mut self.backend);
        self.backend.destroy_texture(&self.scene.environment);
        Ok(())
    }
}

// ── render loop ───────────────────────────────────────────────────────────

impl<B: Backend + 'static> RenderingContext<B> {
    /// Subscribes [`render`](Self::render) to `ticker`. Idempotent.
    pub fn start_rendering(&mut self, ticker: &mut Ticker<Self>) {
        if self.render_handle.is_some_and(|h| ticker.contains(h)) {
            return;
        }
        let handle = ticker.add(|context: &mut Self, _| {
            if let Err(e) = context.render() {
                log::error!("frame failed: {e}");
            }
        });
        self.render_handle = Some(handle);
    }

    /// Returns whether the context was subscribed.
    pub fn stop_rendering(&mut self, ticker: &mut Ticker<Self>) -> bool {
        self.render_handle
            .take()
            .is_some_and(|h| ticker.remove(h))
    }

    /// Captures an animation of the camera animator into `destination` (a
    /// directory for `images`, a file for `video`).
    ///
    /// Every timestep places the camera, resets the renderer and renders for
    /// `frame_time` seconds (at least one frame) before the tone-mapped image
    /// is captured. The context is unsubscribed from `ticker` for the whole
    /// capture and resubscribed afterwards if it was rendering before.
    pub fn record_animation(
        &mut self,
        ticker: &mut Ticker<Self>,
        options: &AnimationOptions,
        destination: &Path,
    ) -> Result<()> {
        options.validate()?;

        let was_rendering = self.stop_rendering(ticker);
        let mut recorder = Recorder::new(options.clone());
        let result = self.capture(&mut recorder, destination);
        if result.is_err() {
            recorder.abort();
        }
        if was_rendering {
            self.start_rendering(ticker);
        }
        result
    }

    fn capture(&mut self, recorder: &mut Recorder, destination: &Path) -> Result<()> {
        recorder.begin(destination)?;
        let frame_time = recorder.options().frame_time;

        while let Some((index, t)) = recorder.next_frame() {
            self.animate_camera(t);
            self.reset_renderer()?;

            let started = Instant::now();
            loop {
                self.render()?;
                if started.elapsed().as_secs_f64() >= frame_time {
                    break;
                }
            }

            let progress = recorder.capture(self.read_output()?)?;
            log::info!("captured frame {index} ({:.0}%)", progress * 100.0);
            self.events.push(ContextEvent::AnimationProgress(progress));
        }
        recorder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordedTexture, RecordingBackend};
    use crate::volume::{RawReader, VolumeMetadata, VoxelFormat};
    use glam::{UVec3, Vec3};

    fn context(renderer: RendererKind) -> RenderingContext<RecordingBackend> {
        RenderingContext::new(
            RecordingBackend::new(),
            ContextConfig {
                resolution: 16,
                renderer,
                ..ContextConfig::default()
            },
        )
        .unwrap()
    }

    fn last_blit(ctx: &RenderingContext<RecordingBackend>) -> crate::backend::DrawRecord {
        ctx.backend()
            .draws()
            .iter()
            .rev()
            .find(|d| d.to_screen)
            .cloned()
            .unwrap()
    }

    fn id(t: &RecordedTexture) -> u64 {
        t.id()
    }

    #[test]
    fn starts_reset_with_defaults() {
        let ctx = context(RendererKind::Mip);
        assert_eq!(ctx.resolution(), 16);
        assert_eq!(ctx.renderer().frame_count(), 0);
        assert_eq!(ctx.renderer().resets(), 1);
        assert_eq!(ctx.camera().transform().translation, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(ctx.tone_mapper().kind(), ToneMapperKind::Artistic);
        assert_eq!(
            ctx.tone_mapper().source().map(id),
            ctx.renderer().texture().ok().map(id)
        );
    }

    #[test]
    fn frame_tone_maps_then_blits_and_submits() {
        let mut ctx = context(RendererKind::Eam);
        ctx.render().unwrap();

        let tonemapped = ctx.tone_mapper().texture().unwrap().id();
        let blit = last_blit(&ctx);
        assert_eq!(blit.program, BLIT);
        assert_eq!(blit.inputs.len(), 1);
        assert_eq!(blit.reads(tonemapped), Some(ctx.backend().version(ctx.tone_mapper().texture().unwrap())));
        assert_eq!(ctx.backend().submits(), 1);
        assert_eq!(ctx.renderer().frame_count(), 1);
    }

    #[test]
    fn path_tracer_blit_samples_the_environment() {
        let mut ctx = context(RendererKind::Fov);
        ctx.render().unwrap();
        let blit = last_blit(&ctx);
        assert_eq!(blit.program, BLIT_FOV);
        assert!(blit.reads(ctx.environment().id()).is_some());
    }

    #[test]
    fn camera_change_resets_once_on_next_frame() {
        let mut ctx = context(RendererKind::Mcs);
        ctx.render().unwrap();
        ctx.render().unwrap();
        let resets = ctx.renderer().resets();

        ctx.animator_mut().yaw = 1.0;
        ctx.animate_camera(0.0);
        ctx.render().unwrap();
        assert_eq!(ctx.renderer().resets(), resets + 1);
        assert_eq!(ctx.renderer().frame_count(), 1);

        ctx.render().unwrap();
        assert_eq!(ctx.renderer().resets(), resets + 1);
    }

    #[test]
    fn resize_changes_aspect_only() {
        let mut ctx = context(RendererKind::Mip);
        ctx.resize(800, 400);
        assert_eq!(ctx.camera().aspect(), 2.0);
        assert_eq!(ctx.resolution(), 16);
        ctx.resize(0, 10);
        assert_eq!(ctx.camera().aspect(), 2.0);
    }

    #[test]
    fn switching_renderer_releases_the_old_one() {
        let mut ctx = context(RendererKind::Mip);
        let live = ctx.backend().live_textures();

        ctx.choose_renderer("dos").unwrap();
        ctx.choose_renderer("mip").unwrap();
        assert_eq!(ctx.backend().live_textures(), live);
        assert_eq!(ctx.renderer().kind(), RendererKind::Mip);
        assert_eq!(
            ctx.tone_mapper().source().map(id),
            ctx.renderer().texture().ok().map(id)
        );
        let events: Vec<_> = ctx.drain_events().collect();
        assert_eq!(
            events,
            vec![
                ContextEvent::RendererChanged(RendererKind::Dos),
                ContextEvent::RendererChanged(RendererKind::Mip)
            ]
        );
    }

    #[test]
    fn unknown_tags_change_nothing() {
        let mut ctx = context(RendererKind::Iso);
        let live = ctx.backend().live_textures();
        let draws = ctx.backend().draws().len();

        assert!(matches!(ctx.choose_renderer("pbr"), Err(Error::UnsupportedRenderer(_))));
        assert!(matches!(ctx.choose_tone_mapper("filmic"), Err(Error::UnsupportedToneMapper(_))));
        assert_eq!(ctx.renderer().kind(), RendererKind::Iso);
        assert_eq!(ctx.tone_mapper().kind(), ToneMapperKind::Artistic);
        assert_eq!(ctx.backend().live_textures(), live);
        assert_eq!(ctx.backend().draws().len(), draws);
    }

    #[test]
    fn resolution_change_follows_through_tone_mapper() {
        let mut ctx = context(RendererKind::Lao);
        ctx.set_resolution(32).unwrap();
        assert_eq!(ctx.tone_mapper().resolution(), 32);
        assert_eq!(ctx.renderer().render_buffer().resolution(), 32);
        assert_eq!(
            ctx.tone_mapper().source().map(id),
            ctx.renderer().texture().ok().map(id)
        );
        assert!(matches!(ctx.set_resolution(0), Err(Error::InvalidResolution(0))));
    }

    #[test]
    fn switches_keep_the_current_resolution() {
        let mut ctx = context(RendererKind::Mip);
        ctx.set_resolution(48).unwrap();
        ctx.set_renderer(RendererKind::Eam).unwrap();
        ctx.set_tone_mapper(ToneMapperKind::Aces).unwrap();

        assert_eq!(ctx.renderer().render_buffer().resolution(), 48);
        assert_eq!(ctx.tone_mapper().resolution(), 48);
        assert_eq!(ctx.resolution(), 48);
    }

    #[test]
    fn volume_load_reports_progress_and_resets() {
        let mut ctx = context(RendererKind::Mip);
        let resets = ctx.renderer().resets();
        let meta = VolumeMetadata {
            dimensions: UVec3::new(4, 4, 4),
            scale: Vec3::ONE,
            format: VoxelFormat::U8,
            max_value: 255.0,
        };
        let mut reader = RawReader::new(&[7u8; 64][..], meta);
        ctx.set_volume(&mut reader).unwrap();

        assert_eq!(ctx.volume().metadata().dimensions, UVec3::new(4, 4, 4));
        assert_eq!(ctx.renderer().resets(), resets + 1);
        let events: Vec<_> = ctx.drain_events().collect();
        assert_eq!(events.first(), Some(&ContextEvent::VolumeProgress(1.0)));
        assert_eq!(
            events.last(),
            Some(&ContextEvent::VolumeLoaded {
                dimensions: UVec3::new(4, 4, 4)
            })
        );
    }

    #[test]
    fn environment_map_is_validated_and_resized() {
        let mut ctx = context(RendererKind::Fov);
        assert!(matches!(
            ctx.set_environment_map(2, 2, &[0; 3]),
            Err(Error::Environment(_))
        ));
        let live = ctx.backend().live_textures();
        ctx.set_environment_map(2, 1, &[9; 8]).unwrap();
        assert_eq!(ctx.environment().spec().width, 2);
        assert_eq!(ctx.backend().live_textures(), live);
    }

    #[test]
    fn filter_change_resets() {
        let mut ctx = context(RendererKind::Eam);
        let resets = ctx.renderer().resets();
        ctx.set_filter(Filter::Nearest).unwrap();
        assert_eq!(ctx.volume().filter(), Filter::Nearest);
        assert_eq!(ctx.renderer().resets(), resets + 1);
    }

    #[test]
    fn gpu_diagnostics_do_not_fail_the_frame() {
        let mut ctx = context(RendererKind::Mip);
        ctx.backend_mut().push_diagnostic("validation error");
        ctx.render().unwrap();
        assert!(ctx.backend_mut().take_diagnostics().is_empty());
    }

    #[test]
    fn ticker_drives_frames_until_stopped() {
        let mut ctx = context(RendererKind::Mip);
        let mut ticker = Ticker::new();

        ctx.start_rendering(&mut ticker);
        ctx.start_rendering(&mut ticker);
        ticker.tick(&mut ctx);
        ticker.tick(&mut ctx);
        assert_eq!(ctx.renderer().frame_count(), 2);

        assert!(ctx.stop_rendering(&mut ticker));
        assert!(!ctx.stop_rendering(&mut ticker));
        ticker.tick(&mut ctx);
        assert_eq!(ctx.renderer().frame_count(), 2);
        assert!(ticker.is_idle());
    }

    #[test]
    fn destroy_releases_everything() {
        let mut ctx = context(RendererKind::Fov);
        ctx.render().unwrap();
        ctx.destroy().unwrap();
        assert_eq!(ctx.backend().live_textures(), 0);
    }
}
