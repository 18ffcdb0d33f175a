//! Progressive renderers.
//!
//! Every renderer runs the same protocol against three buffers:
//!
//! 1. **generate** draws this frame's estimate into the frame buffer
//! 2. **integrate** combines it with the accumulation read set into the write
//!    set, then the accumulation buffer swaps
//! 3. **render** turns the accumulated state into the render buffer image
//!
//! `reset` reinitializes the accumulation (a reset pass into the write set,
//! then a swap) and zeroes the frame counter. Integrate `n + 1` therefore
//! always reads exactly what integrate `n` (or the reset) wrote.
//!
//! The algorithm specific passes live in one module per [`RendererKind`]; the
//! orchestration is shared and dispatches on [`Technique`].

mod common;
mod depth;
mod dos;
mod eam;
mod fov;
mod iso;
mod kind;
mod lao;
mod mcm;
mod mcs;
mod mip;
mod uniforms;

use crate::backend::{
    Backend, DrawCall, DrawTarget, Filter, ProgramId, TexelFormat, TextureHandle, TextureSpec,
};
use crate::buffer::{check_resolution, destroyed, DoubleBuffer, SingleBuffer};
use crate::camera::{mvp_inverse, PerspectiveCamera, Transform};
use crate::error::{Error, Result};
use crate::params::{ParamSet, ParamSpec, ParamValue};
use crate::transfer::{TransferFunction, TRANSFER_FUNCTION_WIDTH};
use crate::volume::Volume;

pub use fov::RESET_PERIOD;
pub use kind::RendererKind;
pub use uniforms::{PassUniforms, FLAG_JITTER, FLAG_RESET};

use fov::FovState;

/// Shared scene state a renderer reads while drawing. Owned by the caller.
#[derive(Debug)]
pub struct FrameInputs<'a, T> {
    pub volume: &'a Volume<T>,
    pub environment: &'a T,
    pub camera: &'a PerspectiveCamera,
    pub volume_transform: &'a Transform,
}

impl<T> Clone for FrameInputs<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FrameInputs<'_, T> {}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RendererState {
    /// Buffers exist but hold no valid accumulation yet.
    Constructed,
    /// Reset; no frame rendered since.
    Ready,
    Rendering,
    Destroyed,
}

// ── buffers ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) struct Buffers<T> {
    pub frame: SingleBuffer<T>,
    pub accumulation: DoubleBuffer<T>,
    pub render: SingleBuffer<T>,
}

impl<T: TextureHandle> Buffers<T> {
    fn new<B: Backend<Texture = T>>(backend: &mut B, kind: RendererKind, resolution: u32) -> Result<Self> {
        let mut frame = SingleBuffer::new(backend, "frame buffer", resolution, kind.frame_layout())?;
        let mut accumulation =
            match DoubleBuffer::new(backend, "accumulation buffer", resolution, kind.accumulation_layout()) {
                Ok(buffer) => buffer,
                Err(e) => {
                    frame.destroy(backend)?;
                    return Err(e);
                }
            };
        let render = match SingleBuffer::new(backend, "render buffer", resolution, kind.render_layout()) {
            Ok(buffer) => buffer,
            Err(e) => {
                frame.destroy(backend)?;
                accumulation.destroy(backend)?;
                return Err(e);
            }
        };
        Ok(Self {
            frame,
            accumulation,
            render,
        })
    }

    fn destroy<B: Backend<Texture = T>>(&mut self, backend: &mut B, keep_render_buffer: bool) -> Result<()> {
        self.frame.destroy(backend)?;
        self.accumulation.destroy(backend)?;
        if !keep_render_buffer {
            self.render.destroy(backend)?;
        }
        Ok(())
    }
}

// ── pass context ──────────────────────────────────────────────────────────

/// Everything a variant's pass encoder may touch during one protocol step.
pub(crate) struct Pass<'a, B: Backend> {
    backend: &'a mut B,
    buffers: &'a Buffers<B::Texture>,
    transfer_function: &'a B::Texture,
    inputs: FrameInputs<'a, B::Texture>,
    uniforms: PassUniforms,
}

impl<'a, B: Backend> Pass<'a, B> {
    pub fn backend(&mut self) -> &mut B {
        self.backend
    }

    pub fn buffers(&self) -> &'a Buffers<B::Texture> {
        self.buffers
    }

    pub fn inputs(&self) -> FrameInputs<'a, B::Texture> {
        self.inputs
    }

    pub fn volume(&self) -> &'a B::Texture {
        self.inputs.volume.texture()
    }

    pub fn environment(&self) -> &'a B::Texture {
        self.inputs.environment
    }

    pub fn transfer_function(&self) -> &'a B::Texture {
        self.transfer_function
    }

    pub fn uniforms(&self) -> &PassUniforms {
        &self.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut PassUniforms {
        &mut self.uniforms
    }

    /// Full-screen pass with the current uniform block.
    pub fn draw(
        &mut self,
        label: &'static str,
        program: ProgramId,
        targets: &[B::Texture],
        inputs: &[&B::Texture],
    ) -> Result<()> {
        let call = DrawCall::fullscreen(label, program, DrawTarget::Textures(targets))
            .inputs(inputs)
            .uniforms(bytemuck::bytes_of(&self.uniforms));
        self.backend.draw(&call)
    }

    pub fn clear(&mut self, targets: &[B::Texture]) -> Result<()> {
        self.backend.clear(targets)
    }
}

// ── techniques ────────────────────────────────────────────────────────────

/// Per-algorithm state and pass dispatch.
#[derive(Debug)]
pub(crate) enum Technique<T> {
    Mip,
    Iso,
    Eam,
    Lao,
    Mcs,
    Mcm,
    Fov(FovState<T>),
    Dos,
    Depth,
}

impl<T: TextureHandle> Technique<T> {
    fn new(kind: RendererKind) -> Self {
        match kind {
            RendererKind::Mip => Technique::Mip,
            RendererKind::Iso => Technique::Iso,
            RendererKind::Eam => Technique::Eam,
            RendererKind::Lao => Technique::Lao,
            RendererKind::Mcs => Technique::Mcs,
            RendererKind::Mcm => Technique::Mcm,
            RendererKind::Fov => Technique::Fov(FovState::new()),
            RendererKind::Dos => Technique::Dos,
            RendererKind::Depth => Technique::Depth,
        }
    }

    fn kind(&self) -> RendererKind {
        match self {
            Technique::Mip => RendererKind::Mip,
            Technique::Iso => RendererKind::Iso,
            Technique::Eam => RendererKind::Eam,
            Technique::Lao => RendererKind::Lao,
            Technique::Mcs => RendererKind::Mcs,
            Technique::Mcm => RendererKind::Mcm,
            Technique::Fov(_) => RendererKind::Fov,
            Technique::Dos => RendererKind::Dos,
            Technique::Depth => RendererKind::Depth,
        }
    }

    fn configure(&self, params: &ParamSet, u: &mut PassUniforms) {
        match self {
            Technique::Mip => mip::configure(params, u),
            Technique::Iso => iso::configure(params, u),
            Technique::Eam => eam::configure(params, u),
            Technique::Lao => lao::configure(params, u),
            Technique::Mcs => mcs::configure(params, u),
            Technique::Mcm => mcm::configure(params, u),
            Technique::Fov(_) => fov::configure(params, u),
            Technique::Dos => dos::configure(params, u),
            Technique::Depth => depth::configure(params, u),
        }
    }

    fn reset<B: Backend<Texture = T>>(&mut self, pass: &mut Pass<'_, B>) -> Result<()> {
        match self {
            Technique::Mip => mip::reset(pass),
            Technique::Iso => iso::reset(pass),
            Technique::Eam => eam::reset(pass),
            Technique::Lao => lao::reset(pass),
            Technique::Mcs => mcs::reset(pass),
            Technique::Mcm => mcm::reset(pass),
            Technique::Fov(state) => state.reset(pass),
            Technique::Dos => dos::reset(pass),
            Technique::Depth => depth::reset(pass),
        }
    }

    /// Path tracers carry their samples in the accumulation buffer and have
    /// nothing to generate.
    fn generate<B: Backend<Texture = T>>(&mut self, pass: &mut Pass<'_, B>) -> Result<()> {
        match self {
            Technique::Mip => mip::generate(pass),
            Technique::Iso => iso::generate(pass),
            Technique::Eam => eam::generate(pass),
            Technique::Lao => lao::generate(pass),
            Technique::Mcs => mcs::generate(pass),
            Technique::Mcm | Technique::Fov(_) => Ok(()),
            Technique::Dos => dos::generate(pass),
            Technique::Depth => depth::generate(pass),
        }
    }

    fn integrate<B: Backend<Texture = T>>(&mut self, pass: &mut Pass<'_, B>) -> Result<()> {
        match self {
            Technique::Mip => mip::integrate(pass),
            Technique::Iso => iso::integrate(pass),
            Technique::Eam => eam::integrate(pass),
            Technique::Lao => lao::integrate(pass),
            Technique::Mcs => mcs::integrate(pass),
            Technique::Mcm => mcm::integrate(pass),
            Technique::Fov(state) => state.integrate(pass),
            Technique::Dos => dos::integrate(pass),
            Technique::Depth => depth::integrate(pass),
        }
    }

    fn render<B: Backend<Texture = T>>(&mut self, pass: &mut Pass<'_, B>) -> Result<()> {
        match self {
            Technique::Mip => mip::render(pass),
            Technique::Iso => iso::render(pass),
            Technique::Eam => eam::render(pass),
            Technique::Lao => lao::render(pass),
            Technique::Mcs => mcs::render(pass),
            Technique::Mcm => mcm::render(pass),
            Technique::Fov(state) => state.render(pass),
            Technique::Dos => dos::render(pass),
            Technique::Depth => depth::render(pass),
        }
    }

    /// Drops resolution-dependent auxiliary resources.
    fn release<B: Backend<Texture = T>>(&mut self, backend: &mut B) -> Result<()> {
        match self {
            Technique::Fov(state) => state.release(backend),
            _ => Ok(()),
        }
    }
}

// ── renderer ──────────────────────────────────────────────────────────────

/// One progressive renderer: buffers, transfer function and parameters of a
/// single algorithm.
///
/// Scene inputs (volume, camera, environment) are passed to every call that
/// draws; the renderer never owns or destroys them.
#[derive(Debug)]
pub struct Renderer<T> {
    technique: Technique<T>,
    state: RendererState,
    resolution: u32,
    params: ParamSet,
    frame: u32,
    resets: u64,
    buffers: Buffers<T>,
    transfer_function: T,
}

impl<T: TextureHandle> Renderer<T> {
    pub fn new<B: Backend<Texture = T>>(backend: &mut B, kind: RendererKind, resolution: u32) -> Result<Self> {
        check_resolution(resolution)?;
        let mut buffers = Buffers::new(backend, kind, resolution)?;

        let spec = TextureSpec::new_2d(
            "transfer function",
            TRANSFER_FUNCTION_WIDTH,
            1,
            TexelFormat::Rgba8Unorm,
        )
        .with_filter(Filter::Linear);
        let transfer_function = match backend.create_texture(&spec) {
            Ok(texture) => texture,
            Err(e) => {
                buffers.destroy(backend, false)?;
                return Err(e);
            }
        };
        backend.write_texture(&transfer_function, spec.full_region(), &TransferFunction::default_texels())?;

        log::debug!("created {kind} renderer at {resolution}x{resolution}");
        Ok(Self {
            technique: Technique::new(kind),
            state: RendererState::Constructed,
            resolution,
            params: ParamSet::new(kind.params()),
            frame: 0,
            resets: 0,
            buffers,
            transfer_function,
        })
    }

    pub fn kind(&self) -> RendererKind {
        self.technique.kind()
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Frames rendered since the last reset.
    pub fn frame_count(&self) -> u32 {
        self.frame
    }

    /// Resets performed since construction.
    pub fn resets(&self) -> u64 {
        self.resets
    }

    pub fn params(&self) -> &[ParamSpec] {
        self.params.specs()
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// The rendered image (attachment 0 of the render buffer).
    pub fn texture(&self) -> Result<&T> {
        self.buffers.render.attachment(0)
    }

    pub fn frame_buffer(&self) -> &SingleBuffer<T> {
        &self.buffers.frame
    }

    pub fn accumulation_buffer(&self) -> &DoubleBuffer<T> {
        &self.buffers.accumulation
    }

    pub fn render_buffer(&self) -> &SingleBuffer<T> {
        &self.buffers.render
    }

    pub fn transfer_function_texture(&self) -> &T {
        &self.transfer_function
    }

    /// Times the occupancy pyramid was built (FOV only).
    pub fn occupancy_builds(&self) -> u64 {
        match &self.technique {
            Technique::Fov(state) => state.pyramid_builds(),
            _ => 0,
        }
    }

    /// Integrate calls since construction (FOV only).
    pub fn path_integrations(&self) -> u64 {
        match &self.technique {
            Technique::Fov(state) => state.integrations(),
            _ => 0,
        }
    }

    fn live(&self) -> Result<()> {
        if self.state == RendererState::Destroyed {
            return Err(destroyed("renderer"));
        }
        Ok(())
    }

    fn uniforms(&self, inputs: &FrameInputs<'_, T>) -> PassUniforms {
        let mut u = PassUniforms {
            mvp_inverse: mvp_inverse(inputs.camera, inputs.volume_transform).to_cols_array_2d(),
            inverse_resolution: [1.0 / self.resolution as f32; 2],
            seed: fastrand::f32(),
            frame: self.frame,
            ..PassUniforms::default()
        };
        self.technique.configure(&self.params, &mut u);
        u
    }

    /// Restarts accumulation: frame counter 0, accumulation read set freshly
    /// initialized by the reset pass.
    pub fn reset<B: Backend<Texture = T>>(&mut self, backend: &mut B, inputs: FrameInputs<'_, T>) -> Result<()> {
        self.live()?;
        self.frame = 0;
        let uniforms = self.uniforms(&inputs);
        let mut pass = Pass {
            backend,
            buffers: &self.buffers,
            transfer_function: &self.transfer_function,
            inputs,
            uniforms,
        };
        self.technique.reset(&mut pass)?;
        self.buffers.accumulation.swap()?;

        self.resets += 1;
        self.state = RendererState::Ready;
        log::debug!("{} reset", self.kind());
        Ok(())
    }

    /// Draws one progressive frame: generate, integrate + swap, render.
    pub fn render<B: Backend<Texture = T>>(&mut self, backend: &mut B, inputs: FrameInputs<'_, T>) -> Result<()> {
        self.live()?;
        if self.state == RendererState::Constructed {
            self.reset(backend, inputs)?;
        }

        let uniforms = self.uniforms(&inputs);
        let mut pass = Pass {
            backend: &mut *backend,
            buffers: &self.buffers,
            transfer_function: &self.transfer_function,
            inputs,
            uniforms,
        };
        self.technique.generate(&mut pass)?;
        self.technique.integrate(&mut pass)?;
        let uniforms = pass.uniforms;

        self.buffers.accumulation.swap()?;

        let mut pass = Pass {
            backend,
            buffers: &self.buffers,
            transfer_function: &self.transfer_function,
            inputs,
            uniforms,
        };
        self.technique.render(&mut pass)?;

        self.frame += 1;
        self.state = RendererState::Rendering;
        Ok(())
    }

    /// Recreates every buffer at `resolution` and resets. No-op when unchanged.
    pub fn set_resolution<B: Backend<Texture = T>>(
        &mut self,
        backend: &mut B,
        inputs: FrameInputs<'_, T>,
        resolution: u32,
    ) -> Result<()> {
        self.live()?;
        check_resolution(resolution)?;
        if resolution == self.resolution {
            return Ok(());
        }

        let buffers = Buffers::new(backend, self.kind(), resolution)?;
        let mut old = std::mem::replace(&mut self.buffers, buffers);
        old.destroy(backend, false)?;
        self.technique.release(backend)?;
        self.resolution = resolution;

        log::info!("{} resolution set to {resolution}", self.kind());
        self.reset(backend, inputs)
    }

    /// Validates and stores a parameter value.
    ///
    /// Returns whether the change invalidated the accumulated image; if so the
    /// renderer has already reset itself.
    pub fn set_parameter<B: Backend<Texture = T>>(
        &mut self,
        backend: &mut B,
        inputs: FrameInputs<'_, T>,
        name: &str,
        value: ParamValue,
    ) -> Result<bool> {
        self.live()?;
        let stored = self.params.set(name, value)?.clone();
        if let ParamValue::TransferFunction(tf) = &stored {
            self.set_transfer_function(backend, &tf.rasterize())?;
        }

        let needs_reset = self.kind().reset_on().contains(&name);
        if needs_reset {
            self.reset(backend, inputs)?;
        }
        Ok(needs_reset)
    }

    /// Uploads `TRANSFER_FUNCTION_WIDTH` RGBA8 texels.
    pub fn set_transfer_function<B: Backend<Texture = T>>(&mut self, backend: &mut B, texels: &[u8]) -> Result<()> {
        self.live()?;
        if texels.len() != TRANSFER_FUNCTION_WIDTH as usize * 4 {
            return Err(Error::ParameterType {
                name: "transferFunction".to_string(),
                expected: "256 RGBA8 texel",
            });
        }
        let region = self.transfer_function.spec().full_region();
        backend.write_texture(&self.transfer_function, region, texels)
    }

    /// Releases every resource the renderer owns, except the render buffer
    /// when `keep_render_buffer` is set (see [`release_render_buffer`](Self::release_render_buffer)).
    pub fn destroy<B: Backend<Texture = T>>(&mut self, backend: &mut B, keep_render_buffer: bool) -> Result<()> {
        self.live()?;
        self.technique.release(backend)?;
        self.buffers.destroy(backend, keep_render_buffer)?;
        backend.destroy_texture(&self.transfer_function);
        self.state = RendererState::Destroyed;
        log::debug!("{} renderer destroyed", self.kind());
        Ok(())
    }

    /// Releases a render buffer kept alive by `destroy(.., true)`.
    pub fn release_render_buffer<B: Backend<Texture = T>>(&mut self, backend: &mut B) -> Result<()> {
        self.buffers.render.destroy(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordedTexture, RecordingBackend};

    struct Scene {
        volume: Volume<RecordedTexture>,
        environment: RecordedTexture,
        camera: PerspectiveCamera,
        transform: Transform,
    }

    impl Scene {
        fn new(b: &mut RecordingBackend) -> Self {
            let environment = b
                .create_texture(&TextureSpec::new_2d("environment", 1, 1, TexelFormat::Rgba8Unorm))
                .unwrap();
            Self {
                volume: Volume::empty(b, Filter::Linear).unwrap(),
                environment,
                camera: PerspectiveCamera::default(),
                transform: Transform::default(),
            }
        }

        fn inputs(&self) -> FrameInputs<'_, RecordedTexture> {
            FrameInputs {
                volume: &self.volume,
                environment: &self.environment,
                camera: &self.camera,
                volume_transform: &self.transform,
            }
        }
    }

    fn setup(kind: RendererKind, resolution: u32) -> (RecordingBackend, Scene, Renderer<RecordedTexture>) {
        let mut b = RecordingBackend::new();
        let scene = Scene::new(&mut b);
        let mut r = Renderer::new(&mut b, kind, resolution).unwrap();
        r.reset(&mut b, scene.inputs()).unwrap();
        (b, scene, r)
    }

    fn ids(set: &[RecordedTexture]) -> Vec<u64> {
        set.iter().map(RecordedTexture::id).collect()
    }

    #[test]
    fn render_counts_frames_and_reset_zeroes() {
        for kind in RendererKind::ALL {
            let (mut b, scene, mut r) = setup(kind, 64);
            for _ in 0..10 {
                r.render(&mut b, scene.inputs()).unwrap();
            }
            assert_eq!(r.frame_count(), 10, "{kind}");
            assert_eq!(r.state(), RendererState::Rendering);
            r.reset(&mut b, scene.inputs()).unwrap();
            assert_eq!(r.frame_count(), 0, "{kind}");
            assert_eq!(r.state(), RendererState::Ready);
        }
    }

    #[test]
    fn reset_leaves_reset_output_on_the_read_side() {
        for kind in RendererKind::ALL {
            let (mut b, scene, mut r) = setup(kind, 16);
            r.render(&mut b, scene.inputs()).unwrap();
            r.reset(&mut b, scene.inputs()).unwrap();
            let first = ids(r.accumulation_buffer().attachments().unwrap());
            let writer = b.last_writer(r.accumulation_buffer().attachment(0).unwrap());
            assert!(writer.is_some(), "{kind}");
            assert!(kind.programs().contains(&writer.unwrap()));
            assert!(writer.unwrap().name().ends_with("reset") || writer.unwrap().name().ends_with("clear"));

            // A second reset lands on the other set with the same program.
            r.reset(&mut b, scene.inputs()).unwrap();
            let second = ids(r.accumulation_buffer().attachments().unwrap());
            assert_ne!(first, second);
            assert_eq!(b.last_writer(r.accumulation_buffer().attachment(0).unwrap()), writer);
            assert_eq!(r.frame_count(), 0);
        }
    }

    #[test]
    fn each_integrate_reads_what_the_previous_one_wrote() {
        let (mut b, scene, mut r) = setup(RendererKind::Eam, 8);
        b.clear_draws();
        for _ in 0..6 {
            r.render(&mut b, scene.inputs()).unwrap();
        }

        let integrates: Vec<_> = b.draws_of(common::INTEGRATE_MEAN).cloned().collect();
        assert_eq!(integrates.len(), 6);
        for pair in integrates.windows(2) {
            let (written_id, written_version) = pair[0].targets[0];
            assert_eq!(pair[1].reads(written_id), Some(written_version));
        }
    }

    #[test]
    fn render_reads_the_latest_accumulation() {
        let (mut b, scene, mut r) = setup(RendererKind::Mip, 8);
        b.clear_draws();
        r.render(&mut b, scene.inputs()).unwrap();

        let draws = b.draws();
        let integrate = &draws[1];
        let render = &draws[2];
        let (id, version) = integrate.targets[0];
        assert_eq!(render.reads(id), Some(version));
    }

    #[test]
    fn resolution_change_recreates_buffers_and_resets() {
        let (mut b, scene, mut r) = setup(RendererKind::Mcm, 32);
        let live = b.live_textures();
        r.render(&mut b, scene.inputs()).unwrap();

        for resolution in [1, 7, 64, 32] {
            r.set_resolution(&mut b, scene.inputs(), resolution).unwrap();
            assert_eq!(r.frame_count(), 0);
            for buffer in [
                r.frame_buffer().attachments().unwrap(),
                r.accumulation_buffer().attachments().unwrap(),
                r.accumulation_buffer().target().unwrap(),
                r.render_buffer().attachments().unwrap(),
            ] {
                for t in buffer {
                    assert_eq!((t.spec().width, t.spec().height), (resolution, resolution));
                }
            }
        }
        assert_eq!(b.live_textures(), live);
    }

    #[test]
    fn unchanged_resolution_is_a_no_op() {
        let (mut b, scene, mut r) = setup(RendererKind::Mip, 32);
        let resets = r.resets();
        r.set_resolution(&mut b, scene.inputs(), 32).unwrap();
        assert_eq!(r.resets(), resets);
        assert!(matches!(
            r.set_resolution(&mut b, scene.inputs(), 0),
            Err(Error::InvalidResolution(0))
        ));
    }

    #[test]
    fn allow_listed_parameters_reset_exactly_once() {
        let (mut b, scene, mut r) = setup(RendererKind::Fov, 16);
        let resets = r.resets();

        assert!(r
            .set_parameter(&mut b, scene.inputs(), "extinction", ParamValue::Float(50.0))
            .unwrap());
        assert_eq!(r.resets(), resets + 1);

        assert!(!r
            .set_parameter(&mut b, scene.inputs(), "steps", ParamValue::Uint(100))
            .unwrap());
        assert_eq!(r.resets(), resets + 1);
        assert_eq!(r.parameter("steps"), Some(&ParamValue::Uint(100)));
    }

    #[test]
    fn bad_parameters_leave_state_untouched() {
        let (mut b, scene, mut r) = setup(RendererKind::Eam, 16);
        let resets = r.resets();
        assert!(matches!(
            r.set_parameter(&mut b, scene.inputs(), "nope", ParamValue::Float(1.0)),
            Err(Error::UnknownParameter(_))
        ));
        assert!(matches!(
            r.set_parameter(&mut b, scene.inputs(), "random", ParamValue::Float(1.0)),
            Err(Error::ParameterType { .. })
        ));
        assert_eq!(r.resets(), resets);
    }

    #[test]
    fn transfer_function_parameter_uploads_texels() {
        let (mut b, scene, mut r) = setup(RendererKind::Mcs, 8);
        let before = b.version(r.transfer_function_texture());
        let changed = r
            .set_parameter(
                &mut b,
                scene.inputs(),
                "transferFunction",
                ParamValue::TransferFunction(TransferFunction::default()),
            )
            .unwrap();
        assert!(changed);
        assert!(b.version(r.transfer_function_texture()) > before);
        assert!(r.set_transfer_function(&mut b, &[0; 12]).is_err());
    }

    #[test]
    fn destroy_releases_everything_once() {
        let (mut b, scene, mut r) = setup(RendererKind::Fov, 16);
        r.render(&mut b, scene.inputs()).unwrap();
        let shared = 2; // volume + environment
        r.destroy(&mut b, false).unwrap();
        assert_eq!(b.live_textures(), shared);

        assert!(matches!(r.destroy(&mut b, false), Err(Error::Destroyed(_))));
        assert!(matches!(r.render(&mut b, scene.inputs()), Err(Error::Destroyed(_))));
        assert!(matches!(r.reset(&mut b, scene.inputs()), Err(Error::Destroyed(_))));
        assert_eq!(b.live_textures(), shared);
    }

    #[test]
    fn destroy_can_keep_the_render_buffer() {
        let (mut b, _scene, mut r) = setup(RendererKind::Iso, 16);
        r.destroy(&mut b, true).unwrap();
        assert!(r.texture().is_ok());
        assert_eq!(b.live_textures(), 3);
        r.release_render_buffer(&mut b).unwrap();
        assert_eq!(b.live_textures(), 2);
    }

    #[test]
    fn fov_flags_every_third_integrate() {
        let (mut b, scene, mut r) = setup(RendererKind::Fov, 16);
        b.clear_draws();
        for _ in 0..9 {
            r.render(&mut b, scene.inputs()).unwrap();
        }

        let flagged: Vec<bool> = b
            .draws_of(ProgramId("fov.integrate"))
            .map(|d| d.uniform_block::<PassUniforms>().unwrap().has_flag(FLAG_RESET))
            .collect();
        assert_eq!(flagged.len(), 9);
        for (i, flag) in flagged.iter().enumerate() {
            assert_eq!(*flag, (i as u64 + 1) % RESET_PERIOD == 0, "integrate {i}");
        }

        // The splat pass never sees the flag.
        assert!(b
            .draws_of(ProgramId("fov.render"))
            .all(|d| !d.uniform_block::<PassUniforms>().unwrap().has_flag(FLAG_RESET)));
    }

    #[test]
    fn pass_uniforms_carry_parameters_and_frame_index() {
        let (mut b, scene, mut r) = setup(RendererKind::Eam, 8);
        r.set_parameter(&mut b, scene.inputs(), "slices", ParamValue::Uint(32))
            .unwrap();
        b.clear_draws();
        r.render(&mut b, scene.inputs()).unwrap();
        r.render(&mut b, scene.inputs()).unwrap();

        let frames: Vec<PassUniforms> = b
            .draws_of(ProgramId("eam.generate"))
            .map(|d| d.uniform_block().unwrap())
            .collect();
        assert_eq!(frames[0].frame, 0);
        assert_eq!(frames[1].frame, 1);
        assert_eq!(frames[0].slices, 32);
        assert_eq!(frames[0].extinction, 100.0);
        assert!(frames[0].has_flag(FLAG_JITTER));
        assert_eq!(frames[0].inverse_resolution, [0.125, 0.125]);
    }

    #[test]
    fn fov_builds_occupancy_once_per_reset() {
        let (mut b, scene, mut r) = setup(RendererKind::Fov, 64);
        for _ in 0..5 {
            r.render(&mut b, scene.inputs()).unwrap();
        }
        assert_eq!(r.occupancy_builds(), 1);
        // 32, 16 and 8 texel levels.
        assert_eq!(b.draws_of(ProgramId("occupancy.downsample")).count(), 3);

        r.reset(&mut b, scene.inputs()).unwrap();
        r.render(&mut b, scene.inputs()).unwrap();
        r.render(&mut b, scene.inputs()).unwrap();
        assert_eq!(r.occupancy_builds(), 2);
    }

    #[test]
    fn fov_splats_one_point_per_pixel_without_clearing() {
        let (mut b, scene, mut r) = setup(RendererKind::Fov, 32);
        b.clear_draws();
        r.render(&mut b, scene.inputs()).unwrap();

        let splat = b.draws_of(ProgramId("fov.render")).next().cloned().unwrap();
        assert_eq!(splat.primitive, crate::backend::Primitive::Points(32 * 32));
        assert_eq!(splat.blend, crate::backend::Blend::Additive);
        assert_eq!(splat.load, crate::backend::LoadOp::Keep);
        assert!(b.draws_of(ProgramId("fov.generate")).next().is_none());
    }

    #[test]
    fn fov_reset_seeds_paths_from_the_mip_image() {
        let (b, _scene, r) = setup(RendererKind::Fov, 16);
        let reset = b.draws_of(ProgramId("fov.reset")).last().unwrap();
        let mip = b.draws_of(ProgramId("mip.render")).last().unwrap();
        let (mip_out, version) = mip.targets[0];
        assert_eq!(reset.reads(mip_out), Some(version));
        assert_eq!(r.frame_count(), 0);
    }
}
