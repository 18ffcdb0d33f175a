//! Field-of-view path tracer.
//!
//! Like [`mcm`](super::mcm) the accumulation buffer holds path state, plus a
//! fifth slot with the image position each path contributes to. The render
//! pass splats one point per path additively into a render buffer that is only
//! cleared on reset, so the image keeps converging while paths restart.
//!
//! Empty space is skipped with an occupancy pyramid built from a maximum
//! intensity projection of the volume: level 0 is the MIP image, every further
//! level halves the previous one with a max reduction, down to an eighth of
//! the resolution.

use crate::backend::{Backend, DrawCall, DrawTarget, ProgramId, TextureHandle};
use crate::buffer::{AttachmentSpec, SingleBuffer};
use crate::error::Result;
use crate::params::{ParamSet, ParamSpec};

use super::{Pass, PassUniforms, Renderer, RendererKind, FLAG_RESET};

const RESET: ProgramId = ProgramId("fov.reset");
const INTEGRATE: ProgramId = ProgramId("fov.integrate");
const RENDER: ProgramId = ProgramId("fov.render");
const DOWNSAMPLE: ProgramId = ProgramId("occupancy.downsample");

pub(super) const PROGRAMS: &[ProgramId] = &[RESET, INTEGRATE, RENDER, DOWNSAMPLE];
pub(super) const RESET_ON: &[&str] = &["extinction", "anisotropy", "bounces", "transferFunction"];

/// Every `RESET_PERIOD`-th integrate restarts all paths.
pub const RESET_PERIOD: u64 = 3;

const RADIANCE: usize = 3;
const SPLAT: usize = 4;

pub(super) fn params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::spinner("extinction", "Extinction", 100.0),
        ParamSpec::slider("anisotropy", "Anisotropy", 0.0, -1.0, 1.0),
        ParamSpec::count("bounces", "Max bounces", 8),
        ParamSpec::count("steps", "Steps", 200),
        ParamSpec::transfer_function(),
    ]
}

pub(super) fn configure(params: &ParamSet, u: &mut PassUniforms) {
    u.extinction = params.float("extinction");
    u.anisotropy = params.float("anisotropy");
    u.bounces = params.uint("bounces");
    u.steps = params.uint("steps");
}

/// Auxiliary resources owned by a FOV renderer.
#[derive(Debug)]
pub(crate) struct FovState<T> {
    mip: Option<Box<Renderer<T>>>,
    pyramid: Vec<SingleBuffer<T>>,
    integrations: u64,
    pyramid_builds: u64,
}

impl<T: TextureHandle> FovState<T> {
    pub(super) fn new() -> Self {
        Self {
            mip: None,
            pyramid: Vec::new(),
            integrations: 0,
            pyramid_builds: 0,
        }
    }

    pub(super) fn pyramid_builds(&self) -> u64 {
        self.pyramid_builds
    }

    pub(super) fn integrations(&self) -> u64 {
        self.integrations
    }

    /// MIP output, i.e. pyramid level 0.
    fn base_level(&self) -> Result<&T> {
        match &self.mip {
            Some(mip) => mip.texture(),
            None => Err(crate::buffer::destroyed("occupancy")),
        }
    }

    fn coarsest_level(&self) -> Result<&T> {
        match self.pyramid.last() {
            Some(level) => level.attachment(0),
            None => self.base_level(),
        }
    }

    pub(super) fn reset<B: Backend<Texture = T>>(&mut self, pass: &mut Pass<'_, B>) -> Result<()> {
        let resolution = pass.buffers().render.resolution();
        let inputs = pass.inputs();

        if self.mip.is_none() {
            self.mip = Some(Box::new(Renderer::new(pass.backend(), RendererKind::Mip, resolution)?));
        }
        if let Some(mip) = self.mip.as_mut() {
            mip.reset(pass.backend(), inputs)?;
            mip.render(pass.backend(), inputs)?;
        }

        let buffers = pass.buffers();
        let occupancy = self.base_level()?;
        let reset_inputs = [occupancy, pass.volume(), pass.transfer_function(), pass.environment()];
        pass.draw("fov reset", RESET, buffers.accumulation.target()?, &reset_inputs)?;
        pass.clear(buffers.render.target()?)
    }

    pub(super) fn integrate<B: Backend<Texture = T>>(&mut self, pass: &mut Pass<'_, B>) -> Result<()> {
        if pass.uniforms().frame == 0 {
            self.build_pyramid(pass)?;
        }

        self.integrations += 1;
        if self.integrations % RESET_PERIOD == 0 {
            pass.uniforms_mut().flags |= FLAG_RESET;
        }

        let buffers = pass.buffers();
        let state = buffers.accumulation.attachments()?;
        let inputs = [
            &state[0],
            &state[1],
            &state[2],
            &state[RADIANCE],
            pass.volume(),
            pass.environment(),
            pass.transfer_function(),
            &state[SPLAT],
            self.coarsest_level()?,
        ];
        let result = pass.draw("fov integrate", INTEGRATE, buffers.accumulation.target()?, &inputs);
        pass.uniforms_mut().flags &= !FLAG_RESET;
        result
    }

    pub(super) fn render<B: Backend<Texture = T>>(&mut self, pass: &mut Pass<'_, B>) -> Result<()> {
        let buffers = pass.buffers();
        let resolution = buffers.render.resolution();
        let inputs = [
            buffers.accumulation.attachment(RADIANCE)?,
            buffers.accumulation.attachment(SPLAT)?,
        ];
        let uniforms = *pass.uniforms();
        let call = DrawCall::fullscreen("fov render", RENDER, DrawTarget::Textures(buffers.render.target()?))
            .inputs(&inputs)
            .uniforms(bytemuck::bytes_of(&uniforms))
            .splat_points(resolution * resolution);
        pass.backend().draw(&call)
    }

    fn build_pyramid<B: Backend<Texture = T>>(&mut self, pass: &mut Pass<'_, B>) -> Result<()> {
        let resolution = pass.buffers().render.resolution();
        if self.pyramid.is_empty() {
            let floor = (resolution / 8).max(1);
            let mut size = resolution / 2;
            while size >= floor && size > 0 {
                let level = SingleBuffer::new(pass.backend(), "occupancy", size, &[AttachmentSpec::R32F])?;
                self.pyramid.push(level);
                size /= 2;
            }
        }

        let mut previous = self.base_level()?;
        for level in &self.pyramid {
            pass.draw("occupancy downsample", DOWNSAMPLE, level.target()?, &[previous])?;
            previous = level.attachment(0)?;
        }
        self.pyramid_builds += 1;
        log::debug!("built occupancy pyramid with {} levels", self.pyramid.len() + 1);
        Ok(())
    }

    /// Releases the MIP renderer and the pyramid; both are rebuilt on the next reset.
    pub(super) fn release<B: Backend<Texture = T>>(&mut self, backend: &mut B) -> Result<()> {
        if let Some(mut mip) = self.mip.take() {
            mip.destroy(backend, false)?;
        }
        for mut level in self.pyramid.drain(..) {
            level.destroy(backend)?;
        }
        Ok(())
    }
}
