//! Monte Carlo multiple scattering.
//!
//! Paths live in the accumulation buffer (position, direction,
//! transmittance, radiance); every integrate advances each path by up to
//! `steps` delta-tracking steps and restarts finished ones. There is no
//! generate pass.

use crate::backend::{Backend, ProgramId};
use crate::error::Result;
use crate::params::{ParamSet, ParamSpec};

use super::{Pass, PassUniforms};

const RESET: ProgramId = ProgramId("mcm.reset");
const INTEGRATE: ProgramId = ProgramId("mcm.integrate");
const RENDER: ProgramId = ProgramId("mcm.render");

pub(super) const PROGRAMS: &[ProgramId] = &[RESET, INTEGRATE, RENDER];
pub(super) const RESET_ON: &[&str] = &["extinction", "anisotropy", "bounces", "transferFunction"];

const RADIANCE: usize = 3;

pub(super) fn params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::spinner("extinction", "Extinction", 100.0),
        ParamSpec::slider("anisotropy", "Anisotropy", 0.0, -1.0, 1.0),
        ParamSpec::count("bounces", "Max bounces", 8),
        ParamSpec::count("steps", "Steps", 8),
        ParamSpec::transfer_function(),
    ]
}

pub(super) fn configure(params: &ParamSet, u: &mut PassUniforms) {
    u.extinction = params.float("extinction");
    u.anisotropy = params.float("anisotropy");
    u.bounces = params.uint("bounces");
    u.steps = params.uint("steps");
}

pub(super) fn reset<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [pass.volume(), pass.transfer_function(), pass.environment()];
    pass.draw("mcm reset", RESET, buffers.accumulation.target()?, &inputs)
}

pub(super) fn integrate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let state = buffers.accumulation.attachments()?;
    let mut inputs: Vec<&B::Texture> = state.iter().collect();
    inputs.extend([pass.volume(), pass.transfer_function(), pass.environment()]);
    pass.draw("mcm integrate", INTEGRATE, buffers.accumulation.target()?, &inputs)
}

pub(super) fn render<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [buffers.accumulation.attachment(RADIANCE)?];
    pass.draw("mcm render", RENDER, buffers.render.target()?, &inputs)
}
