//! Directional occlusion shading.

use crate::backend::{Backend, ProgramId};
use crate::error::Result;
use crate::params::{ParamSet, ParamSpec};

use super::{Pass, PassUniforms};

const RESET: ProgramId = ProgramId("dos.reset");
const GENERATE: ProgramId = ProgramId("dos.generate");
const INTEGRATE: ProgramId = ProgramId("dos.integrate");
const RENDER: ProgramId = ProgramId("dos.render");

pub(super) const PROGRAMS: &[ProgramId] = &[RESET, GENERATE, INTEGRATE, RENDER];
pub(super) const RESET_ON: &[&str] = &[
    "steps",
    "slices",
    "occlusionScale",
    "occlusionSamples",
    "transferFunction",
];

pub(super) fn params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::count("steps", "Steps", 64),
        ParamSpec::count("slices", "Slices", 200),
        ParamSpec::slider("occlusionScale", "Occlusion scale", 0.01, 0.0, 1.0),
        ParamSpec::count("occlusionSamples", "Occlusion samples", 8),
        ParamSpec::transfer_function(),
    ]
}

pub(super) fn configure(params: &ParamSet, u: &mut PassUniforms) {
    u.steps = params.uint("steps");
    u.slices = params.uint("slices");
    u.radius = params.float("occlusionScale");
    u.samples = params.uint("occlusionSamples");
}

pub(super) fn reset<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    pass.draw("dos reset", RESET, buffers.accumulation.target()?, &[])
}

pub(super) fn generate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [pass.volume(), pass.transfer_function()];
    pass.draw("dos generate", GENERATE, buffers.frame.target()?, &inputs)
}

// Color and occlusion are averaged separately.
pub(super) fn integrate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [
        buffers.accumulation.attachment(0)?,
        buffers.accumulation.attachment(1)?,
        buffers.frame.attachment(0)?,
    ];
    pass.draw("dos integrate", INTEGRATE, buffers.accumulation.target()?, &inputs)
}

pub(super) fn render<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [
        buffers.accumulation.attachment(0)?,
        buffers.accumulation.attachment(1)?,
    ];
    pass.draw("dos render", RENDER, buffers.render.target()?, &inputs)
}
