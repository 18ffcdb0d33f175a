//! Maximum intensity projection.

use crate::backend::{Backend, ProgramId};
use crate::error::Result;
use crate::params::{ParamSet, ParamSpec};

use super::common::{clear_accumulation, CLEAR};
use super::{Pass, PassUniforms};

const GENERATE: ProgramId = ProgramId("mip.generate");
const INTEGRATE: ProgramId = ProgramId("mip.integrate");
const RENDER: ProgramId = ProgramId("mip.render");

pub(super) const PROGRAMS: &[ProgramId] = &[CLEAR, GENERATE, INTEGRATE, RENDER];
pub(super) const RESET_ON: &[&str] = &["steps"];

pub(super) fn params() -> Vec<ParamSpec> {
    vec![ParamSpec::count("steps", "Steps", 64)]
}

pub(super) fn configure(params: &ParamSet, u: &mut PassUniforms) {
    u.steps = params.uint("steps");
}

pub(super) fn reset<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    clear_accumulation(pass, "mip reset")
}

pub(super) fn generate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [pass.volume()];
    pass.draw("mip generate", GENERATE, buffers.frame.target()?, &inputs)
}

// Running maximum.
pub(super) fn integrate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [
        buffers.accumulation.attachment(0)?,
        buffers.frame.attachment(0)?,
    ];
    pass.draw("mip integrate", INTEGRATE, buffers.accumulation.target()?, &inputs)
}

pub(super) fn render<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [buffers.accumulation.attachment(0)?];
    pass.draw("mip render", RENDER, buffers.render.target()?, &inputs)
}
