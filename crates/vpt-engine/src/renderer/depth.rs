//! First-hit depth.

use crate::backend::{Backend, ProgramId};
use crate::error::Result;
use crate::params::{ParamSet, ParamSpec};

use super::{Pass, PassUniforms};

const RESET: ProgramId = ProgramId("depth.reset");
const GENERATE: ProgramId = ProgramId("depth.generate");
const INTEGRATE: ProgramId = ProgramId("depth.integrate");
const RENDER: ProgramId = ProgramId("depth.render");

pub(super) const PROGRAMS: &[ProgramId] = &[RESET, GENERATE, INTEGRATE, RENDER];
pub(super) const RESET_ON: &[&str] = &["steps", "threshold"];

pub(super) fn params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::count("steps", "Steps", 64),
        ParamSpec::slider("threshold", "Threshold", 0.5, 0.0, 1.0),
    ]
}

pub(super) fn configure(params: &ParamSet, u: &mut PassUniforms) {
    u.steps = params.uint("steps");
    u.threshold = params.float("threshold");
}

// Far plane everywhere.
pub(super) fn reset<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    pass.draw("depth reset", RESET, buffers.accumulation.target()?, &[])
}

pub(super) fn generate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [pass.volume()];
    pass.draw("depth generate", GENERATE, buffers.frame.target()?, &inputs)
}

// Running minimum.
pub(super) fn integrate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [
        buffers.accumulation.attachment(0)?,
        buffers.frame.attachment(0)?,
    ];
    pass.draw("depth integrate", INTEGRATE, buffers.accumulation.target()?, &inputs)
}

pub(super) fn render<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [buffers.accumulation.attachment(0)?];
    pass.draw("depth render", RENDER, buffers.render.target()?, &inputs)
}
