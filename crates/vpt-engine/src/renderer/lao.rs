//! Local ambient occlusion.

use crate::backend::{Backend, ProgramId};
use crate::error::Result;
use crate::params::{ParamSet, ParamSpec};

use super::common::{clear_accumulation, integrate_mean, render_copy, CLEAR, INTEGRATE_MEAN, RENDER_COPY};
use super::{Pass, PassUniforms};

const GENERATE: ProgramId = ProgramId("lao.generate");

pub(super) const PROGRAMS: &[ProgramId] = &[CLEAR, GENERATE, INTEGRATE_MEAN, RENDER_COPY];
pub(super) const RESET_ON: &[&str] = &["steps", "aoSteps", "aoRadius", "aoSamples", "transferFunction"];

pub(super) fn params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::count("steps", "Steps", 64),
        ParamSpec::count("aoSteps", "AO steps", 16),
        ParamSpec::slider("aoRadius", "AO radius", 0.05, 0.0, 1.0),
        ParamSpec::count("aoSamples", "AO samples", 4),
        ParamSpec::transfer_function(),
    ]
}

pub(super) fn configure(params: &ParamSet, u: &mut PassUniforms) {
    u.steps = params.uint("steps");
    u.bounces = params.uint("aoSteps");
    u.radius = params.float("aoRadius");
    u.samples = params.uint("aoSamples");
}

pub(super) fn reset<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    clear_accumulation(pass, "lao reset")
}

pub(super) fn generate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [pass.volume(), pass.transfer_function()];
    pass.draw("lao generate", GENERATE, buffers.frame.target()?, &inputs)
}

pub(super) fn integrate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    integrate_mean(pass, "lao integrate")
}

pub(super) fn render<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    render_copy(pass, "lao render")
}
