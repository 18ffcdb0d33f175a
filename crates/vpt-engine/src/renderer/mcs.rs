//! Monte Carlo single scattering under the environment light.

use crate::backend::{Backend, ProgramId};
use crate::error::Result;
use crate::params::{ParamSet, ParamSpec};

use super::common::{clear_accumulation, integrate_mean, render_copy, CLEAR, INTEGRATE_MEAN, RENDER_COPY};
use super::{Pass, PassUniforms};

const GENERATE: ProgramId = ProgramId("mcs.generate");

pub(super) const PROGRAMS: &[ProgramId] = &[CLEAR, GENERATE, INTEGRATE_MEAN, RENDER_COPY];
pub(super) const RESET_ON: &[&str] = &["extinction", "steps", "transferFunction"];

pub(super) fn params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::spinner("extinction", "Extinction", 100.0),
        ParamSpec::count("steps", "Steps", 64),
        ParamSpec::transfer_function(),
    ]
}

pub(super) fn configure(params: &ParamSet, u: &mut PassUniforms) {
    u.extinction = params.float("extinction");
    u.steps = params.uint("steps");
}

pub(super) fn reset<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    clear_accumulation(pass, "mcs reset")
}

pub(super) fn generate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [pass.volume(), pass.transfer_function(), pass.environment()];
    pass.draw("mcs generate", GENERATE, buffers.frame.target()?, &inputs)
}

pub(super) fn integrate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    integrate_mean(pass, "mcs integrate")
}

pub(super) fn render<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    render_copy(pass, "mcs render")
}
