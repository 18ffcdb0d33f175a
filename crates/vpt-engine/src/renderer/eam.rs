//! Emission-absorption compositing, averaged over jittered slice offsets.

use crate::backend::{Backend, ProgramId};
use crate::error::Result;
use crate::params::{ParamSet, ParamSpec};

use super::common::{clear_accumulation, integrate_mean, render_copy, CLEAR, INTEGRATE_MEAN, RENDER_COPY};
use super::{Pass, PassUniforms, FLAG_JITTER};

const GENERATE: ProgramId = ProgramId("eam.generate");

pub(super) const PROGRAMS: &[ProgramId] = &[CLEAR, GENERATE, INTEGRATE_MEAN, RENDER_COPY];
pub(super) const RESET_ON: &[&str] = &["extinction", "slices", "random", "transferFunction"];

pub(super) fn params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::spinner("extinction", "Extinction", 100.0),
        ParamSpec::count("slices", "Slices", 64),
        ParamSpec::checkbox("random", "Random", true),
        ParamSpec::transfer_function(),
    ]
}

pub(super) fn configure(params: &ParamSet, u: &mut PassUniforms) {
    u.extinction = params.float("extinction");
    u.slices = params.uint("slices");
    if params.flag("random") {
        u.flags |= FLAG_JITTER;
    }
}

pub(super) fn reset<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    clear_accumulation(pass, "eam reset")
}

pub(super) fn generate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [pass.volume(), pass.transfer_function()];
    pass.draw("eam generate", GENERATE, buffers.frame.target()?, &inputs)
}

pub(super) fn integrate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    integrate_mean(pass, "eam integrate")
}

pub(super) fn render<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    render_copy(pass, "eam render")
}
