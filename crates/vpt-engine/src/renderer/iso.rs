//! Isosurface: closest hit over jittered rays, shaded in the render pass.

use crate::backend::{Backend, ProgramId};
use crate::error::Result;
use crate::params::{ParamSet, ParamSpec};

use super::{Pass, PassUniforms};

const RESET: ProgramId = ProgramId("iso.reset");
const GENERATE: ProgramId = ProgramId("iso.generate");
const INTEGRATE: ProgramId = ProgramId("iso.integrate");
const RENDER: ProgramId = ProgramId("iso.render");

pub(super) const PROGRAMS: &[ProgramId] = &[RESET, GENERATE, INTEGRATE, RENDER];
pub(super) const RESET_ON: &[&str] = &["steps", "isovalue"];

pub(super) fn params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::count("steps", "Steps", 64),
        ParamSpec::slider("isovalue", "Isovalue", 0.5, 0.0, 1.0),
        ParamSpec::color("color", "Color", [1.0, 1.0, 1.0]),
        ParamSpec::color("light", "Light direction", [1.0, 1.0, 1.0]),
    ]
}

pub(super) fn configure(params: &ParamSet, u: &mut PassUniforms) {
    let [r, g, b] = params.color("color");
    let [x, y, z] = params.color("light");
    u.steps = params.uint("steps");
    u.threshold = params.float("isovalue");
    u.color = [r, g, b, 1.0];
    u.light = [x, y, z, 0.0];
}

// Marks every pixel as "no hit".
pub(super) fn reset<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    pass.draw("iso reset", RESET, buffers.accumulation.target()?, &[])
}

pub(super) fn generate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [pass.volume()];
    pass.draw("iso generate", GENERATE, buffers.frame.target()?, &inputs)
}

pub(super) fn integrate<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [
        buffers.accumulation.attachment(0)?,
        buffers.frame.attachment(0)?,
    ];
    pass.draw("iso integrate", INTEGRATE, buffers.accumulation.target()?, &inputs)
}

pub(super) fn render<B: Backend>(pass: &mut Pass<'_, B>) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [buffers.accumulation.attachment(0)?, pass.volume()];
    pass.draw("iso render", RENDER, buffers.render.target()?, &inputs)
}
