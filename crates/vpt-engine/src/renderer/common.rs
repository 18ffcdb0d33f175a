//! Passes shared by the accumulating variants.

use crate::backend::{Backend, ProgramId};
use crate::error::Result;

use super::Pass;

pub(super) const CLEAR: ProgramId = ProgramId("common.clear");
pub(super) const INTEGRATE_MEAN: ProgramId = ProgramId("common.integrate_mean");
pub(super) const RENDER_COPY: ProgramId = ProgramId("common.render_copy");

/// Zeroes the accumulation write set.
pub(super) fn clear_accumulation<B: Backend>(pass: &mut Pass<'_, B>, label: &'static str) -> Result<()> {
    let buffers = pass.buffers();
    pass.draw(label, CLEAR, buffers.accumulation.target()?, &[])
}

/// Running mean of the frame buffer: `acc + (frame - acc) / (n + 1)`.
pub(super) fn integrate_mean<B: Backend>(pass: &mut Pass<'_, B>, label: &'static str) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [
        buffers.accumulation.attachment(0)?,
        buffers.frame.attachment(0)?,
    ];
    pass.draw(label, INTEGRATE_MEAN, buffers.accumulation.target()?, &inputs)
}

pub(super) fn render_copy<B: Backend>(pass: &mut Pass<'_, B>, label: &'static str) -> Result<()> {
    let buffers = pass.buffers();
    let inputs = [buffers.accumulation.attachment(0)?];
    pass.draw(label, RENDER_COPY, buffers.render.target()?, &inputs)
}
