//! GPU backend seam.
//!
//! Everything above this module (buffers, renderers, tone mappers, the rendering
//! context) talks to the GPU exclusively through [`Backend`]. A pass is described
//! by a [`DrawCall`]: which program, which textures it samples, which textures it
//! writes, the uniform block and the primitive to draw.
//!
//! Implementations:
//! - [`WgpuBackend`]: real GPU work through wgpu
//! - [`RecordingBackend`]: CPU-side recorder used by tests and dry runs

mod recording;
mod texture;
mod wgpu_backend;

use std::fmt;

use crate::error::Result;

pub use recording::{DrawRecord, RecordedTexture, RecordingBackend, TextureId};
pub use texture::{Dimension, Filter, TexelFormat, TextureRegion, TextureSpec, Wrap};
pub use wgpu_backend::{GpuCapabilities, GpuTexture, WgpuBackend};

/// Texture handle produced by a backend.
///
/// Handles are cheap to clone; cloning never duplicates GPU memory.
pub trait TextureHandle: Clone + fmt::Debug {
    /// Returns the spec the texture was created with.
    fn spec(&self) -> &TextureSpec;

    /// Changes how this handle is sampled; the texel data is unaffected.
    fn set_filter(&mut self, filter: Filter);
}

/// Names one program of the [`ShaderLibrary`](crate::shaders::ShaderLibrary).
///
/// A program is a WGSL module with a `vs_main` (full-screen) or `vs_points`
/// (splatting) vertex entry and an `fs_main` fragment entry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramId(pub &'static str);

impl ProgramId {
    pub fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Geometry issued by a pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Primitive {
    /// One oversized triangle covering the whole target (3 vertices).
    FullscreenTriangle,
    /// One point primitive per vertex; used for per-pixel splatting.
    Points(u32),
}

impl Primitive {
    pub fn vertex_count(self) -> u32 {
        match self {
            Primitive::FullscreenTriangle => 3,
            Primitive::Points(n) => n,
        }
    }
}

/// Color blending applied to every target of a pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Blend {
    Replace,
    /// `dst = src + dst` on all channels.
    Additive,
}

/// What happens to target contents before the pass draws.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LoadOp {
    /// Cleared to transparent black.
    Clear,
    /// Previous contents are kept (needed for additive splatting).
    Keep,
}

/// Where a pass writes.
#[derive(Debug, Clone, Copy)]
pub enum DrawTarget<'a, T> {
    /// Color attachments, in attachment-index order.
    Textures(&'a [T]),
    /// The presentation surface of the current frame.
    Screen,
}

/// Full description of one GPU pass.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a, T> {
    pub label: &'static str,
    pub program: ProgramId,
    pub target: DrawTarget<'a, T>,
    /// Sampled textures, bound in order after the uniform block.
    pub inputs: &'a [&'a T],
    /// Raw bytes of the program's uniform block (may be empty).
    pub uniforms: &'a [u8],
    pub primitive: Primitive,
    pub blend: Blend,
    pub load: LoadOp,
}

impl<'a, T> DrawCall<'a, T> {
    /// A full-screen pass that clears and overwrites its targets.
    pub fn fullscreen(label: &'static str, program: ProgramId, target: DrawTarget<'a, T>) -> Self {
        Self {
            label,
            program,
            target,
            inputs: &[],
            uniforms: &[],
            primitive: Primitive::FullscreenTriangle,
            blend: Blend::Replace,
            load: LoadOp::Clear,
        }
    }

    pub fn inputs(mut self, inputs: &'a [&'a T]) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn uniforms(mut self, uniforms: &'a [u8]) -> Self {
        self.uniforms = uniforms;
        self
    }

    /// Switches to additive point splatting over the kept target contents.
    pub fn splat_points(mut self, count: u32) -> Self {
        self.primitive = Primitive::Points(count);
        self.blend = Blend::Additive;
        self.load = LoadOp::Keep;
        self
    }
}

/// GPU operations needed by the rendering pipeline.
///
/// Commands are recorded in call order and executed in that order on a single
/// queue; `submit` flushes what has been recorded so far.
pub trait Backend {
    type Texture: TextureHandle;

    fn create_texture(&mut self, spec: &TextureSpec) -> Result<Self::Texture>;

    /// Releases GPU memory. The handle must not be used afterwards.
    fn destroy_texture(&mut self, texture: &Self::Texture);

    /// Uploads tightly packed texel data into `region`.
    fn write_texture(
        &mut self,
        texture: &Self::Texture,
        region: TextureRegion,
        data: &[u8],
    ) -> Result<()>;

    /// Clears every texture in `targets` to transparent black.
    fn clear(&mut self, targets: &[Self::Texture]) -> Result<()>;

    fn draw(&mut self, call: &DrawCall<'_, Self::Texture>) -> Result<()>;

    /// Flushes recorded commands to the queue.
    fn submit(&mut self);

    /// Reads an `Rgba8Unorm` texture back as tightly packed RGBA rows.
    fn read_rgba8(&mut self, texture: &Self::Texture) -> Result<Vec<u8>>;

    /// Drains diagnostic messages (GPU errors) collected since the last call.
    fn take_diagnostics(&mut self) -> Vec<String>;
}
