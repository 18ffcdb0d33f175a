//! Render-target resources.
//!
//! A buffer is an ordered set of same-sized 2D color attachments. Renderers use
//! three of them: a [`SingleBuffer`] for per-frame scratch, a [`DoubleBuffer`]
//! for progressive accumulation and a [`SingleBuffer`] for the final image.

mod double;
mod single;

use crate::backend::{Backend, Filter, TexelFormat, TextureSpec, Wrap};
use crate::error::{Error, Result};

pub use double::DoubleBuffer;
pub use single::SingleBuffer;

/// Format and sampling state of one attachment slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttachmentSpec {
    pub format: TexelFormat,
    pub filter: Filter,
    pub wrap: Wrap,
}

impl AttachmentSpec {
    pub const RGBA32F: Self = Self::nearest(TexelFormat::Rgba32Float);
    pub const R32F: Self = Self::nearest(TexelFormat::R32Float);
    pub const RGBA16F: Self = Self::nearest(TexelFormat::Rgba16Float);
    pub const RGBA8: Self = Self::nearest(TexelFormat::Rgba8Unorm);

    pub const fn nearest(format: TexelFormat) -> Self {
        Self {
            format,
            filter: Filter::Nearest,
            wrap: Wrap::ClampToEdge,
        }
    }

    pub const fn linear(format: TexelFormat) -> Self {
        Self {
            format,
            filter: Filter::Linear,
            wrap: Wrap::ClampToEdge,
        }
    }

    pub fn texture_spec(&self, label: &'static str, resolution: u32) -> TextureSpec {
        TextureSpec::new_2d(label, resolution, resolution, self.format)
            .with_filter(self.filter)
            .with_wrap(self.wrap)
    }
}

pub(crate) fn check_resolution(resolution: u32) -> Result<()> {
    if resolution == 0 {
        return Err(Error::InvalidResolution(resolution));
    }
    Ok(())
}

/// Creates one texture per attachment; on failure the already created ones are released.
pub(crate) fn allocate<B: Backend>(
    backend: &mut B,
    label: &'static str,
    resolution: u32,
    layout: &[AttachmentSpec],
) -> Result<Vec<B::Texture>> {
    check_resolution(resolution)?;
    let mut textures = Vec::with_capacity(layout.len());
    for attachment in layout {
        match backend.create_texture(&attachment.texture_spec(label, resolution)) {
            Ok(texture) => textures.push(texture),
            Err(e) => {
                release(backend, &textures);
                return Err(e);
            }
        }
    }
    Ok(textures)
}

pub(crate) fn release<B: Backend>(backend: &mut B, textures: &[B::Texture]) {
    for texture in textures {
        backend.destroy_texture(texture);
    }
}

pub(crate) fn destroyed(buffer: &'static str) -> Error {
    log::error!("{buffer} used after destroy");
    Error::Destroyed(buffer)
}
