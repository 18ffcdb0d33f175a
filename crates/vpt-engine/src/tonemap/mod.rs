//! Tone mappers: HDR render buffer to a displayable RGBA8 image.

mod kind;

use bytemuck::{Pod, Zeroable};

use crate::backend::{Backend, DrawCall, DrawTarget, TextureHandle};
use crate::buffer::{AttachmentSpec, SingleBuffer};
use crate::error::Result;
use crate::params::{ParamSet, ParamSpec, ParamValue};

pub use kind::ToneMapperKind;

/// Uniform block of the `tonemap_common` WGSL mixin.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct ToneMapUniforms {
    pub exposure: f32,
    pub low: f32,
    pub high: f32,
    pub mid: f32,
    pub saturation: f32,
    pub gamma: f32,
    pub white: f32,
    pub contrast: f32,
}

/// Maps the texture of the active renderer into an owned RGBA8 buffer.
#[derive(Debug)]
pub struct ToneMapper<T> {
    kind: ToneMapperKind,
    params: ParamSet,
    output: SingleBuffer<T>,
    source: Option<T>,
}

impl<T: TextureHandle> ToneMapper<T> {
    pub fn new<B: Backend<Texture = T>>(backend: &mut B, kind: ToneMapperKind, resolution: u32) -> Result<Self> {
        Ok(Self {
            kind,
            params: ParamSet::new(kind.params()),
            output: SingleBuffer::new(backend, "tone mapper", resolution, &[AttachmentSpec::RGBA8])?,
            source: None,
        })
    }

    pub fn kind(&self) -> ToneMapperKind {
        self.kind
    }

    pub fn params(&self) -> &[ParamSpec] {
        self.params.specs()
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<()> {
        self.params.set(name, value)?;
        Ok(())
    }

    /// The texture mapped by [`render`](Self::render).
    pub fn set_texture(&mut self, source: T) {
        self.source = Some(source);
    }

    pub fn source(&self) -> Option<&T> {
        self.source.as_ref()
    }

    pub fn resolution(&self) -> u32 {
        self.output.resolution()
    }

    /// Tone-mapped image.
    pub fn texture(&self) -> Result<&T> {
        self.output.attachment(0)
    }

    pub fn set_resolution<B: Backend<Texture = T>>(&mut self, backend: &mut B, resolution: u32) -> Result<()> {
        if resolution == self.output.resolution() {
            return Ok(());
        }
        let output = SingleBuffer::new(backend, "tone mapper", resolution, &[AttachmentSpec::RGBA8])?;
        let mut old = std::mem::replace(&mut self.output, output);
        old.destroy(backend)
    }

    pub fn uniforms(&self) -> ToneMapUniforms {
        let p = &self.params;
        let or = |name: &str, fallback: f32| match p.get(name) {
            Some(_) => p.float(name),
            None => fallback,
        };
        ToneMapUniforms {
            exposure: or("exposure", 1.0),
            low: or("low", 0.0),
            high: or("high", 1.0),
            mid: or("mid", 0.5),
            saturation: or("saturation", 1.0),
            gamma: or("gamma", 2.2),
            white: or("white", 1.0),
            contrast: or("contrast", 1.0),
        }
    }

    /// Maps the tracked texture. Without one there is nothing to draw.
    pub fn render<B: Backend<Texture = T>>(&mut self, backend: &mut B) -> Result<()> {
        let Some(source) = self.source.as_ref() else {
            log::debug!("{} tone mapper has no source texture", self.kind);
            return Ok(());
        };
        let uniforms = self.uniforms();
        let inputs = [source];
        let call = DrawCall::fullscreen("tone map", self.kind.program(), DrawTarget::Textures(self.output.target()?))
            .inputs(&inputs)
            .uniforms(bytemuck::bytes_of(&uniforms));
        backend.draw(&call)
    }

    pub fn destroy<B: Backend<Texture = T>>(&mut self, backend: &mut B) -> Result<()> {
        self.source = None;
        self.output.destroy(backend)
    }
}
