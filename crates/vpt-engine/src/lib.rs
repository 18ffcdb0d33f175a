//! Progressive GPU volume rendering.
//!
//! A [`RenderingContext`](context::RenderingContext) owns a [`Backend`](backend::Backend),
//! a scalar volume, an environment texture and a camera, and drives one
//! [`Renderer`](renderer::Renderer) and one [`ToneMapper`](tonemap::ToneMapper)
//! per frame. Renderers accumulate a noisy estimate over many frames in
//! double-buffered attachments and restart whenever an input changes.
//!
//! The platform pieces ([`device`], [`window`], [`core`]) follow the usual
//! winit + wgpu split; everything above the backend seam also runs on the
//! [`RecordingBackend`](backend::RecordingBackend), which is how the crate is
//! tested.

pub mod backend;
pub mod buffer;
pub mod camera;
pub mod context;
pub mod core;
pub mod device;
pub mod error;
pub mod export;
pub mod logging;
pub mod params;
pub mod renderer;
pub mod shaders;
pub mod time;
pub mod tonemap;
pub mod transfer;
pub mod volume;
pub mod window;

pub use error::{Error, Result};
