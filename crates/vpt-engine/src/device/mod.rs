//! wgpu device, surface and frame acquisition.
//!
//! [`Gpu`] binds a device to a window surface; [`HeadlessGpu`] is the same
//! device setup without one. Both only create objects: every draw goes through
//! [`WgpuBackend`](crate::backend::WgpuBackend).

mod context;
mod error;
mod frame;
mod headless;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use headless::HeadlessGpu;
pub use init::GpuInit;
