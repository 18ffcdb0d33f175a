//! Host-facing contracts.
//!
//! The runtime owns the platform loop and the GPU; a host implements [`App`]
//! and gets a [`FrameCtx`] once per frame.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
