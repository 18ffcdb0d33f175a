use winit::window::Window;

use crate::device::{Gpu, SurfaceErrorAction};
use crate::time::FrameTime;

use super::app::AppControl;

/// The window a callback runs for.
#[derive(Copy, Clone)]
pub struct WindowCtx<'a> {
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Physical size as `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    pub fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub time: FrameTime,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Acquires the surface texture, lets `draw` record and submit work into
    /// it, then presents.
    ///
    /// Transient surface errors skip the frame; fatal ones return
    /// [`AppControl::Exit`]. `draw` receives the surface view and format.
    pub fn present<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&Gpu<'w>, &wgpu::TextureView) -> AppControl,
    {
        let frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => AppControl::Exit,
                    _ => AppControl::Continue,
                };
            }
        };

        let control = draw(&*self.gpu, &frame.view);

        self.window.window.pre_present_notify();
        self.gpu.present(frame);
        control
    }
}
