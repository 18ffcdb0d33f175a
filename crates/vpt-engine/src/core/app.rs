use winit::event::WindowEvent;

use super::ctx::{FrameCtx, WindowCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by the host.
pub trait App {
    /// Called for window events, before the runtime handles resize and close.
    fn on_window_event(&mut self, window: WindowCtx<'_>, event: &WindowEvent) -> AppControl {
        let _ = (window, event);
        AppControl::Continue
    }

    /// Called once per presented frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
