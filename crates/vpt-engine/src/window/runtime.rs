use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::time::{FrameClock, FrameTime};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "vpt".to_string(),
            initial_size: LogicalSize::new(768.0, 768.0),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and drives `app` from its redraws until the window
    /// closes or the app asks to exit.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    entry: Option<(WindowId, WindowEntry)>,
    failure: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            entry: None,
            failure: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let id = window.id();
        let gpu_init = self.gpu_init.clone();

        let entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed for window")?;

        self.entry = Some((id, entry));
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.failure = Some(error);
        self.entry = None;
        event_loop.exit();
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.entry = None;
        event_loop.exit();
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }
        if let Err(e) = self.create_window_entry(event_loop) {
            self.fail(event_loop, e);
            return;
        }
        if let Some((_, entry)) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);

        // Progressive rendering refines every frame; keep redrawing.
        if let Some((_, entry)) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let app = &mut self.app;
        let Some((id, entry)) = self.entry.as_mut() else {
            return;
        };
        if *id != window_id {
            return;
        }

        let control = entry.with_window(|window| app.on_window_event(WindowCtx { window }, &event));
        if control == AppControl::Exit {
            self.exit(event_loop);
            return;
        }

        match &event {
            WindowEvent::CloseRequested => self.exit(event_loop),

            WindowEvent::Resized(new_size) => {
                entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let new_size = entry.with_window(|w| w.inner_size());
                entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                entry.with_window(|w| w.request_redraw());
            }

            WindowEvent::RedrawRequested => {
                let control = entry.with_mut(|fields| {
                    let time: FrameTime = fields.clock.tick();
                    let mut ctx = FrameCtx {
                        window: WindowCtx {
                            window: fields.window,
                        },
                        gpu: fields.gpu,
                        time,
                    };
                    app.on_frame(&mut ctx)
                });
                if control == AppControl::Exit {
                    self.exit(event_loop);
                }
            }

            _ => {}
        }
    }
}
