use std::sync::Arc;

use anyhow::Result;
use vpt_engine::backend::WgpuBackend;
use vpt_engine::context::RenderingContext;
use vpt_engine::core::{App, AppControl, FrameCtx, WindowCtx};
use vpt_engine::device::Gpu;
use vpt_engine::renderer::RendererKind;
use vpt_engine::shaders::ShaderLibrary;
use vpt_engine::time::Ticker;
use vpt_engine::tonemap::ToneMapperKind;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::config::StudioConfig;
use crate::scene::{log_events, open_context};

type Context = RenderingContext<WgpuBackend>;

/// Interactive host: orbit with the left mouse button, zoom with the wheel,
/// `1`..`9` pick a renderer, `T` cycles tone mappers, `Esc` quits.
pub struct Viewer {
    config: StudioConfig,
    shaders: Arc<ShaderLibrary>,
    context: Option<Context>,
    ticker: Ticker<Context>,
    dragging: bool,
    cursor: Option<(f64, f64)>,
}

impl Viewer {
    pub fn new(config: StudioConfig, shaders: ShaderLibrary) -> Self {
        Self {
            config,
            shaders: Arc::new(shaders),
            context: None,
            ticker: Ticker::new(),
            dragging: false,
            cursor: None,
        }
    }

    /// The context needs the window's device, so it is created on the first frame.
    fn open(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let info = gpu.adapter_info();
        log::info!("{} ({:?})", info.name, info.backend);

        let backend = WgpuBackend::new(gpu.device().clone(), gpu.queue().clone(), self.shaders.clone());
        let mut context = open_context(backend, &self.config)?;
        context.start_rendering(&mut self.ticker);
        self.context = Some(context);
        Ok(())
    }

    fn on_key(context: &mut Context, key: KeyCode) -> AppControl {
        let result = match key {
            KeyCode::Escape => return AppControl::Exit,
            KeyCode::KeyT => {
                let all = ToneMapperKind::ALL;
                let current = all
                    .iter()
                    .position(|k| *k == context.tone_mapper().kind())
                    .unwrap_or(0);
                context.set_tone_mapper(all[(current + 1) % all.len()])
            }
            other => match digit(other).and_then(|d| RendererKind::ALL.get(d)) {
                Some(kind) if *kind != context.renderer().kind() => context.set_renderer(*kind),
                _ => Ok(()),
            },
        };
        if let Err(e) = result {
            log::error!("{e}");
        }
        AppControl::Continue
    }
}

fn digit(key: KeyCode) -> Option<usize> {
    const DIGITS: [KeyCode; 9] = [
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
        KeyCode::Digit5,
        KeyCode::Digit6,
        KeyCode::Digit7,
        KeyCode::Digit8,
        KeyCode::Digit9,
    ];
    DIGITS.iter().position(|k| *k == key)
}

impl App for Viewer {
    fn on_window_event(&mut self, _window: WindowCtx<'_>, event: &WindowEvent) -> AppControl {
        let Some(context) = self.context.as_mut() else {
            return AppControl::Continue;
        };

        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.dragging = *state == ElementState::Pressed,

            WindowEvent::CursorMoved { position, .. } => {
                let now = (position.x, position.y);
                if let (true, Some((x, y))) = (self.dragging, self.cursor) {
                    context.animator_mut().drag((now.0 - x) as f32, (now.1 - y) as f32);
                    context.animate_camera(0.0);
                }
                self.cursor = Some(now);
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
                context.animator_mut().zoom(lines);
                context.animate_camera(0.0);
            }

            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed && !event.repeat => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    return Self::on_key(context, key);
                }
            }

            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.context.is_none() {
            if let Err(e) = self.open(ctx.gpu) {
                log::error!("{e:#}");
                return AppControl::Exit;
            }
        }
        let (ticker, Some(context)) = (&mut self.ticker, self.context.as_mut()) else {
            return AppControl::Exit;
        };

        let (width, height) = ctx.window.size();
        context.resize(width, height);

        ctx.present(|gpu, view| {
            context
                .backend_mut()
                .set_screen(Some((view.clone(), gpu.surface_format())));
            ticker.tick(context);
            context.backend_mut().set_screen(None);
            log_events(context);
            AppControl::Continue
        })
    }
}
