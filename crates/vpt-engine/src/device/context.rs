use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::headless::request_device;
use super::surface;
use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// Device, queue and the configured surface of one window.
pub struct Gpu<'w> {
    surface: wgpu::Surface<'w>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
}

impl<'w> Gpu<'w> {
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = request_device(&adapter, &init).await?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = surface::choose_alpha_mode(&caps, init.alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);
        log::info!("surface {format:?} {}x{}", size.width, size.height);

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            config,
            size,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        surface::apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            new_size,
        );
    }

    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok(GpuFrame {
            surface_texture,
            view,
        })
    }

    /// Presents a frame whose commands were already submitted.
    pub fn present(&self, frame: GpuFrame) {
        drop(frame.view);
        frame.surface_texture.present();
    }

    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        surface::map_surface_error(&self.surface, &self.device, &self.config, self.size, err)
    }
}
