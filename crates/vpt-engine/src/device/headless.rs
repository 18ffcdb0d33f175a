use anyhow::{Context, Result};

use super::GpuInit;

/// Device without a surface, for offscreen rendering and export.
pub struct HeadlessGpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl HeadlessGpu {
    pub async fn new(init: GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = request_device(&adapter, &init).await?;
        Ok(Self {
            adapter,
            device,
            queue,
        })
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
}

pub(crate) async fn request_device(
    adapter: &wgpu::Adapter,
    init: &GpuInit,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    let info = adapter.get_info();
    log::info!("using adapter {} ({:?})", info.name, info.backend);

    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("vpt device"),
            required_features: init.features_for(adapter),
            required_limits: init.limits_for(adapter),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")
}
