/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface. Off by default: tone mappers already write
    /// gamma-encoded values, so an sRGB surface would encode twice.
    pub prefer_srgb: bool,

    pub present_mode: wgpu::PresentMode,

    /// Used if the surface supports it; otherwise the first supported mode.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Features the device must have.
    pub required_features: wgpu::Features,

    /// Features requested only when the adapter offers them. Float32
    /// filtering is one: without it rendering degrades, it does not fail.
    pub optional_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    /// Request the adapter's own limits instead of `required_limits`. The
    /// wide path-tracing accumulation layouts need more color attachment
    /// bytes per sample than the portable defaults.
    pub use_adapter_limits: bool,

    /// Hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            optional_features: wgpu::Features::FLOAT32_FILTERABLE,
            required_limits: wgpu::Limits::default(),
            use_adapter_limits: true,
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Features to request from `adapter`.
    pub(crate) fn features_for(&self, adapter: &wgpu::Adapter) -> wgpu::Features {
        self.required_features | (self.optional_features & adapter.features())
    }

    pub(crate) fn limits_for(&self, adapter: &wgpu::Adapter) -> wgpu::Limits {
        if self.use_adapter_limits {
            adapter.limits()
        } else {
            self.required_limits.clone()
        }
    }
}
