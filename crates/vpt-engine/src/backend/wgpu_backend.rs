use std::collections::HashMap;
use std::sync::{mpsc, Arc};

use wgpu::util::DeviceExt;

use crate::error::{Error, Result};
use crate::shaders::ShaderLibrary;

use super::{
    Backend, Blend, DrawCall, DrawTarget, Filter, LoadOp, Primitive, ProgramId, TextureHandle,
    TextureRegion, TextureSpec, TexelFormat, Wrap,
};

/// Texture handle of the [`WgpuBackend`].
#[derive(Debug, Clone)]
pub struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    spec: TextureSpec,
}

impl GpuTexture {
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

impl TextureHandle for GpuTexture {
    fn spec(&self) -> &TextureSpec {
        &self.spec
    }

    fn set_filter(&mut self, filter: Filter) {
        self.spec.filter = filter;
    }
}

/// Optional device capabilities the pipeline relies on.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GpuCapabilities {
    /// Linear filtering of `R32Float` / `Rgba32Float` textures.
    pub float32_filterable: bool,
    pub max_color_attachment_bytes_per_sample: u32,
}

impl GpuCapabilities {
    pub fn of(device: &wgpu::Device) -> Self {
        Self {
            float32_filterable: device.features().contains(wgpu::Features::FLOAT32_FILTERABLE),
            max_color_attachment_bytes_per_sample: device
                .limits()
                .max_color_attachment_bytes_per_sample,
        }
    }

    /// Whether a draw into `formats` fits the per-sample attachment budget.
    pub fn fits_attachments(&self, formats: &[TexelFormat]) -> bool {
        let bytes: u32 = formats.iter().map(|f| f.bytes_per_texel()).sum();
        bytes <= self.max_color_attachment_bytes_per_sample
    }
}

struct Screen {
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct InputKind {
    is_3d: bool,
    filterable: bool,
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    program: ProgramId,
    targets: Vec<wgpu::TextureFormat>,
    inputs: Vec<InputKind>,
    points: bool,
    blend: Blend,
}

#[derive(Clone)]
struct CachedPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

/// [`Backend`] executing passes on a wgpu device.
///
/// Pipelines, shader modules and samplers are created on first use and cached.
/// Commands are recorded into one encoder that is flushed on [`Backend::submit`]
/// (and before every queue write, so uploads stay ordered with draws).
///
/// A validation error scope is kept open between submits; errors caught in it
/// are returned by [`Backend::take_diagnostics`].
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    shaders: Arc<ShaderLibrary>,
    capabilities: GpuCapabilities,

    encoder: Option<wgpu::CommandEncoder>,
    screen: Option<Screen>,

    modules: HashMap<ProgramId, wgpu::ShaderModule>,
    pipelines: HashMap<PipelineKey, CachedPipeline>,
    samplers: HashMap<(Filter, Wrap), wgpu::Sampler>,

    error_scope: Option<wgpu::ErrorScopeGuard>,
    diagnostics: Vec<String>,
    warned_unfilterable: bool,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, shaders: Arc<ShaderLibrary>) -> Self {
        let capabilities = GpuCapabilities::of(&device);
        if !capabilities.float32_filterable {
            log::error!(
                "GPU lacks FLOAT32_FILTERABLE; 32-bit float textures are sampled with nearest filtering"
            );
        }
        let error_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        Self {
            device,
            queue,
            shaders,
            capabilities,
            encoder: None,
            screen: None,
            modules: HashMap::new(),
            pipelines: HashMap::new(),
            samplers: HashMap::new(),
            error_scope: Some(error_scope),
            diagnostics: Vec::new(),
            warned_unfilterable: false,
        }
    }

    pub fn capabilities(&self) -> GpuCapabilities {
        self.capabilities
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Sets (or clears) the presentation target used by [`DrawTarget::Screen`].
    ///
    /// The host sets this to the acquired surface view before rendering a frame
    /// and clears it after submitting.
    pub fn set_screen(&mut self, target: Option<(wgpu::TextureView, wgpu::TextureFormat)>) {
        self.screen = target.map(|(view, format)| Screen { view, format });
    }

    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        let device = &self.device;
        self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("vpt encoder"),
            })
        })
    }

    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn filterable(&mut self, format: TexelFormat) -> bool {
        if !format.is_float32() || self.capabilities.float32_filterable {
            return true;
        }
        if !self.warned_unfilterable {
            log::debug!("sampling {format:?} without filtering");
            self.warned_unfilterable = true;
        }
        false
    }

    fn sampler(&mut self, filter: Filter, wrap: Wrap) -> wgpu::Sampler {
        let device = &self.device;
        self.samplers
            .entry((filter, wrap))
            .or_insert_with(|| {
                let address_mode = match wrap {
                    Wrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
                    Wrap::Repeat => wgpu::AddressMode::Repeat,
                };
                let filter_mode = match filter {
                    Filter::Nearest => wgpu::FilterMode::Nearest,
                    Filter::Linear => wgpu::FilterMode::Linear,
                };
                device.create_sampler(&wgpu::SamplerDescriptor {
                    label: Some("vpt sampler"),
                    address_mode_u: address_mode,
                    address_mode_v: address_mode,
                    address_mode_w: address_mode,
                    mag_filter: filter_mode,
                    min_filter: filter_mode,
                    ..Default::default()
                })
            })
            .clone()
    }

    fn module(&mut self, program: ProgramId) -> Result<wgpu::ShaderModule> {
        if let Some(module) = self.modules.get(&program) {
            return Ok(module.clone());
        }
        let source = self.shaders.source(program)?;
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(program.name()),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        self.modules.insert(program, module.clone());
        Ok(module)
    }

    fn pipeline(&mut self, key: &PipelineKey) -> Result<CachedPipeline> {
        if let Some(cached) = self.pipelines.get(key) {
            return Ok(cached.clone());
        }
        log::debug!("creating pipeline for `{}` -> {:?}", key.program, key.targets);
        let module = self.module(key.program)?;

        let visibility = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for (i, input) in key.inputs.iter().enumerate() {
            let binding = 1 + 2 * i as u32;
            entries.push(wgpu::BindGroupLayoutEntry {
                binding,
                visibility,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float {
                        filterable: input.filterable,
                    },
                    view_dimension: if input.is_3d {
                        wgpu::TextureViewDimension::D3
                    } else {
                        wgpu::TextureViewDimension::D2
                    },
                    multisampled: false,
                },
                count: None,
            });
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: binding + 1,
                visibility,
                ty: wgpu::BindingType::Sampler(if input.filterable {
                    wgpu::SamplerBindingType::Filtering
                } else {
                    wgpu::SamplerBindingType::NonFiltering
                }),
                count: None,
            });
        }

        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("vpt pass bgl"),
                    entries: &entries,
                });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("vpt pass pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

        let blend = match key.blend {
            Blend::Replace => None,
            Blend::Additive => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
        };
        let targets: Vec<Option<wgpu::ColorTargetState>> = key
            .targets
            .iter()
            .map(|&format| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(key.program.name()),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some(if key.points { "vs_points" } else { "vs_main" }),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &targets,
                }),
                primitive: wgpu::PrimitiveState {
                    topology: if key.points {
                        wgpu::PrimitiveTopology::PointList
                    } else {
                        wgpu::PrimitiveTopology::TriangleList
                    },
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        let cached = CachedPipeline {
            pipeline,
            bind_group_layout,
        };
        self.pipelines.insert(key.clone(), cached.clone());
        Ok(cached)
    }

    fn collect_errors(&mut self) {
        if let Some(error) = self
            .error_scope
            .take()
            .and_then(|scope| pollster::block_on(scope.pop()))
        {
            self.diagnostics.push(error.to_string());
        }
        self.error_scope = Some(self.device.push_error_scope(wgpu::ErrorFilter::Validation));
    }
}

fn color_attachment(view: &wgpu::TextureView, load: LoadOp) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: match load {
                LoadOp::Clear => wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                LoadOp::Keep => wgpu::LoadOp::Load,
            },
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}

impl Backend for WgpuBackend {
    type Texture = GpuTexture;

    fn create_texture(&mut self, spec: &TextureSpec) -> Result<GpuTexture> {
        if spec.width == 0 || spec.height == 0 || spec.depth == 0 {
            return Err(Error::Gpu(format!("texture `{}` has zero extent", spec.label)));
        }
        let (dimension, usage) = if spec.is_3d() {
            (
                wgpu::TextureDimension::D3,
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            )
        } else {
            (
                wgpu::TextureDimension::D2,
                wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC,
            )
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(spec.label),
            size: wgpu::Extent3d {
                width: spec.width,
                height: spec.height,
                depth_or_array_layers: spec.depth,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension,
            format: spec.format.to_wgpu(),
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(GpuTexture {
            texture,
            view,
            spec: spec.clone(),
        })
    }

    fn destroy_texture(&mut self, texture: &GpuTexture) {
        // Recorded passes may still reference it.
        self.flush();
        texture.texture.destroy();
    }

    fn write_texture(&mut self, texture: &GpuTexture, region: TextureRegion, data: &[u8]) -> Result<()> {
        let spec = &texture.spec;
        let bpt = spec.format.bytes_per_texel();
        if !region.fits(spec) {
            return Err(Error::Gpu(format!("write outside of `{}`", spec.label)));
        }
        if data.len() != region.texel_count() * bpt as usize {
            return Err(Error::Gpu(format!(
                "write to `{}` expected {} bytes, got {}",
                spec.label,
                region.texel_count() * bpt as usize,
                data.len()
            )));
        }

        // Queue writes execute before the next submitted command buffer.
        self.flush();

        let [x, y, z] = region.origin;
        let [width, height, depth] = region.size;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * bpt),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: depth,
            },
        );
        Ok(())
    }

    fn clear(&mut self, targets: &[GpuTexture]) -> Result<()> {
        let encoder = self.encoder();
        for t in targets {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vpt clear pass"),
                color_attachments: &[color_attachment(&t.view, LoadOp::Clear)],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_, GpuTexture>) -> Result<()> {
        let (views, formats): (Vec<wgpu::TextureView>, Vec<wgpu::TextureFormat>) = match call.target {
            DrawTarget::Textures(textures) => {
                let formats: Vec<TexelFormat> = textures.iter().map(|t| t.spec.format).collect();
                if !self.capabilities.fits_attachments(&formats) {
                    log::error!(
                        "pass `{}` writes {} bytes per sample, device allows {}",
                        call.label,
                        formats.iter().map(|f| f.bytes_per_texel()).sum::<u32>(),
                        self.capabilities.max_color_attachment_bytes_per_sample
                    );
                }
                textures
                    .iter()
                    .map(|t| (t.view.clone(), t.spec.format.to_wgpu()))
                    .unzip()
            }
            DrawTarget::Screen => match &self.screen {
                Some(screen) => (vec![screen.view.clone()], vec![screen.format]),
                None => {
                    log::debug!("pass `{}` skipped: no screen target", call.label);
                    return Ok(());
                }
            },
        };
        if views.is_empty() {
            return Err(Error::Gpu(format!("pass `{}` has no targets", call.label)));
        }

        let mut inputs = Vec::with_capacity(call.inputs.len());
        let mut samplers = Vec::with_capacity(call.inputs.len());
        for t in call.inputs {
            let filterable = self.filterable(t.spec.format);
            let filter = if filterable { t.spec.filter } else { Filter::Nearest };
            inputs.push(InputKind {
                is_3d: t.spec.is_3d(),
                filterable,
            });
            samplers.push(self.sampler(filter, t.spec.wrap));
        }

        let key = PipelineKey {
            program: call.program,
            targets: formats,
            inputs,
            points: matches!(call.primitive, Primitive::Points(_)),
            blend: call.blend,
        };
        let cached = self.pipeline(&key)?;

        // Uniform blocks are sized in 16-byte units on the shader side.
        let mut uniforms = call.uniforms.to_vec();
        uniforms.resize(call.uniforms.len().max(16).next_multiple_of(16), 0);
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("vpt pass uniforms"),
                contents: &uniforms,
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }];
        for (i, (t, sampler)) in call.inputs.iter().zip(samplers.iter()).enumerate() {
            let binding = 1 + 2 * i as u32;
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(&t.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: binding + 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(call.label),
            layout: &cached.bind_group_layout,
            entries: &entries,
        });

        let attachments: Vec<_> = views.iter().map(|v| color_attachment(v, call.load)).collect();
        let encoder = self.encoder();
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(call.label),
            color_attachments: &attachments,
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(&cached.pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.draw(0..call.primitive.vertex_count(), 0..1);
        Ok(())
    }

    fn submit(&mut self) {
        self.flush();
        self.collect_errors();
    }

    fn read_rgba8(&mut self, texture: &GpuTexture) -> Result<Vec<u8>> {
        let spec = &texture.spec;
        if spec.format != TexelFormat::Rgba8Unorm || spec.is_3d() {
            return Err(Error::Gpu(format!(
                "readback of `{}` requires a 2D Rgba8Unorm texture",
                spec.label
            )));
        }

        let tight_row = spec.width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = tight_row.div_ceil(align) * align;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vpt readback"),
            size: padded_row as u64 * spec.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        self.encoder().copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(spec.height),
                },
            },
            wgpu::Extent3d {
                width: spec.width,
                height: spec.height,
                depth_or_array_layers: 1,
            },
        );
        self.submit();

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
        receiver
            .recv()
            .map_err(|_| Error::Gpu("readback channel closed".into()))?
            .map_err(|e| Error::Gpu(format!("readback failed: {e}")))?;

        let mut pixels = Vec::with_capacity((tight_row * spec.height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded_row as usize) {
                pixels.extend_from_slice(&row[..tight_row as usize]);
            }
        }
        staging.unmap();
        Ok(pixels)
    }

    fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }
}
