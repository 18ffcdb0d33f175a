/// One acquired surface texture.
///
/// Short-lived: holding it blocks acquisition of the next frame. Commands
/// are recorded by the backend, not here.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}
