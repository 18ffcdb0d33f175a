use glam::UVec3;

use crate::renderer::RendererKind;
use crate::tonemap::ToneMapperKind;

/// Notifications queued by the context; drained by the host with
/// [`RenderingContext::drain_events`](super::RenderingContext::drain_events).
#[derive(Debug, Clone, PartialEq)]
pub enum ContextEvent {
    /// Fraction of the volume uploaded, in `(0, 1]`.
    VolumeProgress(f32),
    VolumeLoaded { dimensions: UVec3 },
    RendererChanged(RendererKind),
    ToneMapperChanged(ToneMapperKind),
    /// Fraction of animation frames written, in `(0, 1]`.
    AnimationProgress(f32),
}
