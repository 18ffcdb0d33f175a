use serde::{Deserialize, Serialize};

use crate::backend::Filter;
use crate::renderer::RendererKind;
use crate::tonemap::ToneMapperKind;

/// Initial state of a [`RenderingContext`](super::RenderingContext).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextConfig {
    pub resolution: u32,
    pub filter: Filter,
    pub renderer: RendererKind,
    pub tone_mapper: ToneMapperKind,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            resolution: 512,
            filter: Filter::Linear,
            renderer: RendererKind::Mip,
            tone_mapper: ToneMapperKind::Artistic,
        }
    }
}
