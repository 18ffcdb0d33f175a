use serde::{Deserialize, Serialize};

/// Texel formats used by the pipeline.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TexelFormat {
    R8Unorm,
    R16Float,
    R32Float,
    Rgba8Unorm,
    Rgba16Float,
    Rgba32Float,
}

impl TexelFormat {
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            TexelFormat::R8Unorm => 1,
            TexelFormat::R16Float => 2,
            TexelFormat::R32Float | TexelFormat::Rgba8Unorm => 4,
            TexelFormat::Rgba16Float => 8,
            TexelFormat::Rgba32Float => 16,
        }
    }

    /// 32-bit float formats are only filterable with an optional GPU feature.
    pub fn is_float32(self) -> bool {
        matches!(self, TexelFormat::R32Float | TexelFormat::Rgba32Float)
    }

    pub(crate) fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TexelFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
            TexelFormat::R16Float => wgpu::TextureFormat::R16Float,
            TexelFormat::R32Float => wgpu::TextureFormat::R32Float,
            TexelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TexelFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            TexelFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        }
    }
}

/// Sampling filter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
}

impl std::str::FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nearest" => Ok(Filter::Nearest),
            "linear" => Ok(Filter::Linear),
            other => Err(format!("unknown filter `{other}` (expected `nearest` or `linear`)")),
        }
    }
}

/// Address mode on every axis.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Wrap {
    #[default]
    ClampToEdge,
    Repeat,
}

/// Texture dimensionality.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Dimension {
    D2,
    D3,
}

/// Everything needed to allocate a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSpec {
    pub label: &'static str,
    pub dimension: Dimension,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: TexelFormat,
    pub filter: Filter,
    pub wrap: Wrap,
}

impl TextureSpec {
    pub fn new_2d(label: &'static str, width: u32, height: u32, format: TexelFormat) -> Self {
        Self {
            label,
            dimension: Dimension::D2,
            width,
            height,
            depth: 1,
            format,
            filter: Filter::Nearest,
            wrap: Wrap::ClampToEdge,
        }
    }

    pub fn new_3d(
        label: &'static str,
        width: u32,
        height: u32,
        depth: u32,
        format: TexelFormat,
    ) -> Self {
        Self {
            dimension: Dimension::D3,
            depth,
            ..Self::new_2d(label, width, height, format)
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_wrap(mut self, wrap: Wrap) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn is_3d(&self) -> bool {
        self.dimension == Dimension::D3
    }

    /// Size of the whole texture in bytes, tightly packed.
    pub fn byte_len(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.depth as usize
            * self.format.bytes_per_texel() as usize
    }

    pub fn full_region(&self) -> TextureRegion {
        TextureRegion {
            origin: [0, 0, 0],
            size: [self.width, self.height, self.depth],
        }
    }
}

/// Box inside a texture, in texels.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureRegion {
    pub origin: [u32; 3],
    pub size: [u32; 3],
}

impl TextureRegion {
    /// `depth` whole z-slices starting at slice `z`.
    pub fn slices(spec: &TextureSpec, z: u32, depth: u32) -> Self {
        Self {
            origin: [0, 0, z],
            size: [spec.width, spec.height, depth],
        }
    }

    pub fn texel_count(&self) -> usize {
        self.size.iter().map(|&s| s as usize).product()
    }

    /// Whether the region lies inside a texture described by `spec`.
    pub fn fits(&self, spec: &TextureSpec) -> bool {
        let extent = [spec.width, spec.height, spec.depth];
        self.origin
            .iter()
            .zip(self.size.iter())
            .zip(extent.iter())
            .all(|((&o, &s), &e)| o.checked_add(s).is_some_and(|end| end <= e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_len_counts_every_texel() {
        let spec = TextureSpec::new_3d("v", 4, 3, 2, TexelFormat::R16Float);
        assert_eq!(spec.byte_len(), 4 * 3 * 2 * 2);
        assert!(spec.is_3d());
    }

    #[test]
    fn slice_region_fits_inside_texture() {
        let spec = TextureSpec::new_3d("v", 8, 8, 8, TexelFormat::R8Unorm);
        assert!(TextureRegion::slices(&spec, 4, 4).fits(&spec));
        assert!(!TextureRegion::slices(&spec, 5, 4).fits(&spec));
    }

    #[test]
    fn filter_parses_lowercase_names() {
        assert_eq!("nearest".parse::<Filter>(), Ok(Filter::Nearest));
        assert!("cubic".parse::<Filter>().is_err());
    }
}
