//! Volume data: streaming readers and the GPU-resident volume.

mod loader;
mod readers;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use glam::{UVec3, Vec3};

use crate::backend::{Backend, Filter, TexelFormat, TextureHandle, TextureSpec};
use crate::error::{Error, Result};

pub use loader::load_volume;
pub use readers::{DatReader, RawReader, VolReader};

/// Storage of one voxel in a reader's slabs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VoxelFormat {
    U8,
    /// Native-endian `u16`, normalized by [`VolumeMetadata::max_value`].
    U16,
}

impl VoxelFormat {
    pub fn bytes(self) -> usize {
        match self {
            VoxelFormat::U8 => 1,
            VoxelFormat::U16 => 2,
        }
    }

    pub fn texel_format(self) -> TexelFormat {
        match self {
            VoxelFormat::U8 => TexelFormat::R8Unorm,
            VoxelFormat::U16 => TexelFormat::R16Float,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VolumeMetadata {
    pub dimensions: UVec3,
    pub scale: Vec3,
    pub format: VoxelFormat,
    /// Raw value mapped to 1.0 (only used for `U16`).
    pub max_value: f32,
}

impl VolumeMetadata {
    pub fn slice_len(&self) -> usize {
        self.dimensions.x as usize * self.dimensions.y as usize * self.format.bytes()
    }
}

/// A run of consecutive z-slices.
#[derive(Debug, Clone)]
pub struct Slab {
    pub z: u32,
    pub depth: u32,
    pub data: Vec<u8>,
}

/// Streams a volume: metadata first, then slabs of whole z-slices in order.
pub trait VolumeReader {
    fn metadata(&mut self) -> Result<VolumeMetadata>;

    /// Reads up to `max_slices` slices; `None` once every slice was returned.
    fn read_slab(&mut self, max_slices: u32) -> Result<Option<Slab>>;
}

impl<R: VolumeReader + ?Sized> VolumeReader for Box<R> {
    fn metadata(&mut self) -> Result<VolumeMetadata> {
        (**self).metadata()
    }

    fn read_slab(&mut self, max_slices: u32) -> Result<Option<Slab>> {
        (**self).read_slab(max_slices)
    }
}

/// Picks a reader by file extension (`.vol`, `.dat`).
pub fn open_volume(path: &Path) -> Result<Box<dyn VolumeReader>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let open = || -> Result<BufReader<File>> { Ok(BufReader::new(File::open(path)?)) };
    match extension.as_deref() {
        Some("vol") => Ok(Box::new(VolReader::new(open()?))),
        Some("dat") => Ok(Box::new(DatReader::new(open()?))),
        _ => Err(Error::Volume(format!(
            "unknown volume format `{}` (expected .vol or .dat)",
            path.display()
        ))),
    }
}

/// Scalar volume resident on the GPU as a 3D texture.
#[derive(Debug, Clone)]
pub struct Volume<T> {
    metadata: VolumeMetadata,
    texture: T,
}

impl<T: TextureHandle> Volume<T> {
    /// 1×1×1 zero volume, bound while nothing is loaded.
    pub fn empty<B: Backend<Texture = T>>(backend: &mut B, filter: Filter) -> Result<Self> {
        let spec = TextureSpec::new_3d("volume", 1, 1, 1, TexelFormat::R8Unorm).with_filter(filter);
        let texture = backend.create_texture(&spec)?;
        backend.write_texture(&texture, spec.full_region(), &[0])?;
        Ok(Self {
            metadata: VolumeMetadata {
                dimensions: UVec3::ONE,
                scale: Vec3::ONE,
                format: VoxelFormat::U8,
                max_value: 255.0,
            },
            texture,
        })
    }

    pub(crate) fn from_parts(metadata: VolumeMetadata, texture: T) -> Self {
        Self { metadata, texture }
    }

    pub fn metadata(&self) -> &VolumeMetadata {
        &self.metadata
    }

    pub fn texture(&self) -> &T {
        &self.texture
    }

    pub fn filter(&self) -> Filter {
        self.texture.spec().filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.texture.set_filter(filter);
    }

    pub fn destroy<B: Backend<Texture = T>>(&self, backend: &mut B) {
        backend.destroy_texture(&self.texture);
    }
}
