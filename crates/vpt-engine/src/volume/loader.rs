use half::f16;

use crate::backend::{Backend, Filter, TextureRegion, TextureSpec};
use crate::error::{Error, Result};

use super::{Volume, VolumeReader, VoxelFormat};

/// Upload granularity: slabs of roughly this many bytes.
const SLAB_BYTES: usize = 4 << 20;

/// Streams `reader` into a new 3D texture.
///
/// `progress` receives the loaded fraction in `(0, 1]` after every slab; the
/// last call reports exactly `1.0`. On error the partially filled texture is
/// released.
pub fn load_volume<B: Backend, R: VolumeReader + ?Sized>(
    backend: &mut B,
    reader: &mut R,
    filter: Filter,
    mut progress: impl FnMut(f32),
) -> Result<Volume<B::Texture>> {
    let meta = reader.metadata()?;
    let d = meta.dimensions;
    let spec = TextureSpec::new_3d("volume", d.x, d.y, d.z, meta.format.texel_format())
        .with_filter(filter);
    let texture = backend.create_texture(&spec)?;

    let slices_per_slab = (SLAB_BYTES / meta.slice_len().max(1)).max(1) as u32;
    let mut loaded = 0;
    let result = (|| {
        while let Some(slab) = reader.read_slab(slices_per_slab)? {
            if slab.z != loaded || slab.depth == 0 || slab.z + slab.depth > d.z {
                return Err(Error::Volume(format!(
                    "slab at z={} (depth {}) out of order",
                    slab.z, slab.depth
                )));
            }
            let texels = match meta.format {
                VoxelFormat::U8 => slab.data,
                VoxelFormat::U16 => to_half(&slab.data, meta.max_value),
            };
            backend.write_texture(&texture, TextureRegion::slices(&spec, slab.z, slab.depth), &texels)?;
            loaded += slab.depth;
            progress(loaded as f32 / d.z as f32);
        }
        if loaded != d.z {
            return Err(Error::Volume(format!("expected {} slices, got {loaded}", d.z)));
        }
        Ok(())
    })();

    match result {
        Ok(()) => {
            log::info!("loaded volume {}x{}x{} ({:?})", d.x, d.y, d.z, meta.format);
            Ok(Volume::from_parts(meta, texture))
        }
        Err(e) => {
            backend.destroy_texture(&texture);
            Err(e)
        }
    }
}

fn to_half(data: &[u8], max_value: f32) -> Vec<u8> {
    let scale = 1.0 / max_value.max(1.0);
    let values: Vec<f16> = data
        .chunks_exact(2)
        .map(|c| f16::from_f32(u16::from_ne_bytes([c[0], c[1]]) as f32 * scale))
        .collect();
    bytemuck::cast_slice(&values).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordingBackend, TextureHandle};
    use crate::volume::{RawReader, VolumeMetadata};
    use glam::{UVec3, Vec3};
    use std::io::Cursor;

    fn raw(dims: UVec3, format: VoxelFormat, bytes: Vec<u8>) -> RawReader<Cursor<Vec<u8>>> {
        RawReader::new(
            Cursor::new(bytes),
            VolumeMetadata {
                dimensions: dims,
                scale: Vec3::ONE,
                format,
                max_value: 65535.0,
            },
        )
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_one() {
        let mut b = RecordingBackend::new();
        let dims = UVec3::new(1024, 1024, 10);
        let mut reader = raw(dims, VoxelFormat::U8, vec![1; 1024 * 1024 * 10]);

        let mut events = Vec::new();
        let volume = load_volume(&mut b, &mut reader, Filter::Linear, |p| events.push(p)).unwrap();

        assert!(events.len() > 1);
        assert!(events.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(events.last().copied(), Some(1.0));
        assert!(volume.texture().spec().is_3d());
        assert_eq!(volume.texture().spec().depth, 10);
    }

    #[test]
    fn u16_voxels_become_half_floats() {
        let mut b = RecordingBackend::new();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&65535u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        let mut reader = raw(UVec3::new(2, 1, 1), VoxelFormat::U16, bytes);

        let volume = load_volume(&mut b, &mut reader, Filter::Nearest, |_| {}).unwrap();
        assert_eq!(volume.texture().spec().format, crate::backend::TexelFormat::R16Float);
        assert_eq!(volume.filter(), Filter::Nearest);
    }

    #[test]
    fn failed_load_releases_texture() {
        let mut b = RecordingBackend::new();
        let mut reader = raw(UVec3::new(4, 4, 4), VoxelFormat::U8, vec![0; 10]);
        assert!(load_volume(&mut b, &mut reader, Filter::Linear, |_| {}).is_err());
        assert_eq!(b.live_textures(), 0);
    }

    #[test]
    fn to_half_normalizes_by_max_value() {
        let bytes = 4095u16.to_ne_bytes();
        let half = to_half(&bytes, 4095.0);
        let v = f16::from_ne_bytes([half[0], half[1]]);
        assert_eq!(v.to_f32(), 1.0);
    }
}
