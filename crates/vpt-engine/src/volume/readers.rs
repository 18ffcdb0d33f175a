use std::io::{ErrorKind, Read};

use glam::{UVec3, Vec3};
use nom::{
    bytes::complete::take,
    number::complete::{be_f32, be_u32, le_u16},
    sequence::tuple,
    IResult,
};

use crate::error::{Error, Result};

use super::{Slab, VolumeMetadata, VolumeReader, VoxelFormat};

// ── header parsers ────────────────────────────────────────────────────────

const VOL_HEADER_LEN: usize = 28;
const DAT_HEADER_LEN: usize = 6;

/// Largest raw value in 12-bit `.dat` scans.
const DAT_MAX_VALUE: f32 = 4095.0;

// Big-endian u32 dimensions, 4 bytes of padding, big-endian f32 scale.
fn vol_header(s: &[u8]) -> IResult<&[u8], (UVec3, Vec3)> {
    let (s, ((x, y, z), _, (sx, sy, sz))) = tuple((
        tuple((be_u32, be_u32, be_u32)),
        take(4_u8),
        tuple((be_f32, be_f32, be_f32)),
    ))(s)?;
    Ok((s, (UVec3::new(x, y, z), Vec3::new(sx, sy, sz))))
}

// Little-endian u16 dimensions.
fn dat_header(s: &[u8]) -> IResult<&[u8], UVec3> {
    let (s, (x, y, z)) = tuple((le_u16, le_u16, le_u16))(s)?;
    Ok((s, UVec3::new(x as u32, y as u32, z as u32)))
}

fn read_header<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut header = vec![0; len];
    reader.read_exact(&mut header).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => Error::Volume("file too short for header".into()),
        _ => Error::Io(e),
    })?;
    Ok(header)
}

/// Per-axis limit of a 3D texture under default device limits.
const MAX_DIMENSION: u32 = 2048;

fn check_dimensions(dimensions: UVec3, format: VoxelFormat) -> Result<()> {
    if dimensions.min_element() == 0 {
        return Err(Error::Volume(format!("empty volume {dimensions}")));
    }
    if dimensions.max_element() > MAX_DIMENSION {
        return Err(Error::Volume(format!(
            "volume {dimensions} exceeds {MAX_DIMENSION} voxels per axis"
        )));
    }
    let bytes = (dimensions.x as usize)
        .checked_mul(dimensions.y as usize)
        .and_then(|n| n.checked_mul(dimensions.z as usize))
        .and_then(|n| n.checked_mul(format.bytes()));
    if bytes.is_none() {
        return Err(Error::Volume(format!("volume {dimensions} is too large")));
    }
    Ok(())
}

// ── slab streaming ────────────────────────────────────────────────────────

/// Slice cursor shared by every reader.
struct Slices<R> {
    reader: R,
    metadata: Option<VolumeMetadata>,
    next_z: u32,
}

impl<R: Read> Slices<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            metadata: None,
            next_z: 0,
        }
    }

    fn read_slab(
        &mut self,
        max_slices: u32,
        convert: impl FnOnce(&mut Vec<u8>),
    ) -> Result<Option<Slab>> {
        let Some(meta) = self.metadata else {
            return Err(Error::Volume("metadata must be read before slabs".into()));
        };
        if self.next_z >= meta.dimensions.z {
            return Ok(None);
        }

        let depth = max_slices.max(1).min(meta.dimensions.z - self.next_z);
        let mut data = vec![0; meta.slice_len() * depth as usize];
        self.reader.read_exact(&mut data).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => Error::Volume(format!(
                "truncated volume: expected {} slices, data ends within slice {}",
                meta.dimensions.z, self.next_z
            )),
            _ => Error::Io(e),
        })?;
        convert(&mut data);

        let slab = Slab {
            z: self.next_z,
            depth,
            data,
        };
        self.next_z += depth;
        Ok(Some(slab))
    }
}

fn le_u16_to_native(data: &mut Vec<u8>) {
    for pair in data.chunks_exact_mut(2) {
        let v = u16::from_le_bytes([pair[0], pair[1]]);
        pair.copy_from_slice(&v.to_ne_bytes());
    }
}

// ── readers ───────────────────────────────────────────────────────────────

/// `.vol`: 28-byte big-endian header followed by `u8` voxels.
pub struct VolReader<R> {
    slices: Slices<R>,
}

impl<R: Read> VolReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            slices: Slices::new(reader),
        }
    }
}

impl<R: Read> VolumeReader for VolReader<R> {
    fn metadata(&mut self) -> Result<VolumeMetadata> {
        if let Some(meta) = self.slices.metadata {
            return Ok(meta);
        }
        let header = read_header(&mut self.slices.reader, VOL_HEADER_LEN)?;
        let (_, (dimensions, scale)) =
            vol_header(&header).map_err(|_| Error::Volume("malformed .vol header".into()))?;
        check_dimensions(dimensions, VoxelFormat::U8)?;

        let meta = VolumeMetadata {
            dimensions,
            scale,
            format: VoxelFormat::U8,
            max_value: 255.0,
        };
        self.slices.metadata = Some(meta);
        Ok(meta)
    }

    fn read_slab(&mut self, max_slices: u32) -> Result<Option<Slab>> {
        self.slices.read_slab(max_slices, |_| {})
    }
}

/// `.dat`: three little-endian `u16` dimensions followed by little-endian
/// 12-bit `u16` voxels.
pub struct DatReader<R> {
    slices: Slices<R>,
}

impl<R: Read> DatReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            slices: Slices::new(reader),
        }
    }
}

impl<R: Read> VolumeReader for DatReader<R> {
    fn metadata(&mut self) -> Result<VolumeMetadata> {
        if let Some(meta) = self.slices.metadata {
            return Ok(meta);
        }
        let header = read_header(&mut self.slices.reader, DAT_HEADER_LEN)?;
        let (_, dimensions) =
            dat_header(&header).map_err(|_| Error::Volume("malformed .dat header".into()))?;
        check_dimensions(dimensions, VoxelFormat::U16)?;

        let meta = VolumeMetadata {
            dimensions,
            scale: Vec3::ONE,
            format: VoxelFormat::U16,
            max_value: DAT_MAX_VALUE,
        };
        self.slices.metadata = Some(meta);
        Ok(meta)
    }

    fn read_slab(&mut self, max_slices: u32) -> Result<Option<Slab>> {
        self.slices.read_slab(max_slices, le_u16_to_native)
    }
}

/// Headerless voxels with caller-supplied metadata. `U16` data is little-endian.
pub struct RawReader<R> {
    slices: Slices<R>,
    metadata: VolumeMetadata,
}

impl<R: Read> RawReader<R> {
    pub fn new(reader: R, metadata: VolumeMetadata) -> Self {
        Self {
            slices: Slices::new(reader),
            metadata,
        }
    }
}

impl<R: Read> VolumeReader for RawReader<R> {
    fn metadata(&mut self) -> Result<VolumeMetadata> {
        check_dimensions(self.metadata.dimensions, self.metadata.format)?;
        self.slices.metadata = Some(self.metadata);
        Ok(self.metadata)
    }

    fn read_slab(&mut self, max_slices: u32) -> Result<Option<Slab>> {
        match self.metadata.format {
            VoxelFormat::U8 => self.slices.read_slab(max_slices, |_| {}),
            VoxelFormat::U16 => self.slices.read_slab(max_slices, le_u16_to_native),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn vol_bytes(dims: [u32; 3], scale: [f32; 3], voxels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for d in dims {
            bytes.extend_from_slice(&d.to_be_bytes());
        }
        bytes.extend_from_slice(&[0; 4]);
        for s in scale {
            bytes.extend_from_slice(&s.to_be_bytes());
        }
        bytes.extend_from_slice(voxels);
        bytes
    }

    #[test]
    fn vol_header_is_big_endian() {
        let bytes = vol_bytes([2, 3, 4], [1.0, 0.5, 2.0], &[7; 24]);
        let mut r = VolReader::new(Cursor::new(bytes));
        let meta = r.metadata().unwrap();
        assert_eq!(meta.dimensions, UVec3::new(2, 3, 4));
        assert_eq!(meta.scale, Vec3::new(1.0, 0.5, 2.0));
        assert_eq!(meta.format, VoxelFormat::U8);
    }

    #[test]
    fn slabs_cover_every_slice_once() {
        let bytes = vol_bytes([2, 2, 5], [1.0; 3], &(0..20).collect::<Vec<u8>>());
        let mut r = VolReader::new(Cursor::new(bytes));
        r.metadata().unwrap();

        let mut zs = Vec::new();
        while let Some(slab) = r.read_slab(2).unwrap() {
            assert_eq!(slab.data.len(), 4 * slab.depth as usize);
            zs.push((slab.z, slab.depth));
        }
        assert_eq!(zs, vec![(0, 2), (2, 2), (4, 1)]);
    }

    #[test]
    fn truncated_data_is_an_error() {
        let bytes = vol_bytes([2, 2, 2], [1.0; 3], &[0; 5]);
        let mut r = VolReader::new(Cursor::new(bytes));
        r.metadata().unwrap();
        assert!(matches!(r.read_slab(8), Err(Error::Volume(_))));
    }

    #[test]
    fn short_header_is_an_error() {
        let mut r = DatReader::new(Cursor::new(vec![1, 0, 1]));
        assert!(matches!(r.metadata(), Err(Error::Volume(_))));
    }

    #[test]
    fn dat_voxels_are_little_endian_u16() {
        let mut bytes = vec![1, 0, 1, 0, 2, 0];
        bytes.extend_from_slice(&0x0fffu16.to_le_bytes());
        bytes.extend_from_slice(&0x0001u16.to_le_bytes());
        let mut r = DatReader::new(Cursor::new(bytes));
        let meta = r.metadata().unwrap();
        assert_eq!(meta.dimensions, UVec3::new(1, 1, 2));
        assert_eq!(meta.max_value, DAT_MAX_VALUE);

        let slab = r.read_slab(4).unwrap().unwrap();
        let values: Vec<u16> = slab
            .data
            .chunks_exact(2)
            .map(|c| u16::from_ne_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(values, vec![0x0fff, 1]);
    }

    #[test]
    fn oversized_header_is_rejected_before_allocating() {
        let bytes = vol_bytes([u32::MAX, u32::MAX, 1], [1.0; 3], &[]);
        let mut r = VolReader::new(Cursor::new(bytes));
        assert!(matches!(r.metadata(), Err(Error::Volume(_))));
        assert!(r.read_slab(1).is_err());

        let mut r = DatReader::new(Cursor::new(vec![0xff, 0xff, 0xff, 0xff, 1, 0]));
        assert!(matches!(r.metadata(), Err(Error::Volume(_))));
    }

    #[test]
    fn raw_metadata_is_checked_like_headers() {
        let meta = VolumeMetadata {
            dimensions: UVec3::new(4096, 1, 1),
            scale: Vec3::ONE,
            format: VoxelFormat::U16,
            max_value: 65535.0,
        };
        let mut r = RawReader::new(Cursor::new(Vec::new()), meta);
        assert!(matches!(r.metadata(), Err(Error::Volume(_))));
    }

    #[test]
    fn slabs_before_metadata_are_rejected() {
        let mut r = VolReader::new(Cursor::new(vec![0; 64]));
        assert!(r.read_slab(1).is_err());
    }
}
