//! Transfer functions: scalar value -> color and opacity.

use serde::{Deserialize, Serialize};

/// Number of texels of a rasterized transfer function.
pub const TRANSFER_FUNCTION_WIDTH: u32 = 256;

/// One smooth bump on the value axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bump {
    /// Center on the value axis, in `[0, 1]`.
    pub position: f32,
    /// Half width on the value axis.
    pub size: f32,
    pub color: [f32; 3],
    pub alpha: f32,
}

/// A list of bumps, rasterized into an RGBA8 lookup row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferFunction {
    pub bumps: Vec<Bump>,
}

impl TransferFunction {
    pub fn new(bumps: Vec<Bump>) -> Self {
        Self { bumps }
    }

    /// Texels a renderer starts with: opaque red whose alpha ramps linearly
    /// from 0 to 1 across the value range.
    pub fn default_texels() -> Vec<u8> {
        let last = (TRANSFER_FUNCTION_WIDTH - 1) as f32;
        (0..TRANSFER_FUNCTION_WIDTH)
            .flat_map(|i| [255, 0, 0, to_unorm8(i as f32 / last)])
            .collect()
    }

    /// Rasterizes into `TRANSFER_FUNCTION_WIDTH` RGBA8 texels.
    ///
    /// Color is the opacity-weighted mean of the overlapping bumps; opacity is
    /// the largest contribution.
    pub fn rasterize(&self) -> Vec<u8> {
        let width = TRANSFER_FUNCTION_WIDTH as usize;
        let mut texels = Vec::with_capacity(width * 4);
        for i in 0..width {
            let x = (i as f32 + 0.5) / width as f32;
            let mut color = [0.0f32; 3];
            let mut weight_sum = 0.0f32;
            let mut alpha = 0.0f32;
            for bump in &self.bumps {
                let size = bump.size.max(1e-4);
                let d = (x - bump.position) / size;
                let w = (-d * d * 4.0).exp() * bump.alpha.clamp(0.0, 1.0);
                for (c, b) in color.iter_mut().zip(bump.color) {
                    *c += b * w;
                }
                weight_sum += w;
                alpha = alpha.max(w);
            }
            for c in color {
                let v = if weight_sum > 0.0 { c / weight_sum } else { 0.0 };
                texels.push(to_unorm8(v));
            }
            texels.push(to_unorm8(alpha));
        }
        texels
    }
}

fn to_unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_function_is_transparent() {
        let texels = TransferFunction::default().rasterize();
        assert_eq!(texels.len(), 256 * 4);
        assert!(texels.iter().all(|&b| b == 0));
    }

    #[test]
    fn default_ramp_spans_full_opacity() {
        let texels = TransferFunction::default_texels();
        assert_eq!(texels.len(), TRANSFER_FUNCTION_WIDTH as usize * 4);
        assert_eq!(&texels[..4], &[255, 0, 0, 0]);
        assert_eq!(&texels[texels.len() - 4..], &[255, 0, 0, 255]);
    }

    #[test]
    fn bump_peaks_at_its_position() {
        let tf = TransferFunction::new(vec![Bump {
            position: 0.5,
            size: 0.1,
            color: [0.0, 1.0, 0.0],
            alpha: 1.0,
        }]);
        let texels = tf.rasterize();
        let alpha = |i: usize| texels[i * 4 + 3];

        assert!(alpha(128) > 250);
        assert_eq!(alpha(0), 0);
        assert_eq!(&texels[128 * 4..128 * 4 + 3], &[0, 255, 0]);
    }
}
