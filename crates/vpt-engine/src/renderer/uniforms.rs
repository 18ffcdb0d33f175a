use bytemuck::{Pod, Zeroable};

/// Set on integrate calls that restart path state.
pub const FLAG_RESET: u32 = 1;
/// Randomize the first sample offset along each ray.
pub const FLAG_JITTER: u32 = 2;

/// Uniform block bound at `@binding(0)` of every renderer program.
///
/// Mirrors `PassUniforms` of the `pass_uniforms` WGSL mixin field by field.
/// Variants reuse the generic slots for their own parameters.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct PassUniforms {
    pub mvp_inverse: [[f32; 4]; 4],
    pub inverse_resolution: [f32; 2],
    pub seed: f32,
    /// Frames integrated since the last reset, before this one.
    pub frame: u32,
    pub extinction: f32,
    pub anisotropy: f32,
    pub threshold: f32,
    pub radius: f32,
    pub steps: u32,
    pub bounces: u32,
    pub slices: u32,
    pub samples: u32,
    pub flags: u32,
    pub pad0: u32,
    pub pad1: u32,
    pub pad2: u32,
    pub color: [f32; 4],
    pub light: [f32; 4],
}

impl PassUniforms {
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }
}
