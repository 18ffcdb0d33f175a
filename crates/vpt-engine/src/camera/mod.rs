//! Camera, transforms and camera animation.

mod animator;
mod perspective;
mod transform;

pub use animator::OrbitCameraAnimator;
pub use perspective::PerspectiveCamera;
pub use transform::Transform;

use glam::{Mat4, Vec3};

/// Inverse of `projection * view * model * center`, where `center` moves the
/// unit volume cube to the origin. Unprojecting clip coordinates with it
/// yields volume texture coordinates.
pub fn mvp_inverse(camera: &PerspectiveCamera, volume: &Transform) -> Mat4 {
    let center = Mat4::from_translation(Vec3::splat(-0.5));
    (camera.projection_matrix() * camera.view_matrix() * volume.matrix() * center).inverse()
}
