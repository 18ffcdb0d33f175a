use glam::Mat4;

use super::Transform;

/// Perspective camera.
///
/// Every mutation bumps [`revision`](Self::revision); the rendering context
/// compares revisions once per frame and resets the renderer on change.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    transform: Transform,
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
    revision: u64,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            fov_y: 1.0,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
            revision: 0,
        }
    }
}

impl PerspectiveCamera {
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        if transform != self.transform {
            self.transform = transform;
            self.revision += 1;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Width over height of the viewport.
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 && aspect != self.aspect {
            self.aspect = aspect;
            self.revision += 1;
        }
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn set_fov_y(&mut self, fov_y: f32) {
        if fov_y != self.fov_y {
            self.fov_y = fov_y;
            self.revision += 1;
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.transform.inverse_matrix()
    }

    /// Right-handed projection with depth in `[0, 1]`.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }
}
