use glam::Vec3;

use super::{PerspectiveCamera, Transform};

/// Orbits the camera around a center point.
///
/// `update(t)` places the camera for time `t` (seconds), turning at
/// `angular_speed` radians per second around the vertical axis, so animation
/// export can reproduce the same path frame by frame. Mouse input adjusts the
/// base yaw/pitch and the distance.
#[derive(Debug, Clone)]
pub struct OrbitCameraAnimator {
    pub center: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub angular_speed: f32,
    pub rotate_sensitivity: f32,
    pub zoom_sensitivity: f32,
}

impl Default for OrbitCameraAnimator {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            distance: 2.5,
            yaw: 0.0,
            pitch: 0.3,
            angular_speed: std::f32::consts::FRAC_PI_4,
            rotate_sensitivity: 0.005,
            zoom_sensitivity: 0.1,
        }
    }
}

impl OrbitCameraAnimator {
    const PITCH_LIMIT: f32 = 1.5;

    pub fn transform_at(&self, t: f32) -> Transform {
        let yaw = self.yaw + self.angular_speed * t;
        let pitch = self.pitch.clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        let offset = Vec3::new(
            yaw.sin() * pitch.cos(),
            pitch.sin(),
            yaw.cos() * pitch.cos(),
        ) * self.distance;
        Transform::looking_at(self.center + offset, self.center, Vec3::Y)
    }

    pub fn update(&self, camera: &mut PerspectiveCamera, t: f32) {
        camera.set_transform(self.transform_at(t));
    }

    /// Pixel drag delta.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * self.rotate_sensitivity;
        self.pitch = (self.pitch + dy * self.rotate_sensitivity)
            .clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
    }

    /// Scroll delta in lines; positive zooms in.
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance * (1.0 - delta * self.zoom_sensitivity)).clamp(0.2, 50.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_distance_from_center() {
        let a = OrbitCameraAnimator::default();
        for t in [0.0, 0.7, 3.1] {
            let eye = a.transform_at(t).translation;
            assert!(((eye - a.center).length() - a.distance).abs() < 1e-4);
        }
    }

    #[test]
    fn time_moves_the_camera() {
        let a = OrbitCameraAnimator::default();
        let mut camera = PerspectiveCamera::default();
        a.update(&mut camera, 0.0);
        let before = camera.revision();
        a.update(&mut camera, 1.0);
        assert!(camera.revision() > before);
    }

    #[test]
    fn zoom_is_bounded() {
        let mut a = OrbitCameraAnimator::default();
        for _ in 0..200 {
            a.zoom(5.0);
        }
        assert!(a.distance >= 0.2);
    }
}
