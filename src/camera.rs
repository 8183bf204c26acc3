use glam::{Mat4, Vec3};

/// Orbit camera with exponential damping toward drag/scroll targets.
///
/// Motion state lives outside the frame clock; `update` eases the current
/// orbit toward the input targets each frame.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    target_yaw: f32,
    target_pitch: f32,
    target_distance: f32,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

const MIN_DISTANCE: f32 = 0.5;
const MAX_DISTANCE: f32 = 20.0;
const MAX_PITCH: f32 = 1.55; // just short of the poles

impl Default for OrbitCamera {
    fn default() -> Self {
        // Framing recovered from the authored scene: eye (1, 1, 2.7)
        // looking at (0, 1, 0) with a 65 degree field of view.
        Self::framing(Vec3::new(1.0, 1.0, 2.7), Vec3::new(0.0, 1.0, 0.0))
    }
}

impl OrbitCamera {
    /// Builds an orbit that places the eye at `position` looking at `target`.
    pub fn framing(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let distance = offset.length().max(MIN_DISTANCE);
        let yaw = offset.x.atan2(offset.z);
        let pitch = (offset.y / distance).asin();
        Self {
            target,
            yaw,
            pitch,
            distance,
            target_yaw: yaw,
            target_pitch: pitch,
            target_distance: distance,
            fov: 65.0_f32.to_radians(),
            near: 0.1,
            far: 100.0,
            damping: 8.0,
            rotate_speed: 0.005,
            zoom_speed: 0.25,
        }
    }

    /// Applies a mouse drag delta to the orbit targets.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.target_yaw -= dx * self.rotate_speed;
        self.target_pitch = (self.target_pitch + dy * self.rotate_speed)
            .clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Applies a scroll delta to the orbit distance target.
    pub fn zoom(&mut self, delta: f32) {
        self.target_distance =
            (self.target_distance - delta * self.zoom_speed).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Eases the orbit toward its targets. Larger `dt` converges further;
    /// the exponential form keeps damping frame-rate independent.
    pub fn update(&mut self, dt: f32) {
        let blend = 1.0 - (-self.damping * dt.max(0.0)).exp();
        self.yaw += (self.target_yaw - self.yaw) * blend;
        self.pitch += (self.target_pitch - self.pitch) * blend;
        self.distance += (self.target_distance - self.distance) * blend;
    }

    /// World-space eye position for the current orbit.
    pub fn position(&self) -> Vec3 {
        let dir = Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.cos() * self.pitch.cos(),
        );
        self.target + dir * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect.max(0.01), self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_orbit_recovers_authored_framing() {
        let cam = OrbitCamera::default();
        let eye = cam.position();
        assert!((eye - Vec3::new(1.0, 1.0, 2.7)).length() < 1e-4);
        assert!((cam.fov - 65.0_f32.to_radians()).abs() < 1e-6);
        assert_eq!(cam.near, 0.1);
        assert_eq!(cam.far, 100.0);
    }

    #[test]
    fn view_projection_is_finite() {
        let cam = OrbitCamera::default();
        let vp = cam.view_projection(16.0 / 9.0);
        for col in 0..4 {
            assert!(vp.col(col).is_finite());
        }
    }

    #[test]
    fn damping_converges_to_drag_target() {
        let mut cam = OrbitCamera::default();
        let before = cam.yaw;
        cam.rotate(200.0, 0.0);
        for _ in 0..240 {
            cam.update(1.0 / 60.0);
        }
        assert!((cam.yaw - (before - 200.0 * cam.rotate_speed)).abs() < 1e-3);
    }

    #[test]
    fn pitch_stays_short_of_poles() {
        let mut cam = OrbitCamera::default();
        cam.rotate(0.0, 10_000.0);
        for _ in 0..600 {
            cam.update(1.0 / 60.0);
        }
        assert!(cam.pitch.abs() <= MAX_PITCH + 1e-4);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut cam = OrbitCamera::default();
        cam.zoom(1_000.0);
        for _ in 0..600 {
            cam.update(1.0 / 60.0);
        }
        assert!(cam.distance >= MIN_DISTANCE - 1e-4);
    }
}
