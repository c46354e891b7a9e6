//! Orbit camera with perspective and orthographic projections

use glint_core::{mat4_inverse, mat4_mul, Vec3};

/// A 3D orbit camera: yaw/pitch/distance around a target point
pub struct Camera {
    /// Camera position, derived from the orbit parameters
    pub position: Vec3,
    /// Target point the camera looks at
    pub target: Vec3,
    /// Up vector
    pub up: Vec3,
    /// Field of view in degrees
    pub fov: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance from target
    pub distance: f32,
    /// Horizontal angle in radians
    pub yaw: f32,
    /// Vertical angle in radians
    pub pitch: f32,

    /// Use orthographic projection (true) or perspective (false)
    pub orthographic: bool,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 5.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::UP,
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            aspect: 16.0 / 9.0,
            distance: 12.0,
            yaw: std::f32::consts::FRAC_PI_4,
            pitch: std::f32::consts::FRAC_PI_6,
            orthographic: false,
        };
        camera.update_orbit();
        camera
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get camera position as an array for GPU upload
    pub fn position_array(&self) -> [f32; 3] {
        self.position.to_array()
    }

    /// Update position from the orbit parameters
    pub fn update_orbit(&mut self) {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();

        self.position = Vec3::new(self.target.x + x, self.target.y + y, self.target.z + z);
    }

    /// Orbit horizontally (rotate around target)
    pub fn orbit_horizontal(&mut self, delta: f32) {
        self.yaw += delta;
        self.update_orbit();
    }

    /// Orbit vertically (tilt up/down)
    pub fn orbit_vertical(&mut self, delta: f32) {
        self.pitch += delta;
        // Keep away from the poles where the up vector degenerates
        self.pitch = self.pitch.clamp(-1.55, 1.55);
        self.update_orbit();
    }

    /// Zoom in/out
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance - delta).clamp(1.0, 100.0);
        self.update_orbit();
    }

    /// Pan the camera (move target)
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (self.target - self.position).normalized();
        let right = forward.cross(&self.up).normalized();
        let up = right.cross(&forward);

        self.target = self.target + right * dx + up * dy;
        self.update_orbit();
    }

    /// Get the view matrix (4x4, column-major)
    pub fn view_matrix(&self) -> [[f32; 4]; 4] {
        let f = (self.target - self.position).normalized();
        let s = f.cross(&self.up).normalized();
        let u = s.cross(&f);

        [
            [s.x, u.x, -f.x, 0.0],
            [s.y, u.y, -f.y, 0.0],
            [s.z, u.z, -f.z, 0.0],
            [
                -s.dot(&self.position),
                -u.dot(&self.position),
                f.dot(&self.position),
                1.0,
            ],
        ]
    }

    /// Get the projection matrix (4x4, column-major)
    pub fn projection_matrix(&self) -> [[f32; 4]; 4] {
        if self.orthographic {
            self.orthographic_matrix()
        } else {
            self.perspective_matrix()
        }
    }

    fn perspective_matrix(&self) -> [[f32; 4]; 4] {
        let fov_rad = self.fov.to_radians();
        let f = 1.0 / (fov_rad / 2.0).tan();

        let depth = self.far - self.near;

        [
            [f / self.aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, -(self.far + self.near) / depth, -1.0],
            [0.0, 0.0, -(2.0 * self.far * self.near) / depth, 0.0],
        ]
    }

    fn orthographic_matrix(&self) -> [[f32; 4]; 4] {
        // Size the ortho volume so objects at `distance` appear the same
        // size as in perspective
        let half_h = self.distance * (self.fov.to_radians() / 2.0).tan();
        let half_w = half_h * self.aspect;
        let depth = self.far - self.near;

        // Column-major: m[col][row]; depth maps to [0, 1]
        [
            [1.0 / half_w, 0.0, 0.0, 0.0],
            [0.0, 1.0 / half_h, 0.0, 0.0],
            [0.0, 0.0, -1.0 / depth, 0.0],
            [0.0, 0.0, -self.near / depth, 1.0],
        ]
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> [[f32; 4]; 4] {
        mat4_mul(&self.projection_matrix(), &self.view_matrix())
    }

    /// Inverse view-projection with the view translation stripped — maps
    /// clip-space corners to world directions for the environment backdrop
    pub fn backdrop_inverse_view_projection(&self) -> [[f32; 4]; 4] {
        let view = self.view_matrix();
        let view_rot_only = [view[0], view[1], view[2], [0.0, 0.0, 0.0, 1.0]];
        let vp = mat4_mul(&self.projection_matrix(), &view_rot_only);
        mat4_inverse(&vp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_core::mat4_transform_point;

    #[test]
    fn test_view_matrix_centers_target() {
        let mut camera = Camera::new();
        camera.target = Vec3::ZERO;
        camera.distance = 10.0;
        camera.yaw = 0.3;
        camera.pitch = 0.4;
        camera.update_orbit();

        // The target projects onto the view axis at -distance
        let v = camera.view_matrix();
        let p = mat4_transform_point(&v, &[0.0, 0.0, 0.0]);
        assert!(p[0].abs() < 1e-4);
        assert!(p[1].abs() < 1e-4);
        assert!((p[2] + 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_orbit_distance_is_preserved() {
        let mut camera = Camera::new();
        camera.distance = 7.0;
        camera.orbit_horizontal(1.2);
        camera.orbit_vertical(-0.5);
        let d = (camera.position - camera.target).length();
        assert!((d - 7.0).abs() < 1e-4);
    }

    #[test]
    fn test_backdrop_matrix_ignores_position() {
        let mut a = Camera::new();
        let mut b = Camera::new();
        b.target = Vec3::new(50.0, 0.0, -20.0);
        a.update_orbit();
        b.update_orbit();
        // Same orientation, different position: backdrop matrices agree
        let ma = a.backdrop_inverse_view_projection();
        let mb = b.backdrop_inverse_view_projection();
        for col in 0..4 {
            for row in 0..4 {
                assert!((ma[col][row] - mb[col][row]).abs() < 1e-4);
            }
        }
    }
}
