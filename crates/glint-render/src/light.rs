//! Light descriptors and light-space math for shadow mapping

use glint_core::{mat4_mul, Vec3};

/// Number of simultaneously shadow-casting lights. Each owns one depth
/// layer; lights beyond this count are not rendered.
pub const MAX_SHADOW_LIGHTS: usize = 2;

/// What kind of light a descriptor represents
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Sun-style light with an explicit look-at view for its shadow map
    Directional { target: Vec3, up: Vec3 },
    /// Local light with inverse-quadratic distance falloff
    Point {
        constant: f32,
        linear: f32,
        quadratic: f32,
    },
}

/// One editable light. The shadow target and light-space transform are
/// recomputed from these fields every frame; nothing here is cached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDescriptor {
    pub position: Vec3,
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
    pub enabled: bool,
}

impl LightDescriptor {
    pub fn directional(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            kind: LightKind::Directional {
                target,
                up: Vec3::UP,
            },
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            enabled: true,
        }
    }

    pub fn point(position: Vec3) -> Self {
        Self {
            position,
            kind: LightKind::Point {
                constant: 1.0,
                linear: 0.09,
                quadratic: 0.032,
            },
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            enabled: true,
        }
    }

    /// Where this light's shadow view looks. Point lights have no authored
    /// target; their single orthographic map aims at the world origin.
    pub fn view_target(&self) -> Vec3 {
        match self.kind {
            LightKind::Directional { target, .. } => target,
            LightKind::Point { .. } => Vec3::ZERO,
        }
    }

    fn view_up(&self) -> Vec3 {
        match self.kind {
            LightKind::Directional { up, .. } if up.length() > 1e-6 => up,
            _ => Vec3::UP,
        }
    }

    /// Unit direction the light shines in (toward its target)
    pub fn direction(&self) -> Vec3 {
        let d = (self.view_target() - self.position).normalized();
        if d.length() > 0.0 {
            d
        } else {
            -Vec3::UP
        }
    }

    /// Light-space transform = orthographic projection ∘ look-at view.
    /// Point lights reuse the same orthographic approach; this renderer has
    /// no perspective or cubemap shadows.
    pub fn light_space_matrix(&self, projection: &ShadowProjection) -> [[f32; 4]; 4] {
        let view = look_at(self.position, self.view_target(), self.view_up());
        let proj = ortho(
            -projection.half_extent,
            projection.half_extent,
            -projection.half_extent,
            projection.half_extent,
            projection.near,
            projection.far,
        );
        mat4_mul(&proj, &view)
    }

    /// Distance falloff factor. Directional lights do not attenuate.
    pub fn attenuation(&self, distance: f32) -> f32 {
        match self.kind {
            LightKind::Directional { .. } => 1.0,
            LightKind::Point {
                constant,
                linear,
                quadratic,
            } => {
                let denom = constant + linear * distance + quadratic * distance * distance;
                if denom <= 0.0 {
                    1.0
                } else {
                    1.0 / denom
                }
            }
        }
    }
}

impl Default for LightDescriptor {
    fn default() -> Self {
        Self::directional(Vec3::new(-5.0, 10.0, -5.0), Vec3::ZERO)
    }
}

/// Orthographic shadow volume, shared by every light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowProjection {
    /// Half size of the square ortho window
    pub half_extent: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShadowProjection {
    fn default() -> Self {
        Self {
            half_extent: 15.0,
            near: 1.0,
            far: 25.0,
        }
    }
}

/// Look-at view matrix (column-major). Degenerate inputs (eye on target,
/// forward parallel to up) fall back to stable axes instead of NaNs, since
/// every field is panel-editable between frames.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> [[f32; 4]; 4] {
    let mut f = (target - eye).normalized();
    if f.length() < 1e-6 {
        f = Vec3::new(0.0, 0.0, -1.0);
    }
    let mut s = f.cross(&up).normalized();
    if s.length() < 1e-6 {
        s = f.cross(&Vec3::new(0.0, 0.0, 1.0)).normalized();
        if s.length() < 1e-6 {
            s = Vec3::RIGHT;
        }
    }
    let u = s.cross(&f);

    [
        [s.x, u.x, -f.x, 0.0],
        [s.y, u.y, -f.y, 0.0],
        [s.z, u.z, -f.z, 0.0],
        [-s.dot(&eye), -u.dot(&eye), f.dot(&eye), 1.0],
    ]
}

/// Orthographic projection matrix (column-major, depth mapped to [0, 1])
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> [[f32; 4]; 4] {
    let rml = right - left;
    let tmb = top - bottom;
    let fmn = far - near;

    [
        [2.0 / rml, 0.0, 0.0, 0.0],
        [0.0, 2.0 / tmb, 0.0, 0.0],
        [0.0, 0.0, -1.0 / fmn, 0.0],
        [
            -(right + left) / rml,
            -(top + bottom) / tmb,
            -near / fmn,
            1.0,
        ],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_core::mat4_transform_point;

    #[test]
    fn test_unattenuated_point_light() {
        let mut light = LightDescriptor::point(Vec3::ZERO);
        light.kind = LightKind::Point {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        };
        for distance in [0.0, 0.5, 10.0, 1000.0] {
            assert_eq!(light.attenuation(distance), 1.0);
        }
    }

    #[test]
    fn test_point_light_inverse_quadratic() {
        let mut light = LightDescriptor::point(Vec3::ZERO);
        light.kind = LightKind::Point {
            constant: 1.0,
            linear: 0.0,
            quadratic: 1.0,
        };
        assert!((light.attenuation(2.0) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_directional_light_never_attenuates() {
        let light = LightDescriptor::default();
        assert_eq!(light.attenuation(500.0), 1.0);
    }

    #[test]
    fn test_directional_direction_points_at_target() {
        let light = LightDescriptor::directional(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO);
        let d = light.direction();
        assert!((d.x).abs() < 1e-6);
        assert!((d.y + 1.0).abs() < 1e-6);
        assert!((d.z).abs() < 1e-6);
    }

    #[test]
    fn test_light_space_matrix_maps_target_depth() {
        let light = LightDescriptor::directional(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        let projection = ShadowProjection::default();
        let m = light.light_space_matrix(&projection);

        // The target sits 10 units down the view axis; with near 1 / far 25
        // the ortho depth lands at (10 - 1) / 24.
        let p = mat4_transform_point(&m, &[0.0, 0.0, 0.0]);
        assert!(p[0].abs() < 1e-5);
        assert!(p[1].abs() < 1e-5);
        assert!((p[2] - 9.0 / 24.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_look_at_is_finite() {
        // Light directly above its target with the default +Y up
        let light = LightDescriptor::directional(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO);
        let m = light.light_space_matrix(&ShadowProjection::default());
        for col in &m {
            for v in col {
                assert!(v.is_finite());
            }
        }
    }

    #[test]
    fn test_point_light_aims_at_origin() {
        let light = LightDescriptor::point(Vec3::new(3.0, 4.0, 0.0));
        assert_eq!(light.view_target(), Vec3::ZERO);
    }
}
