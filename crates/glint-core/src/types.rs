//! Spatial and common types

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// A 3D vector
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const ONE: Self = Self {
        x: 1.0,
        y: 1.0,
        z: 1.0,
    };
    pub const UP: Self = Self {
        x: 0.0,
        y: 1.0,
        z: 0.0,
    };
    pub const RIGHT: Self = Self {
        x: 1.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(arr: [f32; 3]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
            z: arr[2],
        }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
                z: self.z / len,
            }
        } else {
            Self::ZERO
        }
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

/// A 3D transform with position, rotation (Euler angles in degrees), and scale.
///
/// The world matrix composes translate ∘ rotateX ∘ rotateY ∘ rotateZ ∘ scale
/// and is always rebuilt from the current field values; it is never cached
/// because the fields are edited freely between frames.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    /// Rotation in degrees, applied X then Y then Z
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Convert to a 4x4 transformation matrix (column-major)
    pub fn to_matrix(&self) -> [[f32; 4]; 4] {
        let (ax, ay, az) = (
            self.rotation.x.to_radians(),
            self.rotation.y.to_radians(),
            self.rotation.z.to_radians(),
        );

        let (sa, ca) = (ax.sin(), ax.cos());
        let (sb, cb) = (ay.sin(), ay.cos());
        let (sc, cc) = (az.sin(), az.cos());

        // Rotation = Rx * Ry * Rz, row-major entries
        let r00 = cb * cc;
        let r01 = -cb * sc;
        let r02 = sb;
        let r10 = ca * sc + sa * sb * cc;
        let r11 = ca * cc - sa * sb * sc;
        let r12 = -sa * cb;
        let r20 = sa * sc - ca * sb * cc;
        let r21 = sa * cc + ca * sb * sc;
        let r22 = ca * cb;

        [
            [r00 * self.scale.x, r10 * self.scale.x, r20 * self.scale.x, 0.0],
            [r01 * self.scale.y, r11 * self.scale.y, r21 * self.scale.y, 0.0],
            [r02 * self.scale.z, r12 * self.scale.z, r22 * self.scale.z, 0.0],
            [self.position.x, self.position.y, self.position.z, 1.0],
        ]
    }
}

/// RGBA color
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Multiply two 4x4 column-major matrices
pub fn mat4_mul(a: &[[f32; 4]; 4], b: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut result = [[0.0; 4]; 4];
    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                result[i][j] += a[k][j] * b[i][k];
            }
        }
    }
    result
}

/// Transform a point by a column-major 4x4 matrix, with perspective divide
pub fn mat4_transform_point(m: &[[f32; 4]; 4], p: &[f32; 3]) -> [f32; 3] {
    let mut out = [0.0f32; 4];
    for row in 0..4 {
        out[row] = m[0][row] * p[0] + m[1][row] * p[1] + m[2][row] * p[2] + m[3][row];
    }
    let w = out[3];
    if w.abs() < 1e-10 {
        return [out[0], out[1], out[2]];
    }
    [out[0] / w, out[1] / w, out[2] / w]
}

/// Compute the inverse of a 4x4 column-major matrix via 2x2 sub-determinants.
/// Returns the identity for a singular input.
pub fn mat4_inverse(m: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let (a00, a01, a02, a03) = (m[0][0], m[0][1], m[0][2], m[0][3]);
    let (a10, a11, a12, a13) = (m[1][0], m[1][1], m[1][2], m[1][3]);
    let (a20, a21, a22, a23) = (m[2][0], m[2][1], m[2][2], m[2][3]);
    let (a30, a31, a32, a33) = (m[3][0], m[3][1], m[3][2], m[3][3]);

    let b00 = a00 * a11 - a01 * a10;
    let b01 = a00 * a12 - a02 * a10;
    let b02 = a00 * a13 - a03 * a10;
    let b03 = a01 * a12 - a02 * a11;
    let b04 = a01 * a13 - a03 * a11;
    let b05 = a02 * a13 - a03 * a12;
    let b06 = a20 * a31 - a21 * a30;
    let b07 = a20 * a32 - a22 * a30;
    let b08 = a20 * a33 - a23 * a30;
    let b09 = a21 * a32 - a22 * a31;
    let b10 = a21 * a33 - a23 * a31;
    let b11 = a22 * a33 - a23 * a32;

    let det = b00 * b11 - b01 * b10 + b02 * b09 + b03 * b08 - b04 * b07 + b05 * b06;
    if det.abs() < 1e-10 {
        return [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
    }
    let inv_det = 1.0 / det;

    [
        [
            (a11 * b11 - a12 * b10 + a13 * b09) * inv_det,
            (a02 * b10 - a01 * b11 - a03 * b09) * inv_det,
            (a31 * b05 - a32 * b04 + a33 * b03) * inv_det,
            (a22 * b04 - a21 * b05 - a23 * b03) * inv_det,
        ],
        [
            (a12 * b08 - a10 * b11 - a13 * b07) * inv_det,
            (a00 * b11 - a02 * b08 + a03 * b07) * inv_det,
            (a32 * b02 - a30 * b05 - a33 * b01) * inv_det,
            (a20 * b05 - a22 * b02 + a23 * b01) * inv_det,
        ],
        [
            (a10 * b10 - a11 * b08 + a13 * b06) * inv_det,
            (a01 * b08 - a00 * b10 - a03 * b06) * inv_det,
            (a30 * b04 - a31 * b02 + a33 * b00) * inv_det,
            (a21 * b02 - a20 * b04 - a23 * b00) * inv_det,
        ],
        [
            (a11 * b07 - a10 * b09 - a12 * b06) * inv_det,
            (a00 * b09 - a01 * b07 + a02 * b06) * inv_det,
            (a31 * b01 - a30 * b03 - a32 * b00) * inv_det,
            (a20 * b03 - a21 * b01 + a22 * b00) * inv_det,
        ],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec3_near(a: [f32; 3], b: [f32; 3]) {
        for i in 0..3 {
            assert!((a[i] - b[i]).abs() < 1e-5, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_vec3_operations() {
        let v1 = Vec3::new(1.0, 2.0, 3.0);
        let v2 = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(v1 + v2, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(v2 - v1, Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(v1 * 2.0, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(Vec3::RIGHT.cross(&Vec3::UP), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_transform_default() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Vec3::ZERO);
        assert_eq!(t.scale, Vec3::ONE);
    }

    #[test]
    fn test_transform_translate_then_scale() {
        // Scale is applied before translation: p' = T * S * p
        let t = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::ZERO,
            scale: Vec3::new(2.0, 2.0, 2.0),
        };
        let m = t.to_matrix();
        assert_vec3_near(mat4_transform_point(&m, &[1.0, 0.0, 0.0]), [3.0, 2.0, 3.0]);
    }

    #[test]
    fn test_transform_rotation_order_xyz() {
        // With Rx * Ry * Rz, a 90° yaw alone sends +X to -Z
        let t = Transform::IDENTITY.with_rotation(Vec3::new(0.0, 90.0, 0.0));
        let m = t.to_matrix();
        assert_vec3_near(mat4_transform_point(&m, &[1.0, 0.0, 0.0]), [0.0, 0.0, -1.0]);

        // 90° about X then 90° about Y: +Z first goes to... Rz is identity,
        // Ry sends +Z to +X, then Rx leaves +X in place
        let t = Transform::IDENTITY.with_rotation(Vec3::new(90.0, 90.0, 0.0));
        let m = t.to_matrix();
        assert_vec3_near(mat4_transform_point(&m, &[0.0, 0.0, 1.0]), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mat4_inverse_roundtrip() {
        let t = Transform {
            position: Vec3::new(3.0, -2.0, 5.0),
            rotation: Vec3::new(30.0, 45.0, -60.0),
            scale: Vec3::new(2.0, 0.5, 1.5),
        };
        let m = t.to_matrix();
        let inv = mat4_inverse(&m);
        let id = mat4_mul(&m, &inv);
        for col in 0..4 {
            for row in 0..4 {
                let expected = if col == row { 1.0 } else { 0.0 };
                assert!((id[col][row] - expected).abs() < 1e-4);
            }
        }
    }
}
