//! Fixed import post-processing: triangulation, normal generation, and
//! tangent-space computation for sources that lack them.

use crate::types::{DEFAULT_BITANGENT, DEFAULT_NORMAL, DEFAULT_TANGENT};

/// Source primitive topology for triangulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

/// Convert a strip or fan index list into a plain triangle list, preserving
/// the winding of the first triangle. Triangle lists pass through unchanged.
pub fn triangulate(topology: Topology, indices: Vec<u32>) -> Vec<u32> {
    match topology {
        Topology::TriangleList => indices,
        Topology::TriangleStrip => {
            let mut out = Vec::with_capacity(indices.len().saturating_sub(2) * 3);
            for i in 2..indices.len() {
                // Every second strip triangle reverses winding
                if i % 2 == 0 {
                    out.extend_from_slice(&[indices[i - 2], indices[i - 1], indices[i]]);
                } else {
                    out.extend_from_slice(&[indices[i - 1], indices[i - 2], indices[i]]);
                }
            }
            out
        }
        Topology::TriangleFan => {
            let mut out = Vec::with_capacity(indices.len().saturating_sub(2) * 3);
            for i in 2..indices.len() {
                out.extend_from_slice(&[indices[0], indices[i - 1], indices[i]]);
            }
            out
        }
    }
}

/// Generate per-vertex normals by accumulating face normals over every
/// triangle a vertex participates in. Vertices referenced by no triangle
/// (or only by degenerate ones) get the default up normal.
pub fn generate_flat_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accum = vec![[0.0f32; 3]; positions.len()];

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let e1 = sub(positions[i1], positions[i0]);
        let e2 = sub(positions[i2], positions[i0]);
        let n = cross(e1, e2);
        for &i in &[i0, i1, i2] {
            accum[i] = add(accum[i], n);
        }
    }

    accum
        .into_iter()
        .map(|n| normalize_or(n, DEFAULT_NORMAL))
        .collect()
}

/// Compute per-vertex tangent/bitangent space from positions, normals, and
/// texture coordinates. Per-triangle tangents are accumulated per vertex,
/// then the tangent is orthonormalized against the vertex normal and the
/// bitangent rebuilt with the accumulated handedness. Degenerate UV mappings
/// fall back to the default basis.
pub fn compute_tangent_space(
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    uvs: &[[f32; 2]],
    indices: &[u32],
) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
    let count = positions.len();
    let mut tan_accum = vec![[0.0f32; 3]; count];
    let mut bitan_accum = vec![[0.0f32; 3]; count];

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if i0 >= count || i1 >= count || i2 >= count {
            continue;
        }

        let e1 = sub(positions[i1], positions[i0]);
        let e2 = sub(positions[i2], positions[i0]);
        let duv1 = [uvs[i1][0] - uvs[i0][0], uvs[i1][1] - uvs[i0][1]];
        let duv2 = [uvs[i2][0] - uvs[i0][0], uvs[i2][1] - uvs[i0][1]];

        let det = duv1[0] * duv2[1] - duv2[0] * duv1[1];
        if det.abs() < 1e-12 {
            continue;
        }
        let f = 1.0 / det;

        let tangent = [
            f * (duv2[1] * e1[0] - duv1[1] * e2[0]),
            f * (duv2[1] * e1[1] - duv1[1] * e2[1]),
            f * (duv2[1] * e1[2] - duv1[1] * e2[2]),
        ];
        let bitangent = [
            f * (duv1[0] * e2[0] - duv2[0] * e1[0]),
            f * (duv1[0] * e2[1] - duv2[0] * e1[1]),
            f * (duv1[0] * e2[2] - duv2[0] * e1[2]),
        ];

        for &i in &[i0, i1, i2] {
            tan_accum[i] = add(tan_accum[i], tangent);
            bitan_accum[i] = add(bitan_accum[i], bitangent);
        }
    }

    let mut tangents = Vec::with_capacity(count);
    let mut bitangents = Vec::with_capacity(count);

    for i in 0..count {
        let n = normals[i];
        let t = tan_accum[i];

        if length(t) < 1e-8 {
            tangents.push(DEFAULT_TANGENT);
            bitangents.push(DEFAULT_BITANGENT);
            continue;
        }

        // Gram-Schmidt: tangent orthogonal to the vertex normal
        let n_dot_t = dot(n, t);
        let t_ortho = normalize_or(
            [
                t[0] - n[0] * n_dot_t,
                t[1] - n[1] * n_dot_t,
                t[2] - n[2] * n_dot_t,
            ],
            DEFAULT_TANGENT,
        );

        // Rebuild the bitangent, keeping the accumulated handedness
        let mut b = cross(n, t_ortho);
        if dot(b, bitan_accum[i]) < 0.0 {
            b = [-b[0], -b[1], -b[2]];
        }

        tangents.push(t_ortho);
        bitangents.push(normalize_or(b, DEFAULT_BITANGENT));
    }

    (tangents, bitangents)
}

fn add(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn length(v: [f32; 3]) -> f32 {
    dot(v, v).sqrt()
}

fn normalize_or(v: [f32; 3], fallback: [f32; 3]) -> [f32; 3] {
    let len = length(v);
    if len < 1e-8 {
        return fallback;
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangulate_list_passthrough() {
        let indices = vec![0, 1, 2, 2, 1, 3];
        assert_eq!(
            triangulate(Topology::TriangleList, indices.clone()),
            indices
        );
    }

    #[test]
    fn test_triangulate_strip_alternates_winding() {
        assert_eq!(
            triangulate(Topology::TriangleStrip, vec![0, 1, 2, 3]),
            vec![0, 1, 2, 2, 1, 3]
        );
    }

    #[test]
    fn test_triangulate_fan_pivots_on_first() {
        assert_eq!(
            triangulate(Topology::TriangleFan, vec![0, 1, 2, 3, 4]),
            vec![0, 1, 2, 0, 2, 3, 0, 3, 4]
        );
    }

    #[test]
    fn test_generate_flat_normals_upward_triangle() {
        // CCW triangle in the XZ plane seen from above (+Y)
        let positions = [[0.0, 0.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, -1.0]];
        let normals = generate_flat_normals(&positions, &[0, 1, 2]);
        for n in &normals {
            assert!((n[0]).abs() < 1e-6);
            assert!((n[1] - 1.0).abs() < 1e-6);
            assert!((n[2]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_unreferenced_vertex_gets_default_normal() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [9.0, 9.0, 9.0]];
        let normals = generate_flat_normals(&positions, &[0, 1, 2]);
        assert_eq!(normals[3], DEFAULT_NORMAL);
    }

    #[test]
    fn test_tangent_space_axis_aligned_quad() {
        // Quad in the XY plane, UVs matching XY: tangent must follow +X
        // (the U direction) and the bitangent +Y (the V direction).
        let positions = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let normals = [[0.0, 0.0, 1.0]; 4];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let indices = [0, 1, 2, 0, 2, 3];

        let (tangents, bitangents) =
            compute_tangent_space(&positions, &normals, &uvs, &indices);
        for t in &tangents {
            assert!((t[0] - 1.0).abs() < 1e-5, "tangent {:?}", t);
        }
        for b in &bitangents {
            assert!((b[1] - 1.0).abs() < 1e-5, "bitangent {:?}", b);
        }
    }

    #[test]
    fn test_tangent_space_degenerate_uvs_fall_back() {
        let positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let normals = [[0.0, 0.0, 1.0]; 3];
        let uvs = [[0.5, 0.5]; 3];
        let (tangents, bitangents) =
            compute_tangent_space(&positions, &normals, &uvs, &[0, 1, 2]);
        assert_eq!(tangents, vec![DEFAULT_TANGENT; 3]);
        assert_eq!(bitangents, vec![DEFAULT_BITANGENT; 3]);
    }
}
