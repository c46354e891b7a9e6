//! Procedural mesh primitives (cube, ground plane)

use crate::mesh::{Mesh, Vertex};

/// Create an axis-aligned cube mesh centered at the origin, with per-face
/// normals and a full tangent basis aligned to each face's UV layout.
pub fn create_cube_mesh(size: f32) -> Mesh {
    let h = size / 2.0;

    // (normal, tangent, bitangent) per face; vertex order gives CCW winding
    // for the outward normal with indices [0,1,2, 0,2,3]
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),   // front
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), // back
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),  // right
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),  // left
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),  // top
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),  // bottom
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, tangent, bitangent) in faces {
        let base = vertices.len() as u32;
        // The four face corners span the tangent/bitangent plane
        let corners = [
            (-1.0f32, -1.0f32, [0.0f32, 1.0f32]),
            (1.0, -1.0, [1.0, 1.0]),
            (1.0, 1.0, [1.0, 0.0]),
            (-1.0, 1.0, [0.0, 0.0]),
        ];
        for (u, v, uv) in corners {
            let position = [
                normal[0] * h + tangent[0] * u * h + bitangent[0] * v * h,
                normal[1] * h + tangent[1] * u * h + bitangent[1] * v * h,
                normal[2] * h + tangent[2] * u * h + bitangent[2] * v * h,
            ];
            vertices.push(Vertex {
                position,
                normal,
                uv,
                tangent,
                bitangent,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh { vertices, indices }
}

/// Create a flat ground plane in the XZ plane at the given height, with UVs
/// tiled so textures repeat once per `tile` world units.
pub fn create_plane_mesh(half_extent: f32, height: f32, tile: f32) -> Mesh {
    let uv_max = (half_extent * 2.0) / tile.max(1e-6);
    let corners = [
        ([-half_extent, height, half_extent], [0.0, uv_max]),
        ([half_extent, height, half_extent], [uv_max, uv_max]),
        ([half_extent, height, -half_extent], [uv_max, 0.0]),
        ([-half_extent, height, -half_extent], [0.0, 0.0]),
    ];

    let vertices = corners
        .into_iter()
        .map(|(position, uv)| Vertex {
            position,
            normal: [0.0, 1.0, 0.0],
            uv,
            tangent: [1.0, 0.0, 0.0],
            bitangent: [0.0, 0.0, -1.0],
        })
        .collect();

    Mesh {
        vertices,
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_mesh_counts() {
        let cube = create_cube_mesh(1.0);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube.indices.iter().all(|&i| (i as usize) < cube.vertices.len()));
    }

    #[test]
    fn test_cube_corners_on_surface() {
        let cube = create_cube_mesh(2.0);
        for v in &cube.vertices {
            assert!(v.position.iter().all(|c| c.abs() <= 1.0 + 1e-6));
            // Every vertex lies on the face its normal names
            let along_normal = v.position[0] * v.normal[0]
                + v.position[1] * v.normal[1]
                + v.position[2] * v.normal[2];
            assert!((along_normal - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_plane_mesh_winding_up() {
        let plane = create_plane_mesh(10.0, -0.5, 5.0);
        assert_eq!(plane.vertices.len(), 4);
        // First triangle must be CCW seen from +Y
        let [a, b, c] = [
            plane.vertices[plane.indices[0] as usize].position,
            plane.vertices[plane.indices[1] as usize].position,
            plane.vertices[plane.indices[2] as usize].position,
        ];
        let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let ny = e1[2] * e2[0] - e1[0] * e2[2];
        assert!(ny > 0.0);
    }
}
