//! GPU mesh upload — converts imported vertex data into GPU-resident buffers

use bytemuck::{Pod, Zeroable};
use glint_import::{ImportedMesh, DEFAULT_BITANGENT, DEFAULT_NORMAL, DEFAULT_TANGENT, DEFAULT_UV};
use wgpu::util::DeviceExt;

/// A vertex with position, normal, UV, and tangent-space basis
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x3,   // position
        1 => Float32x3,   // normal
        2 => Float32x2,   // uv
        3 => Float32x3,   // tangent
        4 => Float32x3,   // bitangent
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// A mesh on the CPU, ready for upload
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Interleave imported attribute arrays into vertices, substituting the
/// import defaults for any array that falls short of the vertex count.
pub fn build_vertices(mesh: &ImportedMesh) -> Vec<Vertex> {
    let attr = |values: &[[f32; 3]], i: usize, default: [f32; 3]| -> [f32; 3] {
        values.get(i).copied().unwrap_or(default)
    };

    (0..mesh.positions.len())
        .map(|i| Vertex {
            position: mesh.positions[i],
            normal: attr(&mesh.normals, i, DEFAULT_NORMAL),
            uv: mesh.uvs.get(i).copied().unwrap_or(DEFAULT_UV),
            tangent: attr(&mesh.tangents, i, DEFAULT_TANGENT),
            bitangent: attr(&mesh.bitangents, i, DEFAULT_BITANGENT),
        })
        .collect()
}

/// An immutable GPU-resident vertex/index buffer pair. Owned exclusively by
/// the Renderable that carries it; wgpu releases the buffers exactly once
/// when the value drops at asset teardown.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    /// Upload a CPU mesh to the GPU
    pub fn upload(device: &wgpu::Device, label: &str, mesh: &Mesh) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }

    /// Upload an imported mesh primitive
    pub fn upload_imported(device: &wgpu::Device, label: &str, imported: &ImportedMesh) -> Self {
        let mesh = Mesh {
            vertices: build_vertices(imported),
            indices: imported.indices.clone(),
        };
        Self::upload(device, label, &mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_vertices_substitutes_defaults() {
        let imported = ImportedMesh {
            name: "partial".to_string(),
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]], // short on purpose
            uvs: Vec::new(),
            tangents: Vec::new(),
            bitangents: Vec::new(),
            indices: vec![0, 1, 2],
            material_index: None,
        };

        let vertices = build_vertices(&imported);
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertices[1].normal, DEFAULT_NORMAL);
        assert_eq!(vertices[2].uv, DEFAULT_UV);
        assert_eq!(vertices[2].tangent, DEFAULT_TANGENT);
        assert_eq!(vertices[2].bitangent, DEFAULT_BITANGENT);
    }

    #[test]
    fn test_vertex_layout_stride() {
        // 14 floats per vertex; the attribute layout must agree
        assert_eq!(std::mem::size_of::<Vertex>(), 14 * 4);
        assert_eq!(Vertex::desc().array_stride, 14 * 4);
    }
}
