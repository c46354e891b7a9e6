//! Import record types

use std::path::PathBuf;

/// Default attribute values substituted when a source file is silent.
/// Chosen to avoid degenerate shading math, not to be physically meaningful.
pub const DEFAULT_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];
pub const DEFAULT_UV: [f32; 2] = [0.0, 0.0];
pub const DEFAULT_TANGENT: [f32; 3] = [1.0, 0.0, 0.0];
pub const DEFAULT_BITANGENT: [f32; 3] = [0.0, 1.0, 0.0];

/// Result of importing a scene file: every mesh primitive flattened into one
/// list, in node-enumeration order. The node hierarchy has no other bearing
/// on the output — this renderer has one flat matrix per object.
#[derive(Debug)]
pub struct SceneImport {
    pub source_path: PathBuf,
    /// Directory external texture URIs resolve against
    pub base_dir: PathBuf,
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
    /// Embedded (buffer-view) images, still in their container encoding
    pub images: Vec<ImportedImage>,
}

impl SceneImport {
    /// Compute the combined bounding box across all meshes
    pub fn bounds(&self) -> Option<MeshBounds> {
        self.meshes
            .iter()
            .filter_map(|m| m.bounds())
            .reduce(|a, b| a.union(&b))
    }
}

/// An imported mesh primitive. All attribute arrays have the same length as
/// `positions`; missing source attributes are filled with defaults or
/// generated during import.
#[derive(Debug, Clone)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub tangents: Vec<[f32; 3]>,
    pub bitangents: Vec<[f32; 3]>,
    /// Triangle list, winding preserved from the source
    pub indices: Vec<u32>,
    pub material_index: Option<usize>,
}

impl ImportedMesh {
    /// Compute the axis-aligned bounding box of this mesh's vertices
    pub fn bounds(&self) -> Option<MeshBounds> {
        MeshBounds::from_positions(&self.positions)
    }

    /// True when every index references a vertex inside this mesh's own
    /// vertex array
    pub fn indices_in_bounds(&self) -> bool {
        let count = self.positions.len() as u32;
        self.indices.iter().all(|&i| i < count)
    }
}

/// Axis-aligned bounding box computed from vertex positions
#[derive(Debug, Clone, Copy)]
pub struct MeshBounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl MeshBounds {
    /// Compute bounds from a set of vertex positions
    pub fn from_positions(positions: &[[f32; 3]]) -> Option<Self> {
        if positions.is_empty() {
            return None;
        }
        let mut min = positions[0];
        let mut max = positions[0];
        for p in positions.iter().skip(1) {
            for i in 0..3 {
                if p[i] < min[i] {
                    min[i] = p[i];
                }
                if p[i] > max[i] {
                    max[i] = p[i];
                }
            }
        }
        Some(Self { min, max })
    }

    /// Size along each axis
    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Merge with another bounds to get the union
    pub fn union(&self, other: &MeshBounds) -> MeshBounds {
        MeshBounds {
            min: [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            max: [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        }
    }
}

/// Where a material texture's pixels come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureRef {
    /// External file, already resolved against the asset's directory
    Path(PathBuf),
    /// Index into [`SceneImport::images`]
    Embedded(usize),
}

/// An embedded image extracted from a binary buffer view. `bytes` are still
/// in the container encoding (PNG/JPEG); the texture cache decodes them.
#[derive(Debug, Clone)]
pub struct ImportedImage {
    /// Synthetic cache key, unique per source file and image index
    pub key: String,
    pub bytes: Vec<u8>,
}

/// Raw material channels harvested from the source file.
///
/// Equivalent channels are kept separate here; the precedence rules that
/// collapse them into the five renderer slots live in the accessor methods
/// so they can be tested without any file or GPU.
#[derive(Debug, Clone, Default)]
pub struct ImportedMaterial {
    pub name: String,
    /// Legacy diffuse color (specular-glossiness workflow)
    pub diffuse_color: Option<[f32; 4]>,
    /// Modern base color (metallic-roughness workflow)
    pub base_color: Option<[f32; 4]>,
    pub metallic: Option<f32>,
    pub roughness: Option<f32>,
    pub diffuse_texture: Option<TextureRef>,
    pub base_color_texture: Option<TextureRef>,
    pub normal_texture: Option<TextureRef>,
    /// Bump-as-normal fallback; glTF itself never fills this channel
    pub height_texture: Option<TextureRef>,
    pub metallic_texture: Option<TextureRef>,
    pub roughness_texture: Option<TextureRef>,
    pub occlusion_texture: Option<TextureRef>,
    /// Ambient-occlusion fallback; glTF itself never fills this channel
    pub light_map_texture: Option<TextureRef>,
}

impl ImportedMaterial {
    /// Albedo tint: legacy diffuse first, base color overwrites when present.
    /// White when neither channel exists.
    pub fn tint(&self) -> [f32; 4] {
        let mut tint = [1.0, 1.0, 1.0, 1.0];
        if let Some(diffuse) = self.diffuse_color {
            tint = diffuse;
        }
        if let Some(base) = self.base_color {
            tint = base;
        }
        tint
    }

    pub fn metallic_factor(&self) -> f32 {
        self.metallic.unwrap_or(0.0)
    }

    pub fn roughness_factor(&self) -> f32 {
        self.roughness.unwrap_or(0.5)
    }

    /// Albedo slot: diffuse texture, else base-color texture
    pub fn albedo_source(&self) -> Option<&TextureRef> {
        self.diffuse_texture
            .as_ref()
            .or(self.base_color_texture.as_ref())
    }

    /// Normal slot: normal texture, else height texture (bump-as-normal)
    pub fn normal_source(&self) -> Option<&TextureRef> {
        self.normal_texture.as_ref().or(self.height_texture.as_ref())
    }

    pub fn metallic_source(&self) -> Option<&TextureRef> {
        self.metallic_texture.as_ref()
    }

    pub fn roughness_source(&self) -> Option<&TextureRef> {
        self.roughness_texture.as_ref()
    }

    /// Occlusion slot: dedicated AO texture, else light-map texture
    pub fn occlusion_source(&self) -> Option<&TextureRef> {
        self.occlusion_texture
            .as_ref()
            .or(self.light_map_texture.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_ref(name: &str) -> TextureRef {
        TextureRef::Path(PathBuf::from(name))
    }

    #[test]
    fn test_tint_base_color_overwrites_diffuse() {
        let mat = ImportedMaterial {
            diffuse_color: Some([0.2, 0.3, 0.4, 1.0]),
            base_color: Some([0.9, 0.8, 0.7, 1.0]),
            ..Default::default()
        };
        assert_eq!(mat.tint(), [0.9, 0.8, 0.7, 1.0]);

        let legacy_only = ImportedMaterial {
            diffuse_color: Some([0.2, 0.3, 0.4, 1.0]),
            ..Default::default()
        };
        assert_eq!(legacy_only.tint(), [0.2, 0.3, 0.4, 1.0]);

        assert_eq!(ImportedMaterial::default().tint(), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_scalar_fallbacks() {
        let mat = ImportedMaterial::default();
        assert_eq!(mat.metallic_factor(), 0.0);
        assert_eq!(mat.roughness_factor(), 0.5);
    }

    #[test]
    fn test_texture_slot_precedence() {
        let mat = ImportedMaterial {
            diffuse_texture: Some(path_ref("diffuse.png")),
            base_color_texture: Some(path_ref("base.png")),
            height_texture: Some(path_ref("bump.png")),
            light_map_texture: Some(path_ref("lightmap.png")),
            ..Default::default()
        };
        assert_eq!(mat.albedo_source(), Some(&path_ref("diffuse.png")));
        assert_eq!(mat.normal_source(), Some(&path_ref("bump.png")));
        assert_eq!(mat.occlusion_source(), Some(&path_ref("lightmap.png")));

        let modern = ImportedMaterial {
            base_color_texture: Some(path_ref("base.png")),
            normal_texture: Some(path_ref("normal.png")),
            height_texture: Some(path_ref("bump.png")),
            occlusion_texture: Some(path_ref("ao.png")),
            light_map_texture: Some(path_ref("lightmap.png")),
            ..Default::default()
        };
        assert_eq!(modern.albedo_source(), Some(&path_ref("base.png")));
        assert_eq!(modern.normal_source(), Some(&path_ref("normal.png")));
        assert_eq!(modern.occlusion_source(), Some(&path_ref("ao.png")));
    }

    #[test]
    fn test_index_bounds_check() {
        let mesh = ImportedMesh {
            name: "tri".to_string(),
            positions: vec![[0.0; 3]; 3],
            normals: vec![DEFAULT_NORMAL; 3],
            uvs: vec![DEFAULT_UV; 3],
            tangents: vec![DEFAULT_TANGENT; 3],
            bitangents: vec![DEFAULT_BITANGENT; 3],
            indices: vec![0, 1, 2],
            material_index: None,
        };
        assert!(mesh.indices_in_bounds());

        let mut bad = mesh.clone();
        bad.indices = vec![0, 1, 3];
        assert!(!bad.indices_in_bounds());
    }

    #[test]
    fn test_bounds_union() {
        let a = MeshBounds::from_positions(&[[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]]).unwrap();
        let b = MeshBounds::from_positions(&[[-1.0, 0.5, 0.0], [0.5, 0.5, 4.0]]).unwrap();
        let u = a.union(&b);
        assert_eq!(u.min, [-1.0, 0.0, 0.0]);
        assert_eq!(u.max, [1.0, 2.0, 4.0]);
        assert_eq!(u.size(), [2.0, 2.0, 4.0]);
    }
}
