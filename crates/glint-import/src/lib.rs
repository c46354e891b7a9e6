//! Glint Import - CPU-side asset importing
//!
//! Converts a glTF/GLB scene graph into flat, GPU-ready records: one
//! [`ImportedMesh`] per primitive with a complete attribute set (defaults
//! substituted where the file is silent) and one [`ImportedMaterial`] per
//! material with its raw texture channels. No GPU types appear here; the
//! renderer crate uploads the records.

mod gltf_import;
mod postprocess;
mod types;

pub use gltf_import::import_scene;
pub use postprocess::{compute_tangent_space, generate_flat_normals, triangulate, Topology};
pub use types::{
    ImportedImage, ImportedMaterial, ImportedMesh, MeshBounds, SceneImport, TextureRef,
    DEFAULT_BITANGENT, DEFAULT_NORMAL, DEFAULT_TANGENT, DEFAULT_UV,
};
