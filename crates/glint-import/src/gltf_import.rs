//! glTF/GLB file importer

use crate::postprocess::{compute_tangent_space, generate_flat_normals, triangulate, Topology};
use crate::types::{
    ImportedImage, ImportedMaterial, ImportedMesh, SceneImport, TextureRef, DEFAULT_BITANGENT,
    DEFAULT_NORMAL, DEFAULT_TANGENT, DEFAULT_UV,
};
use glint_core::{GlintError, Result};
use gltf::Gltf;
use log::{info, warn};
use std::path::Path;

/// Import a glTF or GLB file into flat mesh and material records.
///
/// The node hierarchy is walked with an explicit worklist (no recursion) and
/// every mesh primitive is appended to one flat list in enumeration order.
/// Fails when the file cannot be parsed, its buffers cannot be resolved, or
/// it contains no scene root; no GPU resources exist at this stage, so a
/// failed import leaves nothing behind.
pub fn import_scene<P: AsRef<Path>>(path: P) -> Result<SceneImport> {
    let path = path.as_ref();
    let gltf = Gltf::open(path)
        .map_err(|e| GlintError::Import(format!("failed to parse '{}': {}", path.display(), e)))?;

    let base_dir = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let document = gltf.document;
    let buffers = gltf::import_buffers(&document, Some(&base_dir), gltf.blob)
        .map_err(|e| GlintError::Import(format!("failed to read buffers: {}", e)))?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| GlintError::Import(format!("'{}' has no scene root", path.display())))?;

    // Resolve every image to either an external path or embedded bytes once,
    // so material channels can share the references.
    let mut images = Vec::new();
    let image_refs = collect_image_refs(&document, &buffers, &base_dir, &mut images);

    let materials: Vec<ImportedMaterial> = document
        .materials()
        .map(|m| harvest_material(&m, &image_refs))
        .collect();

    // Worklist traversal of the node tree; hierarchy affects enumeration
    // order only, all primitives flatten into one list.
    let mut meshes = Vec::new();
    let mut stack: Vec<gltf::Node> = scene.nodes().collect();
    stack.reverse();

    while let Some(node) = stack.pop() {
        if let Some(mesh) = node.mesh() {
            let mesh_name = mesh
                .name()
                .map(String::from)
                .unwrap_or_else(|| format!("mesh_{}", mesh.index()));

            for primitive in mesh.primitives() {
                if let Some(imported) = read_primitive(&mesh_name, &primitive, &buffers)? {
                    meshes.push(imported);
                }
            }
        }
        let children: Vec<gltf::Node> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }

    info!(
        "imported {}: {} meshes, {} materials, {} embedded images",
        path.display(),
        meshes.len(),
        materials.len(),
        images.len()
    );

    Ok(SceneImport {
        source_path: path.to_path_buf(),
        base_dir,
        meshes,
        materials,
        images,
    })
}

/// Extract one mesh primitive, substituting defaults for absent attributes.
/// Returns `Ok(None)` for topologies a triangle renderer cannot draw.
fn read_primitive(
    mesh_name: &str,
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Result<Option<ImportedMesh>> {
    let topology = match primitive.mode() {
        gltf::mesh::Mode::Triangles => Topology::TriangleList,
        gltf::mesh::Mode::TriangleStrip => Topology::TriangleStrip,
        gltf::mesh::Mode::TriangleFan => Topology::TriangleFan,
        other => {
            warn!("skipping non-triangle primitive in '{}' ({:?})", mesh_name, other);
            return Ok(None);
        }
    };

    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|iter| iter.collect())
        .unwrap_or_default();
    if positions.is_empty() {
        warn!("skipping primitive without positions in '{}'", mesh_name);
        return Ok(None);
    }

    // Index list: flattened per-face indices with winding preserved;
    // unindexed primitives get the sequential list.
    let raw_indices: Vec<u32> = reader
        .read_indices()
        .map(|iter| iter.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());
    let indices = triangulate(topology, raw_indices);

    // Texture coordinates, V axis flipped to the renderer's convention
    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map(|iter| iter.into_f32().map(|uv| [uv[0], 1.0 - uv[1]]).collect())
        .unwrap_or_else(|| vec![DEFAULT_UV; positions.len()]);

    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|iter| iter.collect())
        .unwrap_or_else(|| generate_flat_normals(&positions, &indices));

    // Tangent space: taken from the file when authored (bitangent rebuilt
    // from the w handedness), generated from UV gradients otherwise.
    let (tangents, bitangents) = match reader.read_tangents() {
        Some(iter) => {
            let raw: Vec<[f32; 4]> = iter.collect();
            let mut tangents = Vec::with_capacity(raw.len());
            let mut bitangents = Vec::with_capacity(raw.len());
            for (i, t) in raw.iter().enumerate() {
                let tangent = [t[0], t[1], t[2]];
                let n = normals.get(i).copied().unwrap_or(DEFAULT_NORMAL);
                let b = [
                    (n[1] * tangent[2] - n[2] * tangent[1]) * t[3],
                    (n[2] * tangent[0] - n[0] * tangent[2]) * t[3],
                    (n[0] * tangent[1] - n[1] * tangent[0]) * t[3],
                ];
                tangents.push(tangent);
                bitangents.push(b);
            }
            (tangents, bitangents)
        }
        None => compute_tangent_space(&positions, &normals, &uvs, &indices),
    };

    let imported = ImportedMesh {
        name: mesh_name.to_string(),
        normals: resize_attr(normals, positions.len(), DEFAULT_NORMAL),
        uvs: resize_attr(uvs, positions.len(), DEFAULT_UV),
        tangents: resize_attr(tangents, positions.len(), DEFAULT_TANGENT),
        bitangents: resize_attr(bitangents, positions.len(), DEFAULT_BITANGENT),
        positions,
        indices,
        material_index: primitive.material().index(),
    };

    if !imported.indices_in_bounds() {
        return Err(GlintError::Import(format!(
            "primitive in '{}' references vertices outside its vertex array",
            mesh_name
        )));
    }

    Ok(Some(imported))
}

/// Force an attribute array to the vertex count, padding with the default
fn resize_attr<T: Copy>(mut values: Vec<T>, count: usize, default: T) -> Vec<T> {
    values.resize(count, default);
    values
}

/// Map every document image to a texture reference: external URIs resolve
/// against the asset directory, buffer-view images are copied out as
/// embedded bytes. Unsupported sources (data URIs) become `None` and the
/// referencing channel degrades to absent.
fn collect_image_refs(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    base_dir: &Path,
    images: &mut Vec<ImportedImage>,
) -> Vec<Option<TextureRef>> {
    document
        .images()
        .map(|image| match image.source() {
            gltf::image::Source::Uri { uri, .. } => {
                if uri.starts_with("data:") {
                    warn!("data-URI image {} is not supported", image.index());
                    None
                } else {
                    Some(TextureRef::Path(base_dir.join(uri)))
                }
            }
            gltf::image::Source::View { view, .. } => {
                let buffer = &buffers[view.buffer().index()];
                let start = view.offset();
                let end = start + view.length();
                let Some(bytes) = buffer.get(start..end) else {
                    warn!("image {} buffer view out of range", image.index());
                    return None;
                };
                images.push(ImportedImage {
                    key: format!("#image{}", image.index()),
                    bytes: bytes.to_vec(),
                });
                Some(TextureRef::Embedded(images.len() - 1))
            }
        })
        .collect()
}

/// Read the raw material channels. The legacy specular-glossiness extension
/// supplies the diffuse channels; the metallic-roughness channels are read
/// only for materials authored in the modern workflow, so the extractor's
/// precedence rules see each channel only where the document carries it.
fn harvest_material(
    material: &gltf::Material,
    image_refs: &[Option<TextureRef>],
) -> ImportedMaterial {
    let tex_ref = |texture: gltf::Texture| -> Option<TextureRef> {
        image_refs
            .get(texture.source().index())
            .cloned()
            .flatten()
    };

    let mut imported = ImportedMaterial {
        name: material
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or(0))),
        ..Default::default()
    };

    if let Some(sg) = material.pbr_specular_glossiness() {
        imported.diffuse_color = Some(sg.diffuse_factor());
        imported.diffuse_texture = sg.diffuse_texture().and_then(|info| tex_ref(info.texture()));
    } else {
        let pbr = material.pbr_metallic_roughness();
        imported.base_color = Some(pbr.base_color_factor());
        imported.metallic = Some(pbr.metallic_factor());
        imported.roughness = Some(pbr.roughness_factor());
        imported.base_color_texture = pbr
            .base_color_texture()
            .and_then(|info| tex_ref(info.texture()));

        // glTF packs metallic (blue) and roughness (green) into one image;
        // it fills both renderer slots.
        let mr_texture = pbr
            .metallic_roughness_texture()
            .and_then(|info| tex_ref(info.texture()));
        imported.metallic_texture = mr_texture.clone();
        imported.roughness_texture = mr_texture;
    }

    imported.normal_texture = material
        .normal_texture()
        .and_then(|info| tex_ref(info.texture()));
    imported.occlusion_texture = material
        .occlusion_texture()
        .and_then(|info| tex_ref(info.texture()));

    imported
}
