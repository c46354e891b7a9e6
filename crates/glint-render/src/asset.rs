//! Imported assets: flat lists of drawable/material pairs with one
//! editable transform per asset

use crate::material::{resolve_material, Material, TextureSlot};
use crate::mesh::GpuMesh;
use crate::pipeline::{RenderPipeline, TransformUniforms};
use crate::texture_cache::TextureCache;
use glint_core::{Result, Transform, Vec3};
use glint_import::import_scene;
use log::info;
use std::path::Path;
use wgpu::util::DeviceExt;

/// One drawable with its material and per-draw GPU state. The mesh buffers
/// are owned exclusively here and released once, when the Renderable drops.
pub struct Renderable {
    pub mesh: GpuMesh,
    pub material: Material,
    pub transform_buffer: wgpu::Buffer,
    pub transform_bind_group: wgpu::BindGroup,
    pub material_buffer: wgpu::Buffer,
    pub material_bind_group: wgpu::BindGroup,
}

impl Renderable {
    pub fn new(
        device: &wgpu::Device,
        pipeline: &RenderPipeline,
        cache: &TextureCache,
        mesh: GpuMesh,
        material: Material,
    ) -> Self {
        let transform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Renderable Transform Buffer"),
            contents: bytemuck::cast_slice(&[TransformUniforms::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let transform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &pipeline.transform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: transform_buffer.as_entire_binding(),
            }],
            label: Some("Renderable Transform Bind Group"),
        });

        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Renderable Material Buffer"),
            contents: bytemuck::cast_slice(&[material.uniforms()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let material_bind_group =
            create_material_bind_group(device, pipeline, cache, &material, &material_buffer);

        Self {
            mesh,
            material,
            transform_buffer,
            transform_bind_group,
            material_buffer,
            material_bind_group,
        }
    }

    /// Rewrite the material uniforms and rebuild the texture bindings after
    /// a slot changed
    pub fn refresh_material(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pipeline: &RenderPipeline,
        cache: &TextureCache,
    ) {
        queue.write_buffer(
            &self.material_buffer,
            0,
            bytemuck::cast_slice(&[self.material.uniforms()]),
        );
        self.material_bind_group = create_material_bind_group(
            device,
            pipeline,
            cache,
            &self.material,
            &self.material_buffer,
        );
    }
}

/// Build the material bind group. Absent slots bind the 1x1 defaults to
/// satisfy the layout; their presence flags are zero, so the shader never
/// reads them.
fn create_material_bind_group(
    device: &wgpu::Device,
    pipeline: &RenderPipeline,
    cache: &TextureCache,
    material: &Material,
    material_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    let slot_texture = |slot: TextureSlot| {
        material.texture(slot).cloned().unwrap_or_else(|| match slot {
            TextureSlot::Normal => cache.default_normal.clone(),
            _ => cache.default_white.clone(),
        })
    };
    let textures: Vec<_> = TextureSlot::ALL.iter().map(|&s| slot_texture(s)).collect();

    let mut entries = vec![wgpu::BindGroupEntry {
        binding: 0,
        resource: material_buffer.as_entire_binding(),
    }];
    for (i, texture) in textures.iter().enumerate() {
        entries.push(wgpu::BindGroupEntry {
            binding: 1 + i as u32 * 2,
            resource: wgpu::BindingResource::TextureView(&texture.view),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: 2 + i as u32 * 2,
            resource: wgpu::BindingResource::Sampler(&texture.sampler),
        });
    }

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &pipeline.material_bind_group_layout,
        entries: &entries,
        label: Some("Renderable Material Bind Group"),
    })
}

/// One imported asset instance: its renderables plus an editable
/// position/rotation/scale triple and a loaded flag
pub struct Asset {
    pub name: String,
    pub renderables: Vec<Renderable>,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub loaded: bool,
}

impl Asset {
    pub fn unloaded(name: &str) -> Self {
        Self {
            name: name.to_string(),
            renderables: Vec::new(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            loaded: false,
        }
    }

    /// World matrix derived on demand from the current transform fields.
    /// Never cached — the fields can change every frame.
    pub fn world_matrix(&self) -> [[f32; 4]; 4] {
        Transform {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
        }
        .to_matrix()
    }

    /// Release all drawables and reset to the unloaded state. The texture
    /// cache is deliberately left untouched so a reload of the same path
    /// reuses its entries.
    pub fn clear(&mut self) {
        self.renderables.clear();
        self.loaded = false;
    }
}

/// Import an asset file and upload it. All parsing happens before the first
/// GPU allocation, so a failed import allocates nothing and the returned
/// error leaves prior state untouched. Texture failures inside material
/// resolution only degrade their slot.
pub fn load_asset(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipeline: &RenderPipeline,
    cache: &mut TextureCache,
    path: &Path,
) -> Result<Asset> {
    let import = import_scene(path)?;

    let name = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("asset")
        .to_string();

    let mut renderables = Vec::with_capacity(import.meshes.len());
    for (i, mesh) in import.meshes.iter().enumerate() {
        let material = resolve_material(
            device,
            queue,
            cache,
            &import,
            mesh.material_index.and_then(|m| import.materials.get(m)),
        );
        let label = format!("{}/{}", name, i);
        let gpu_mesh = GpuMesh::upload_imported(device, &label, mesh);
        renderables.push(Renderable::new(device, pipeline, cache, gpu_mesh, material));
    }

    info!("loaded asset '{}' ({} renderables)", name, renderables.len());

    Ok(Asset {
        name,
        renderables,
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
        loaded: true,
    })
}
