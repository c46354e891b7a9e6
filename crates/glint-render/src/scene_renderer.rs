//! Frame orchestration
//!
//! Sequences each frame: one depth-only shadow pass per active light, the
//! main color pass (renderables, then the environment backdrop at the far
//! plane), and an optional shadow-map debug overlay. Render state for a
//! frame comes exclusively from one [`SceneParameters`] snapshot, so the
//! shadow and color passes can never read torn half-edited values.

use crate::asset::{load_asset, Asset, Renderable};
use crate::camera::Camera;
use crate::context::RenderContext;
use crate::debug::{DebugDepthPipeline, DebugDepthUniforms};
use crate::environment::{Environment, EnvironmentSource, GradientSky};
use crate::light::{LightDescriptor, ShadowProjection, MAX_SHADOW_LIGHTS};
use crate::material::{Material, TextureSlot};
use crate::mesh::{GpuMesh, Mesh};
use crate::pipeline::{LightGpu, LightUniforms, RenderPipeline, TransformUniforms};
use crate::shadow::{ShadowDrawUniforms, ShadowPass, DEFAULT_SHADOW_RESOLUTION};
use crate::skybox_pipeline::{SkyboxPipeline, SkyboxUniforms};
use crate::texture_cache::TextureCache;
use glint_core::{mat4_inverse, Vec3};
use log::{error, info};
use std::path::Path;
use wgpu::util::DeviceExt;

/// Reflectance model used by the color pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadingModel {
    /// Classic diffuse/specular with strength and shininess scalars
    BlinnPhong,
    /// Metallic/roughness Cook-Torrance
    #[default]
    MetallicRoughness,
}

impl ShadingModel {
    pub fn as_u32(self) -> u32 {
        match self {
            Self::BlinnPhong => 0,
            Self::MetallicRoughness => 1,
        }
    }
}

/// Shadow tunables shared by all lights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    pub enabled: bool,
    /// Depth comparison bias against self-shadowing acne
    pub bias: f32,
    pub projection: ShadowProjection,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bias: 0.005,
            projection: ShadowProjection::default(),
        }
    }
}

/// Immutable-per-frame scene state. The control surface mutates a staging
/// copy between frames; the orchestrator receives one snapshot per frame
/// and reads nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneParameters {
    pub lights: [LightDescriptor; MAX_SHADOW_LIGHTS],
    pub shadow: ShadowSettings,
    pub shading_model: ShadingModel,
    pub specular_strength: f32,
    pub specular_shininess: f32,
    pub ambient_strength: f32,
    pub environment_intensity: f32,
    pub ao_strength: f32,
    pub ao_power: f32,
    pub clear_color: [f32; 3],
    /// Paint this light's shadow depth map over the viewport
    pub debug_shadow_layer: Option<usize>,
}

impl Default for SceneParameters {
    fn default() -> Self {
        let key = LightDescriptor::directional(Vec3::new(-5.0, 10.0, -5.0), Vec3::ZERO);
        let mut fill = LightDescriptor::point(Vec3::new(6.0, 4.0, 3.0));
        fill.enabled = false;

        Self {
            lights: [key, fill],
            shadow: ShadowSettings::default(),
            shading_model: ShadingModel::default(),
            specular_strength: 0.5,
            specular_shininess: 32.0,
            ambient_strength: 0.3,
            environment_intensity: 1.0,
            ao_strength: 1.0,
            ao_power: 1.0,
            clear_color: [0.1, 0.1, 0.1],
            debug_shadow_layer: None,
        }
    }
}

impl SceneParameters {
    /// Snapshot the per-frame lighting uniforms. Disabled lights stay in
    /// their slot (the binding order is fixed) but are flagged inactive, so
    /// their contribution is exactly zero rather than stale.
    pub fn light_uniforms(&self) -> LightUniforms {
        let mut uniforms = LightUniforms {
            ambient_strength: self.ambient_strength,
            environment_intensity: self.environment_intensity,
            shadow_bias: self.shadow.bias,
            shading_model: self.shading_model.as_u32(),
            specular_strength: self.specular_strength,
            specular_shininess: self.specular_shininess,
            ao_strength: self.ao_strength,
            ao_power: self.ao_power,
            shadows_enabled: self.shadow.enabled as u32,
            ..Default::default()
        };
        for (slot, light) in uniforms.lights.iter_mut().zip(self.lights.iter()) {
            *slot = LightGpu::from_descriptor(light, &self.shadow.projection);
        }
        uniforms
    }
}

/// Renders imported assets with shadow mapping and environment lighting
pub struct SceneRenderer {
    pipeline: RenderPipeline,
    shadow_pass: ShadowPass,
    skybox_pipeline: SkyboxPipeline,
    skybox_uniform_buffer: wgpu::Buffer,
    skybox_uniform_bind_group: wgpu::BindGroup,
    skybox_texture_bind_group: wgpu::BindGroup,
    debug_pipeline: DebugDepthPipeline,
    debug_uniform_buffer: wgpu::Buffer,
    debug_bind_group: wgpu::BindGroup,
    light_buffer: wgpu::Buffer,
    lighting_bind_group: wgpu::BindGroup,
    texture_cache: TextureCache,
    environment: Environment,
    /// Environment generation the lighting/backdrop bind groups were built
    /// against; a mismatch forces a rebuild before the next frame
    bound_env_generation: u64,
    sky: GradientSky,
    assets: Vec<Asset>,
}

impl SceneRenderer {
    pub fn new(context: &RenderContext) -> Self {
        let device = &context.device;
        let queue = &context.queue;
        let format = context.config.format;

        let pipeline = RenderPipeline::new(device, format);
        let shadow_pass = ShadowPass::new(device, DEFAULT_SHADOW_RESOLUTION);
        let skybox_pipeline = SkyboxPipeline::new(device, format);
        let debug_pipeline = DebugDepthPipeline::new(device, format);
        let texture_cache = TextureCache::new(device, queue);

        let sky = GradientSky::default();
        let environment = Environment::new(device, queue, &sky);

        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Uniform Buffer"),
            contents: bytemuck::cast_slice(&[LightUniforms::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let skybox_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Skybox Uniform Buffer"),
            contents: bytemuck::cast_slice(&[SkyboxUniforms {
                inv_view_proj: TransformUniforms::new().view_proj,
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let skybox_uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &skybox_pipeline.uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: skybox_uniform_buffer.as_entire_binding(),
            }],
            label: Some("Skybox Uniform Bind Group"),
        });

        let debug_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Debug Depth Uniform Buffer"),
            contents: bytemuck::cast_slice(&[DebugDepthUniforms {
                layer: 0,
                _pad: [0; 3],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let lighting_bind_group = create_lighting_bind_group(
            device,
            &pipeline,
            &light_buffer,
            &shadow_pass,
            &environment,
        );
        let skybox_texture_bind_group =
            create_skybox_texture_bind_group(device, &skybox_pipeline, &environment);
        let debug_bind_group =
            create_debug_bind_group(device, &debug_pipeline, &debug_uniform_buffer, &shadow_pass);
        let bound_env_generation = environment.generation();

        Self {
            pipeline,
            shadow_pass,
            skybox_pipeline,
            skybox_uniform_buffer,
            skybox_uniform_bind_group,
            skybox_texture_bind_group,
            debug_pipeline,
            debug_uniform_buffer,
            debug_bind_group,
            light_buffer,
            lighting_bind_group,
            texture_cache,
            environment,
            bound_env_generation,
            sky,
            assets: Vec::new(),
        }
    }

    /// Import an asset file and add it to the scene. Failures are recovered
    /// here: the error is logged, no asset is added, and false is returned.
    pub fn load_asset(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, path: &Path) -> bool {
        match load_asset(device, queue, &self.pipeline, &mut self.texture_cache, path) {
            Ok(asset) => {
                self.assets.push(asset);
                true
            }
            Err(e) => {
                error!("asset load failed: {}", e);
                false
            }
        }
    }

    /// Add a procedural mesh as a single-renderable asset
    pub fn add_mesh_asset(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        mesh: &Mesh,
        material: Material,
    ) -> usize {
        let gpu_mesh = GpuMesh::upload(device, name, mesh);
        let renderable =
            Renderable::new(device, &self.pipeline, &self.texture_cache, gpu_mesh, material);
        let mut asset = Asset::unloaded(name);
        asset.renderables.push(renderable);
        asset.loaded = true;
        self.assets.push(asset);
        self.assets.len() - 1
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut [Asset] {
        &mut self.assets
    }

    /// Release an asset's drawables and reset it to unloaded. Its texture
    /// cache entries deliberately survive for reloads of the same path.
    pub fn clear_asset(&mut self, index: usize) {
        if let Some(asset) = self.assets.get_mut(index) {
            asset.clear();
        }
    }

    /// Load a texture file into one mesh's material slot. Returns false and
    /// leaves the slot untouched when the file cannot be decoded.
    pub fn set_mesh_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        asset_index: usize,
        mesh_index: usize,
        slot: TextureSlot,
        path: &Path,
    ) -> bool {
        let Some(texture) = self.texture_cache.load_file(device, queue, path) else {
            return false;
        };
        let Some(renderable) = self
            .assets
            .get_mut(asset_index)
            .and_then(|a| a.renderables.get_mut(mesh_index))
        else {
            return false;
        };
        renderable.material.set_texture(slot, texture);
        renderable.refresh_material(device, queue, &self.pipeline, &self.texture_cache);
        true
    }

    /// Remove a texture from one mesh's material slot
    pub fn clear_mesh_texture(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        asset_index: usize,
        mesh_index: usize,
        slot: TextureSlot,
    ) {
        if let Some(renderable) = self
            .assets
            .get_mut(asset_index)
            .and_then(|a| a.renderables.get_mut(mesh_index))
        {
            renderable.material.clear_texture(slot);
            renderable.refresh_material(device, queue, &self.pipeline, &self.texture_cache);
        }
    }

    /// Switch the environment source. A failed load falls back to the
    /// gradient sky and returns false; the replaced cubemap is released
    /// only after the next completed frame.
    pub fn set_environment(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: EnvironmentSource,
    ) -> bool {
        self.environment.set_source(device, queue, source, &self.sky)
    }

    pub fn environment_source(&self) -> &EnvironmentSource {
        self.environment.source()
    }

    pub fn texture_cache(&self) -> &TextureCache {
        &self.texture_cache
    }

    /// Recreate the shadow targets at a new resolution
    pub fn set_shadow_resolution(&mut self, device: &wgpu::Device, resolution: u32) {
        self.shadow_pass.set_resolution(device, resolution);
        self.rebuild_shadow_dependent_binds(device);
        info!("shadow resolution set to {}", self.shadow_pass.resolution);
    }

    fn rebuild_shadow_dependent_binds(&mut self, device: &wgpu::Device) {
        self.lighting_bind_group = create_lighting_bind_group(
            device,
            &self.pipeline,
            &self.light_buffer,
            &self.shadow_pass,
            &self.environment,
        );
        self.debug_bind_group = create_debug_bind_group(
            device,
            &self.debug_pipeline,
            &self.debug_uniform_buffer,
            &self.shadow_pass,
        );
    }

    /// Render one frame from a parameter snapshot
    pub fn render(
        &mut self,
        context: &RenderContext,
        camera: &Camera,
        params: &SceneParameters,
        target_view: &wgpu::TextureView,
    ) {
        let device = &context.device;
        let queue = &context.queue;

        // A replaced environment needs fresh bind groups before any pass
        // references the new cubemap
        if self.bound_env_generation != self.environment.generation() {
            self.lighting_bind_group = create_lighting_bind_group(
                device,
                &self.pipeline,
                &self.light_buffer,
                &self.shadow_pass,
                &self.environment,
            );
            self.skybox_texture_bind_group =
                create_skybox_texture_bind_group(device, &self.skybox_pipeline, &self.environment);
            self.bound_env_generation = self.environment.generation();
        }

        queue.write_buffer(
            &self.light_buffer,
            0,
            bytemuck::cast_slice(&[params.light_uniforms()]),
        );

        // Per-renderable transform uniforms from the current asset fields
        let view_proj = camera.view_projection_matrix();
        let camera_pos = camera.position_array();
        for asset in self.assets.iter().filter(|a| a.loaded) {
            let model = asset.world_matrix();
            let model_inv_transpose = transpose(&mat4_inverse(&model));
            let uniforms = TransformUniforms {
                view_proj,
                model,
                model_inv_transpose,
                camera_pos,
                _pad: 0.0,
            };
            for renderable in &asset.renderables {
                queue.write_buffer(
                    &renderable.transform_buffer,
                    0,
                    bytemuck::cast_slice(&[uniforms]),
                );
            }
        }

        // Shadow pass per active light, depth only, into that light's
        // dedicated layer. Material state is never bound here.
        if params.shadow.enabled {
            for (i, light) in params.lights.iter().take(MAX_SHADOW_LIGHTS).enumerate() {
                if !light.enabled {
                    continue;
                }
                let light_view_proj = light.light_space_matrix(&params.shadow.projection);
                self.render_shadow_layer(device, queue, i, light_view_proj);
            }
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Color Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: params.clear_color[0] as f64,
                            g: params.clear_color[1] as f64,
                            b: params.clear_color[2] as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &context.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(2, &self.lighting_bind_group, &[]);

            for asset in self.assets.iter().filter(|a| a.loaded) {
                for renderable in &asset.renderables {
                    pass.set_bind_group(0, &renderable.transform_bind_group, &[]);
                    pass.set_bind_group(1, &renderable.material_bind_group, &[]);
                    pass.set_vertex_buffer(0, renderable.mesh.vertex_buffer.slice(..));
                    pass.set_index_buffer(
                        renderable.mesh.index_buffer.slice(..),
                        wgpu::IndexFormat::Uint32,
                    );
                    pass.draw_indexed(0..renderable.mesh.index_count, 0, 0..1);
                }
            }

            // Environment backdrop last, at the far plane behind everything
            queue.write_buffer(
                &self.skybox_uniform_buffer,
                0,
                bytemuck::cast_slice(&[SkyboxUniforms {
                    inv_view_proj: camera.backdrop_inverse_view_projection(),
                }]),
            );
            pass.set_pipeline(&self.skybox_pipeline.pipeline);
            pass.set_bind_group(0, &self.skybox_uniform_bind_group, &[]);
            pass.set_bind_group(1, &self.skybox_texture_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        // Optional debug overlay: paint one shadow depth layer over the view
        if let Some(layer) = params.debug_shadow_layer {
            let layer = layer.min(MAX_SHADOW_LIGHTS - 1) as u32;
            queue.write_buffer(
                &self.debug_uniform_buffer,
                0,
                bytemuck::cast_slice(&[DebugDepthUniforms {
                    layer,
                    _pad: [0; 3],
                }]),
            );

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Debug Depth Overlay"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.debug_pipeline.pipeline);
            pass.set_bind_group(0, &self.debug_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        queue.submit(std::iter::once(encoder.finish()));

        // The frame that last referenced any retired environment texture is
        // now submitted; releasing here is safe, mid-frame would not be
        self.environment.end_frame();
    }

    fn render_shadow_layer(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layer: usize,
        light_view_proj: [[f32; 4]; 4],
    ) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Shadow Encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_pass.layer_views[layer],
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.shadow_pass.pipeline);

            for asset in self.assets.iter().filter(|a| a.loaded) {
                let model = asset.world_matrix();
                for renderable in &asset.renderables {
                    let uniforms = ShadowDrawUniforms {
                        light_view_proj,
                        model,
                    };
                    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Shadow Draw Uniform"),
                        contents: bytemuck::cast_slice(&[uniforms]),
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                        layout: &self.shadow_pass.bind_group_layout,
                        entries: &[wgpu::BindGroupEntry {
                            binding: 0,
                            resource: buffer.as_entire_binding(),
                        }],
                        label: Some("Shadow Draw Bind Group"),
                    });

                    pass.set_bind_group(0, &bind_group, &[]);
                    pass.set_vertex_buffer(0, renderable.mesh.vertex_buffer.slice(..));
                    pass.set_index_buffer(
                        renderable.mesh.index_buffer.slice(..),
                        wgpu::IndexFormat::Uint32,
                    );
                    pass.draw_indexed(0..renderable.mesh.index_count, 0, 0..1);
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }
}

fn create_lighting_bind_group(
    device: &wgpu::Device,
    pipeline: &RenderPipeline,
    light_buffer: &wgpu::Buffer,
    shadow_pass: &ShadowPass,
    environment: &Environment,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &pipeline.lighting_bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_pass.array_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&shadow_pass.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&environment.current().view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(&environment.current().sampler),
            },
        ],
        label: Some("Lighting Bind Group"),
    })
}

fn create_skybox_texture_bind_group(
    device: &wgpu::Device,
    skybox_pipeline: &SkyboxPipeline,
    environment: &Environment,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &skybox_pipeline.texture_bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&environment.current().view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&environment.current().sampler),
            },
        ],
        label: Some("Skybox Texture Bind Group"),
    })
}

fn create_debug_bind_group(
    device: &wgpu::Device,
    debug_pipeline: &DebugDepthPipeline,
    uniform_buffer: &wgpu::Buffer,
    shadow_pass: &ShadowPass,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &debug_pipeline.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_pass.array_view),
            },
        ],
        label: Some("Debug Depth Bind Group"),
    })
}

/// Transpose a column-major 4x4 matrix
fn transpose(m: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut out = [[0.0f32; 4]; 4];
    for col in 0..4 {
        for row in 0..4 {
            out[col][row] = m[row][col];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_light_snapshot_is_inactive() {
        let mut params = SceneParameters::default();
        params.lights[1].enabled = false;
        let uniforms = params.light_uniforms();
        assert_eq!(uniforms.lights[1].active, 0);

        params.lights[1].enabled = true;
        let uniforms = params.light_uniforms();
        assert_eq!(uniforms.lights[1].active, 1);
    }

    #[test]
    fn test_snapshot_carries_shadow_settings() {
        let mut params = SceneParameters::default();
        params.shadow.bias = 0.01;
        params.shadow.enabled = false;
        params.shading_model = ShadingModel::BlinnPhong;
        let uniforms = params.light_uniforms();
        assert_eq!(uniforms.shadow_bias, 0.01);
        assert_eq!(uniforms.shadows_enabled, 0);
        assert_eq!(uniforms.shading_model, 0);
    }

    #[test]
    fn test_transpose_roundtrip() {
        let m = [
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
            [13.0, 14.0, 15.0, 16.0],
        ];
        assert_eq!(transpose(&transpose(&m)), m);
        assert_eq!(transpose(&m)[0][1], m[1][0]);
    }
}
