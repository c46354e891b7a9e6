//! Render pipeline setup for the main color pass

use crate::light::{LightDescriptor, LightKind, ShadowProjection, MAX_SHADOW_LIGHTS};
use crate::mesh::Vertex;
use bytemuck::{Pod, Zeroable};

/// Transform uniform buffer data (bind group 0)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct TransformUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub model_inv_transpose: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub _pad: f32,
}

impl TransformUniforms {
    pub fn new() -> Self {
        let identity = [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ];
        Self {
            view_proj: identity,
            model: identity,
            model_inv_transpose: identity,
            camera_pos: [0.0, 0.0, 0.0],
            _pad: 0.0,
        }
    }
}

impl Default for TransformUniforms {
    fn default() -> Self {
        Self::new()
    }
}

/// Material uniform buffer data (bind group 1). The has_* flags mirror the
/// material's Option slots; the shader reads a slot's texture only behind
/// its flag.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub has_albedo_tex: u32,
    pub has_normal_tex: u32,
    pub has_metallic_tex: u32,
    pub has_roughness_tex: u32,
    pub has_occlusion_tex: u32,
    pub _pad: u32,
}

/// One light as the shader sees it (part of bind group 2)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LightGpu {
    pub light_space: [[f32; 4]; 4],
    pub position: [f32; 3],
    /// 0 = directional, 1 = point
    pub kind: u32,
    /// Unit direction toward the light's target
    pub direction: [f32; 3],
    /// 0 disables the light entirely; its slot contributes exactly zero
    pub active: u32,
    pub color: [f32; 3],
    pub intensity: f32,
    /// Constant / linear / quadratic attenuation coefficients
    pub attenuation: [f32; 3],
    pub _pad: f32,
}

impl LightGpu {
    /// Snapshot a light descriptor for the GPU. `active` is forced off for
    /// disabled lights regardless of the rest of the record.
    pub fn from_descriptor(light: &LightDescriptor, projection: &ShadowProjection) -> Self {
        let attenuation = match light.kind {
            LightKind::Directional { .. } => [1.0, 0.0, 0.0],
            LightKind::Point {
                constant,
                linear,
                quadratic,
            } => [constant, linear, quadratic],
        };
        Self {
            light_space: light.light_space_matrix(projection),
            position: light.position.to_array(),
            kind: match light.kind {
                LightKind::Directional { .. } => 0,
                LightKind::Point { .. } => 1,
            },
            direction: light.direction().to_array(),
            active: light.enabled as u32,
            color: light.color,
            intensity: light.intensity,
            attenuation,
            _pad: 0.0,
        }
    }
}

impl Default for LightGpu {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Scene-wide lighting uniform buffer (bind group 2)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LightUniforms {
    pub lights: [LightGpu; MAX_SHADOW_LIGHTS],
    pub ambient_strength: f32,
    pub environment_intensity: f32,
    pub shadow_bias: f32,
    /// 0 = Blinn-Phong, 1 = metallic-roughness
    pub shading_model: u32,
    pub specular_strength: f32,
    pub specular_shininess: f32,
    pub ao_strength: f32,
    pub ao_power: f32,
    pub shadows_enabled: u32,
    pub _pad: [u32; 3],
}

impl Default for LightUniforms {
    fn default() -> Self {
        let mut uniforms = Self::zeroed();
        uniforms.ambient_strength = 0.3;
        uniforms.environment_intensity = 1.0;
        uniforms.shadow_bias = 0.005;
        uniforms.specular_strength = 0.5;
        uniforms.specular_shininess = 32.0;
        uniforms.ao_strength = 1.0;
        uniforms.ao_power = 1.0;
        uniforms.shadows_enabled = 1;
        uniforms
    }
}

/// The main color-pass pipeline and its bind group layouts.
///
/// Binding contract (fixed slot order — light 0's shadow layer is always
/// array layer 0, light 1's is layer 1):
/// - group 0: transform uniforms
/// - group 1: material uniforms + five texture/sampler pairs
/// - group 2: light uniforms, shadow depth array, comparison sampler,
///   environment cube, environment sampler
pub struct RenderPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub transform_bind_group_layout: wgpu::BindGroupLayout,
    pub material_bind_group_layout: wgpu::BindGroupLayout,
    pub lighting_bind_group_layout: wgpu::BindGroupLayout,
}

impl RenderPipeline {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        // Bind group 0: Transform uniforms (vertex + fragment)
        let transform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("Transform Bind Group Layout"),
            });

        // Bind group 1: Material uniforms + the five texture slots, each a
        // texture/sampler pair in TextureSlot order
        let mut material_entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for slot in 0..5u32 {
            material_entries.push(wgpu::BindGroupLayoutEntry {
                binding: 1 + slot * 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            material_entries.push(wgpu::BindGroupLayoutEntry {
                binding: 2 + slot * 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        let material_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &material_entries,
                label: Some("Material Bind Group Layout"),
            });

        // Bind group 2: lights + shadow maps + environment
        let lighting_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    // binding 0: LightUniforms
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // binding 1: shadow depth array (layer i = light i)
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Depth,
                            view_dimension: wgpu::TextureViewDimension::D2Array,
                            multisampled: false,
                        },
                        count: None,
                    },
                    // binding 2: shadow comparison sampler
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                        count: None,
                    },
                    // binding 3: environment cubemap
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::Cube,
                            multisampled: false,
                        },
                        count: None,
                    },
                    // binding 4: environment sampler
                    wgpu::BindGroupLayoutEntry {
                        binding: 4,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
                label: Some("Lighting Bind Group Layout"),
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[
                &transform_bind_group_layout,
                &material_bind_group_layout,
                &lighting_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            transform_bind_group_layout,
            material_bind_group_layout,
            lighting_bind_group_layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_core::Vec3;

    #[test]
    fn test_light_gpu_uniform_size_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<LightGpu>() % 16, 0);
        assert_eq!(std::mem::size_of::<LightUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<MaterialUniforms>() % 16, 0);
    }

    #[test]
    fn test_disabled_light_snapshots_inactive() {
        let mut light = LightDescriptor::directional(Vec3::new(0.0, 5.0, 5.0), Vec3::ZERO);
        light.enabled = false;
        let gpu = LightGpu::from_descriptor(&light, &ShadowProjection::default());
        assert_eq!(gpu.active, 0);

        light.enabled = true;
        let gpu = LightGpu::from_descriptor(&light, &ShadowProjection::default());
        assert_eq!(gpu.active, 1);
        assert_eq!(gpu.kind, 0);
    }

    #[test]
    fn test_point_light_snapshot_carries_coefficients() {
        let mut light = LightDescriptor::point(Vec3::new(1.0, 2.0, 3.0));
        light.kind = crate::light::LightKind::Point {
            constant: 1.0,
            linear: 0.2,
            quadratic: 0.04,
        };
        let gpu = LightGpu::from_descriptor(&light, &ShadowProjection::default());
        assert_eq!(gpu.kind, 1);
        assert_eq!(gpu.attenuation, [1.0, 0.2, 0.04]);
    }
}
