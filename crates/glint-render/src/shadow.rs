//! Shadow pass driver
//!
//! One depth-only target per simultaneously active light, kept as layers of
//! a single Depth32Float array so the main shader can bind them in light
//! enumeration order. Light-space matrices come from the light descriptors
//! and are recomputed every frame.

use crate::light::MAX_SHADOW_LIGHTS;
use crate::mesh::Vertex;
use bytemuck::{Pod, Zeroable};

/// Default shadow map resolution per light
pub const DEFAULT_SHADOW_RESOLUTION: u32 = 2048;

/// Uniform data for a single shadow draw call
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ShadowDrawUniforms {
    pub light_view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
}

/// The shadow mapping pass. Depth-only: the pipeline has no fragment stage
/// and binds nothing but the per-draw transform — material state never
/// touches a shadow pass.
pub struct ShadowPass {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub texture: wgpu::Texture,
    /// Render-target view per light layer
    pub layer_views: Vec<wgpu::TextureView>,
    /// Full-array view bound by the lighting compositor
    pub array_view: wgpu::TextureView,
    /// Comparison sampler for shadow tests
    pub sampler: wgpu::Sampler,
    pub resolution: u32,
}

impl ShadowPass {
    pub fn new(device: &wgpu::Device, resolution: u32) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shadow Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shadow_shader.wgsl").into()),
        });

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("Shadow Draw Bind Group Layout"),
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shadow Depth Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_shadow"),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: None, // Depth only, no fragment shader
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
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let (texture, layer_views, array_view) = create_targets(device, resolution);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Comparison Sampler"),
            compare: Some(wgpu::CompareFunction::LessEqual),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            bind_group_layout,
            texture,
            layer_views,
            array_view,
            sampler,
            resolution,
        }
    }

    /// Recreate the depth targets at a new resolution. The compositor's
    /// lighting bind group references the array view and must be rebuilt.
    pub fn set_resolution(&mut self, device: &wgpu::Device, resolution: u32) {
        let resolution = resolution.clamp(256, 8192);
        let (texture, layer_views, array_view) = create_targets(device, resolution);
        self.texture = texture;
        self.layer_views = layer_views;
        self.array_view = array_view;
        self.resolution = resolution;
    }
}

fn create_targets(
    device: &wgpu::Device,
    resolution: u32,
) -> (wgpu::Texture, Vec<wgpu::TextureView>, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Shadow Map Array"),
        size: wgpu::Extent3d {
            width: resolution,
            height: resolution,
            depth_or_array_layers: MAX_SHADOW_LIGHTS as u32,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Depth32Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });

    let layer_views = (0..MAX_SHADOW_LIGHTS as u32)
        .map(|i| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some(&format!("Shadow Light {} View", i)),
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_array_layer: i,
                array_layer_count: Some(1),
                ..Default::default()
            })
        })
        .collect();

    let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("Shadow Map Array View"),
        dimension: Some(wgpu::TextureViewDimension::D2Array),
        ..Default::default()
    });

    (texture, layer_views, array_view)
}
