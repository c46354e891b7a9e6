//! Glint Render - wgpu renderer for imported scenes
//!
//! Renders imported glTF assets with physically-inspired materials,
//! per-light shadow mapping, and image-based environment lighting. The
//! environment cubemap is built on the CPU from an equirectangular HDR
//! panorama, a folder of face images, or a procedural gradient sky.

mod asset;
mod camera;
mod context;
mod debug;
mod environment;
mod light;
mod material;
mod mesh;
mod pipeline;
mod primitives;
mod scene_renderer;
mod shadow;
mod skybox_pipeline;
mod texture_cache;

pub use asset::{load_asset, Asset, Renderable};
pub use camera::Camera;
pub use context::{RenderContext, RenderError};
pub use debug::{DebugDepthPipeline, DebugDepthUniforms};
pub use environment::{
    convert_equirectangular, direction_to_equirect_uv, face_direction, gradient, load_face_folder,
    sky_color, upload_cubemap, CubemapData, Environment, EnvironmentSource, EquirectImage,
    GpuCubemap, GradientSky, CUBE_FACE_COUNT, ENV_FACE_SIZE, FACE_NAMES,
};
pub use light::{
    look_at, ortho, LightDescriptor, LightKind, ShadowProjection, MAX_SHADOW_LIGHTS,
};
pub use material::{resolve_material, Material, TextureSlot};
pub use mesh::{build_vertices, GpuMesh, Mesh, Vertex};
pub use pipeline::{
    LightGpu, LightUniforms, MaterialUniforms, RenderPipeline, TransformUniforms,
};
pub use primitives::{create_cube_mesh, create_plane_mesh};
pub use scene_renderer::{SceneParameters, SceneRenderer, ShadingModel, ShadowSettings};
pub use shadow::{ShadowDrawUniforms, ShadowPass, DEFAULT_SHADOW_RESOLUTION};
pub use skybox_pipeline::{SkyboxPipeline, SkyboxUniforms};
pub use texture_cache::{build_mip_chain, GpuTexture, TextureCache};

#[cfg(test)]
mod tests {
    #[test]
    fn shader_wgsl_parses() {
        let source = include_str!("shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("shader.wgsl failed to parse");
    }

    #[test]
    fn shadow_shader_wgsl_parses() {
        let source = include_str!("shadow_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("shadow_shader.wgsl failed to parse");
    }

    #[test]
    fn skybox_shader_wgsl_parses() {
        let source = include_str!("skybox_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("skybox_shader.wgsl failed to parse");
    }

    #[test]
    fn debug_depth_shader_wgsl_parses() {
        let source = include_str!("debug_depth_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("debug_depth_shader.wgsl failed to parse");
    }
}
