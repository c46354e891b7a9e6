//! Material records and extraction from imported channels

use crate::pipeline::MaterialUniforms;
use crate::texture_cache::{GpuTexture, TextureCache};
use glint_import::{ImportedMaterial, SceneImport, TextureRef};
use std::sync::Arc;

/// The five material texture slots. Slots are addressed through this enum
/// everywhere — a new slot cannot silently alias an existing one the way a
/// raw integer code could.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSlot {
    Albedo,
    Normal,
    Metallic,
    Roughness,
    Occlusion,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 5] = [
        TextureSlot::Albedo,
        TextureSlot::Normal,
        TextureSlot::Metallic,
        TextureSlot::Roughness,
        TextureSlot::Occlusion,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Albedo => "albedo",
            Self::Normal => "normal",
            Self::Metallic => "metallic",
            Self::Roughness => "roughness",
            Self::Occlusion => "occlusion",
        }
    }
}

/// A uniform material record: five optional texture slots plus flat
/// fallbacks. A slot is present exactly when its Option holds a handle, so
/// an absent slot has nothing that could be sampled.
#[derive(Default, Clone)]
pub struct Material {
    pub albedo: Option<Arc<GpuTexture>>,
    pub normal: Option<Arc<GpuTexture>>,
    pub metallic: Option<Arc<GpuTexture>>,
    pub roughness: Option<Arc<GpuTexture>>,
    pub occlusion: Option<Arc<GpuTexture>>,
    /// Flat albedo used when no albedo texture is present
    pub albedo_color: [f32; 4],
    pub metallic_value: f32,
    pub roughness_value: f32,
}

impl Material {
    /// The untextured default: white albedo, dielectric, half-rough
    pub fn plain() -> Self {
        Self {
            albedo_color: [1.0, 1.0, 1.0, 1.0],
            metallic_value: 0.0,
            roughness_value: 0.5,
            ..Default::default()
        }
    }

    pub fn texture(&self, slot: TextureSlot) -> Option<&Arc<GpuTexture>> {
        match slot {
            TextureSlot::Albedo => self.albedo.as_ref(),
            TextureSlot::Normal => self.normal.as_ref(),
            TextureSlot::Metallic => self.metallic.as_ref(),
            TextureSlot::Roughness => self.roughness.as_ref(),
            TextureSlot::Occlusion => self.occlusion.as_ref(),
        }
    }

    pub fn set_texture(&mut self, slot: TextureSlot, texture: Arc<GpuTexture>) {
        match slot {
            TextureSlot::Albedo => self.albedo = Some(texture),
            TextureSlot::Normal => self.normal = Some(texture),
            TextureSlot::Metallic => self.metallic = Some(texture),
            TextureSlot::Roughness => self.roughness = Some(texture),
            TextureSlot::Occlusion => self.occlusion = Some(texture),
        }
    }

    pub fn clear_texture(&mut self, slot: TextureSlot) {
        match slot {
            TextureSlot::Albedo => self.albedo = None,
            TextureSlot::Normal => self.normal = None,
            TextureSlot::Metallic => self.metallic = None,
            TextureSlot::Roughness => self.roughness = None,
            TextureSlot::Occlusion => self.occlusion = None,
        }
    }

    /// GPU uniform view of this material; the presence flags mirror the
    /// Option slots so the shader never consults an absent slot.
    pub fn uniforms(&self) -> MaterialUniforms {
        MaterialUniforms {
            base_color: self.albedo_color,
            metallic: self.metallic_value,
            roughness: self.roughness_value,
            has_albedo_tex: self.albedo.is_some() as u32,
            has_normal_tex: self.normal.is_some() as u32,
            has_metallic_tex: self.metallic.is_some() as u32,
            has_roughness_tex: self.roughness.is_some() as u32,
            has_occlusion_tex: self.occlusion.is_some() as u32,
            _pad: 0,
        }
    }
}

/// Resolve an imported material into a GPU material: collapse the raw
/// channels through their precedence rules and pull each selected texture
/// through the cache. A failed texture load leaves that slot absent and the
/// flat fallbacks in effect — degraded quality, never an error.
pub fn resolve_material(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    cache: &mut TextureCache,
    import: &SceneImport,
    imported: Option<&ImportedMaterial>,
) -> Material {
    let Some(imported) = imported else {
        return Material::plain();
    };

    let mut load = |source: Option<&TextureRef>| -> Option<Arc<GpuTexture>> {
        match source? {
            TextureRef::Path(path) => cache.load_file(device, queue, path),
            TextureRef::Embedded(index) => {
                let img = import.images.get(*index)?;
                let key = format!("{}{}", import.source_path.display(), img.key);
                cache.load_embedded(device, queue, &key, &img.bytes)
            }
        }
    };

    Material {
        albedo: load(imported.albedo_source()),
        normal: load(imported.normal_source()),
        metallic: load(imported.metallic_source()),
        roughness: load(imported.roughness_source()),
        occlusion: load(imported.occlusion_source()),
        albedo_color: imported.tint(),
        metallic_value: imported.metallic_factor(),
        roughness_value: imported.roughness_factor(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_material_has_no_presence_flags() {
        let uniforms = Material::plain().uniforms();
        assert_eq!(uniforms.base_color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(uniforms.metallic, 0.0);
        assert_eq!(uniforms.roughness, 0.5);
        assert_eq!(uniforms.has_albedo_tex, 0);
        assert_eq!(uniforms.has_normal_tex, 0);
        assert_eq!(uniforms.has_metallic_tex, 0);
        assert_eq!(uniforms.has_roughness_tex, 0);
        assert_eq!(uniforms.has_occlusion_tex, 0);
    }

    #[test]
    fn test_slot_labels_are_distinct() {
        let mut labels: Vec<&str> = TextureSlot::ALL.iter().map(|s| s.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), TextureSlot::ALL.len());
    }
}
