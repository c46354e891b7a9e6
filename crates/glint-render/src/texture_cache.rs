//! GPU texture cache — deduplicates image loads by resolved path

use glint_core::{GlintError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A GPU-resident 2D texture with its view and sampler
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Cache of GPU textures keyed by the exact resolved path string (not
/// canonicalized — two spellings of the same file are distinct entries, a
/// known limitation). Entries are never evicted within an asset's lifetime;
/// `clear` exists for callers that know the underlying files changed.
pub struct TextureCache {
    textures: HashMap<String, Arc<GpuTexture>>,
    /// 1x1 white texture bound in absent albedo/metallic/roughness/occlusion slots
    pub default_white: Arc<GpuTexture>,
    /// 1x1 flat normal map (0.5, 0.5, 1.0) bound in absent normal slots
    pub default_normal: Arc<GpuTexture>,
}

impl TextureCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let default_white =
            Arc::new(create_1x1(device, queue, [255, 255, 255, 255], "Default White"));
        let default_normal =
            Arc::new(create_1x1(device, queue, [128, 128, 255, 255], "Default Normal"));

        Self {
            textures: HashMap::new(),
            default_white,
            default_normal,
        }
    }

    /// Load a texture file, memoized by its resolved path. Returns the
    /// cached handle on a repeat load and `None` when decoding fails — the
    /// failure is logged here and callers treat `None` as "no texture",
    /// never as an error.
    pub fn load_file(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
    ) -> Option<Arc<GpuTexture>> {
        match self.try_load_file(device, queue, path) {
            Ok(texture) => Some(texture),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Upload an embedded image (bytes still in their container encoding)
    /// under a synthetic key, with the same dedup and failure rules as
    /// file loads.
    pub fn load_embedded(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        key: &str,
        bytes: &[u8],
    ) -> Option<Arc<GpuTexture>> {
        if let Some(existing) = self.textures.get(key) {
            return Some(existing.clone());
        }
        let result = image::load_from_memory(bytes)
            .map_err(|e| GlintError::TextureLoad(format!("embedded '{}': {}", key, e)))
            .and_then(|img| decode_rgba(key, img))
            .map(|rgba| self.insert(device, queue, key, &rgba));
        match result {
            Ok(texture) => Some(texture),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    fn try_load_file(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
    ) -> Result<Arc<GpuTexture>> {
        let key = path.to_string_lossy().to_string();
        if let Some(existing) = self.textures.get(&key) {
            return Ok(existing.clone());
        }

        let img = image::open(path)
            .map_err(|e| GlintError::TextureLoad(format!("'{}': {}", path.display(), e)))?;
        let rgba = decode_rgba(&key, img)?;
        let texture = self.insert(device, queue, &key, &rgba);
        info!("loaded texture: {}", path.display());
        Ok(texture)
    }

    fn insert(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        key: &str,
        rgba: &RgbaImage,
    ) -> Arc<GpuTexture> {
        let texture = Arc::new(upload_rgba_with_mips(device, queue, key, rgba));
        self.textures.insert(key.to_string(), texture.clone());
        texture
    }

    /// Number of cached entries (defaults excluded)
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Drop every cached entry. Textures still referenced by materials stay
    /// alive until those materials drop.
    pub fn clear(&mut self) {
        self.textures.clear();
    }
}

/// Convert a decoded image to RGBA8, inferring the layout from its
/// component count: 1 expands to grayscale, 3 gains an opaque alpha, 4
/// passes through. Anything else (16-bit, float) is unsupported.
fn decode_rgba(key: &str, img: DynamicImage) -> Result<RgbaImage> {
    match img {
        DynamicImage::ImageLuma8(gray) => {
            let mut rgba = RgbaImage::new(gray.width(), gray.height());
            for (out, px) in rgba.pixels_mut().zip(gray.pixels()) {
                let v = px.0[0];
                out.0 = [v, v, v, 255];
            }
            Ok(rgba)
        }
        rgb @ DynamicImage::ImageRgb8(_) => Ok(rgb.to_rgba8()),
        DynamicImage::ImageRgba8(rgba) => Ok(rgba),
        other => Err(GlintError::TextureLoad(format!(
            "'{}' has unsupported component layout ({:?})",
            key,
            other.color()
        ))),
    }
}

/// Build the full mip chain: level 0 is the source, each further level is
/// the source resampled with triangle filtering at half the previous
/// dimensions, down to 1x1.
pub fn build_mip_chain(base: &RgbaImage) -> Vec<RgbaImage> {
    let mut levels = vec![base.clone()];
    let (mut w, mut h) = base.dimensions();
    while w > 1 || h > 1 {
        w = (w / 2).max(1);
        h = (h / 2).max(1);
        levels.push(image::imageops::resize(base, w, h, FilterType::Triangle));
    }
    levels
}

fn upload_rgba_with_mips(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    rgba: &RgbaImage,
) -> GpuTexture {
    let (width, height) = rgba.dimensions();
    let mips = build_mip_chain(rgba);

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: mips.len() as u32,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (level, mip) in mips.iter().enumerate() {
        let (mw, mh) = mip.dimensions();
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: level as u32,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            mip,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * mw),
                rows_per_image: Some(mh),
            },
            wgpu::Extent3d {
                width: mw,
                height: mh,
                depth_or_array_layers: 1,
            },
        );
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(&format!("{} Sampler", label)),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    GpuTexture {
        texture,
        view,
        sampler,
    }
}

fn create_1x1(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    color: [u8; 4],
    label: &str,
) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &color,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(&format!("{} Sampler", label)),
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    GpuTexture {
        texture,
        view,
        sampler,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_chain_halves_to_one() {
        let base = RgbaImage::new(64, 16);
        let mips = build_mip_chain(&base);
        let dims: Vec<(u32, u32)> = mips.iter().map(|m| m.dimensions()).collect();
        assert_eq!(
            dims,
            vec![(64, 16), (32, 8), (16, 4), (8, 2), (4, 1), (2, 1), (1, 1)]
        );
    }

    #[test]
    fn test_mip_chain_single_pixel() {
        let base = RgbaImage::new(1, 1);
        assert_eq!(build_mip_chain(&base).len(), 1);
    }

    #[test]
    fn test_decode_expands_grayscale() {
        let mut gray = image::GrayImage::new(2, 1);
        gray.put_pixel(0, 0, image::Luma([7]));
        gray.put_pixel(1, 0, image::Luma([200]));
        let rgba = decode_rgba("gray", DynamicImage::ImageLuma8(gray)).unwrap();
        assert_eq!(rgba.get_pixel(0, 0).0, [7, 7, 7, 255]);
        assert_eq!(rgba.get_pixel(1, 0).0, [200, 200, 200, 255]);
    }

    #[test]
    fn test_decode_rejects_other_layouts() {
        let img = DynamicImage::ImageRgba16(image::ImageBuffer::new(2, 2));
        let err = decode_rgba("wide", img).unwrap_err();
        assert!(matches!(err, GlintError::TextureLoad(_)));
    }
}
