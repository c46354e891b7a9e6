//! Environment map building — equirectangular projection, procedural
//! gradient sky, cubemap face sets, and GPU upload with deferred release.
//!
//! The converters are CPU-side and GPU-free so the projection math stays
//! unit-testable; `upload_cubemap` turns the result into a cube texture.

use glint_core::{GlintError, Result};
use half::f16;
use log::{info, warn};
use std::path::{Path, PathBuf};

pub const CUBE_FACE_COUNT: usize = 6;

/// Face resolution for converted equirectangular sources, independent of
/// the source resolution
pub const ENV_FACE_SIZE: u32 = 512;

/// Face resolution for the analytic gradient sky; low frequency content
/// needs far fewer texels
pub const GRADIENT_FACE_SIZE: u32 = 64;

/// Fixed face file names, in the enumeration order of the face basis table
pub const FACE_NAMES: [&str; CUBE_FACE_COUNT] = ["right", "left", "top", "bottom", "front", "back"];

const FACE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tga"];

/// Per-face basis: texel (s, t) in [0, 1]² maps to the direction
/// forward + (2s-1)·right + (2t-1)·up. The enumeration order +X, -X, +Y,
/// -Y, +Z, -Z and the axis permutations reproduce the right-handed cubemap
/// convention; changing any entry skews every environment lookup.
const FACE_BASES: [([f32; 3], [f32; 3], [f32; 3]); CUBE_FACE_COUNT] = [
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, -1.0, 0.0]), // +X
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]), // -X
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),   // +Y
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]), // -Y
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),  // +Z
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]), // -Z
];

/// Unit direction through the center of texel (s, t) of a face
pub fn face_direction(face: usize, s: f32, t: f32) -> [f32; 3] {
    let (forward, right, up) = FACE_BASES[face];
    let a = 2.0 * s - 1.0;
    let b = 2.0 * t - 1.0;
    let dir = [
        forward[0] + right[0] * a + up[0] * b,
        forward[1] + right[1] * a + up[1] * b,
        forward[2] + right[2] * a + up[2] * b,
    ];
    normalize(dir)
}

/// Map a direction to normalized equirectangular coordinates: azimuth over
/// a full turn and elevation over a half turn, each offset to [0, 1]
pub fn direction_to_equirect_uv(dir: [f32; 3]) -> [f32; 2] {
    let d = normalize(dir);
    let azimuth = d[2].atan2(d[0]);
    let elevation = d[1].clamp(-1.0, 1.0).asin();
    [
        azimuth / std::f32::consts::TAU + 0.5,
        elevation / std::f32::consts::PI + 0.5,
    ]
}

/// A decoded equirectangular panorama in linear float RGB. Row 0 stores the
/// bottom of the panorama, matching the flipped HDR load.
#[derive(Debug)]
pub struct EquirectImage {
    width: u32,
    height: u32,
    texels: Vec<[f32; 3]>,
}

impl EquirectImage {
    /// Load an HDR panorama. This is the one load path with vertical
    /// flip-on-load, so elevation 0 samples the first stored row.
    pub fn load(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .map_err(|e| GlintError::Environment(format!("'{}': {}", path.display(), e)))?;
        let rgb = img.flipv().to_rgb32f();
        let (width, height) = rgb.dimensions();
        if width < 2 || height < 2 {
            return Err(GlintError::Environment(format!(
                "'{}' is too small ({}x{})",
                path.display(),
                width,
                height
            )));
        }
        let texels = rgb.pixels().map(|p| p.0).collect();
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// Build from raw texels (row 0 = elevation 0). Used by tests and
    /// procedural sources.
    pub fn from_texels(width: u32, height: u32, texels: Vec<[f32; 3]>) -> Self {
        assert_eq!(texels.len(), (width * height) as usize);
        Self {
            width,
            height,
            texels,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn texel(&self, x: u32, y: u32) -> [f32; 3] {
        self.texels[(y * self.width + x) as usize]
    }

    /// Bilinear sample at normalized (u, v). All four neighboring texels
    /// are clamped to the image bounds; there is no wraparound across the
    /// seam or the poles (accepted minor artifact).
    pub fn sample_bilinear(&self, u: f32, v: f32) -> [f32; 3] {
        let x = u.clamp(0.0, 1.0) * (self.width - 1) as f32;
        let y = v.clamp(0.0, 1.0) * (self.height - 1) as f32;

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let c00 = self.texel(x0, y0);
        let c10 = self.texel(x1, y0);
        let c01 = self.texel(x0, y1);
        let c11 = self.texel(x1, y1);

        let mut out = [0.0f32; 3];
        for i in 0..3 {
            let top = c00[i] + (c10[i] - c00[i]) * fx;
            let bottom = c01[i] + (c11[i] - c01[i]) * fx;
            out[i] = top + (bottom - top) * fy;
        }
        out
    }
}

/// Six square faces of RGBA float texels, enumeration order matching the
/// face basis table
#[derive(Debug)]
pub struct CubemapData {
    pub face_size: u32,
    pub faces: [Vec<[f32; 4]>; CUBE_FACE_COUNT],
}

impl CubemapData {
    pub fn texel(&self, face: usize, x: u32, y: u32) -> [f32; 4] {
        self.faces[face][(y * self.face_size + x) as usize]
    }
}

/// Horizon/zenith/ground colors for the procedural sky
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientSky {
    pub zenith: [f32; 3],
    pub horizon: [f32; 3],
    pub ground: [f32; 3],
}

impl Default for GradientSky {
    fn default() -> Self {
        Self {
            zenith: [0.18, 0.32, 0.62],
            horizon: [0.72, 0.78, 0.86],
            ground: [0.22, 0.19, 0.16],
        }
    }
}

/// Analytic sky color for a direction: horizon→zenith blend over the upper
/// hemisphere, horizon→ground over the lower, keyed on the direction's
/// vertical component
pub fn sky_color(sky: &GradientSky, dir: [f32; 3]) -> [f32; 3] {
    let d = normalize(dir);
    let t = d[1].clamp(-1.0, 1.0);
    let (from, to, blend) = if t >= 0.0 {
        (sky.horizon, sky.zenith, t)
    } else {
        (sky.horizon, sky.ground, -t)
    };
    [
        from[0] + (to[0] - from[0]) * blend,
        from[1] + (to[1] - from[1]) * blend,
        from[2] + (to[2] - from[2]) * blend,
    ]
}

/// Project an equirectangular panorama onto the six cube faces at the fixed
/// output resolution
pub fn convert_equirectangular(img: &EquirectImage) -> CubemapData {
    project_faces(img, ENV_FACE_SIZE)
}

fn project_faces(img: &EquirectImage, face_size: u32) -> CubemapData {
    let faces = std::array::from_fn(|face| {
        let mut texels = Vec::with_capacity((face_size * face_size) as usize);
        for y in 0..face_size {
            for x in 0..face_size {
                let s = (x as f32 + 0.5) / face_size as f32;
                let t = (y as f32 + 0.5) / face_size as f32;
                let dir = face_direction(face, s, t);
                let [u, v] = direction_to_equirect_uv(dir);
                let rgb = img.sample_bilinear(u, v);
                texels.push([rgb[0], rgb[1], rgb[2], 1.0]);
            }
        }
        texels
    });
    CubemapData {
        face_size,
        faces,
    }
}

/// Synthesize the procedural gradient sky. Never fails; this is the
/// fallback for every environment load error.
pub fn gradient(sky: &GradientSky) -> CubemapData {
    gradient_faces(sky, GRADIENT_FACE_SIZE)
}

fn gradient_faces(sky: &GradientSky, face_size: u32) -> CubemapData {
    let faces = std::array::from_fn(|face| {
        let mut texels = Vec::with_capacity((face_size * face_size) as usize);
        for y in 0..face_size {
            for x in 0..face_size {
                let s = (x as f32 + 0.5) / face_size as f32;
                let t = (y as f32 + 0.5) / face_size as f32;
                let rgb = sky_color(sky, face_direction(face, s, t));
                texels.push([rgb[0], rgb[1], rgb[2], 1.0]);
            }
        }
        texels
    });
    CubemapData {
        face_size,
        faces,
    }
}

/// Load six cubemap faces from a folder by the fixed naming convention,
/// in the basis enumeration order. Faces must be square and uniformly sized.
pub fn load_face_folder(dir: &Path) -> Result<CubemapData> {
    let mut faces: Vec<Vec<[f32; 4]>> = Vec::with_capacity(CUBE_FACE_COUNT);
    let mut face_size = 0u32;

    for name in FACE_NAMES {
        let path = find_face_file(dir, name).ok_or_else(|| {
            GlintError::Environment(format!("missing face '{}' in {}", name, dir.display()))
        })?;
        let img = image::open(&path)
            .map_err(|e| GlintError::Environment(format!("'{}': {}", path.display(), e)))?;
        let rgb = img.to_rgb32f();
        let (w, h) = rgb.dimensions();
        if w != h {
            return Err(GlintError::Environment(format!(
                "face '{}' is not square ({}x{})",
                path.display(),
                w,
                h
            )));
        }
        if face_size == 0 {
            face_size = w;
        } else if w != face_size {
            return Err(GlintError::Environment(format!(
                "face '{}' size {} does not match {}",
                path.display(),
                w,
                face_size
            )));
        }
        faces.push(rgb.pixels().map(|p| [p.0[0], p.0[1], p.0[2], 1.0]).collect());
    }

    let faces: [Vec<[f32; 4]>; CUBE_FACE_COUNT] = faces
        .try_into()
        .expect("exactly six faces were collected");
    Ok(CubemapData { face_size, faces })
}

fn find_face_file(dir: &Path, name: &str) -> Option<PathBuf> {
    FACE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .find(|p| p.exists())
}

/// A GPU-resident cube texture with its view and sampler
pub struct GpuCubemap {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Upload cubemap data as an Rgba16Float cube texture
pub fn upload_cubemap(device: &wgpu::Device, queue: &wgpu::Queue, data: &CubemapData) -> GpuCubemap {
    let size = data.face_size;
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Environment Cubemap"),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: CUBE_FACE_COUNT as u32,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba16Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (face, texels) in data.faces.iter().enumerate() {
        let halves: Vec<u16> = texels
            .iter()
            .flat_map(|t| t.iter().map(|&c| f16::from_f32(c).to_bits()))
            .collect();
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: face as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&halves),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(8 * size),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("Environment Cubemap View"),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    });

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Environment Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    GpuCubemap {
        texture,
        view,
        sampler,
    }
}

/// Where the active environment map comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnvironmentSource {
    #[default]
    Gradient,
    /// Single equirectangular HDR panorama
    Equirectangular(PathBuf),
    /// Folder holding the six fixed-name face images
    FaceFolder(PathBuf),
}

/// The active environment cubemap plus deferred release of replaced ones.
/// A retired texture may still be referenced by the frame in flight, so it
/// is dropped only after the next submit (`end_frame`), never mid-frame.
pub struct Environment {
    current: GpuCubemap,
    source: EnvironmentSource,
    retired: Vec<GpuCubemap>,
    generation: u64,
}

impl Environment {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, sky: &GradientSky) -> Self {
        let current = upload_cubemap(device, queue, &gradient(sky));
        Self {
            current,
            source: EnvironmentSource::Gradient,
            retired: Vec::new(),
            generation: 0,
        }
    }

    pub fn current(&self) -> &GpuCubemap {
        &self.current
    }

    pub fn source(&self) -> &EnvironmentSource {
        &self.source
    }

    /// Bumped on every replacement so bind groups referencing the cubemap
    /// know to rebuild
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Regenerate the environment from a source. Load failures fall back to
    /// the procedural gradient and return false; the previous texture is
    /// always retired, never destroyed in place.
    pub fn set_source(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: EnvironmentSource,
        sky: &GradientSky,
    ) -> bool {
        let (data, applied_source, ok) = match &source {
            EnvironmentSource::Gradient => (gradient(sky), source.clone(), true),
            EnvironmentSource::Equirectangular(path) => match EquirectImage::load(path) {
                Ok(img) => (convert_equirectangular(&img), source.clone(), true),
                Err(e) => {
                    warn!("environment load failed, using gradient sky: {}", e);
                    (gradient(sky), EnvironmentSource::Gradient, false)
                }
            },
            EnvironmentSource::FaceFolder(dir) => match load_face_folder(dir) {
                Ok(data) => (data, source.clone(), true),
                Err(e) => {
                    warn!("environment load failed, using gradient sky: {}", e);
                    (gradient(sky), EnvironmentSource::Gradient, false)
                }
            },
        };

        let new = upload_cubemap(device, queue, &data);
        let old = std::mem::replace(&mut self.current, new);
        self.retired.push(old);
        self.source = applied_source;
        self.generation += 1;

        if ok {
            info!("environment set to {:?}", self.source);
        }
        ok
    }

    /// Drop retired cubemaps. Call after the frame's commands are
    /// submitted; the frame that last referenced them is then in the queue.
    pub fn end_frame(&mut self) {
        self.retired.clear();
    }
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len < 1e-10 {
        return [0.0, 1.0, 0.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

#[cfg(test)]
mod tests {
    use super::*;

    const AXES: [[f32; 3]; 6] = [
        [1.0, 0.0, 0.0],
        [-1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0],
    ];

    /// Panorama whose red channel encodes u and green channel encodes v,
    /// smooth enough for bilinear comparisons
    fn uv_panorama(width: u32, height: u32) -> EquirectImage {
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let u = x as f32 / (width - 1) as f32;
                let v = y as f32 / (height - 1) as f32;
                texels.push([u, v, 0.0]);
            }
        }
        EquirectImage::from_texels(width, height, texels)
    }

    #[test]
    fn test_face_centers_hit_principal_axes() {
        for (face, axis) in AXES.iter().enumerate() {
            let dir = face_direction(face, 0.5, 0.5);
            for i in 0..3 {
                assert!(
                    (dir[i] - axis[i]).abs() < 1e-6,
                    "face {} center {:?} != {:?}",
                    face,
                    dir,
                    axis
                );
            }
        }
    }

    #[test]
    fn test_face_bases_are_right_handed() {
        // right × up must equal -forward for every face (s grows right,
        // t grows down in texture space)
        for (forward, right, up) in FACE_BASES {
            let cross = [
                right[1] * up[2] - right[2] * up[1],
                right[2] * up[0] - right[0] * up[2],
                right[0] * up[1] - right[1] * up[0],
            ];
            for i in 0..3 {
                assert!((cross[i] + forward[i]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_equirect_uv_of_principal_axes() {
        let cases = [
            ([1.0, 0.0, 0.0], [0.5, 0.5]),
            ([0.0, 0.0, 1.0], [0.75, 0.5]),
            ([0.0, 0.0, -1.0], [0.25, 0.5]),
            ([0.0, 1.0, 0.0], [0.5, 1.0]),
            ([0.0, -1.0, 0.0], [0.5, 0.0]),
        ];
        for (dir, expected) in cases {
            let [u, v] = direction_to_equirect_uv(dir);
            assert!((u - expected[0]).abs() < 1e-6, "dir {:?} u={}", dir, u);
            assert!((v - expected[1]).abs() < 1e-6, "dir {:?} v={}", dir, v);
        }
    }

    /// Panorama keyed on elevation only. Near the poles a half-texel of
    /// angular deviation swings azimuth arbitrarily, so a round-trip
    /// comparison must not encode azimuth in the pixel values.
    fn elevation_panorama(width: u32, height: u32) -> EquirectImage {
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for _ in 0..width {
                let v = y as f32 / (height - 1) as f32;
                texels.push([v, v * v, 0.0]);
            }
        }
        EquirectImage::from_texels(width, height, texels)
    }

    #[test]
    fn test_conversion_round_trip_on_principal_axes() {
        let img = elevation_panorama(128, 64);
        let size = 16;
        let cube = project_faces(&img, size);

        for (face, axis) in AXES.iter().enumerate() {
            // The texel nearest the axis is the face center
            let center = size / 2;
            let got = cube.texel(face, center, center);
            let [u, v] = direction_to_equirect_uv(*axis);
            let expected = img.sample_bilinear(u, v);
            // Half a texel of angular deviation bounds the error
            for i in 0..3 {
                assert!(
                    (got[i] - expected[i]).abs() < 0.05,
                    "face {} got {:?} expected {:?}",
                    face,
                    got,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_bilinear_clamps_at_bounds() {
        let img = uv_panorama(8, 4);
        assert_eq!(img.sample_bilinear(0.0, 0.0), img.texel(0, 0));
        assert_eq!(img.sample_bilinear(1.0, 1.0), img.texel(7, 3));
        // Out-of-range coordinates clamp instead of wrapping
        assert_eq!(img.sample_bilinear(-2.0, 0.5), img.sample_bilinear(0.0, 0.5));
        assert_eq!(img.sample_bilinear(3.0, 0.5), img.sample_bilinear(1.0, 0.5));
    }

    #[test]
    fn test_gradient_symmetric_under_horizontal_negation() {
        let sky = GradientSky::default();
        for dir in [[0.3, 0.5, 0.2], [0.9, -0.1, 0.4], [0.2, 0.0, -0.7]] {
            let mirrored = [-dir[0], dir[1], dir[2]];
            assert_eq!(sky_color(&sky, dir), sky_color(&sky, mirrored));
        }

        // Left/right faces are interchangeable under the chosen basis
        let cube = gradient_faces(&sky, 8);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(cube.texel(0, x, y), cube.texel(1, 7 - x, y));
            }
        }
    }

    #[test]
    fn test_gradient_asymmetric_under_vertical_negation() {
        let sky = GradientSky::default();
        let up = sky_color(&sky, [0.0, 1.0, 0.0]);
        let down = sky_color(&sky, [0.0, -1.0, 0.0]);
        assert_ne!(up, down);
        assert_eq!(up, sky.zenith);
        assert_eq!(down, sky.ground);
    }

    #[test]
    fn test_gradient_horizon_at_equator() {
        let sky = GradientSky::default();
        assert_eq!(sky_color(&sky, [1.0, 0.0, 0.0]), sky.horizon);
    }

    #[test]
    fn test_gradient_always_produces_six_full_faces() {
        let cube = gradient(&GradientSky::default());
        assert_eq!(cube.faces.len(), CUBE_FACE_COUNT);
        for face in &cube.faces {
            assert_eq!(face.len(), (cube.face_size * cube.face_size) as usize);
        }
    }

    #[test]
    fn test_missing_equirect_file_is_an_environment_error() {
        let err = EquirectImage::load(Path::new("/definitely/not/here.hdr")).unwrap_err();
        assert!(matches!(err, GlintError::Environment(_)));
    }

    #[test]
    fn test_missing_face_folder_is_an_environment_error() {
        let err = load_face_folder(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, GlintError::Environment(_)));
    }
}
