//! Viewer startup configuration (TOML)

use glint_core::{GlintError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Startup configuration, usually read from `glint.toml`. Every field has a
/// default so a missing or partial file is fine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub scene: SceneConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Glint Viewer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Model file loaded at startup
    pub model: Option<PathBuf>,
    /// Equirectangular HDR panorama for the environment
    pub environment: Option<PathBuf>,
    /// Folder with right/left/top/bottom/front/back face images
    pub cubemap_folder: Option<PathBuf>,
    pub shadow_resolution: Option<u32>,
}

impl ViewerConfig {
    /// Load a config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| GlintError::Render(format!("bad config '{}': {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let config: ViewerConfig = toml::from_str(
            r#"
            [window]
            width = 1920

            [scene]
            model = "models/helmet.glb"
            shadow_resolution = 4096
            "#,
        )
        .unwrap();
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.scene.model, Some(PathBuf::from("models/helmet.glb")));
        assert_eq!(config.scene.shadow_resolution, Some(4096));
        assert_eq!(config.scene.environment, None);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: ViewerConfig = toml::from_str("").unwrap();
        assert_eq!(config.window.title, "Glint Viewer");
    }
}
