// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// This module handles loading and parsing configuration from config.toml.
// Provides sensible defaults if config file is missing or has errors.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub scene: SceneConfig,
    pub debug: DebugConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Instanced Renderer".to_string(),
            width: 800,
            height: 600,
            fullscreen: false,
        }
    }
}

/// Graphics settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    pub clear_color: [f32; 4],
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// What gets drawn, and where its files live
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub instance_count: u32,
    /// Base for relative asset paths; the executable's directory when unset.
    pub asset_root: Option<PathBuf>,
    pub model: PathBuf,
    pub texture: PathBuf,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            instance_count: 125,
            asset_root: None,
            model: PathBuf::from("data/models/model.obj"),
            texture: PathBuf::from("data/textures/texture.png"),
            vertex_shader: PathBuf::from("data/shaders/model/vert.spv"),
            fragment_shader: PathBuf::from("data/shaders/model/frag.spv"),
        }
    }
}

impl SceneConfig {
    pub fn asset_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.asset_root {
            return Ok(root.clone());
        }

        let exe = std::env::current_exe().context("Failed to locate the running executable")?;
        exe.parent()
            .map(Path::to_path_buf)
            .with_context(|| format!("Executable {:?} has no parent directory", exe))
    }

    /// `path` relative to the asset root; absolute paths are kept.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.asset_root()?.join(path))
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub show_fps: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: cfg!(debug_assertions),
            show_fps: true,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {:#}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }
}
