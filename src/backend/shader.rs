// Shader module loading
//
// Vulkan consumes SPIR-V words. The bytes come from pre-compiled `.spv`
// files; `read_spv` takes care of alignment and endianness.

use anyhow::{Context, Result};
use ash::vk;
use std::path::Path;
use std::sync::Arc;

use super::handle::Unique;
use super::GpuDevice;
use crate::error::RendererError;

/// Vertex + fragment SPIR-V for the model pipeline.
#[derive(Debug, Clone)]
pub struct ShaderCode {
    pub vertex: Vec<u32>,
    pub fragment: Vec<u32>,
}

impl ShaderCode {
    pub fn load(vertex: &Path, fragment: &Path) -> Result<Self> {
        Ok(Self {
            vertex: read_spv_file(vertex)?,
            fragment: read_spv_file(fragment)?,
        })
    }
}

pub fn read_spv_file(path: &Path) -> Result<Vec<u32>> {
    if !path.exists() {
        return Err(RendererError::AssetMissing(path.to_path_buf()).into());
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read shader {:?}", path))?;

    ash::util::read_spv(&mut std::io::Cursor::new(bytes))
        .with_context(|| format!("Invalid SPIR-V in {:?}", path))
}

/// Create a shader module from SPIR-V words
pub fn create_shader_module<D: GpuDevice>(
    device: &Arc<D>,
    code: &[u32],
) -> Result<Unique<D, vk::ShaderModule>> {
    let create_info = vk::ShaderModuleCreateInfo::builder().code(code);

    let module = device
        .create_shader_module(&create_info)
        .context("Failed to create shader module")?;

    Ok(Unique::new(device, module))
}
