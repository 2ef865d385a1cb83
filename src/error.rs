// Renderer errors
//
// Construction-time failures that stop the engine before the first frame.
// Everything else is an `anyhow::Error` carrying call-site context.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RendererError {
    #[error("validation layer {0} requested but not available")]
    ValidationLayerMissing(String),

    #[error("no GPU supports graphics + presentation to this surface")]
    NoSuitableDevice,

    #[error("no supported depth attachment format")]
    NoDepthFormat,

    #[error("no memory type matches filter {type_bits:#x} with {properties:?}")]
    NoMemoryType {
        type_bits: u32,
        properties: ash::vk::MemoryPropertyFlags,
    },

    #[error("{count} instances at a {stride} byte stride exceed the dynamic offset range")]
    TooManyInstances { count: u32, stride: u64 },

    #[error("uniform block of {size} bytes exceeds maxUniformBufferRange ({max})")]
    UniformRangeTooLarge { size: u64, max: u32 },

    #[error("surface reports no formats")]
    NoSurfaceFormat,

    #[error("asset not found: {0}")]
    AssetMissing(PathBuf),

    #[error("mesh {0} contains no triangles")]
    EmptyMesh(PathBuf),
}

/// Render an error and its causes outermost-first, one per line.
pub fn format_chain(err: &anyhow::Error) -> String {
    err.chain()
        .enumerate()
        .map(|(depth, cause)| {
            if depth == 0 {
                format!("error: {cause}")
            } else {
                format!("{:indent$}caused by: {cause}", "", indent = depth * 2)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
