// Backend module - Vulkan abstraction layer
//
// Design: every component talks to the GPU through `GpuDevice` and owns its
// handles through `Unique`, so teardown order follows struct field order.

pub mod api;
pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod handle;
pub mod image;
pub mod instance;
pub mod pipeline;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod uniform;

#[cfg(test)]
pub(crate) mod stub;

pub use api::{GpuDevice, MemoryUsage, QueueFamilyIndices};
pub use device::VulkanDevice;
