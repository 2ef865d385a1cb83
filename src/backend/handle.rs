// Unique ownership of device objects
//
// One wrapper for every API handle type. A `Unique` is either `Uninit`
// (nothing to destroy) or `Live` (handle plus the device that made it).
// Holding `Arc<D>` keeps the device alive until its last object is gone.

use ash::vk;
use std::sync::Arc;

use super::GpuDevice;

/// A handle type that a device knows how to destroy.
pub trait DeviceObject<D: GpuDevice + ?Sized>: Copy + vk::Handle {
    fn destroy(self, device: &D);
}

macro_rules! device_objects {
    ($($handle:ty => $destroy:ident),* $(,)?) => {
        $(
            impl<D: GpuDevice + ?Sized> DeviceObject<D> for $handle {
                fn destroy(self, device: &D) {
                    device.$destroy(self);
                }
            }
        )*
    };
}

device_objects! {
    vk::SwapchainKHR => destroy_swapchain,
    vk::Buffer => destroy_buffer,
    vk::Image => destroy_image,
    vk::ImageView => destroy_image_view,
    vk::RenderPass => destroy_render_pass,
    vk::Framebuffer => destroy_framebuffer,
    vk::ShaderModule => destroy_shader_module,
    vk::DescriptorSetLayout => destroy_descriptor_set_layout,
    vk::PipelineLayout => destroy_pipeline_layout,
    vk::Pipeline => destroy_pipeline,
    vk::DescriptorPool => destroy_descriptor_pool,
    vk::Sampler => destroy_sampler,
    vk::Semaphore => destroy_semaphore,
    vk::CommandPool => destroy_command_pool,
}

enum State<D: GpuDevice, H> {
    Uninit,
    Live { device: Arc<D>, handle: H },
}

pub struct Unique<D: GpuDevice, H: DeviceObject<D>> {
    state: State<D, H>,
}

impl<D: GpuDevice, H: DeviceObject<D>> Unique<D, H> {
    pub fn new(device: &Arc<D>, handle: H) -> Self {
        Self {
            state: State::Live {
                device: Arc::clone(device),
                handle,
            },
        }
    }

    /// The raw handle, or the null handle while uninitialized.
    pub fn raw(&self) -> H {
        match &self.state {
            State::Live { handle, .. } => *handle,
            State::Uninit => H::from_raw(0),
        }
    }

    pub fn device(&self) -> Option<&Arc<D>> {
        match &self.state {
            State::Live { device, .. } => Some(device),
            State::Uninit => None,
        }
    }

    #[cfg(test)]
    pub fn is_live(&self) -> bool {
        matches!(self.state, State::Live { .. })
    }

    /// Move ownership out, leaving `self` uninitialized.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl<D: GpuDevice, H: DeviceObject<D>> Default for Unique<D, H> {
    fn default() -> Self {
        Self {
            state: State::Uninit,
        }
    }
}

impl<D: GpuDevice, H: DeviceObject<D>> Drop for Unique<D, H> {
    fn drop(&mut self) {
        if let State::Live { device, handle } = &self.state {
            handle.destroy(device);
        }
    }
}

impl<D: GpuDevice, H: DeviceObject<D> + std::fmt::Debug> std::fmt::Debug for Unique<D, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            State::Live { handle, .. } => f.debug_tuple("Live").field(handle).finish(),
            State::Uninit => f.write_str("Uninit"),
        }
    }
}
