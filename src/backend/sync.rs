// Synchronization primitives
//
// One frame in flight: a single pair of semaphores orders acquire -> submit
// -> present on the GPU. The host side is serialized by waiting for the
// device to go idle after each present, so no fence is needed.

use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;

use super::handle::Unique;
use super::GpuDevice;

pub struct FrameSync<D: GpuDevice> {
    image_available: Unique<D, vk::Semaphore>,
    render_finished: Unique<D, vk::Semaphore>,
}

impl<D: GpuDevice> FrameSync<D> {
    pub fn new(device: &Arc<D>) -> Result<Self> {
        let image_available = device
            .create_semaphore()
            .context("Failed to create image-available semaphore")?;
        let image_available = Unique::new(device, image_available);

        let render_finished = device
            .create_semaphore()
            .context("Failed to create render-finished semaphore")?;

        Ok(Self {
            image_available,
            render_finished: Unique::new(device, render_finished),
        })
    }

    /// Signaled when the acquired swapchain image may be written.
    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available.raw()
    }

    /// Signaled when the frame's commands have finished executing.
    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::stub::StubDevice;

    #[test]
    fn semaphores_are_distinct_and_released() {
        let device = StubDevice::new();
        let sync = FrameSync::new(&device).unwrap();
        assert_ne!(sync.image_available(), sync.render_finished());
        assert_eq!(device.live_count("semaphore"), 2);
        drop(sync);
        assert_eq!(device.live_count("semaphore"), 0);
    }
}
