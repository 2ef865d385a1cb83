// Swapchain - Window presentation
//
// Negotiates format, present mode and extent with the surface and owns the
// presentable images. Recreation hands the previous handle to the driver
// so it can recycle resources during the swap.

use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;

use super::handle::Unique;
use super::GpuDevice;
use crate::error::RendererError;

/// Format the swapchain asks for when the surface leaves the choice open.
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Surface capabilities, formats and present modes for one physical device.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Pick the surface format.
///
/// A lone `UNDEFINED` entry means the surface accepts anything, so the
/// preferred pair is returned. Otherwise the preferred pair wins if listed,
/// and the first listed format is the fallback.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    if let [only] = formats {
        if only.format == vk::Format::UNDEFINED {
            return Some(PREFERRED_SURFACE_FORMAT);
        }
    }

    formats
        .iter()
        .find(|f| {
            f.format == PREFERRED_SURFACE_FORMAT.format
                && f.color_space == PREFERRED_SURFACE_FORMAT.color_space
        })
        .or_else(|| formats.first())
        .copied()
}

/// Pick the present mode: MAILBOX anywhere in the list, else IMMEDIATE,
/// else FIFO (always supported).
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    let mut best = vk::PresentModeKHR::FIFO;

    for &mode in modes {
        if mode == vk::PresentModeKHR::MAILBOX {
            return mode;
        }
        if mode == vk::PresentModeKHR::IMMEDIATE {
            best = mode;
        }
    }

    best
}

/// Pick the extent: the surface's current extent when it defines one,
/// otherwise the window size clamped into the supported range.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_extent: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    vk::Extent2D {
        width: window_extent.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: window_extent.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// `minImageCount + 1`, bounded by `maxImageCount` when the surface sets one.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let mut image_count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 && image_count > capabilities.max_image_count {
        image_count = capabilities.max_image_count;
    }
    image_count
}

/// Result of asking the swapchain for the next image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquiredImage {
    Ready { index: u32, suboptimal: bool },
    OutOfDate,
}

/// Result of presenting an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentStatus {
    Optimal,
    Suboptimal,
    OutOfDate,
}

impl PresentStatus {
    pub fn needs_recreation(self) -> bool {
        !matches!(self, PresentStatus::Optimal)
    }
}

pub struct Swapchain<D: GpuDevice> {
    handle: Unique<D, vk::SwapchainKHR>,
    pub images: Vec<vk::Image>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    device: Arc<D>,
}

impl<D: GpuDevice> Swapchain<D> {
    /// Create a swapchain sized for `window_extent`.
    ///
    /// Pass the current swapchain's handle as `old` when recreating; the old
    /// swapchain must stay alive until this call returns.
    pub fn new(device: &Arc<D>, window_extent: vk::Extent2D, old: vk::SwapchainKHR) -> Result<Self> {
        let support = device
            .surface_support()
            .context("Failed to query surface support")?;

        let surface_format =
            choose_surface_format(&support.formats).ok_or(RendererError::NoSurfaceFormat)?;
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, window_extent);
        let image_count = choose_image_count(&support.capabilities);

        log::info!(
            "Creating swapchain: {}x{}, {:?}, {:?}",
            extent.width,
            extent.height,
            surface_format.format,
            present_mode
        );

        let families = device.queue_families();
        let family_indices = [families.graphics, families.present];

        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(device.surface())
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old);

        create_info = if families.is_shared() {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        } else {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&family_indices)
        };

        let raw = device
            .create_swapchain(&create_info)
            .context("Failed to create swapchain")?;
        let handle = Unique::new(device, raw);

        let images = device
            .swapchain_images(raw)
            .context("Failed to get swapchain images")?;

        log::info!("Created swapchain with {} images", images.len());

        Ok(Self {
            handle,
            images,
            format: surface_format.format,
            extent,
            present_mode,
            device: Arc::clone(device),
        })
    }

    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle.raw()
    }

    /// Acquire next image, waiting without timeout.
    ///
    /// `OutOfDate` is reported as a status, anything other than success or
    /// suboptimal is an error.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<AcquiredImage> {
        match self.device.acquire_next_image(self.handle(), u64::MAX, semaphore) {
            Ok((index, suboptimal)) => Ok(AcquiredImage::Ready { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquiredImage::OutOfDate),
            Err(e) => Err(e).context("Failed to acquire swapchain image"),
        }
    }

    /// Present `image_index` once `wait_semaphores` are signaled.
    pub fn present(&self, image_index: u32, wait_semaphores: &[vk::Semaphore]) -> Result<PresentStatus> {
        let swapchains = [self.handle()];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match self.device.queue_present(self.device.present_queue(), &present_info) {
            Ok(false) => Ok(PresentStatus::Optimal),
            Ok(true) => Ok(PresentStatus::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentStatus::OutOfDate),
            Err(e) => Err(e).context("Failed to present swapchain image"),
        }
    }
}
