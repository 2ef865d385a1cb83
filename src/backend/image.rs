// Image views and the depth attachment
//
// Both live exactly as long as one swapchain generation.

use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;

use super::handle::Unique;
use super::{GpuDevice, MemoryUsage};
use crate::error::RendererError;

/// Depth formats in order of preference.
const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

pub fn create_image_view<D: GpuDevice>(
    device: &Arc<D>,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
) -> Result<Unique<D, vk::ImageView>> {
    let create_info = vk::ImageViewCreateInfo::builder()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    let view = device
        .create_image_view(&create_info)
        .context("Failed to create image view")?;

    Ok(Unique::new(device, view))
}

/// One color view per swapchain image.
pub fn create_swapchain_views<D: GpuDevice>(
    device: &Arc<D>,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<Unique<D, vk::ImageView>>> {
    images
        .iter()
        .map(|&image| create_image_view(device, image, format, vk::ImageAspectFlags::COLOR))
        .collect()
}

/// First candidate whose optimal tiling supports depth-stencil attachment.
pub fn find_depth_format<D: GpuDevice>(device: &D) -> Result<vk::Format> {
    DEPTH_FORMAT_CANDIDATES
        .iter()
        .copied()
        .find(|&format| {
            device
                .format_properties(format)
                .optimal_tiling_features
                .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
        })
        .ok_or_else(|| RendererError::NoDepthFormat.into())
}

/// Depth buffer image and its view, sized to the swapchain extent.
pub struct DepthImage<D: GpuDevice> {
    // Field order matters for Drop: view before image
    pub view: Unique<D, vk::ImageView>,
    _image: Unique<D, vk::Image>,
}

impl<D: GpuDevice> DepthImage<D> {
    pub fn new(device: &Arc<D>, extent: vk::Extent2D, format: vk::Format) -> Result<Self> {
        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .samples(vk::SampleCountFlags::TYPE_1)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let raw = device
            .create_image(&image_info, MemoryUsage::DeviceLocal)
            .context("Failed to create depth image")?;
        let image = Unique::new(device, raw);

        let view = create_image_view(device, raw, format, vk::ImageAspectFlags::DEPTH)
            .context("Failed to create depth image view")?;

        Ok(Self { view, _image: image })
    }

    #[cfg(test)]
    pub fn image(&self) -> vk::Image {
        self._image.raw()
    }
}

impl<D: GpuDevice> Default for DepthImage<D> {
    fn default() -> Self {
        Self {
            view: Unique::default(),
            _image: Unique::default(),
        }
    }
}
