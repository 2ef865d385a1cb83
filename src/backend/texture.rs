// Sampled texture: device-local RGBA8 image, its view and a sampler
//
// Pixels go through a staging buffer; the image moves
// UNDEFINED -> TRANSFER_DST -> SHADER_READ_ONLY around the copy.

use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;

use super::buffer::Buffer;
use super::command::one_time_submit;
use super::handle::Unique;
use super::image::create_image_view;
use super::{GpuDevice, MemoryUsage};
use crate::assets::TextureData;

const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_SRGB;
const MAX_ANISOTROPY: f32 = 16.0;

pub struct Texture<D: GpuDevice> {
    // Field order matters for Drop
    sampler: Unique<D, vk::Sampler>,
    view: Unique<D, vk::ImageView>,
    _image: Unique<D, vk::Image>,
}

impl<D: GpuDevice> Texture<D> {
    pub fn new(device: &Arc<D>, pool: vk::CommandPool, texture: &TextureData) -> Result<Self> {
        let extent = vk::Extent2D {
            width: texture.width,
            height: texture.height,
        };

        let staging = Buffer::new(
            device,
            texture.pixels.len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryUsage::HostCoherent,
        )
        .context("Failed to create texture staging buffer")?;
        staging.write(0, &texture.pixels)?;

        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(TEXTURE_FORMAT)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .samples(vk::SampleCountFlags::TYPE_1)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let raw = device
            .create_image(&image_info, MemoryUsage::DeviceLocal)
            .context("Failed to create texture image")?;
        let image = Unique::new(device, raw);

        one_time_submit(device, pool, |cmd| {
            transition_layout(
                device.as_ref(),
                cmd,
                raw,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            );
            device.cmd_copy_buffer_to_image(cmd, staging.handle(), raw, extent);
            transition_layout(
                device.as_ref(),
                cmd,
                raw,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
        })
        .context("Failed to upload texture")?;

        let view = create_image_view(device, raw, TEXTURE_FORMAT, vk::ImageAspectFlags::COLOR)
            .context("Failed to create texture image view")?;

        let sampler = create_sampler(device)?;

        log::info!("Uploaded texture: {}x{}", extent.width, extent.height);

        Ok(Self {
            sampler,
            view,
            _image: image,
        })
    }

    pub fn view(&self) -> vk::ImageView {
        self.view.raw()
    }

    pub fn sampler(&self) -> vk::Sampler {
        self.sampler.raw()
    }

    #[cfg(test)]
    pub fn image(&self) -> vk::Image {
        self._image.raw()
    }
}

fn transition_layout<D: GpuDevice>(
    device: &D,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let (src_access, dst_access, src_stage, dst_stage) = match new_layout {
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        _ => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
    };

    let barrier = vk::ImageMemoryBarrier::builder()
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    device.cmd_image_barrier(cmd, src_stage, dst_stage, &barrier);
}

fn create_sampler<D: GpuDevice>(device: &Arc<D>) -> Result<Unique<D, vk::Sampler>> {
    let anisotropy = MAX_ANISOTROPY.min(device.limits().max_sampler_anisotropy);

    let sampler_info = vk::SamplerCreateInfo::builder()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .address_mode_u(vk::SamplerAddressMode::REPEAT)
        .address_mode_v(vk::SamplerAddressMode::REPEAT)
        .address_mode_w(vk::SamplerAddressMode::REPEAT)
        .anisotropy_enable(true)
        .max_anisotropy(anisotropy)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
        .unnormalized_coordinates(false)
        .compare_enable(false)
        .compare_op(vk::CompareOp::ALWAYS)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .mip_lod_bias(0.0)
        .min_lod(0.0)
        .max_lod(0.0);

    let sampler = device
        .create_sampler(&sampler_info)
        .context("Failed to create texture sampler")?;

    Ok(Unique::new(device, sampler))
}
