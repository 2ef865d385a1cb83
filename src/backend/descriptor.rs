// Descriptor pool and the single descriptor set
//
// One set serves every draw: instances differ only by the dynamic offset
// passed when binding it.

use anyhow::{Context, Result};
use ash::vk;
use std::mem::size_of;
use std::sync::Arc;

use super::handle::Unique;
use super::texture::Texture;
use super::uniform::{DynamicUbo, UniformBuffers, ViewProjectionUbo};
use super::GpuDevice;

pub struct Descriptors<D: GpuDevice> {
    set: vk::DescriptorSet,
    // Freeing the pool frees the set
    _pool: Unique<D, vk::DescriptorPool>,
}

impl<D: GpuDevice> Descriptors<D> {
    pub fn new(
        device: &Arc<D>,
        layout: vk::DescriptorSetLayout,
        uniforms: &UniformBuffers<D>,
        texture: &Texture<D>,
    ) -> Result<Self> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: 1,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                descriptor_count: 1,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 1,
            },
        ];

        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .pool_sizes(&pool_sizes)
            .max_sets(1);

        let pool = device
            .create_descriptor_pool(&pool_info)
            .context("Failed to create descriptor pool")?;
        let pool = Unique::new(device, pool);

        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool.raw())
            .set_layouts(&layouts);

        let set = device
            .allocate_descriptor_sets(&alloc_info)
            .context("Failed to allocate descriptor set")?
            .into_iter()
            .next()
            .context("Driver returned no descriptor set")?;

        let view_projection_info = [vk::DescriptorBufferInfo {
            buffer: uniforms.view_projection_buffer(),
            offset: 0,
            range: size_of::<ViewProjectionUbo>() as vk::DeviceSize,
        }];
        let image_info = [vk::DescriptorImageInfo {
            sampler: texture.sampler(),
            image_view: texture.view(),
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];

        let mut writes = vec![
            vk::WriteDescriptorSet::builder()
                .dst_set(set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(&view_projection_info)
                .build(),
            vk::WriteDescriptorSet::builder()
                .dst_set(set)
                .dst_binding(2)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(&image_info)
                .build(),
        ];

        // The shader sees one block; the dynamic offset picks which
        let dynamic_info = uniforms.dynamic_buffer().map(|buffer| {
            [vk::DescriptorBufferInfo {
                buffer,
                offset: 0,
                range: size_of::<DynamicUbo>() as vk::DeviceSize,
            }]
        });
        if let Some(info) = &dynamic_info {
            writes.push(
                vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(1)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
                    .buffer_info(info)
                    .build(),
            );
        }

        device.update_descriptor_sets(&writes);

        Ok(Self { set, _pool: pool })
    }

    pub fn set(&self) -> vk::DescriptorSet {
        self.set
    }
}
