// Uniform data: one view-projection block plus N per-instance model blocks
//
// The per-instance blocks live in one buffer bound as a dynamic uniform
// buffer. Each block starts on a `minUniformBufferOffsetAlignment`
// boundary, so instance i sits at `i * stride`.

use anyhow::{Context, Result};
use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Mat4, Quat, Vec3};
use rand::Rng;
use std::mem::size_of;
use std::sync::Arc;
use std::time::Instant;

use super::buffer::Buffer;
use super::{GpuDevice, MemoryUsage};
use crate::error::RendererError;

/// Distance between neighbouring instances on the grid.
const GRID_SPACING: f32 = 2.5;

/// Spin rate about Y, alternating direction per instance.
const SPIN_DEGREES_PER_SECOND: f32 = 90.0;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ViewProjectionUbo {
    pub view: Mat4,
    pub projection: Mat4,
}

impl ViewProjectionUbo {
    /// Fixed camera looking at the origin, 45° vertical FOV, Y flipped for
    /// Vulkan clip space.
    pub fn for_extent(extent: vk::Extent2D) -> Self {
        let view = Mat4::look_at_rh(
            Vec3::new(0.0, -5.0, -5.0),
            Vec3::ZERO,
            Vec3::new(0.0, -1.0, 0.0),
        );

        let aspect = extent.width as f32 / extent.height.max(1) as f32;
        let mut projection = Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 50.0);
        projection.y_axis.y *= -1.0;

        Self { view, projection }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DynamicUbo {
    pub model: Mat4,
}

/// Size of one per-instance block rounded up to `alignment`.
pub fn dynamic_stride(alignment: vk::DeviceSize) -> vk::DeviceSize {
    let alignment = alignment.max(1);
    let size = size_of::<DynamicUbo>() as vk::DeviceSize;
    size.div_ceil(alignment) * alignment
}

/// Centre of instance `index` on a cube of side `ceil(cbrt(count))`.
pub fn grid_position(index: u32, count: u32) -> Vec3 {
    let side = grid_side(count);
    let x = index % side;
    let y = (index / side) % side;
    let z = index / (side * side);

    let centre = (side - 1) as f32 * 0.5;
    Vec3::new(x as f32 - centre, y as f32 - centre, z as f32 - centre) * GRID_SPACING
}

/// Smallest cube side that fits `count` instances.
fn grid_side(count: u32) -> u32 {
    let mut side = 1;
    while (side as u64).pow(3) < count as u64 {
        side += 1;
    }
    side
}

/// Every instance offset must fit the `u32` dynamic offset and each bound
/// block must fit the device's uniform range.
fn check_dynamic_range(
    instance_count: u32,
    stride: vk::DeviceSize,
    max_range: u32,
) -> Result<(), RendererError> {
    let block = size_of::<ViewProjectionUbo>().max(size_of::<DynamicUbo>()) as vk::DeviceSize;
    if block > max_range as vk::DeviceSize {
        return Err(RendererError::UniformRangeTooLarge {
            size: block,
            max: max_range,
        });
    }

    let last_offset = instance_count.saturating_sub(1) as vk::DeviceSize * stride;
    if last_offset > u32::MAX as vk::DeviceSize {
        return Err(RendererError::TooManyInstances {
            count: instance_count,
            stride,
        });
    }
    Ok(())
}

pub struct UniformBuffers<D: GpuDevice> {
    view_projection: Buffer<D>,
    dynamic: Option<Buffer<D>>,
    stride: vk::DeviceSize,
    instance_count: u32,
    initial_rotations: Vec<Quat>,
    // Reused every frame; N * stride bytes
    blocks: Vec<u8>,
    start: Instant,
}

impl<D: GpuDevice> UniformBuffers<D> {
    pub fn new(device: &Arc<D>, instance_count: u32) -> Result<Self> {
        let view_projection = Buffer::new(
            device,
            size_of::<ViewProjectionUbo>() as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            MemoryUsage::HostCoherent,
        )
        .context("Failed to create view-projection uniform buffer")?;

        let limits = device.limits();
        let stride = dynamic_stride(limits.min_uniform_buffer_offset_alignment);
        check_dynamic_range(instance_count, stride, limits.max_uniform_buffer_range)?;

        let (dynamic, initial_rotations) = if instance_count == 0 {
            (None, Vec::new())
        } else {
            let buffer = Buffer::new(
                device,
                instance_count as vk::DeviceSize * stride,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                MemoryUsage::HostVisible,
            )
            .context("Failed to create dynamic uniform buffer")?;

            let mut rng = rand::thread_rng();
            let rotations = (0..instance_count)
                .map(|_| {
                    Quat::from_euler(
                        EulerRot::XYZ,
                        rng.gen_range(0.0..std::f32::consts::TAU),
                        rng.gen_range(0.0..std::f32::consts::TAU),
                        rng.gen_range(0.0..std::f32::consts::TAU),
                    )
                })
                .collect();

            (Some(buffer), rotations)
        };

        log::debug!(
            "Uniform buffers: {} instances, {} byte stride",
            instance_count,
            stride
        );

        Ok(Self {
            view_projection,
            dynamic,
            stride,
            instance_count,
            initial_rotations,
            blocks: vec![0; (instance_count as vk::DeviceSize * stride) as usize],
            start: Instant::now(),
        })
    }

    pub fn stride(&self) -> vk::DeviceSize {
        self.stride
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Byte offset of instance `index`'s block.
    pub fn offset(&self, index: u32) -> vk::DeviceSize {
        index as vk::DeviceSize * self.stride
    }

    pub fn view_projection_buffer(&self) -> vk::Buffer {
        self.view_projection.handle()
    }

    /// `None` when there are no instances.
    pub fn dynamic_buffer(&self) -> Option<vk::Buffer> {
        self.dynamic.as_ref().map(Buffer::handle)
    }

    /// Recompute the camera for a new swapchain extent.
    pub fn update_view_projection(&self, extent: vk::Extent2D) -> Result<()> {
        let ubo = ViewProjectionUbo::for_extent(extent);
        self.view_projection
            .write(0, bytemuck::bytes_of(&ubo))
            .context("Failed to write view-projection uniform buffer")
    }

    /// Recompute every instance's model matrix for the current time.
    pub fn update(&mut self) -> Result<()> {
        let elapsed = self.start.elapsed().as_secs_f32();
        self.update_at(elapsed)
    }

    /// Recompute every instance's model matrix for `seconds` since start.
    pub fn update_at(&mut self, seconds: f32) -> Result<()> {
        let Some(dynamic) = &self.dynamic else {
            return Ok(());
        };

        for (i, rotation) in self.initial_rotations.iter().enumerate() {
            let index = i as u32;
            let ubo = DynamicUbo {
                model: instance_model(index, self.instance_count, *rotation, seconds),
            };
            let start = self.offset(index) as usize;
            self.blocks[start..start + size_of::<DynamicUbo>()]
                .copy_from_slice(bytemuck::bytes_of(&ubo));
        }

        dynamic
            .write(0, &self.blocks)
            .context("Failed to write dynamic uniform buffer")
    }
}

fn instance_model(index: u32, count: u32, initial: Quat, seconds: f32) -> Mat4 {
    let direction = if index % 2 == 1 { 1.0 } else { -1.0 };
    let spin = direction * seconds * SPIN_DEGREES_PER_SECOND.to_radians();

    Mat4::from_translation(grid_position(index, count))
        * Mat4::from_rotation_y(spin)
        * Mat4::from_quat(initial)
}
