// Command pool and pre-recorded draw commands
//
// One primary command buffer per framebuffer, recorded once per swapchain
// generation. Recreation frees and re-records them all.

use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;

use super::handle::Unique;
use super::GpuDevice;

pub fn create_command_pool<D: GpuDevice>(device: &Arc<D>) -> Result<Unique<D, vk::CommandPool>> {
    let pool_info = vk::CommandPoolCreateInfo::builder()
        .queue_family_index(device.queue_families().graphics)
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

    let pool = device
        .create_command_pool(&pool_info)
        .context("Failed to create command pool")?;

    Ok(Unique::new(device, pool))
}

/// Record `record` into a throwaway command buffer, submit it to the
/// graphics queue and wait for it to finish.
pub fn one_time_submit<D, F>(device: &Arc<D>, pool: vk::CommandPool, record: F) -> Result<()>
where
    D: GpuDevice,
    F: FnOnce(vk::CommandBuffer),
{
    let alloc_info = vk::CommandBufferAllocateInfo::builder()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);

    let cmd = device
        .allocate_command_buffers(&alloc_info)
        .context("Failed to allocate transfer command buffer")?
        .into_iter()
        .next()
        .context("Driver returned no command buffer")?;

    let result = (|| -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        device
            .begin_command_buffer(cmd, &begin_info)
            .context("Failed to begin transfer command buffer")?;

        record(cmd);

        device
            .end_command_buffer(cmd)
            .context("Failed to end transfer command buffer")?;

        let command_buffers = [cmd];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);
        device
            .queue_submit(device.graphics_queue(), &[submit_info.build()], vk::Fence::null())
            .context("Failed to submit transfer command buffer")?;
        device
            .queue_wait_idle(device.graphics_queue())
            .context("Failed waiting for transfer to finish")
    })();

    device.free_command_buffers(pool, &[cmd]);
    result
}

/// Everything one frame's draw commands reference.
#[derive(Debug, Clone, Copy)]
pub struct DrawParams {
    pub render_pass: vk::RenderPass,
    pub extent: vk::Extent2D,
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub vertex_buffer: vk::Buffer,
    pub index_buffer: vk::Buffer,
    pub index_count: u32,
    pub descriptor_set: vk::DescriptorSet,
    pub instance_count: u32,
    pub dynamic_stride: vk::DeviceSize,
    pub clear_color: [f32; 4],
}

impl DrawParams {
    /// Dynamic offset selecting instance `i`'s transform block.
    ///
    /// `UniformBuffers::new` rejects counts whose last offset overflows `u32`.
    pub fn dynamic_offset(&self, instance: u32) -> u32 {
        (instance as vk::DeviceSize * self.dynamic_stride) as u32
    }
}

pub struct CommandBuffers<D: GpuDevice> {
    buffers: Vec<vk::CommandBuffer>,
    pool: vk::CommandPool,
    device: Option<Arc<D>>,
}

impl<D: GpuDevice> CommandBuffers<D> {
    /// Allocate and record one command buffer per framebuffer.
    pub fn new(
        device: &Arc<D>,
        pool: vk::CommandPool,
        framebuffers: &[Unique<D, vk::Framebuffer>],
        params: &DrawParams,
    ) -> Result<Self> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(framebuffers.len() as u32);

        let buffers = device
            .allocate_command_buffers(&alloc_info)
            .context("Failed to allocate command buffers")?;

        // Owned from here on, so an early return frees them
        let command_buffers = Self {
            buffers,
            pool,
            device: Some(Arc::clone(device)),
        };

        for (i, (&cmd, framebuffer)) in command_buffers
            .buffers
            .iter()
            .zip(framebuffers)
            .enumerate()
        {
            record_frame(device.as_ref(), cmd, framebuffer.raw(), params)
                .with_context(|| format!("Failed to record command buffer {}", i))?;
        }

        log::debug!(
            "Recorded {} command buffers with {} draws each",
            command_buffers.len(),
            params.instance_count
        );

        Ok(command_buffers)
    }

    pub fn get(&self, image_index: u32) -> Result<vk::CommandBuffer> {
        self.buffers
            .get(image_index as usize)
            .copied()
            .with_context(|| format!("No command buffer for swapchain image {}", image_index))
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }
}

impl<D: GpuDevice> Default for CommandBuffers<D> {
    fn default() -> Self {
        Self {
            buffers: Vec::new(),
            pool: vk::CommandPool::null(),
            device: None,
        }
    }
}

impl<D: GpuDevice> Drop for CommandBuffers<D> {
    fn drop(&mut self) {
        if let Some(device) = &self.device {
            if !self.buffers.is_empty() {
                device.free_command_buffers(self.pool, &self.buffers);
            }
        }
    }
}

fn record_frame<D: GpuDevice>(
    device: &D,
    cmd: vk::CommandBuffer,
    framebuffer: vk::Framebuffer,
    params: &DrawParams,
) -> Result<()> {
    let begin_info =
        vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::SIMULTANEOUS_USE);
    device
        .begin_command_buffer(cmd, &begin_info)
        .context("Failed to begin recording command buffer")?;

    let clear_values = [
        vk::ClearValue {
            color: vk::ClearColorValue {
                float32: params.clear_color,
            },
        },
        vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue {
                depth: 1.0,
                stencil: 0,
            },
        },
    ];

    let render_pass_info = vk::RenderPassBeginInfo::builder()
        .render_pass(params.render_pass)
        .framebuffer(framebuffer)
        .render_area(vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: params.extent,
        })
        .clear_values(&clear_values);

    device.cmd_begin_render_pass(cmd, &render_pass_info);
    device.cmd_bind_pipeline(cmd, params.pipeline);
    device.cmd_bind_vertex_buffer(cmd, params.vertex_buffer);
    device.cmd_bind_index_buffer(cmd, params.index_buffer);

    for instance in 0..params.instance_count {
        device.cmd_bind_descriptor_set(
            cmd,
            params.pipeline_layout,
            params.descriptor_set,
            &[params.dynamic_offset(instance)],
        );
        device.cmd_draw_indexed(cmd, params.index_count);
    }

    device.cmd_end_render_pass(cmd);

    device
        .end_command_buffer(cmd)
        .context("Failed to finish recording command buffer")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::stub::{Recorded, StubDevice};
    use ash::vk::Handle;

    fn params(instance_count: u32) -> DrawParams {
        DrawParams {
            render_pass: vk::RenderPass::from_raw(1000),
            extent: vk::Extent2D { width: 800, height: 600 },
            pipeline: vk::Pipeline::from_raw(1001),
            pipeline_layout: vk::PipelineLayout::from_raw(1002),
            vertex_buffer: vk::Buffer::from_raw(1003),
            index_buffer: vk::Buffer::from_raw(1004),
            index_count: 36,
            descriptor_set: vk::DescriptorSet::from_raw(1005),
            instance_count,
            dynamic_stride: 256,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    fn framebuffers(device: &Arc<StubDevice>, count: usize) -> Vec<Unique<StubDevice, vk::Framebuffer>> {
        (0..count)
            .map(|_| {
                let info = vk::FramebufferCreateInfo::builder();
                Unique::new(device, device.create_framebuffer(&info).unwrap())
            })
            .collect()
    }

    #[test]
    fn each_buffer_draws_every_instance_with_its_offset() {
        let device = StubDevice::new();
        let pool = create_command_pool(&device).unwrap();
        let framebuffers = framebuffers(&device, 3);

        let buffers = CommandBuffers::new(&device, pool.raw(), &framebuffers, &params(3)).unwrap();
        assert_eq!(buffers.len(), 3);

        let recorded = device.recording(buffers.get(1).unwrap());
        assert_eq!(
            recorded,
            vec![
                Recorded::BeginRenderPass {
                    framebuffer: framebuffers[1].raw(),
                    clear_values: 2,
                },
                Recorded::BindPipeline(vk::Pipeline::from_raw(1001)),
                Recorded::BindVertexBuffer(vk::Buffer::from_raw(1003)),
                Recorded::BindIndexBuffer(vk::Buffer::from_raw(1004)),
                Recorded::BindDescriptorSet {
                    set: vk::DescriptorSet::from_raw(1005),
                    dynamic_offsets: vec![0],
                },
                Recorded::DrawIndexed { index_count: 36 },
                Recorded::BindDescriptorSet {
                    set: vk::DescriptorSet::from_raw(1005),
                    dynamic_offsets: vec![256],
                },
                Recorded::DrawIndexed { index_count: 36 },
                Recorded::BindDescriptorSet {
                    set: vk::DescriptorSet::from_raw(1005),
                    dynamic_offsets: vec![512],
                },
                Recorded::DrawIndexed { index_count: 36 },
                Recorded::EndRenderPass,
            ]
        );
    }

    #[test]
    fn zero_instances_record_an_empty_pass() {
        let device = StubDevice::new();
        let pool = create_command_pool(&device).unwrap();
        let framebuffers = framebuffers(&device, 2);

        let buffers = CommandBuffers::new(&device, pool.raw(), &framebuffers, &params(0)).unwrap();
        let recorded = device.recording(buffers.get(0).unwrap());

        assert!(!recorded
            .iter()
            .any(|c| matches!(c, Recorded::DrawIndexed { .. })));
        assert_eq!(recorded.last(), Some(&Recorded::EndRenderPass));
        assert!(buffers.get(2).is_err());
    }

    #[test]
    fn dropping_frees_the_buffers() {
        let device = StubDevice::new();
        let pool = create_command_pool(&device).unwrap();
        let framebuffers = framebuffers(&device, 3);

        let buffers = CommandBuffers::new(&device, pool.raw(), &framebuffers, &params(1)).unwrap();
        assert_eq!(device.live_count("command buffer"), 3);
        drop(buffers);
        assert_eq!(device.live_count("command buffer"), 0);
    }

    #[test]
    fn one_time_submit_waits_and_frees() {
        let device = StubDevice::new();
        let pool = create_command_pool(&device).unwrap();
        let (src, dst) = (vk::Buffer::from_raw(7), vk::Buffer::from_raw(8));

        one_time_submit(&device, pool.raw(), |cmd| device.cmd_copy_buffer(cmd, src, dst, 64)).unwrap();

        assert_eq!(device.submit_count(), 1);
        assert_eq!(device.live_count("command buffer"), 0);
    }
}
