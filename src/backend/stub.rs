// Recording device for tests
//
// Fabricates handles, remembers what was created and destroyed, records
// every command-buffer command and lets tests script the results of
// acquire, submit and present.

use anyhow::{bail, Result};
use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use super::swapchain::{SurfaceSupport, PREFERRED_SURFACE_FORMAT};
use super::{GpuDevice, MemoryUsage, QueueFamilyIndices};

/// One recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    BeginRenderPass {
        framebuffer: vk::Framebuffer,
        clear_values: u32,
    },
    BindPipeline(vk::Pipeline),
    BindVertexBuffer(vk::Buffer),
    BindIndexBuffer(vk::Buffer),
    BindDescriptorSet {
        set: vk::DescriptorSet,
        dynamic_offsets: Vec<u32>,
    },
    DrawIndexed {
        index_count: u32,
    },
    EndRenderPass,
    CopyBuffer {
        src: vk::Buffer,
        dst: vk::Buffer,
        size: vk::DeviceSize,
    },
    CopyBufferToImage {
        src: vk::Buffer,
        dst: vk::Image,
    },
    ImageBarrier {
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    },
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub command_buffers: Vec<vk::CommandBuffer>,
    pub wait_semaphores: Vec<vk::Semaphore>,
    pub wait_stages: Vec<vk::PipelineStageFlags>,
    pub signal_semaphores: Vec<vk::Semaphore>,
}

#[derive(Debug, Clone)]
pub struct BufferWrite {
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct StubBuffer {
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub memory: MemoryUsage,
}

/// Fixed-function state a graphics pipeline was created with.
#[derive(Debug, Clone, Copy)]
pub struct PipelineRecord {
    pub viewport: vk::Viewport,
    pub topology: vk::PrimitiveTopology,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: vk::CompareOp,
    pub blend_enable: bool,
}

#[derive(Debug, Clone)]
pub struct RenderPassRecord {
    pub attachments: Vec<vk::AttachmentDescription>,
    pub dependencies: Vec<vk::SubpassDependency>,
}

/// Device-level calls in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    WaitIdle,
    CreateSwapchain,
    CreateImage,
    CreateImageView,
    CreateRenderPass,
    CreatePipeline,
    CreateFramebuffer,
    AllocateCommandBuffers,
    Acquire,
    Submit,
    Present,
}

struct State {
    next_handle: u64,
    live: HashMap<u64, &'static str>,
    destroyed: usize,
    calls: Vec<Call>,
    recordings: HashMap<vk::CommandBuffer, Vec<Recorded>>,
    submissions: Vec<Submission>,
    presents: usize,
    acquire_results: VecDeque<VkResult<(u32, bool)>>,
    submit_results: VecDeque<VkResult<()>>,
    present_results: VecDeque<VkResult<bool>>,
    support: SurfaceSupport,
    alignment: vk::DeviceSize,
    depth_formats: Vec<vk::Format>,
    buffers: HashMap<vk::Buffer, StubBuffer>,
    writes: Vec<BufferWrite>,
    swapchain_images: HashMap<vk::SwapchainKHR, Vec<vk::Image>>,
    last_old_swapchain: vk::SwapchainKHR,
    descriptor_writes: Vec<(u32, vk::DescriptorType)>,
    render_passes: Vec<RenderPassRecord>,
    pipelines: Vec<PipelineRecord>,
}

impl State {
    fn fabricate<H: Handle>(&mut self) -> H {
        self.next_handle += 1;
        H::from_raw(self.next_handle)
    }

    fn create<H: Handle + Copy>(&mut self, kind: &'static str) -> H {
        let handle: H = self.fabricate();
        self.live.insert(handle.as_raw(), kind);
        handle
    }

    fn destroy<H: Handle + Copy>(&mut self, handle: H) {
        if self.live.remove(&handle.as_raw()).is_some() {
            self.destroyed += 1;
        }
    }

    fn record(&mut self, cmd: vk::CommandBuffer, command: Recorded) {
        self.recordings.entry(cmd).or_default().push(command);
    }
}

unsafe fn raw_slice<T: Copy>(ptr: *const T, len: u32) -> Vec<T> {
    if len == 0 || ptr.is_null() {
        Vec::new()
    } else {
        std::slice::from_raw_parts(ptr, len as usize).to_vec()
    }
}

pub struct StubDevice {
    state: Mutex<State>,
}

impl StubDevice {
    /// Surface with an undefined current extent, three images per
    /// swapchain and the preferred format available.
    pub fn new() -> Arc<Self> {
        let support = SurfaceSupport {
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 0,
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                min_image_extent: vk::Extent2D { width: 1, height: 1 },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                ..Default::default()
            },
            formats: vec![
                vk::SurfaceFormatKHR {
                    format: vk::Format::R8G8B8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                },
                PREFERRED_SURFACE_FORMAT,
            ],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        };

        Arc::new(Self {
            state: Mutex::new(State {
                next_handle: 0,
                live: HashMap::new(),
                destroyed: 0,
                calls: Vec::new(),
                recordings: HashMap::new(),
                submissions: Vec::new(),
                presents: 0,
                acquire_results: VecDeque::new(),
                submit_results: VecDeque::new(),
                present_results: VecDeque::new(),
                support,
                alignment: 256,
                depth_formats: vec![vk::Format::D32_SFLOAT],
                buffers: HashMap::new(),
                writes: Vec::new(),
                swapchain_images: HashMap::new(),
                last_old_swapchain: vk::SwapchainKHR::null(),
                descriptor_writes: Vec::new(),
                render_passes: Vec::new(),
                pipelines: Vec::new(),
            }),
        })
    }

    // ── Scripting ─────────────────────────────────────────────────────────

    pub fn push_acquire_result(&self, result: VkResult<(u32, bool)>) {
        self.state.lock().acquire_results.push_back(result);
    }

    pub fn push_submit_result(&self, result: VkResult<()>) {
        self.state.lock().submit_results.push_back(result);
    }

    pub fn push_present_result(&self, result: VkResult<bool>) {
        self.state.lock().present_results.push_back(result);
    }

    pub fn set_min_uniform_buffer_offset_alignment(&self, alignment: vk::DeviceSize) {
        self.state.lock().alignment = alignment;
    }

    pub fn set_supported_depth_formats(&self, formats: &[vk::Format]) {
        self.state.lock().depth_formats = formats.to_vec();
    }

    // ── Inspection ────────────────────────────────────────────────────────

    pub fn destroyed_count(&self) -> usize {
        self.state.lock().destroyed
    }

    /// Kinds of every object created and not yet destroyed.
    pub fn live_objects(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.state.lock().live.values().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn live_count(&self, kind: &str) -> usize {
        self.state
            .lock()
            .live
            .values()
            .filter(|&&k| k == kind)
            .count()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn recording(&self, cmd: vk::CommandBuffer) -> Vec<Recorded> {
        self.state
            .lock()
            .recordings
            .get(&cmd)
            .cloned()
            .unwrap_or_default()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().submissions.clone()
    }

    pub fn submit_count(&self) -> usize {
        self.state.lock().submissions.len()
    }

    pub fn present_count(&self) -> usize {
        self.state.lock().presents
    }

    pub fn buffer(&self, buffer: vk::Buffer) -> Option<StubBuffer> {
        self.state.lock().buffers.get(&buffer).copied()
    }

    pub fn writes_to(&self, buffer: vk::Buffer) -> Vec<BufferWrite> {
        self.state
            .lock()
            .writes
            .iter()
            .filter(|w| w.buffer == buffer)
            .cloned()
            .collect()
    }

    pub fn last_old_swapchain(&self) -> vk::SwapchainKHR {
        self.state.lock().last_old_swapchain
    }

    pub fn descriptor_writes(&self) -> Vec<(u32, vk::DescriptorType)> {
        self.state.lock().descriptor_writes.clone()
    }

    pub fn pipeline_viewports(&self) -> Vec<vk::Viewport> {
        self.state.lock().pipelines.iter().map(|p| p.viewport).collect()
    }

    pub fn pipelines(&self) -> Vec<PipelineRecord> {
        self.state.lock().pipelines.clone()
    }

    pub fn render_passes(&self) -> Vec<RenderPassRecord> {
        self.state.lock().render_passes.clone()
    }
}

impl GpuDevice for StubDevice {
    fn limits(&self) -> vk::PhysicalDeviceLimits {
        vk::PhysicalDeviceLimits {
            min_uniform_buffer_offset_alignment: self.state.lock().alignment,
            non_coherent_atom_size: 64,
            max_uniform_buffer_range: 65_536,
            max_sampler_anisotropy: 16.0,
            ..Default::default()
        }
    }

    fn queue_families(&self) -> QueueFamilyIndices {
        QueueFamilyIndices {
            graphics: 0,
            present: 0,
        }
    }

    fn graphics_queue(&self) -> vk::Queue {
        vk::Queue::from_raw(u64::MAX - 1)
    }

    fn present_queue(&self) -> vk::Queue {
        vk::Queue::from_raw(u64::MAX - 1)
    }

    fn surface(&self) -> vk::SurfaceKHR {
        vk::SurfaceKHR::from_raw(u64::MAX - 2)
    }

    fn surface_support(&self) -> VkResult<SurfaceSupport> {
        Ok(self.state.lock().support.clone())
    }

    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        let state = self.state.lock();
        let optimal_tiling_features = if state.depth_formats.contains(&format) {
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
        } else {
            vk::FormatFeatureFlags::empty()
        };
        vk::FormatProperties {
            optimal_tiling_features,
            ..Default::default()
        }
    }

    fn wait_idle(&self) -> VkResult<()> {
        self.state.lock().calls.push(Call::WaitIdle);
        Ok(())
    }

    fn queue_wait_idle(&self, _queue: vk::Queue) -> VkResult<()> {
        Ok(())
    }

    fn queue_submit(
        &self,
        _queue: vk::Queue,
        submits: &[vk::SubmitInfo],
        _fence: vk::Fence,
    ) -> VkResult<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::Submit);
        if let Some(Err(e)) = state.submit_results.pop_front() {
            return Err(e);
        }

        // SAFETY: the pointers come from slices borrowed for this call.
        for submit in submits {
            let submission = unsafe {
                Submission {
                    command_buffers: raw_slice(submit.p_command_buffers, submit.command_buffer_count),
                    wait_semaphores: raw_slice(submit.p_wait_semaphores, submit.wait_semaphore_count),
                    wait_stages: raw_slice(submit.p_wait_dst_stage_mask, submit.wait_semaphore_count),
                    signal_semaphores: raw_slice(
                        submit.p_signal_semaphores,
                        submit.signal_semaphore_count,
                    ),
                }
            };
            state.submissions.push(submission);
        }
        Ok(())
    }

    fn create_swapchain(&self, info: &vk::SwapchainCreateInfoKHR) -> VkResult<vk::SwapchainKHR> {
        let mut state = self.state.lock();
        state.calls.push(Call::CreateSwapchain);
        state.last_old_swapchain = info.old_swapchain;

        let swapchain: vk::SwapchainKHR = state.create("swapchain");
        let images: Vec<vk::Image> = (0..info.min_image_count)
            .map(|_| state.fabricate())
            .collect();
        state.swapchain_images.insert(swapchain, images);
        Ok(swapchain)
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        self.state
            .lock()
            .swapchain_images
            .get(&swapchain)
            .cloned()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        let mut state = self.state.lock();
        state.swapchain_images.remove(&swapchain);
        state.destroy(swapchain);
    }

    fn acquire_next_image(
        &self,
        _swapchain: vk::SwapchainKHR,
        _timeout: u64,
        _semaphore: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        let mut state = self.state.lock();
        state.calls.push(Call::Acquire);
        state.acquire_results.pop_front().unwrap_or(Ok((0, false)))
    }

    fn queue_present(&self, _queue: vk::Queue, _info: &vk::PresentInfoKHR) -> VkResult<bool> {
        let mut state = self.state.lock();
        state.calls.push(Call::Present);
        state.presents += 1;
        state.present_results.pop_front().unwrap_or(Ok(false))
    }

    fn create_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        memory: MemoryUsage,
    ) -> Result<vk::Buffer> {
        if size == 0 {
            bail!("Zero-sized buffer");
        }
        let mut state = self.state.lock();
        let buffer = state.create("buffer");
        state
            .buffers
            .insert(buffer, StubBuffer { size, usage, memory });
        Ok(buffer)
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        let mut state = self.state.lock();
        state.buffers.remove(&buffer);
        state.destroy(buffer);
    }

    fn write_buffer(&self, buffer: vk::Buffer, offset: vk::DeviceSize, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        let Some(info) = state.buffers.get(&buffer).copied() else {
            bail!("Write to unknown buffer {:?}", buffer);
        };
        if info.memory == MemoryUsage::DeviceLocal {
            bail!("Buffer {:?} is not host visible", buffer);
        }
        if offset + data.len() as vk::DeviceSize > info.size {
            bail!(
                "Write of {} bytes at {} overflows buffer of {} bytes",
                data.len(),
                offset,
                info.size
            );
        }
        state.writes.push(BufferWrite {
            buffer,
            offset,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn create_image(&self, _info: &vk::ImageCreateInfo, _memory: MemoryUsage) -> Result<vk::Image> {
        let mut state = self.state.lock();
        state.calls.push(Call::CreateImage);
        Ok(state.create("image"))
    }

    fn destroy_image(&self, image: vk::Image) {
        self.state.lock().destroy(image);
    }

    fn create_image_view(&self, _info: &vk::ImageViewCreateInfo) -> VkResult<vk::ImageView> {
        let mut state = self.state.lock();
        state.calls.push(Call::CreateImageView);
        Ok(state.create("image view"))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.state.lock().destroy(view);
    }

    fn create_render_pass(&self, info: &vk::RenderPassCreateInfo) -> VkResult<vk::RenderPass> {
        let mut state = self.state.lock();
        state.calls.push(Call::CreateRenderPass);
        // SAFETY: the pointers come from slices borrowed for this call.
        let record = unsafe {
            RenderPassRecord {
                attachments: raw_slice(info.p_attachments, info.attachment_count),
                dependencies: raw_slice(info.p_dependencies, info.dependency_count),
            }
        };
        state.render_passes.push(record);
        Ok(state.create("render pass"))
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.state.lock().destroy(render_pass);
    }

    fn create_framebuffer(&self, _info: &vk::FramebufferCreateInfo) -> VkResult<vk::Framebuffer> {
        let mut state = self.state.lock();
        state.calls.push(Call::CreateFramebuffer);
        Ok(state.create("framebuffer"))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.state.lock().destroy(framebuffer);
    }

    fn create_shader_module(
        &self,
        _info: &vk::ShaderModuleCreateInfo,
    ) -> VkResult<vk::ShaderModule> {
        Ok(self.state.lock().create("shader module"))
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        self.state.lock().destroy(module);
    }

    fn create_descriptor_set_layout(
        &self,
        _info: &vk::DescriptorSetLayoutCreateInfo,
    ) -> VkResult<vk::DescriptorSetLayout> {
        Ok(self.state.lock().create("descriptor set layout"))
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        self.state.lock().destroy(layout);
    }

    fn create_pipeline_layout(
        &self,
        _info: &vk::PipelineLayoutCreateInfo,
    ) -> VkResult<vk::PipelineLayout> {
        Ok(self.state.lock().create("pipeline layout"))
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        self.state.lock().destroy(layout);
    }

    fn create_graphics_pipeline(
        &self,
        info: &vk::GraphicsPipelineCreateInfo,
    ) -> VkResult<vk::Pipeline> {
        let mut state = self.state.lock();
        state.calls.push(Call::CreatePipeline);
        // SAFETY: the create info borrows live builder state for this call.
        let record = unsafe {
            let viewport_state = info.p_viewport_state.as_ref();
            let input_assembly = info.p_input_assembly_state.as_ref();
            let rasterization = info.p_rasterization_state.as_ref();
            let depth_stencil = info.p_depth_stencil_state.as_ref();
            let blend = info.p_color_blend_state.as_ref();
            PipelineRecord {
                viewport: viewport_state
                    .filter(|v| v.viewport_count > 0)
                    .map(|v| *v.p_viewports)
                    .unwrap_or_default(),
                topology: input_assembly.map(|i| i.topology).unwrap_or_default(),
                cull_mode: rasterization.map(|r| r.cull_mode).unwrap_or_default(),
                front_face: rasterization.map(|r| r.front_face).unwrap_or_default(),
                depth_test: depth_stencil.map_or(false, |d| d.depth_test_enable == vk::TRUE),
                depth_write: depth_stencil.map_or(false, |d| d.depth_write_enable == vk::TRUE),
                depth_compare: depth_stencil.map(|d| d.depth_compare_op).unwrap_or_default(),
                blend_enable: blend.map_or(false, |b| {
                    raw_slice(b.p_attachments, b.attachment_count)
                        .iter()
                        .any(|a| a.blend_enable == vk::TRUE)
                }),
            }
        };
        state.pipelines.push(record);
        Ok(state.create("pipeline"))
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.state.lock().destroy(pipeline);
    }

    fn create_descriptor_pool(
        &self,
        _info: &vk::DescriptorPoolCreateInfo,
    ) -> VkResult<vk::DescriptorPool> {
        Ok(self.state.lock().create("descriptor pool"))
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        self.state.lock().destroy(pool);
    }

    fn allocate_descriptor_sets(
        &self,
        info: &vk::DescriptorSetAllocateInfo,
    ) -> VkResult<Vec<vk::DescriptorSet>> {
        let mut state = self.state.lock();
        Ok((0..info.descriptor_set_count)
            .map(|_| state.fabricate())
            .collect())
    }

    fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet]) {
        let mut state = self.state.lock();
        state
            .descriptor_writes
            .extend(writes.iter().map(|w| (w.dst_binding, w.descriptor_type)));
    }

    fn create_sampler(&self, _info: &vk::SamplerCreateInfo) -> VkResult<vk::Sampler> {
        Ok(self.state.lock().create("sampler"))
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        self.state.lock().destroy(sampler);
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        Ok(self.state.lock().create("semaphore"))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.state.lock().destroy(semaphore);
    }

    fn create_command_pool(&self, _info: &vk::CommandPoolCreateInfo) -> VkResult<vk::CommandPool> {
        Ok(self.state.lock().create("command pool"))
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        self.state.lock().destroy(pool);
    }

    fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        let mut state = self.state.lock();
        state.calls.push(Call::AllocateCommandBuffers);
        Ok((0..info.command_buffer_count)
            .map(|_| state.create("command buffer"))
            .collect())
    }

    fn free_command_buffers(&self, _pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        let mut state = self.state.lock();
        // Recordings are kept so tests can inspect freed buffers
        for &cmd in buffers {
            state.destroy(cmd);
        }
    }

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        _info: &vk::CommandBufferBeginInfo,
    ) -> VkResult<()> {
        self.state.lock().recordings.insert(cmd, Vec::new());
        Ok(())
    }

    fn end_command_buffer(&self, _cmd: vk::CommandBuffer) -> VkResult<()> {
        Ok(())
    }

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, info: &vk::RenderPassBeginInfo) {
        self.state.lock().record(
            cmd,
            Recorded::BeginRenderPass {
                framebuffer: info.framebuffer,
                clear_values: info.clear_value_count,
            },
        );
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        self.state.lock().record(cmd, Recorded::EndRenderPass);
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        self.state.lock().record(cmd, Recorded::BindPipeline(pipeline));
    }

    fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        self.state.lock().record(cmd, Recorded::BindVertexBuffer(buffer));
    }

    fn cmd_bind_index_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        self.state.lock().record(cmd, Recorded::BindIndexBuffer(buffer));
    }

    fn cmd_bind_descriptor_set(
        &self,
        cmd: vk::CommandBuffer,
        _layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
        dynamic_offsets: &[u32],
    ) {
        self.state.lock().record(
            cmd,
            Recorded::BindDescriptorSet {
                set,
                dynamic_offsets: dynamic_offsets.to_vec(),
            },
        );
    }

    fn cmd_draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32) {
        self.state
            .lock()
            .record(cmd, Recorded::DrawIndexed { index_count });
    }

    fn cmd_copy_buffer(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        size: vk::DeviceSize,
    ) {
        self.state
            .lock()
            .record(cmd, Recorded::CopyBuffer { src, dst, size });
    }

    fn cmd_copy_buffer_to_image(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Image,
        _extent: vk::Extent2D,
    ) {
        self.state
            .lock()
            .record(cmd, Recorded::CopyBufferToImage { src, dst });
    }

    fn cmd_image_barrier(
        &self,
        cmd: vk::CommandBuffer,
        _src_stage: vk::PipelineStageFlags,
        _dst_stage: vk::PipelineStageFlags,
        barrier: &vk::ImageMemoryBarrier,
    ) {
        self.state.lock().record(
            cmd,
            Recorded::ImageBarrier {
                old_layout: barrier.old_layout,
                new_layout: barrier.new_layout,
            },
        );
    }
}
