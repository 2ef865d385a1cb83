// =============================================================================
// ENGINE - Owns every GPU resource and runs the frame protocol
// =============================================================================
//
// CONSTRUCTION ORDER (leaves first):
//   depth format -> swapchain -> descriptor set layout -> command pool
//   -> geometry -> texture -> uniforms -> descriptor set -> semaphores
//   -> views -> depth image -> render pass -> pipeline -> framebuffers
//   -> command buffers
//
// FRAME PROTOCOL (one frame in flight):
//   acquire (image available) -> submit (waits image available at color
//   output, signals render finished) -> present (waits render finished)
//   -> device idle
//
// A stale swapchain on acquire skips the frame; on present it is rebuilt
// after the image has been handed over. Either way the caller never sees
// an error for it.
//
// =============================================================================

use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;

use crate::assets::{Mesh, TextureData};
use crate::backend::buffer::GeometryBuffers;
use crate::backend::command::{create_command_pool, CommandBuffers, DrawParams};
use crate::backend::descriptor::Descriptors;
use crate::backend::handle::Unique;
use crate::backend::image::{create_swapchain_views, find_depth_format, DepthImage};
use crate::backend::pipeline::{
    create_descriptor_set_layout, create_framebuffers, create_render_pass, GraphicsPipeline,
};
use crate::backend::shader::ShaderCode;
use crate::backend::swapchain::{AcquiredImage, Swapchain};
use crate::backend::sync::FrameSync;
use crate::backend::texture::Texture;
use crate::backend::uniform::UniformBuffers;
use crate::backend::{GpuDevice, VulkanDevice};
use crate::config::{Config, SceneConfig};

/// CPU-side inputs the engine uploads once.
pub struct Scene {
    pub mesh: Mesh,
    pub texture: TextureData,
    pub shaders: ShaderCode,
}

impl Scene {
    pub fn load(config: &SceneConfig) -> Result<Self> {
        let mesh = Mesh::load(&config.resolve(&config.model)?)?;
        let texture = TextureData::load(&config.resolve(&config.texture)?)?;
        let shaders = ShaderCode::load(
            &config.resolve(&config.vertex_shader)?,
            &config.resolve(&config.fragment_shader)?,
        )
        .context("Failed to load shaders")?;

        Ok(Self {
            mesh,
            texture,
            shaders,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    pub instance_count: u32,
    pub clear_color: [f32; 4],
}

/// Which path a `draw_frame` call took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// Presented, then rebuilt because present reported a stale swapchain.
    PresentedAndRecreated,
    /// Acquire reported a stale swapchain: nothing was submitted.
    SkippedAndRecreated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Idle,
    Acquiring,
    Submitting,
    Presenting,
    Recreating,
}

/// IMPORTANT: Field order matters for Drop! Swapchain-generation objects
/// go first, then the long-lived ones, the device last.
pub struct Engine<D: GpuDevice> {
    // ─────────────────────────────────────────────────────────────────────────
    // SWAPCHAIN GENERATION (rebuilt on recreation)
    // ─────────────────────────────────────────────────────────────────────────
    command_buffers: CommandBuffers<D>,
    framebuffers: Vec<Unique<D, vk::Framebuffer>>,
    pipeline: GraphicsPipeline<D>,
    render_pass: Unique<D, vk::RenderPass>,
    depth: DepthImage<D>,
    views: Vec<Unique<D, vk::ImageView>>,
    swapchain: Swapchain<D>,

    // ─────────────────────────────────────────────────────────────────────────
    // ENGINE LIFETIME
    // ─────────────────────────────────────────────────────────────────────────
    descriptors: Descriptors<D>,
    set_layout: Unique<D, vk::DescriptorSetLayout>,
    _texture: Texture<D>,
    uniforms: UniformBuffers<D>,
    geometry: GeometryBuffers<D>,
    sync: FrameSync<D>,
    command_pool: Unique<D, vk::CommandPool>,

    shaders: ShaderCode,
    settings: RenderSettings,
    depth_format: vk::Format,
    window_extent: vk::Extent2D,
    state: FrameState,
    device: Arc<D>,
}

impl Engine<VulkanDevice> {
    /// Create the Vulkan device for `window` and everything drawn with it.
    pub fn new(window: &winit::window::Window, config: &Config) -> Result<Self> {
        let scene = Scene::load(&config.scene).context("Failed to load scene assets")?;

        let device = VulkanDevice::new(
            window,
            &config.window.title,
            config.debug.validation_layers,
        )
        .context("Failed to create Vulkan device")?;

        let size = window.inner_size();
        let settings = RenderSettings {
            instance_count: config.scene.instance_count,
            clear_color: config.graphics.clear_color,
        };

        Self::with_device(
            device,
            scene,
            settings,
            vk::Extent2D {
                width: size.width,
                height: size.height,
            },
        )
    }
}

impl<D: GpuDevice> Engine<D> {
    pub fn with_device(
        device: Arc<D>,
        scene: Scene,
        settings: RenderSettings,
        window_extent: vk::Extent2D,
    ) -> Result<Self> {
        let depth_format =
            find_depth_format(device.as_ref()).context("Failed to pick depth format")?;

        let swapchain = Swapchain::new(&device, window_extent, vk::SwapchainKHR::null())
            .context("Failed to create swapchain")?;

        let set_layout = create_descriptor_set_layout(&device)?;
        let command_pool = create_command_pool(&device)?;

        let geometry = GeometryBuffers::new(&device, command_pool.raw(), &scene.mesh)
            .context("Failed to upload geometry")?;
        let texture = Texture::new(&device, command_pool.raw(), &scene.texture)
            .context("Failed to upload texture")?;
        let uniforms = UniformBuffers::new(&device, settings.instance_count)
            .context("Failed to create uniform buffers")?;
        let descriptors = Descriptors::new(&device, set_layout.raw(), &uniforms, &texture)
            .context("Failed to create descriptor set")?;
        let sync = FrameSync::new(&device)?;

        let mut engine = Self {
            command_buffers: CommandBuffers::default(),
            framebuffers: Vec::new(),
            pipeline: GraphicsPipeline::default(),
            render_pass: Unique::default(),
            depth: DepthImage::default(),
            views: Vec::new(),
            swapchain,
            descriptors,
            set_layout,
            _texture: texture,
            uniforms,
            geometry,
            sync,
            command_pool,
            shaders: scene.shaders,
            settings,
            depth_format,
            window_extent,
            state: FrameState::Idle,
            device,
        };

        engine.create_swapchain_resources()?;
        engine
            .uniforms
            .update_view_projection(engine.swapchain.extent)?;
        engine.uniforms.update()?;

        log::info!(
            "Engine ready: {} instances, {} command buffers",
            engine.settings.instance_count,
            engine.command_buffers.len()
        );

        Ok(engine)
    }

    // =========================================================================
    // SWAPCHAIN-DEPENDENT RESOURCES
    // =========================================================================

    /// Build views, depth, render pass, pipeline, framebuffers and command
    /// buffers for the current swapchain, in that order.
    fn create_swapchain_resources(&mut self) -> Result<()> {
        let extent = self.swapchain.extent;

        self.views = create_swapchain_views(&self.device, &self.swapchain.images, self.swapchain.format)
            .context("Failed to create swapchain image views")?;

        self.depth = DepthImage::new(&self.device, extent, self.depth_format)
            .context("Failed to create depth image")?;

        self.render_pass = create_render_pass(&self.device, self.swapchain.format, self.depth_format)
            .context("Failed to create render pass")?;

        self.pipeline = GraphicsPipeline::new(
            &self.device,
            self.render_pass.raw(),
            extent,
            self.set_layout.raw(),
            &self.shaders,
        )?;

        self.framebuffers = create_framebuffers(
            &self.device,
            &self.views,
            self.depth.view.raw(),
            self.render_pass.raw(),
            extent,
        )?;

        let params = DrawParams {
            render_pass: self.render_pass.raw(),
            extent,
            pipeline: self.pipeline.handle(),
            pipeline_layout: self.pipeline.layout(),
            vertex_buffer: self.geometry.vertices.handle(),
            index_buffer: self.geometry.indices.handle(),
            index_count: self.geometry.index_count,
            descriptor_set: self.descriptors.set(),
            instance_count: self.uniforms.instance_count(),
            dynamic_stride: self.uniforms.stride(),
            clear_color: self.settings.clear_color,
        };

        self.command_buffers = CommandBuffers::new(
            &self.device,
            self.command_pool.raw(),
            &self.framebuffers,
            &params,
        )?;

        Ok(())
    }

    /// Wait for the device, replace the swapchain (handing the old one to
    /// the driver) and rebuild everything that depends on it.
    ///
    /// Device, surface, descriptor set and buffers are kept.
    pub fn recreate_swapchain(&mut self) -> Result<()> {
        self.device
            .wait_idle()
            .context("Failed waiting for device before swapchain recreation")?;

        let swapchain = Swapchain::new(&self.device, self.window_extent, self.swapchain.handle())
            .context("Failed to recreate swapchain")?;

        // Old dependents go before the swapchain whose images they view
        drop(std::mem::take(&mut self.command_buffers));
        self.framebuffers.clear();
        drop(std::mem::take(&mut self.pipeline));
        drop(self.render_pass.take());
        drop(std::mem::take(&mut self.depth));
        self.views.clear();
        self.swapchain = swapchain;

        self.create_swapchain_resources()?;
        self.uniforms
            .update_view_projection(self.swapchain.extent)?;

        log::info!(
            "Swapchain recreated: {}x{}, {:?}",
            self.swapchain.extent.width,
            self.swapchain.extent.height,
            self.swapchain.present_mode
        );

        Ok(())
    }

    /// Window resize callback. Zero-sized (minimized) windows are ignored;
    /// returns whether the swapchain was rebuilt.
    pub fn on_window_resized(&mut self, width: u32, height: u32) -> Result<bool> {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return Ok(false);
        }

        log::debug!("Window resized to {}x{}", width, height);
        self.window_extent = vk::Extent2D { width, height };
        self.recreate_swapchain()?;
        Ok(true)
    }

    // =========================================================================
    // PER-FRAME
    // =========================================================================

    /// Recompute every instance transform for the current time.
    pub fn update_uniform_buffer(&mut self) -> Result<()> {
        self.uniforms.update()
    }

    pub fn draw_frame(&mut self) -> Result<FrameOutcome> {
        // ─────────────────────────────────────────────────────────────────────
        // STEP 1: Acquire next swapchain image
        // ─────────────────────────────────────────────────────────────────────
        self.transition(FrameState::Acquiring);
        let image_index = match self.swapchain.acquire_next_image(self.sync.image_available())? {
            AcquiredImage::Ready { index, suboptimal } => {
                if suboptimal {
                    log::debug!("Acquired image {} from a suboptimal swapchain", index);
                }
                index
            }
            AcquiredImage::OutOfDate => {
                self.transition(FrameState::Recreating);
                self.recreate_swapchain()?;
                self.transition(FrameState::Idle);
                return Ok(FrameOutcome::SkippedAndRecreated);
            }
        };

        // ─────────────────────────────────────────────────────────────────────
        // STEP 2: Submit the pre-recorded command buffer
        // ─────────────────────────────────────────────────────────────────────
        self.transition(FrameState::Submitting);
        let command_buffers = [self.command_buffers.get(image_index)?];
        let wait_semaphores = [self.sync.image_available()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [self.sync.render_finished()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        self.device
            .queue_submit(
                self.device.graphics_queue(),
                &[submit_info.build()],
                vk::Fence::null(),
            )
            .context("Failed to submit draw command buffer")?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 3: Present
        // ─────────────────────────────────────────────────────────────────────
        self.transition(FrameState::Presenting);
        let status = self.swapchain.present(image_index, &signal_semaphores)?;

        let outcome = if status.needs_recreation() {
            log::debug!("Present reported {:?}", status);
            self.transition(FrameState::Recreating);
            self.recreate_swapchain()?;
            FrameOutcome::PresentedAndRecreated
        } else {
            FrameOutcome::Presented
        };

        // No fence: the command buffers are reused next frame, so the host
        // waits here until the GPU is done with them.
        self.device
            .wait_idle()
            .context("Failed waiting for device after present")?;
        self.transition(FrameState::Idle);

        Ok(outcome)
    }

    fn transition(&mut self, next: FrameState) {
        log::trace!("Frame state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

impl<D: GpuDevice> Drop for Engine<D> {
    fn drop(&mut self) {
        log::info!("Shutting down engine...");

        // GPU objects must outlive any work that references them
        if let Err(e) = self.device.wait_idle() {
            log::warn!("Device did not go idle before teardown: {}", e);
        }
    }
}
