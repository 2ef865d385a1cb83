// Vulkan Device - Core GPU interface
//
// Responsibilities:
// - Physical device selection (graphics + present queues, swapchain
//   extension, anisotropic sampling, usable surface; prefer discrete GPU)
// - Logical device + queue creation
// - Buffer and image memory: device-local through gpu-allocator,
//   host-visible as dedicated allocations that are mapped per write
// - `GpuDevice` implementation forwarding to ash

use anyhow::{bail, Context, Result};
use ash::extensions::khr;
use ash::prelude::VkResult;
use ash::vk;
use gpu_allocator::vulkan::{
    Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc,
};
use gpu_allocator::MemoryLocation;
use parking_lot::Mutex;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use std::collections::{BTreeSet, HashMap};
use std::ffi::CStr;
use std::sync::Arc;

use super::instance::{Instance, Surface};
use super::swapchain::SurfaceSupport;
use super::{GpuDevice, MemoryUsage, QueueFamilyIndices};
use crate::error::RendererError;

/// Required Vulkan device features for our renderer
fn required_features() -> vk::PhysicalDeviceFeatures {
    vk::PhysicalDeviceFeatures {
        sampler_anisotropy: vk::TRUE,
        ..Default::default()
    }
}

/// What device selection looks at for one GPU.
#[derive(Debug, Clone, Copy)]
pub struct DeviceCandidate {
    pub device_type: vk::PhysicalDeviceType,
    pub families: Option<QueueFamilyIndices>,
    pub has_swapchain_extension: bool,
    pub sampler_anisotropy: bool,
    pub surface_adequate: bool,
}

impl DeviceCandidate {
    /// `None` when the GPU cannot run the renderer, otherwise a preference
    /// score where discrete beats integrated beats everything else.
    pub fn score(&self) -> Option<u32> {
        if self.families.is_none()
            || !self.has_swapchain_extension
            || !self.sampler_anisotropy
            || !self.surface_adequate
        {
            return None;
        }

        Some(match self.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
            _ => 1,
        })
    }
}

/// Graphics and present families, preferring one family that does both.
pub fn find_queue_families(
    families: &[vk::QueueFamilyProperties],
    supports_present: impl Fn(u32) -> bool,
) -> Option<QueueFamilyIndices> {
    let mut graphics = None;
    let mut present = None;

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;
        let has_graphics =
            family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
        let has_present = family.queue_count > 0 && supports_present(index);

        if has_graphics && has_present {
            return Some(QueueFamilyIndices {
                graphics: index,
                present: index,
            });
        }
        if has_graphics && graphics.is_none() {
            graphics = Some(index);
        }
        if has_present && present.is_none() {
            present = Some(index);
        }
    }

    Some(QueueFamilyIndices {
        graphics: graphics?,
        present: present?,
    })
}

/// First memory type allowed by `type_bits` that has all of `properties`.
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    properties: vk::MemoryPropertyFlags,
) -> Result<u32, RendererError> {
    (0..memory_properties.memory_type_count)
        .find(|&i| {
            type_bits & (1 << i) != 0
                && memory_properties.memory_types[i as usize]
                    .property_flags
                    .contains(properties)
        })
        .ok_or(RendererError::NoMemoryType {
            type_bits,
            properties,
        })
}

/// Offset and size to flush after writing `len` bytes at `offset` into
/// host memory of `allocation_size` bytes. Both are multiples of
/// `atom`, or the size is `WHOLE_SIZE` when the range reaches the end.
pub fn flush_range(
    offset: vk::DeviceSize,
    len: vk::DeviceSize,
    atom: vk::DeviceSize,
    allocation_size: vk::DeviceSize,
) -> (vk::DeviceSize, vk::DeviceSize) {
    let atom = atom.max(1);
    let start = offset / atom * atom;
    let end = (offset + len).div_ceil(atom) * atom;

    if end >= allocation_size {
        (start, vk::WHOLE_SIZE)
    } else {
        (start, end - start)
    }
}

enum BufferMemory {
    Pooled(Allocation),
    Host {
        memory: vk::DeviceMemory,
        allocation_size: vk::DeviceSize,
        size: vk::DeviceSize,
    },
}

/// Vulkan device wrapper with automatic cleanup
pub struct VulkanDevice {
    // Vulkan handles (order matters for drop!)
    allocator: Option<Mutex<Allocator>>,
    buffers: Mutex<HashMap<vk::Buffer, BufferMemory>>,
    images: Mutex<HashMap<vk::Image, Allocation>>,
    swapchain_loader: khr::Swapchain,
    device: ash::Device,
    surface: Surface,
    instance: Instance,

    physical_device: vk::PhysicalDevice,
    families: QueueFamilyIndices,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,

    // Device properties (cached for performance)
    properties: vk::PhysicalDeviceProperties,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl VulkanDevice {
    /// Create the instance, a surface for `window` and a device that can
    /// present to it.
    ///
    /// # Arguments
    /// * `app_name` - Application name for debugging
    /// * `enable_validation` - Enable Vulkan validation layers
    pub fn new<W>(window: &W, app_name: &str, enable_validation: bool) -> Result<Arc<Self>>
    where
        W: HasRawDisplayHandle + HasRawWindowHandle,
    {
        log::info!("Creating Vulkan device: {}", app_name);

        let display = window.raw_display_handle();
        let instance = Instance::new(display, app_name, enable_validation)?;
        let surface = Surface::new(&instance, display, window.raw_window_handle())?;

        let (physical_device, families) = pick_physical_device(&instance.raw, &surface)
            .context("Failed to pick physical device")?;

        let properties = unsafe { instance.raw.get_physical_device_properties(physical_device) };
        let memory_properties =
            unsafe { instance.raw.get_physical_device_memory_properties(physical_device) };

        log::info!(
            "Selected GPU: {}",
            unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy()
        );
        log::info!(
            "API Version: {}.{}.{}",
            vk::api_version_major(properties.api_version),
            vk::api_version_minor(properties.api_version),
            vk::api_version_patch(properties.api_version)
        );

        let device = create_logical_device(&instance.raw, physical_device, families)
            .context("Failed to create logical device")?;

        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.raw.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        });
        let allocator = match allocator {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                return Err(e).context("Failed to create memory allocator");
            }
        };

        let swapchain_loader = khr::Swapchain::new(&instance.raw, &device);

        Ok(Arc::new(Self {
            allocator: Some(Mutex::new(allocator)),
            buffers: Mutex::new(HashMap::new()),
            images: Mutex::new(HashMap::new()),
            swapchain_loader,
            device,
            surface,
            instance,
            physical_device,
            families,
            graphics_queue,
            present_queue,
            properties,
            memory_properties,
        }))
    }

    fn allocator(&self) -> Result<&Mutex<Allocator>> {
        self.allocator.as_ref().context("Allocator already released")
    }

    fn allocate_pooled(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        linear: bool,
    ) -> Result<Allocation> {
        self.allocator()?
            .lock()
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location: MemoryLocation::GpuOnly,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .with_context(|| format!("Failed to allocate {} bytes for {}", requirements.size, name))
    }

    fn allocate_host(
        &self,
        requirements: vk::MemoryRequirements,
        properties: vk::MemoryPropertyFlags,
        size: vk::DeviceSize,
    ) -> Result<BufferMemory> {
        let type_index = find_memory_type(
            &self.memory_properties,
            requirements.memory_type_bits,
            properties,
        )?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(type_index);

        let memory = unsafe { self.device.allocate_memory(&alloc_info, None) }
            .context("Failed to allocate host-visible memory")?;

        Ok(BufferMemory::Host {
            memory,
            allocation_size: requirements.size,
            size,
        })
    }

    fn release_buffer_memory(&self, memory: BufferMemory) {
        match memory {
            BufferMemory::Pooled(allocation) => {
                if let Ok(allocator) = self.allocator() {
                    if let Err(e) = allocator.lock().free(allocation) {
                        log::error!("Failed to free buffer allocation: {}", e);
                    }
                }
            }
            BufferMemory::Host { memory, .. } => unsafe {
                self.device.free_memory(memory, None);
            },
        }
    }
}

fn pick_physical_device(
    instance: &ash::Instance,
    surface: &Surface,
) -> Result<(vk::PhysicalDevice, QueueFamilyIndices)> {
    let devices = unsafe { instance.enumerate_physical_devices() }
        .context("Failed to enumerate physical devices")?;

    let mut best: Option<(u32, vk::PhysicalDevice, QueueFamilyIndices)> = None;

    for device in devices {
        let props = unsafe { instance.get_physical_device_properties(device) };
        let features = unsafe { instance.get_physical_device_features(device) };
        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(device) };

        let has_swapchain_extension = unsafe { instance.enumerate_device_extension_properties(device) }
            .map(|extensions| {
                extensions.iter().any(|ext| {
                    let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
                    name == khr::Swapchain::name()
                })
            })
            .unwrap_or(false);

        // Surface support is only meaningful once the extension is known present
        let surface_adequate = has_swapchain_extension
            && surface
                .support(device)
                .map(|support| support.is_adequate())
                .unwrap_or(false);

        let candidate = DeviceCandidate {
            device_type: props.device_type,
            families: find_queue_families(&queue_families, |family| {
                surface.supports_present(device, family)
            }),
            has_swapchain_extension,
            sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
            surface_adequate,
        };

        let name = unsafe { CStr::from_ptr(props.device_name.as_ptr()) }.to_string_lossy();
        match (candidate.score(), candidate.families) {
            (Some(score), Some(families)) => {
                log::debug!("GPU {} is suitable (score {})", name, score);
                if best.map_or(true, |(best_score, ..)| score > best_score) {
                    best = Some((score, device, families));
                }
            }
            _ => log::debug!("GPU {} is not suitable: {:?}", name, candidate),
        }
    }

    best.map(|(_, device, families)| (device, families))
        .ok_or_else(|| RendererError::NoSuitableDevice.into())
}

fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    families: QueueFamilyIndices,
) -> Result<ash::Device> {
    let queue_priorities = [1.0];
    let unique_families: BTreeSet<u32> = [families.graphics, families.present].into();

    let queue_create_infos: Vec<_> = unique_families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::builder()
                .queue_family_index(family)
                .queue_priorities(&queue_priorities)
                .build()
        })
        .collect();

    let extensions = [khr::Swapchain::name().as_ptr()];
    let features = required_features();

    let create_info = vk::DeviceCreateInfo::builder()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extensions)
        .enabled_features(&features);

    let device = unsafe { instance.create_device(physical_device, &create_info, None) }?;

    Ok(device)
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        log::info!("Destroying Vulkan device...");

        if let Err(e) = unsafe { self.device.device_wait_idle() } {
            log::warn!("Device did not go idle before teardown: {}", e);
        }

        let leaked = self.buffers.lock().len() + self.images.lock().len();
        if leaked > 0 {
            log::warn!("{} buffers/images still alive at device teardown", leaked);
        }
        for (_, memory) in self.buffers.lock().drain() {
            self.release_buffer_memory(memory);
        }
        if let Some(allocator) = &self.allocator {
            for (image, allocation) in self.images.lock().drain() {
                if let Err(e) = allocator.lock().free(allocation) {
                    log::error!("Failed to free allocation of leaked image {:?}: {}", image, e);
                }
            }
        }

        // The allocator frees its memory blocks through the device
        drop(self.allocator.take());

        unsafe { self.device.destroy_device(None) };
        // Surface, then instance, drop after this
    }
}

impl GpuDevice for VulkanDevice {
    fn limits(&self) -> vk::PhysicalDeviceLimits {
        self.properties.limits
    }

    fn queue_families(&self) -> QueueFamilyIndices {
        self.families
    }

    fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    fn surface(&self) -> vk::SurfaceKHR {
        self.surface.raw
    }

    fn surface_support(&self) -> VkResult<SurfaceSupport> {
        self.surface.support(self.physical_device)
    }

    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.instance
                .raw
                .get_physical_device_format_properties(self.physical_device, format)
        }
    }

    fn wait_idle(&self) -> VkResult<()> {
        unsafe { self.device.device_wait_idle() }
    }

    fn queue_wait_idle(&self, queue: vk::Queue) -> VkResult<()> {
        unsafe { self.device.queue_wait_idle(queue) }
    }

    fn queue_submit(
        &self,
        queue: vk::Queue,
        submits: &[vk::SubmitInfo],
        fence: vk::Fence,
    ) -> VkResult<()> {
        unsafe { self.device.queue_submit(queue, submits, fence) }
    }

    fn create_swapchain(&self, info: &vk::SwapchainCreateInfoKHR) -> VkResult<vk::SwapchainKHR> {
        unsafe { self.swapchain_loader.create_swapchain(info, None) }
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        unsafe { self.swapchain_loader.get_swapchain_images(swapchain) }
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.swapchain_loader.destroy_swapchain(swapchain, None) }
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        timeout: u64,
        semaphore: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        unsafe {
            self.swapchain_loader
                .acquire_next_image(swapchain, timeout, semaphore, vk::Fence::null())
        }
    }

    fn queue_present(&self, queue: vk::Queue, info: &vk::PresentInfoKHR) -> VkResult<bool> {
        unsafe { self.swapchain_loader.queue_present(queue, info) }
    }

    fn create_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        memory: MemoryUsage,
    ) -> Result<vk::Buffer> {
        if size == 0 {
            bail!("Cannot create an empty buffer");
        }

        let info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { self.device.create_buffer(&info, None) }
            .context("Failed to create buffer")?;
        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer) };

        let allocated = match memory {
            MemoryUsage::DeviceLocal => self
                .allocate_pooled("buffer", requirements, true)
                .map(BufferMemory::Pooled),
            MemoryUsage::HostCoherent => self.allocate_host(
                requirements,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
                size,
            ),
            MemoryUsage::HostVisible => {
                self.allocate_host(requirements, vk::MemoryPropertyFlags::HOST_VISIBLE, size)
            }
        };

        let allocated = match allocated {
            Ok(allocated) => allocated,
            Err(e) => {
                unsafe { self.device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        let (device_memory, offset) = match &allocated {
            BufferMemory::Pooled(allocation) => unsafe { (allocation.memory(), allocation.offset()) },
            BufferMemory::Host { memory, .. } => (*memory, 0),
        };

        if let Err(e) = unsafe { self.device.bind_buffer_memory(buffer, device_memory, offset) } {
            unsafe { self.device.destroy_buffer(buffer, None) };
            self.release_buffer_memory(allocated);
            return Err(e).context("Failed to bind buffer memory");
        }

        self.buffers.lock().insert(buffer, allocated);
        Ok(buffer)
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        unsafe { self.device.destroy_buffer(buffer, None) };
        let memory = self.buffers.lock().remove(&buffer);
        if let Some(memory) = memory {
            self.release_buffer_memory(memory);
        }
    }

    fn write_buffer(&self, buffer: vk::Buffer, offset: vk::DeviceSize, data: &[u8]) -> Result<()> {
        let buffers = self.buffers.lock();
        let Some(BufferMemory::Host {
            memory,
            allocation_size,
            size,
        }) = buffers.get(&buffer)
        else {
            bail!("Buffer {:?} is not host visible", buffer);
        };

        let len = data.len() as vk::DeviceSize;
        if offset.checked_add(len).map_or(true, |end| end > *size) {
            bail!(
                "Write of {} bytes at offset {} overflows {} byte buffer",
                len,
                offset,
                size
            );
        }

        unsafe {
            let mapped = self
                .device
                .map_memory(*memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())
                .context("Failed to map buffer memory")?
                .cast::<u8>();
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.add(offset as usize), data.len());

            // Flushed even when the type is also HOST_COHERENT
            let (flush_offset, flush_size) = flush_range(
                offset,
                len,
                self.properties.limits.non_coherent_atom_size,
                *allocation_size,
            );
            let range = vk::MappedMemoryRange::builder()
                .memory(*memory)
                .offset(flush_offset)
                .size(flush_size)
                .build();
            let flushed = self.device.flush_mapped_memory_ranges(&[range]);

            self.device.unmap_memory(*memory);
            flushed.context("Failed to flush buffer memory")
        }
    }

    fn create_image(&self, info: &vk::ImageCreateInfo, memory: MemoryUsage) -> Result<vk::Image> {
        if memory != MemoryUsage::DeviceLocal {
            bail!("Only device-local images are supported");
        }

        let image = unsafe { self.device.create_image(info, None) }
            .context("Failed to create image")?;
        let requirements = unsafe { self.device.get_image_memory_requirements(image) };

        let linear = info.tiling == vk::ImageTiling::LINEAR;
        let allocation = match self.allocate_pooled("image", requirements, linear) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { self.device.destroy_image(image, None) };
                return Err(e);
            }
        };

        let bound = unsafe {
            self.device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
        };
        if let Err(e) = bound {
            unsafe { self.device.destroy_image(image, None) };
            if let Ok(allocator) = self.allocator() {
                if let Err(e) = allocator.lock().free(allocation) {
                    log::error!("Failed to free image allocation: {}", e);
                }
            }
            return Err(e).context("Failed to bind image memory");
        }

        self.images.lock().insert(image, allocation);
        Ok(image)
    }

    fn destroy_image(&self, image: vk::Image) {
        unsafe { self.device.destroy_image(image, None) };
        let allocation = self.images.lock().remove(&image);
        if let (Some(allocation), Ok(allocator)) = (allocation, self.allocator()) {
            if let Err(e) = allocator.lock().free(allocation) {
                log::error!("Failed to free image allocation: {}", e);
            }
        }
    }

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo) -> VkResult<vk::ImageView> {
        unsafe { self.device.create_image_view(info, None) }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) }
    }

    fn create_render_pass(&self, info: &vk::RenderPassCreateInfo) -> VkResult<vk::RenderPass> {
        unsafe { self.device.create_render_pass(info, None) }
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device.destroy_render_pass(render_pass, None) }
    }

    fn create_framebuffer(&self, info: &vk::FramebufferCreateInfo) -> VkResult<vk::Framebuffer> {
        unsafe { self.device.create_framebuffer(info, None) }
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device.destroy_framebuffer(framebuffer, None) }
    }

    fn create_shader_module(
        &self,
        info: &vk::ShaderModuleCreateInfo,
    ) -> VkResult<vk::ShaderModule> {
        unsafe { self.device.create_shader_module(info, None) }
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        unsafe { self.device.destroy_shader_module(module, None) }
    }

    fn create_descriptor_set_layout(
        &self,
        info: &vk::DescriptorSetLayoutCreateInfo,
    ) -> VkResult<vk::DescriptorSetLayout> {
        unsafe { self.device.create_descriptor_set_layout(info, None) }
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.device.destroy_descriptor_set_layout(layout, None) }
    }

    fn create_pipeline_layout(
        &self,
        info: &vk::PipelineLayoutCreateInfo,
    ) -> VkResult<vk::PipelineLayout> {
        unsafe { self.device.create_pipeline_layout(info, None) }
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        unsafe { self.device.destroy_pipeline_layout(layout, None) }
    }

    fn create_graphics_pipeline(
        &self,
        info: &vk::GraphicsPipelineCreateInfo,
    ) -> VkResult<vk::Pipeline> {
        let pipelines = unsafe {
            self.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                std::slice::from_ref(info),
                None,
            )
        }
        .map_err(|(_, e)| e)?;

        pipelines
            .into_iter()
            .next()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe { self.device.destroy_pipeline(pipeline, None) }
    }

    fn create_descriptor_pool(
        &self,
        info: &vk::DescriptorPoolCreateInfo,
    ) -> VkResult<vk::DescriptorPool> {
        unsafe { self.device.create_descriptor_pool(info, None) }
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.device.destroy_descriptor_pool(pool, None) }
    }

    fn allocate_descriptor_sets(
        &self,
        info: &vk::DescriptorSetAllocateInfo,
    ) -> VkResult<Vec<vk::DescriptorSet>> {
        unsafe { self.device.allocate_descriptor_sets(info) }
    }

    fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet]) {
        unsafe { self.device.update_descriptor_sets(writes, &[]) }
    }

    fn create_sampler(&self, info: &vk::SamplerCreateInfo) -> VkResult<vk::Sampler> {
        unsafe { self.device.create_sampler(info, None) }
    }

    fn destroy_sampler(&self, sampler: vk::Sampler) {
        unsafe { self.device.destroy_sampler(sampler, None) }
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        let info = vk::SemaphoreCreateInfo::default();
        unsafe { self.device.create_semaphore(&info, None) }
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device.destroy_semaphore(semaphore, None) }
    }

    fn create_command_pool(&self, info: &vk::CommandPoolCreateInfo) -> VkResult<vk::CommandPool> {
        unsafe { self.device.create_command_pool(info, None) }
    }

    fn destroy_command_pool(&self, pool: vk::CommandPool) {
        unsafe { self.device.destroy_command_pool(pool, None) }
    }

    fn allocate_command_buffers(
        &self,
        info: &vk::CommandBufferAllocateInfo,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        unsafe { self.device.allocate_command_buffers(info) }
    }

    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        unsafe { self.device.free_command_buffers(pool, buffers) }
    }

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        info: &vk::CommandBufferBeginInfo,
    ) -> VkResult<()> {
        unsafe { self.device.begin_command_buffer(cmd, info) }
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> VkResult<()> {
        unsafe { self.device.end_command_buffer(cmd) }
    }

    fn cmd_begin_render_pass(&self, cmd: vk::CommandBuffer, info: &vk::RenderPassBeginInfo) {
        unsafe {
            self.device
                .cmd_begin_render_pass(cmd, info, vk::SubpassContents::INLINE)
        }
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        unsafe { self.device.cmd_end_render_pass(cmd) }
    }

    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline) {
        unsafe {
            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline)
        }
    }

    fn cmd_bind_vertex_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        unsafe { self.device.cmd_bind_vertex_buffers(cmd, 0, &[buffer], &[0]) }
    }

    fn cmd_bind_index_buffer(&self, cmd: vk::CommandBuffer, buffer: vk::Buffer) {
        unsafe {
            self.device
                .cmd_bind_index_buffer(cmd, buffer, 0, vk::IndexType::UINT32)
        }
    }

    fn cmd_bind_descriptor_set(
        &self,
        cmd: vk::CommandBuffer,
        layout: vk::PipelineLayout,
        set: vk::DescriptorSet,
        dynamic_offsets: &[u32],
    ) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                &[set],
                dynamic_offsets,
            )
        }
    }

    fn cmd_draw_indexed(&self, cmd: vk::CommandBuffer, index_count: u32) {
        unsafe { self.device.cmd_draw_indexed(cmd, index_count, 1, 0, 0, 0) }
    }

    fn cmd_copy_buffer(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Buffer,
        size: vk::DeviceSize,
    ) {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe { self.device.cmd_copy_buffer(cmd, src, dst, &[region]) }
    }

    fn cmd_copy_buffer_to_image(
        &self,
        cmd: vk::CommandBuffer,
        src: vk::Buffer,
        dst: vk::Image,
        extent: vk::Extent2D,
    ) {
        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            },
            image_offset: vk::Offset3D::default(),
            image_extent: vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            },
        };
        unsafe {
            self.device.cmd_copy_buffer_to_image(
                cmd,
                src,
                dst,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            )
        }
    }

    fn cmd_image_barrier(
        &self,
        cmd: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        barrier: &vk::ImageMemoryBarrier,
    ) {
        unsafe {
            self.device.cmd_pipeline_barrier(
                cmd,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                std::slice::from_ref(barrier),
            )
        }
    }
}
