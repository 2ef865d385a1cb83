// Buffers for vertices, indices and uniforms
//
// Geometry is uploaded once through a transient staging buffer into
// device-local memory. Uniform buffers stay host visible.

use anyhow::{Context, Result};
use ash::vk;
use bytemuck::Pod;
use std::sync::Arc;

use super::command::one_time_submit;
use super::handle::Unique;
use super::{GpuDevice, MemoryUsage};
use crate::assets::{Mesh, Vertex};

pub struct Buffer<D: GpuDevice> {
    handle: Unique<D, vk::Buffer>,
    size: vk::DeviceSize,
}

impl<D: GpuDevice> Buffer<D> {
    pub fn new(
        device: &Arc<D>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        memory: MemoryUsage,
    ) -> Result<Self> {
        let raw = device
            .create_buffer(size, usage, memory)
            .with_context(|| format!("Failed to create {} byte buffer", size))?;

        Ok(Self {
            handle: Unique::new(device, raw),
            size,
        })
    }

    pub fn handle(&self) -> vk::Buffer {
        self.handle.raw()
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Copy `data` into the buffer at `offset`. Host-visible buffers only.
    pub fn write(&self, offset: vk::DeviceSize, data: &[u8]) -> Result<()> {
        let device = self.handle.device().context("Buffer not initialized")?;
        device.write_buffer(self.handle(), offset, data)
    }
}

/// Create a device-local buffer holding `data`, filled through a staging copy.
pub fn upload_device_local<D: GpuDevice, T: Pod>(
    device: &Arc<D>,
    pool: vk::CommandPool,
    usage: vk::BufferUsageFlags,
    data: &[T],
) -> Result<Buffer<D>> {
    let bytes: &[u8] = bytemuck::cast_slice(data);
    let size = bytes.len() as vk::DeviceSize;

    let staging = Buffer::new(
        device,
        size,
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryUsage::HostCoherent,
    )
    .context("Failed to create staging buffer")?;
    staging.write(0, bytes)?;

    let buffer = Buffer::new(
        device,
        size,
        usage | vk::BufferUsageFlags::TRANSFER_DST,
        MemoryUsage::DeviceLocal,
    )?;

    one_time_submit(device, pool, |cmd| {
        device.cmd_copy_buffer(cmd, staging.handle(), buffer.handle(), staging.size());
    })
    .context("Failed to copy staging buffer")?;

    Ok(buffer)
}

/// Immutable vertex and index buffers for one mesh.
pub struct GeometryBuffers<D: GpuDevice> {
    pub vertices: Buffer<D>,
    pub indices: Buffer<D>,
    pub index_count: u32,
}

impl<D: GpuDevice> GeometryBuffers<D> {
    pub fn new(device: &Arc<D>, pool: vk::CommandPool, mesh: &Mesh) -> Result<Self> {
        let vertices = upload_device_local::<D, Vertex>(
            device,
            pool,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            &mesh.vertices,
        )
        .context("Failed to create vertex buffer")?;

        let indices = upload_device_local(
            device,
            pool,
            vk::BufferUsageFlags::INDEX_BUFFER,
            &mesh.indices,
        )
        .context("Failed to create index buffer")?;

        log::info!(
            "Uploaded mesh: {} vertices, {} indices",
            mesh.vertices.len(),
            mesh.indices.len()
        );

        Ok(Self {
            vertices,
            indices,
            index_count: mesh.indices.len() as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::command::create_command_pool;
    use crate::backend::stub::{Recorded, StubDevice};

    #[test]
    fn geometry_is_copied_from_staging_and_staging_released() {
        let device = StubDevice::new();
        let pool = create_command_pool(&device).unwrap();
        let mesh = Mesh::cube();

        let geometry = GeometryBuffers::new(&device, pool.raw(), &mesh).unwrap();

        assert_eq!(geometry.index_count, 36);
        let vertex_info = device.buffer(geometry.vertices.handle()).unwrap();
        assert_eq!(vertex_info.memory, MemoryUsage::DeviceLocal);
        assert!(vertex_info
            .usage
            .contains(vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST));
        assert_eq!(
            vertex_info.size as usize,
            mesh.vertices.len() * std::mem::size_of::<Vertex>()
        );

        // Staging buffers are gone, only the two geometry buffers remain
        assert_eq!(device.live_count("buffer"), 2);
        assert_eq!(device.submit_count(), 2);
    }

    #[test]
    fn device_local_buffers_reject_host_writes() {
        let device = StubDevice::new();
        let buffer = Buffer::new(
            &device,
            64,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            MemoryUsage::DeviceLocal,
        )
        .unwrap();
        assert!(buffer.write(0, &[0u8; 16]).is_err());
    }

    #[test]
    fn upload_records_a_full_size_copy() {
        let device = StubDevice::new();
        let pool = create_command_pool(&device).unwrap();
        let data = [1u32, 2, 3, 4];

        let buffer =
            upload_device_local(&device, pool.raw(), vk::BufferUsageFlags::INDEX_BUFFER, &data)
                .unwrap();
        assert_eq!(buffer.size(), 16);

        let submission = &device.submissions()[0];
        let recorded = device.recording(submission.command_buffers[0]);
        assert!(matches!(
            recorded.as_slice(),
            [Recorded::CopyBuffer { dst, size: 16, .. }] if *dst == buffer.handle()
        ));
    }
}
