//! Static mesh geometry shared by every frame slot.

use std::collections::HashMap;

use renderer_rhi::RhiResult;
use renderer_rhi::buffer::BufferUsage;
use renderer_rhi::vertex::Vertex;
use renderer_scene::MeshId;
use tracing::{debug, info};

use crate::backend::{GpuBackend, HostBuffer};
use crate::error::{RenderError, RenderResult};

/// Vertex and index buffers of one uploaded mesh.
pub struct GpuMesh<B: GpuBackend> {
    vertex_buffer: B::Buffer,
    index_buffer: B::Buffer,
    index_count: u32,
}

impl<B: GpuBackend> GpuMesh<B> {
    #[inline]
    pub fn vertex_buffer(&self) -> &B::Buffer {
        &self.vertex_buffer
    }

    #[inline]
    pub fn index_buffer(&self) -> &B::Buffer {
        &self.index_buffer
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Uploaded meshes by id.
///
/// Geometry is written once and read by every slot, so replacing or removing
/// a mesh that a frame in flight still draws requires an idle device.
pub struct MeshLibrary<B: GpuBackend> {
    meshes: HashMap<MeshId, GpuMesh<B>>,
}

impl<B: GpuBackend> Default for MeshLibrary<B> {
    fn default() -> Self {
        Self {
            meshes: HashMap::new(),
        }
    }
}

impl<B: GpuBackend> MeshLibrary<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads `vertices` and 32-bit `indices` under `id`, replacing any
    /// previous mesh with that id.
    pub fn upload(
        &mut self,
        backend: &B,
        id: MeshId,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> RenderResult<()> {
        let mesh = Self::create(backend, vertices, indices)
            .map_err(|source| RenderError::MeshUpload { mesh: id, source })?;

        if self.meshes.insert(id, mesh).is_some() {
            debug!(?id, "Replaced mesh");
        }
        info!(
            ?id,
            "Uploaded mesh: {} vertices, {} indices",
            vertices.len(),
            indices.len()
        );

        Ok(())
    }

    fn create(backend: &B, vertices: &[Vertex], indices: &[u32]) -> RhiResult<GpuMesh<B>> {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);

        let mut vertex_buffer = backend.create_buffer(BufferUsage::Vertex, vertex_bytes.len() as u64)?;
        vertex_buffer.write_bytes(0, vertex_bytes)?;

        let mut index_buffer = backend.create_buffer(BufferUsage::Index, index_bytes.len() as u64)?;
        index_buffer.write_bytes(0, index_bytes)?;

        Ok(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        })
    }

    pub fn get(&self, id: MeshId) -> Option<&GpuMesh<B>> {
        self.meshes.get(&id)
    }

    pub fn contains(&self, id: MeshId) -> bool {
        self.meshes.contains_key(&id)
    }

    pub fn remove(&mut self, id: MeshId) -> bool {
        self.meshes.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn clear(&mut self) {
        self.meshes.clear();
    }
}
