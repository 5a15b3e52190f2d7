//! Triangle mesh wrapper.
//!
//! A [`Mesh`] owns the vertex buffer, index buffer, and vertex array
//! objects for an indexed triangle list. Vertex and index data are staged
//! CPU-side and pushed with [`Mesh::upload`]; changing either invalidates
//! the buffers until the next upload. The index array length must be a
//! multiple of three, enforced at assignment time rather than draw time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use silene_core::vertex::Vertex;

use crate::backend::{BufferHandle, BufferTarget, VertexArrayHandle};
use crate::device::RenderDevice;
use crate::error::{RenderError, RenderResult};

/// An indexed triangle mesh over vertices of type `V`.
pub struct Mesh<V: Vertex> {
    device: Arc<RenderDevice>,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    vertex_array: VertexArrayHandle,
    vertices: Vec<V>,
    indices: Vec<u32>,
    uploaded: bool,
    valid: bool,
    disposed: AtomicBool,
}

impl<V: Vertex> Mesh<V> {
    /// Create an empty mesh with fresh native buffer objects.
    pub fn new(device: &Arc<RenderDevice>) -> Self {
        let backend = device.backend();
        Self {
            device: Arc::clone(device),
            vertex_buffer: backend.create_buffer(),
            index_buffer: backend.create_buffer(),
            vertex_array: backend.create_vertex_array(),
            vertices: Vec::new(),
            indices: Vec::new(),
            uploaded: false,
            valid: false,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of indices drawn per draw call.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Whether the native handles have been released.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Stage vertex data. Invalidates the buffers.
    pub fn set_vertices(&mut self, vertices: Vec<V>) {
        self.vertices = vertices;
        self.invalidate();
    }

    /// Stage index data. Invalidates the buffers.
    ///
    /// Fails with [`RenderError::InvalidArgument`] if the index count is
    /// not a multiple of three; the mesh draws triangle lists only.
    pub fn set_indices(&mut self, indices: Vec<u32>) -> RenderResult<()> {
        if indices.len() % 3 != 0 {
            return Err(RenderError::InvalidArgument(format!(
                "invalid number of indices supplied; {} is not a multiple of 3",
                indices.len()
            )));
        }
        self.indices = indices;
        self.invalidate();
        Ok(())
    }

    /// Manually invalidate the buffers; requires another [`Mesh::upload`]
    /// before the mesh can be drawn again.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Push vertices and indices to the GPU and wire up the vertex array.
    pub fn upload(&mut self) -> RenderResult<()> {
        if self.is_disposed() {
            return Err(RenderError::Disposed);
        }
        if self.vertices.is_empty() {
            return Err(RenderError::InvalidArgument(
                "mesh has no vertices to upload".to_owned(),
            ));
        }
        if self.indices.is_empty() {
            return Err(RenderError::InvalidArgument(
                "mesh has no indices to upload".to_owned(),
            ));
        }

        let backend = self.device.backend();
        backend.buffer_data(
            BufferTarget::Array,
            self.vertex_buffer,
            bytemuck::cast_slice(&self.vertices),
        );
        backend.buffer_data(
            BufferTarget::ElementArray,
            self.index_buffer,
            bytemuck::cast_slice(&self.indices),
        );
        backend.configure_vertex_array(
            self.vertex_array,
            self.vertex_buffer,
            self.index_buffer,
            V::STRIDE,
            V::attributes(),
        );

        if let Some(error) = backend.poll_error() {
            return Err(RenderError::Api(error));
        }

        self.uploaded = true;
        self.valid = true;
        Ok(())
    }

    /// Draw the mesh, assuming a material has already been bound.
    pub fn draw(&self) -> RenderResult<()> {
        if self.is_disposed() {
            return Err(RenderError::Disposed);
        }
        if !self.uploaded {
            return Err(RenderError::NotUploaded);
        }
        if !self.valid {
            return Err(RenderError::InvalidState(
                "mesh data has been invalidated since the last upload".to_owned(),
            ));
        }

        let backend = self.device.backend();
        backend.bind_vertex_array(Some(self.vertex_array));
        backend.draw_elements(self.indices.len() as i32);

        if let Some(error) = backend.poll_error() {
            return Err(RenderError::Api(error));
        }
        Ok(())
    }

    /// Release the native buffer and vertex array handles. Exactly once;
    /// further calls are no-ops.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let backend = self.device.backend();
        backend.delete_buffer(self.vertex_buffer);
        backend.delete_buffer(self.index_buffer);
        backend.delete_vertex_array(self.vertex_array);
    }
}

impl<V: Vertex> Drop for Mesh<V> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<V: Vertex> std::fmt::Debug for Mesh<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("vertices", &self.vertices.len())
            .field("indices", &self.indices.len())
            .field("uploaded", &self.uploaded)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use silene_core::vertex::PositionVertex;

    fn quad_vertices() -> Vec<PositionVertex> {
        vec![
            PositionVertex::new(-1.0, -1.0, 0.0),
            PositionVertex::new(1.0, -1.0, 0.0),
            PositionVertex::new(1.0, 1.0, 0.0),
            PositionVertex::new(-1.0, 1.0, 0.0),
        ]
    }

    const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

    #[test]
    fn index_count_must_be_a_multiple_of_three() {
        let device = RenderDevice::headless();
        let mut mesh = Mesh::<PositionVertex>::new(&device);
        assert!(matches!(
            mesh.set_indices(vec![0, 1, 2, 3]),
            Err(RenderError::InvalidArgument(_))
        ));
        // Rejected at assignment: the staged indices are untouched.
        assert!(mesh.indices().is_empty());
        mesh.set_indices(QUAD_INDICES.to_vec()).unwrap();
    }

    #[test]
    fn draw_before_upload_fails() {
        let device = RenderDevice::headless();
        let mut mesh = Mesh::new(&device);
        mesh.set_vertices(quad_vertices());
        mesh.set_indices(QUAD_INDICES.to_vec()).unwrap();
        assert!(matches!(mesh.draw(), Err(RenderError::NotUploaded)));
    }

    #[test]
    fn upload_then_draw() {
        let backend = Arc::new(crate::backend::HeadlessBackend::new());
        let device = RenderDevice::new(backend.clone());
        let mut mesh = Mesh::new(&device);
        mesh.set_vertices(quad_vertices());
        mesh.set_indices(QUAD_INDICES.to_vec()).unwrap();
        mesh.upload().unwrap();
        mesh.draw().unwrap();
        assert_eq!(backend.draw_call_count(), 1);
        let (_, count) = backend.last_draw_call().unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn staging_new_data_invalidates_the_buffers() {
        let device = RenderDevice::headless();
        let mut mesh = Mesh::new(&device);
        mesh.set_vertices(quad_vertices());
        mesh.set_indices(QUAD_INDICES.to_vec()).unwrap();
        mesh.upload().unwrap();

        mesh.set_vertices(quad_vertices());
        assert!(matches!(mesh.draw(), Err(RenderError::InvalidState(_))));
    }

    #[test]
    fn upload_requires_data() {
        let device = RenderDevice::headless();
        let mut mesh = Mesh::<PositionVertex>::new(&device);
        assert!(matches!(
            mesh.upload(),
            Err(RenderError::InvalidArgument(_))
        ));
    }

    #[test]
    fn dispose_is_idempotent() {
        let device = RenderDevice::headless();
        let mesh = Mesh::<PositionVertex>::new(&device);
        mesh.dispose();
        mesh.dispose();
        assert!(matches!(mesh.draw(), Err(RenderError::Disposed)));
    }
}
