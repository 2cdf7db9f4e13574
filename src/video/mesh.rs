//! Meshes uploaded into device buffers.

use crate::utils::pod;

use super::assets::prelude::*;
use super::device::GraphicsDevice;
use super::errors::*;
use super::resource::GraphicsObject;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    #[inline]
    pub fn format(&self) -> IndexFormat {
        match *self {
            IndexData::U16(_) => IndexFormat::U16,
            IndexData::U32(_) => IndexFormat::U32,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match *self {
            IndexData::U16(ref v) => v.len(),
            IndexData::U32(ref v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_bytes(&self) -> &[u8] {
        match *self {
            IndexData::U16(ref v) => pod::as_bytes(v.as_slice()),
            IndexData::U32(ref v) => pod::as_bytes(v.as_slice()),
        }
    }
}

/// The vertices (interleaved as `layout` declares) and optional indices of a mesh.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub layout: VertexLayout,
    pub vertices: Vec<u8>,
    pub indices: Option<IndexData>,
    pub topology: Topology,
}

impl MeshData {
    /// The number of vertices, derived from the layout stride.
    pub fn vertex_count(&self) -> usize {
        match self.layout.stride() {
            0 => 0,
            stride => self.vertices.len() / stride as usize,
        }
    }
}

/// A mesh living on the device. Dropping it releases its buffers.
#[derive(Debug)]
pub struct Mesh {
    vertex_array: GraphicsObject<VertexArrayHandle>,
    vertex_buffer: GraphicsObject<BufferHandle>,
    index_buffer: Option<GraphicsObject<BufferHandle>>,
    index_format: Option<IndexFormat>,
    topology: Topology,
    count: u32,
}

impl Mesh {
    pub fn new(device: &mut GraphicsDevice, data: &MeshData, dynamic: bool) -> Result<Self> {
        let stride = data.layout.stride() as usize;
        if stride == 0 || data.vertices.is_empty() || data.vertices.len() % stride != 0 {
            return Err(Error::InvalidOperation(format!(
                "{} bytes of vertices do not fit a layout with stride {}",
                data.vertices.len(),
                stride
            )));
        }

        let vbo = device.create_buffer(BufferKind::Vertex, data.vertices.as_slice(), dynamic)?;
        let vertex_buffer = device.own(vbo);

        let index_buffer = match data.indices {
            Some(ref indices) => {
                let ibo = device.create_buffer(BufferKind::Index, indices.as_bytes(), dynamic)?;
                Some(device.own(ibo))
            }
            None => None,
        };

        let vao = device.create_vertex_array(
            data.layout,
            vbo,
            index_buffer.as_ref().map(|v| v.handle()),
        )?;

        let count = match data.indices {
            Some(ref v) => v.len(),
            None => data.vertex_count(),
        };

        Ok(Mesh {
            vertex_array: device.own(vao),
            vertex_buffer,
            index_buffer,
            index_format: data.indices.as_ref().map(|v| v.format()),
            topology: data.topology,
            count: count as u32,
        })
    }

    /// A quad covering the clip space, with `Position` and `Texcoord0` attributes.
    pub fn fullscreen_quad(device: &mut GraphicsDevice) -> Result<Self> {
        let layout = VertexLayout::build()
            .with(Attribute::Position, VertexFormat::Float, 2, false)
            .with(Attribute::Texcoord0, VertexFormat::Float, 2, false)
            .finish();

        let vertices: [[f32; 4]; 4] = [
            [-1.0, -1.0, 0.0, 0.0],
            [1.0, -1.0, 1.0, 0.0],
            [1.0, 1.0, 1.0, 1.0],
            [-1.0, 1.0, 0.0, 1.0],
        ];

        let data = MeshData {
            layout,
            vertices: pod::as_bytes(&vertices[..]).to_vec(),
            indices: Some(IndexData::U16(vec![0, 1, 2, 0, 2, 3])),
            topology: Topology::Triangles,
        };

        Mesh::new(device, &data, false)
    }

    #[inline]
    pub fn vertex_array(&self) -> VertexArrayHandle {
        self.vertex_array.handle()
    }

    #[inline]
    pub fn vertex_buffer(&self) -> BufferHandle {
        self.vertex_buffer.handle()
    }

    #[inline]
    pub fn index_buffer(&self) -> Option<BufferHandle> {
        self.index_buffer.as_ref().map(|v| v.handle())
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// The number of vertices, or indices for indexed meshes, drawn by `draw`.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Draws the whole mesh with the bound program.
    pub fn draw(&self, device: &mut GraphicsDevice) -> Result<()> {
        device.bind_vertex_array(Some(self.vertex_array.handle()))?;

        match self.index_format {
            Some(format) => device.draw_elements(self.topology, 0, self.count, format, None),
            None => device.draw_arrays(self.topology, 0, self.count),
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::backends::headless::HeadlessVisitor;
    use super::super::settings::GraphicsParams;
    use super::*;

    #[test]
    fn release_on_drop() {
        let visitor = Box::new(HeadlessVisitor::new());
        let mut device = GraphicsDevice::new(visitor, GraphicsParams::default()).unwrap();
        device.initialize().unwrap();

        let quad = Mesh::fullscreen_quad(&mut device).unwrap();
        assert_eq!(quad.count(), 6);
        assert!(quad.index_buffer().is_some());
        assert_eq!(device.frame_info().alive_buffers, 2);
        assert_eq!(device.frame_info().alive_vertex_arrays, 1);

        drop(quad);
        assert_eq!(device.collect().unwrap(), 3);
        assert_eq!(device.frame_info().alive_buffers, 0);
        assert_eq!(device.frame_info().alive_vertex_arrays, 0);

        device.shutdown().unwrap();
    }
}
