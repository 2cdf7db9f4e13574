//! Vertex layouts, index formats and primitive topologies.

use super::buffer::BufferHandle;
use crate::video::MAX_VERTEX_ATTRIBUTES;

impl_handle!(VertexArrayHandle);

/// The semantic of a vertex attribute. Each semantic owns a fixed attribute
/// location, so a vertex array works with every program that declares the
/// attribute under its semantic name.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Position,
    Normal,
    Tangent,
    Color0,
    Color1,
    Indices,
    Weight,
    Texcoord0,
    Texcoord1,
    Texcoord2,
    Texcoord3,
    ObjectId,
}

impl Attribute {
    pub const ALL: [Attribute; 12] = [
        Attribute::Position,
        Attribute::Normal,
        Attribute::Tangent,
        Attribute::Color0,
        Attribute::Color1,
        Attribute::Indices,
        Attribute::Weight,
        Attribute::Texcoord0,
        Attribute::Texcoord1,
        Attribute::Texcoord2,
        Attribute::Texcoord3,
        Attribute::ObjectId,
    ];

    #[inline]
    pub fn location(self) -> u32 {
        self as u32
    }

    /// The attribute name programs declare for this semantic.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Position => "Position",
            Attribute::Normal => "Normal",
            Attribute::Tangent => "Tangent",
            Attribute::Color0 => "Color0",
            Attribute::Color1 => "Color1",
            Attribute::Indices => "Indices",
            Attribute::Weight => "Weight",
            Attribute::Texcoord0 => "Texcoord0",
            Attribute::Texcoord1 => "Texcoord1",
            Attribute::Texcoord2 => "Texcoord2",
            Attribute::Texcoord3 => "Texcoord3",
            Attribute::ObjectId => "ObjectId",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum VertexFormat {
    Byte,
    UByte,
    Short,
    UShort,
    Int,
    UInt,
    Float,
}

impl VertexFormat {
    #[inline]
    pub fn size(self) -> u8 {
        match self {
            VertexFormat::Byte | VertexFormat::UByte => 1,
            VertexFormat::Short | VertexFormat::UShort => 2,
            VertexFormat::Int | VertexFormat::UInt | VertexFormat::Float => 4,
        }
    }
}

/// `VertexAttribute` defines an generic vertex element data.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct VertexAttribute {
    pub name: Attribute,
    /// The data type of each component of this element.
    pub format: VertexFormat,
    /// The number of components per generic vertex element.
    pub size: u8,
    /// Whether fixed-point data values should be normalized.
    pub normalized: bool,
}

impl Default for VertexAttribute {
    fn default() -> Self {
        VertexAttribute {
            name: Attribute::Position,
            format: VertexFormat::Byte,
            size: 0,
            normalized: false,
        }
    }
}

/// `VertexLayout` defines an layout of vertex structure.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
pub struct VertexLayout {
    stride: u8,
    len: u8,
    offset: [u8; MAX_VERTEX_ATTRIBUTES],
    elements: [VertexAttribute; MAX_VERTEX_ATTRIBUTES],
}

impl VertexLayout {
    /// Creates a new an empty `VertexLayoutBuilder`.
    #[inline]
    pub fn build() -> VertexLayoutBuilder {
        VertexLayoutBuilder::new()
    }

    /// Stride of single vertex structure.
    #[inline]
    pub fn stride(&self) -> u8 {
        self.stride
    }

    /// Returns the number of elements in the layout.
    #[inline]
    pub fn len(&self) -> u8 {
        self.len
    }

    /// Returns true if the layout has no element.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Relative element offset from the layout.
    pub fn offset(&self, name: Attribute) -> Option<u8> {
        for i in 0..self.len as usize {
            if self.elements[i].name == name {
                return Some(self.offset[i]);
            }
        }

        None
    }

    /// Returns named `VertexAttribute` from the layout.
    pub fn element(&self, name: Attribute) -> Option<VertexAttribute> {
        for i in 0..self.len as usize {
            if self.elements[i].name == name {
                return Some(self.elements[i]);
            }
        }

        None
    }

    /// Iterates the `(element, offset)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (VertexAttribute, u8)> + '_ {
        (0..self.len as usize).map(move |i| (self.elements[i], self.offset[i]))
    }
}

#[derive(Default)]
pub struct VertexLayoutBuilder(VertexLayout);

impl VertexLayoutBuilder {
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// Declares an attribute, rewrites it if it has been declared already.
    ///
    /// # Panics
    ///
    /// Panics if there are more than `MAX_VERTEX_ATTRIBUTES` distinct attributes.
    pub fn with(
        &mut self,
        attribute: Attribute,
        format: VertexFormat,
        size: u8,
        normalized: bool,
    ) -> &mut Self {
        assert!(size > 0 && size <= 4);

        let desc = VertexAttribute {
            name: attribute,
            format,
            size,
            normalized,
        };

        for i in 0..self.0.len as usize {
            if self.0.elements[i].name == attribute {
                self.0.elements[i] = desc;
                return self;
            }
        }

        assert!(
            (self.0.len as usize) < MAX_VERTEX_ATTRIBUTES,
            "Out of layout bounds."
        );

        self.0.elements[self.0.len as usize] = desc;
        self.0.len += 1;
        self
    }

    #[inline]
    pub fn finish(&mut self) -> VertexLayout {
        self.0.stride = 0;
        for i in 0..self.0.len as usize {
            let len = self.0.elements[i].size * self.0.elements[i].format.size();
            self.0.offset[i] = self.0.stride;
            self.0.stride += len;
        }

        self.0
    }
}

/// Specify the index type of an index buffer.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    #[inline]
    pub fn stride(self) -> usize {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// Defines how the input vertex data is used to assemble primitives.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl Topology {
    /// The number of triangles assembled from `count` vertices.
    pub fn triangles(self, count: u32) -> u32 {
        match self {
            Topology::Triangles => count / 3,
            Topology::TriangleStrip | Topology::TriangleFan => count.saturating_sub(2),
            _ => 0,
        }
    }
}

/// The association of a vertex layout with buffer storage.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexArrayParams {
    pub layout: VertexLayout,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: Option<BufferHandle>,
}
