use gl;
use gl::types::*;

use super::super::super::assets::prelude::*;

impl From<BufferHint> for GLenum {
    fn from(hint: BufferHint) -> Self {
        match hint {
            BufferHint::Immutable => gl::STATIC_DRAW,
            BufferHint::Stream => gl::STREAM_DRAW,
            BufferHint::Dynamic => gl::DYNAMIC_DRAW,
        }
    }
}

impl From<BufferKind> for GLenum {
    fn from(kind: BufferKind) -> Self {
        match kind {
            BufferKind::Vertex => gl::ARRAY_BUFFER,
            BufferKind::Index => gl::ELEMENT_ARRAY_BUFFER,
            BufferKind::Uniform => gl::UNIFORM_BUFFER,
            BufferKind::Structured => gl::SHADER_STORAGE_BUFFER,
        }
    }
}

impl From<Comparison> for GLenum {
    fn from(cmp: Comparison) -> Self {
        match cmp {
            Comparison::Never => gl::NEVER,
            Comparison::Less => gl::LESS,
            Comparison::LessOrEqual => gl::LEQUAL,
            Comparison::Greater => gl::GREATER,
            Comparison::GreaterOrEqual => gl::GEQUAL,
            Comparison::Equal => gl::EQUAL,
            Comparison::NotEqual => gl::NOTEQUAL,
            Comparison::Always => gl::ALWAYS,
        }
    }
}

impl From<Equation> for GLenum {
    fn from(eq: Equation) -> Self {
        match eq {
            Equation::Add => gl::FUNC_ADD,
            Equation::Subtract => gl::FUNC_SUBTRACT,
            Equation::ReverseSubtract => gl::FUNC_REVERSE_SUBTRACT,
            Equation::Min => gl::MIN,
            Equation::Max => gl::MAX,
        }
    }
}

impl From<BlendFactor> for GLenum {
    fn from(factor: BlendFactor) -> Self {
        match factor {
            BlendFactor::Zero => gl::ZERO,
            BlendFactor::One => gl::ONE,
            BlendFactor::Value(BlendValue::SourceColor) => gl::SRC_COLOR,
            BlendFactor::Value(BlendValue::SourceAlpha) => gl::SRC_ALPHA,
            BlendFactor::Value(BlendValue::DestinationColor) => gl::DST_COLOR,
            BlendFactor::Value(BlendValue::DestinationAlpha) => gl::DST_ALPHA,
            BlendFactor::OneMinusValue(BlendValue::SourceColor) => gl::ONE_MINUS_SRC_COLOR,
            BlendFactor::OneMinusValue(BlendValue::SourceAlpha) => gl::ONE_MINUS_SRC_ALPHA,
            BlendFactor::OneMinusValue(BlendValue::DestinationColor) => gl::ONE_MINUS_DST_COLOR,
            BlendFactor::OneMinusValue(BlendValue::DestinationAlpha) => gl::ONE_MINUS_DST_ALPHA,
        }
    }
}

impl From<CullFace> for GLenum {
    fn from(face: CullFace) -> Self {
        match face {
            CullFace::Front => gl::FRONT,
            CullFace::Back => gl::BACK,
            CullFace::FrontAndBack => gl::FRONT_AND_BACK,
        }
    }
}

impl From<FrontFaceOrder> for GLenum {
    fn from(order: FrontFaceOrder) -> Self {
        match order {
            FrontFaceOrder::Clockwise => gl::CW,
            FrontFaceOrder::CounterClockwise => gl::CCW,
        }
    }
}

impl From<VertexFormat> for GLenum {
    fn from(format: VertexFormat) -> Self {
        match format {
            VertexFormat::Byte => gl::BYTE,
            VertexFormat::UByte => gl::UNSIGNED_BYTE,
            VertexFormat::Short => gl::SHORT,
            VertexFormat::UShort => gl::UNSIGNED_SHORT,
            VertexFormat::Int => gl::INT,
            VertexFormat::UInt => gl::UNSIGNED_INT,
            VertexFormat::Float => gl::FLOAT,
        }
    }
}

impl From<Topology> for GLenum {
    fn from(topology: Topology) -> Self {
        match topology {
            Topology::Points => gl::POINTS,
            Topology::Lines => gl::LINES,
            Topology::LineStrip => gl::LINE_STRIP,
            Topology::Triangles => gl::TRIANGLES,
            Topology::TriangleStrip => gl::TRIANGLE_STRIP,
            Topology::TriangleFan => gl::TRIANGLE_FAN,
        }
    }
}

impl From<IndexFormat> for GLenum {
    fn from(format: IndexFormat) -> Self {
        match format {
            IndexFormat::U16 => gl::UNSIGNED_SHORT,
            IndexFormat::U32 => gl::UNSIGNED_INT,
        }
    }
}

impl From<ShaderStage> for GLenum {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
            ShaderStage::Geometry => gl::GEOMETRY_SHADER,
            ShaderStage::Compute => gl::COMPUTE_SHADER,
        }
    }
}

impl From<TextureKind> for GLenum {
    fn from(kind: TextureKind) -> Self {
        match kind {
            TextureKind::Texture2D => gl::TEXTURE_2D,
            TextureKind::Texture2DArray => gl::TEXTURE_2D_ARRAY,
            TextureKind::Texture3D => gl::TEXTURE_3D,
            TextureKind::Cubemap => gl::TEXTURE_CUBE_MAP,
            TextureKind::CubemapArray => gl::TEXTURE_CUBE_MAP_ARRAY,
        }
    }
}

impl From<CubemapFace> for GLenum {
    fn from(face: CubemapFace) -> Self {
        match face {
            CubemapFace::PositiveX => gl::TEXTURE_CUBE_MAP_POSITIVE_X,
            CubemapFace::NegativeX => gl::TEXTURE_CUBE_MAP_NEGATIVE_X,
            CubemapFace::PositiveY => gl::TEXTURE_CUBE_MAP_POSITIVE_Y,
            CubemapFace::NegativeY => gl::TEXTURE_CUBE_MAP_NEGATIVE_Y,
            CubemapFace::PositiveZ => gl::TEXTURE_CUBE_MAP_POSITIVE_Z,
            CubemapFace::NegativeZ => gl::TEXTURE_CUBE_MAP_NEGATIVE_Z,
        }
    }
}

impl From<TextureWrap> for GLenum {
    fn from(wrap: TextureWrap) -> Self {
        match wrap {
            TextureWrap::Repeat => gl::REPEAT,
            TextureWrap::Mirror => gl::MIRRORED_REPEAT,
            TextureWrap::Clamp => gl::CLAMP_TO_EDGE,
        }
    }
}

impl From<TextureAxis> for GLenum {
    fn from(axis: TextureAxis) -> Self {
        match axis {
            TextureAxis::S => gl::TEXTURE_WRAP_S,
            TextureAxis::T => gl::TEXTURE_WRAP_T,
            TextureAxis::R => gl::TEXTURE_WRAP_R,
        }
    }
}

/// Minification filter.
pub fn min_filter(filter: TextureFilter) -> GLenum {
    match filter {
        TextureFilter::Nearest => gl::NEAREST,
        TextureFilter::Linear => gl::LINEAR,
        TextureFilter::NearestMipmapNearest => gl::NEAREST_MIPMAP_NEAREST,
        TextureFilter::LinearMipmapNearest => gl::LINEAR_MIPMAP_NEAREST,
        TextureFilter::NearestMipmapLinear => gl::NEAREST_MIPMAP_LINEAR,
        TextureFilter::LinearMipmapLinear => gl::LINEAR_MIPMAP_LINEAR,
    }
}

/// Magnification filter, mipmaps never take part in magnification.
pub fn mag_filter(filter: TextureFilter) -> GLenum {
    match filter {
        TextureFilter::Nearest
        | TextureFilter::NearestMipmapNearest
        | TextureFilter::NearestMipmapLinear => gl::NEAREST,
        _ => gl::LINEAR,
    }
}

/// Returns the `(internal format, format, pixel type)` triple of a texture format.
pub fn texture_format(format: TextureFormat) -> (GLenum, GLenum, GLenum) {
    match format {
        TextureFormat::R8 => (gl::R8, gl::RED, gl::UNSIGNED_BYTE),
        TextureFormat::RG8 => (gl::RG8, gl::RG, gl::UNSIGNED_BYTE),
        TextureFormat::RGB8 => (gl::RGB8, gl::RGB, gl::UNSIGNED_BYTE),
        TextureFormat::RGBA8 => (gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE),
        TextureFormat::R16F => (gl::R16F, gl::RED, gl::HALF_FLOAT),
        TextureFormat::RG16F => (gl::RG16F, gl::RG, gl::HALF_FLOAT),
        TextureFormat::RGBA16F => (gl::RGBA16F, gl::RGBA, gl::HALF_FLOAT),
        TextureFormat::R32F => (gl::R32F, gl::RED, gl::FLOAT),
        TextureFormat::RG32F => (gl::RG32F, gl::RG, gl::FLOAT),
        TextureFormat::RGBA32F => (gl::RGBA32F, gl::RGBA, gl::FLOAT),
        TextureFormat::R32UI => (gl::R32UI, gl::RED_INTEGER, gl::UNSIGNED_INT),
        TextureFormat::Depth16 => (
            gl::DEPTH_COMPONENT16,
            gl::DEPTH_COMPONENT,
            gl::UNSIGNED_SHORT,
        ),
        TextureFormat::Depth24 => (gl::DEPTH_COMPONENT24, gl::DEPTH_COMPONENT, gl::UNSIGNED_INT),
        TextureFormat::Depth32F => (gl::DEPTH_COMPONENT32F, gl::DEPTH_COMPONENT, gl::FLOAT),
        TextureFormat::Depth24Stencil8 => (
            gl::DEPTH24_STENCIL8,
            gl::DEPTH_STENCIL,
            gl::UNSIGNED_INT_24_8,
        ),
    }
}

pub fn clear_bits(flags: ClearFlags) -> GLbitfield {
    let mut bits = 0;
    if flags.contains(ClearFlags::COLOR) {
        bits |= gl::COLOR_BUFFER_BIT;
    }

    if flags.contains(ClearFlags::DEPTH) {
        bits |= gl::DEPTH_BUFFER_BIT;
    }

    if flags.contains(ClearFlags::STENCIL) {
        bits |= gl::STENCIL_BUFFER_BIT;
    }

    bits
}
