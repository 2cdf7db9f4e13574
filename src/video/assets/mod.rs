//! Descriptors of the native graphics resources and pipeline state.

pub mod buffer;
pub mod framebuffer;
pub mod program;
pub mod state;
pub mod texture;
pub mod vertex;

pub mod prelude {
    pub use super::buffer::{BufferHandle, BufferHint, BufferKind, BufferParams};
    pub use super::framebuffer::{
        Attachment, BlitFilter, ClearFlags, FrameBufferHandle, FrameBufferParams,
        FrameBufferTarget,
    };
    pub use super::program::{
        ProgramHandle, ShaderSourceDescriptor, ShaderStage, UniformLocation, UniformVariable,
    };
    pub use super::state::{
        BlendFactor, BlendValue, Comparison, CullFace, Equation, FrontFaceOrder,
        RasterizerState,
    };
    pub use super::texture::{
        CubemapFace, TextureAxis, TextureFilter, TextureFormat, TextureHandle, TextureKind,
        TextureParams, TextureWrap,
    };
    pub use super::vertex::{
        Attribute, IndexFormat, Topology, VertexArrayHandle, VertexArrayParams, VertexAttribute,
        VertexFormat, VertexLayout, VertexLayoutBuilder,
    };
}
