//! The backend of the graphics device, which should be responsible for only one
//! thing: forwarding already validated requests to the native graphics APIs.
//!
//! The device does all the bookkeeping (handles, bindings, state tracking and
//! validation), a `Visitor` only translates. Every hook is `unsafe` since it
//! talks to the native API directly and expects the device's invariants.

pub mod headless;

#[cfg(not(target_arch = "wasm32"))]
pub mod gl;

#[cfg(not(target_arch = "wasm32"))]
mod utils;

use crate::errors::*;
use crate::math::{Color, Rect};

use super::assets::prelude::*;

pub trait Visitor {
    /// Resets the native context to a known baseline.
    unsafe fn initialize(&mut self) -> Result<()>;

    /// Releases backend owned objects, the device has deleted every resource already.
    unsafe fn shutdown(&mut self) -> Result<()>;

    unsafe fn set_depth_test(&mut self, enable: bool) -> Result<()>;
    unsafe fn set_depth_write(&mut self, enable: bool) -> Result<()>;
    unsafe fn set_depth_func(&mut self, comparison: Comparison) -> Result<()>;
    unsafe fn set_blend(&mut self, enable: bool) -> Result<()>;
    unsafe fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) -> Result<()>;
    unsafe fn set_blend_equation(&mut self, equation: Equation) -> Result<()>;
    unsafe fn set_cull(&mut self, enable: bool) -> Result<()>;
    unsafe fn set_cull_face(&mut self, face: CullFace) -> Result<()>;
    unsafe fn set_front_face(&mut self, order: FrontFaceOrder) -> Result<()>;
    unsafe fn set_scissor_test(&mut self, enable: bool) -> Result<()>;
    unsafe fn set_scissor_rect(&mut self, rect: Rect) -> Result<()>;
    unsafe fn set_viewport(&mut self, rect: Rect) -> Result<()>;

    /// Clears the buffers of the bound draw framebuffer selected by `flags`.
    unsafe fn clear(&mut self, color: Color, depth: f32, stencil: i32, flags: ClearFlags)
        -> Result<()>;

    /// Creates a buffer and leaves it bound to its kind's slot.
    unsafe fn create_buffer(
        &mut self,
        handle: BufferHandle,
        params: BufferParams,
        data: Option<&[u8]>,
    ) -> Result<()>;

    /// Reallocates the storage of a buffer, leaves it bound to its kind's slot.
    unsafe fn set_buffer(&mut self, handle: BufferHandle, params: BufferParams, data: &[u8])
        -> Result<()>;

    /// Updates a sub-range of a buffer, leaves it bound to its kind's slot.
    unsafe fn update_buffer(&mut self, handle: BufferHandle, offset: usize, data: &[u8])
        -> Result<()>;

    unsafe fn bind_buffer(&mut self, kind: BufferKind, handle: Option<BufferHandle>) -> Result<()>;
    unsafe fn delete_buffer(&mut self, handle: BufferHandle) -> Result<()>;

    /// Creates a vertex array, the bindings of vertex arrays and vertex buffers
    /// are undefined afterwards.
    unsafe fn create_vertex_array(
        &mut self,
        handle: VertexArrayHandle,
        params: VertexArrayParams,
    ) -> Result<()>;

    unsafe fn bind_vertex_array(&mut self, handle: Option<VertexArrayHandle>) -> Result<()>;
    unsafe fn delete_vertex_array(&mut self, handle: VertexArrayHandle) -> Result<()>;

    /// Creates a framebuffer, the framebuffer bindings are undefined afterwards.
    unsafe fn create_framebuffer(
        &mut self,
        handle: FrameBufferHandle,
        params: &FrameBufferParams,
    ) -> Result<()>;

    unsafe fn bind_framebuffer(
        &mut self,
        target: FrameBufferTarget,
        handle: Option<FrameBufferHandle>,
    ) -> Result<()>;

    /// Copies a block of pixels from the bound read framebuffer to the bound draw framebuffer.
    unsafe fn blit_framebuffer(
        &mut self,
        src: Rect,
        dst: Rect,
        flags: ClearFlags,
        filter: BlitFilter,
    ) -> Result<()>;

    /// Reads a block of pixels from the `attachment`th color buffer of the bound
    /// read framebuffer. `out` has exactly the size of the requested region.
    unsafe fn read_pixels(
        &mut self,
        attachment: usize,
        rect: Rect,
        format: TextureFormat,
        out: &mut [u8],
    ) -> Result<()>;

    unsafe fn delete_framebuffer(&mut self, handle: FrameBufferHandle) -> Result<()>;

    /// Compiles and links a program. Fails with `CompileFailure` or `LinkFailure`
    /// carrying the native info log, no native object survives a failure.
    unsafe fn compile_program(
        &mut self,
        handle: ProgramHandle,
        sources: &[ShaderSourceDescriptor],
    ) -> Result<()>;

    unsafe fn bind_program(&mut self, handle: Option<ProgramHandle>) -> Result<()>;
    unsafe fn uniform_location(&mut self, handle: ProgramHandle, name: &str)
        -> Result<UniformLocation>;
    unsafe fn attrib_location(&mut self, handle: ProgramHandle, name: &str) -> Result<i32>;

    /// Writes a uniform variable of the bound program.
    unsafe fn set_uniform(&mut self, location: UniformLocation, variable: &UniformVariable)
        -> Result<()>;

    unsafe fn delete_program(&mut self, handle: ProgramHandle) -> Result<()>;

    unsafe fn create_texture(&mut self, handle: TextureHandle, params: TextureParams)
        -> Result<()>;

    /// Binds a texture to the sampler `slot`.
    unsafe fn bind_texture(&mut self, slot: usize, handle: Option<TextureHandle>) -> Result<()>;

    unsafe fn set_texture_wrap(
        &mut self,
        handle: TextureHandle,
        axis: TextureAxis,
        wrap: TextureWrap,
    ) -> Result<()>;

    unsafe fn set_texture_filter(
        &mut self,
        handle: TextureHandle,
        min: TextureFilter,
        mag: TextureFilter,
    ) -> Result<()>;

    unsafe fn generate_mipmap(&mut self, handle: TextureHandle, params: TextureParams)
        -> Result<()>;

    /// Specifies the image of a mip level (of a face, for cubemaps). The data
    /// has been validated against the level dimensions. Texture manipulations
    /// happen on the reserved sampler slot 0.
    unsafe fn tex_image(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        face: Option<CubemapFace>,
        level: u32,
        data: Option<&[u8]>,
    ) -> Result<()>;

    unsafe fn tex_sub_image(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        face: Option<CubemapFace>,
        level: u32,
        offset: (u32, u32, u32),
        size: (u32, u32, u32),
        data: &[u8],
    ) -> Result<()>;

    /// Reads back the image of a mip level. `out` has exactly the size of the level.
    unsafe fn get_tex_image(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        face: Option<CubemapFace>,
        level: u32,
        out: &mut [u8],
    ) -> Result<()>;

    unsafe fn delete_texture(&mut self, handle: TextureHandle) -> Result<()>;

    unsafe fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) -> Result<()>;

    unsafe fn draw_elements(
        &mut self,
        topology: Topology,
        first: u32,
        count: u32,
        format: IndexFormat,
        base_vertex: Option<i32>,
    ) -> Result<()>;
}
