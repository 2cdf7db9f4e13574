//! The graphics device, the single point of contact with the native API.
//!
//! The device owns every resource in a registry keyed by typed handles, tracks
//! the applied pipeline state and the bound objects, and issues a native call
//! only when it actually changes something. All of it is confined to the
//! rendering thread.

use smallvec::SmallVec;

use crate::math::{Color, Point2, Rect};
use crate::utils::hash::FastHashMap;
use crate::utils::hash_value::HashValue;
use crate::utils::object_pool::ObjectPool;
use crate::utils::pod::{self, Pod};

use super::assets::prelude::*;
use super::assets::texture::mip_levels;
use super::backends::Visitor;
use super::errors::*;
use super::resource::{GraphicsObject, ReleaseQueue, Resource, ResourceHandle};
use super::settings::GraphicsParams;

macro_rules! stat {
    ($info:expr, $field:ident += $v:expr) => {{
        #[cfg(feature = "stats")]
        {
            $info.$field += $v;
        }
    }};
}

/// The profiling counters of a frame. Without the `stats` feature only the
/// alive resource counts are filled.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub draw_calls: u32,
    pub triangles: u32,
    pub state_changes: u32,
    pub uniform_writes: u32,
    pub buffer_binds: u32,
    pub texture_binds: u32,
    pub program_binds: u32,
    pub programs_compiled: u32,
    pub alive_buffers: u32,
    pub alive_textures: u32,
    pub alive_vertex_arrays: u32,
    pub alive_framebuffers: u32,
    pub alive_programs: u32,
}

/// What the device knows about a binding point. Operations with binding side
/// effects on the native side leave it `Unknown`, which forces the next bind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Binding<H> {
    Unknown,
    Bound(Option<H>),
}

impl<H: Copy + PartialEq> Binding<H> {
    #[inline]
    fn is(self, handle: Option<H>) -> bool {
        self == Binding::Bound(handle)
    }

    #[inline]
    fn current(self) -> Option<H> {
        match self {
            Binding::Bound(v) => v,
            Binding::Unknown => None,
        }
    }
}

#[derive(Debug, Default)]
struct ProgramData {
    uniforms: FastHashMap<HashValue<str>, UniformLocation>,
    attributes: FastHashMap<HashValue<str>, i32>,
}

pub struct GraphicsDevice {
    visitor: Box<dyn Visitor>,
    params: GraphicsParams,
    initialized: bool,

    state: RasterizerState,
    scissor_test: bool,

    buffers: ObjectPool<BufferHandle, BufferParams>,
    textures: ObjectPool<TextureHandle, TextureParams>,
    vertex_arrays: ObjectPool<VertexArrayHandle, VertexArrayParams>,
    framebuffers: ObjectPool<FrameBufferHandle, FrameBufferParams>,
    programs: ObjectPool<ProgramHandle, ProgramData>,

    bound_buffers: [Binding<BufferHandle>; BufferKind::COUNT],
    bound_vertex_array: Binding<VertexArrayHandle>,
    bound_program: Binding<ProgramHandle>,
    bound_read_framebuffer: Binding<FrameBufferHandle>,
    bound_draw_framebuffer: Binding<FrameBufferHandle>,
    bound_textures: SmallVec<[Binding<TextureHandle>; 16]>,

    releases: ReleaseQueue,
    info: FrameInfo,
}

impl GraphicsDevice {
    /// Creates a device on top of `visitor`. It must be initialized before use.
    pub fn new(visitor: Box<dyn Visitor>, params: GraphicsParams) -> Result<Self> {
        params.validate()?;

        let mut bound_textures = SmallVec::new();
        bound_textures.resize(params.max_texture_slots, Binding::Unknown);

        Ok(GraphicsDevice {
            visitor,
            params,
            initialized: false,
            state: RasterizerState::default(),
            scissor_test: false,
            buffers: ObjectPool::new(),
            textures: ObjectPool::new(),
            vertex_arrays: ObjectPool::new(),
            framebuffers: ObjectPool::new(),
            programs: ObjectPool::new(),
            bound_buffers: [Binding::Unknown; BufferKind::COUNT],
            bound_vertex_array: Binding::Unknown,
            bound_program: Binding::Unknown,
            bound_read_framebuffer: Binding::Unknown,
            bound_draw_framebuffer: Binding::Unknown,
            bound_textures,
            releases: ReleaseQueue::new(),
            info: FrameInfo::default(),
        })
    }

    #[inline]
    pub fn params(&self) -> &GraphicsParams {
        &self.params
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn ensure(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }
}

impl GraphicsDevice {
    /// Brings the native context to the baseline state.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }

        unsafe {
            self.visitor.initialize()?;
        }

        self.initialized = true;
        self.bound_read_framebuffer = Binding::Bound(None);
        self.bound_draw_framebuffer = Binding::Bound(None);

        self.set_state(&RasterizerState::default(), true)?;
        self.set_enable_scissor_test(false, true)?;

        info!(
            "GraphicsDevice initialized with {} texture slots.",
            self.params.max_texture_slots
        );

        Ok(())
    }

    /// Releases every resource still alive. Resources that have not been
    /// released by their owners are reported as leaks.
    pub fn shutdown(&mut self) -> Result<()> {
        self.ensure()?;
        self.collect()?;

        let mut leaks: Vec<Resource> = Vec::new();
        leaks.extend(self.programs.iter().map(Resource::Program));
        leaks.extend(self.framebuffers.iter().map(Resource::FrameBuffer));
        leaks.extend(self.vertex_arrays.iter().map(Resource::VertexArray));
        leaks.extend(self.textures.iter().map(Resource::Texture));
        leaks.extend(self.buffers.iter().map(Resource::Buffer));

        for &v in &leaks {
            warn!("{} leaked, it is released at the device shutdown.", v);
            self.release(v)?;
        }

        unsafe {
            self.visitor.shutdown()?;
        }

        self.initialized = false;
        info!("GraphicsDevice shutdown.");

        if self.params.strict_leak_check && !leaks.is_empty() {
            return Err(Error::ResourceLeak(leaks.len()));
        }

        Ok(())
    }

    /// Wraps `handle` into an owning object, dropping it releases the resource.
    pub fn own<H: ResourceHandle>(&self, handle: H) -> GraphicsObject<H> {
        GraphicsObject::new(handle, self.releases.clone())
    }

    /// Deletes the resources released by their owners since the last collection.
    pub fn collect(&mut self) -> Result<usize> {
        let released = self.releases.drain();
        for &v in &released {
            self.release(v)?;
        }

        Ok(released.len())
    }

    fn release(&mut self, resource: Resource) -> Result<()> {
        match resource {
            Resource::Buffer(h) => self.delete_buffer(h),
            Resource::Texture(h) => self.delete_texture(h),
            Resource::VertexArray(h) => self.delete_vertex_array(h),
            Resource::FrameBuffer(h) => self.delete_framebuffer(h),
            Resource::Program(h) => self.delete_program(h),
        }
    }

    /// Returns the counters since the last reset.
    pub fn frame_info(&self) -> FrameInfo {
        let mut info = self.info;
        info.alive_buffers = self.buffers.len() as u32;
        info.alive_textures = self.textures.len() as u32;
        info.alive_vertex_arrays = self.vertex_arrays.len() as u32;
        info.alive_framebuffers = self.framebuffers.len() as u32;
        info.alive_programs = self.programs.len() as u32;
        info
    }

    pub fn reset_frame_info(&mut self) {
        self.info = FrameInfo::default();
    }
}

impl Drop for GraphicsDevice {
    fn drop(&mut self) {
        if self.initialized {
            if let Err(err) = self.shutdown() {
                error!("{}", err);
            }
        }
    }
}

impl GraphicsDevice {
    /// Applies a complete rasterizer state. Only the fields that differ from
    /// the applied state reach the native API, unless `force` is set.
    pub fn set_state(&mut self, state: &RasterizerState, force: bool) -> Result<()> {
        self.ensure()?;

        self.set_enable_depth_test(state.depth_test, force)?;
        self.set_enable_depth_write(state.depth_write, force)?;

        if force || self.state.depth_mode != state.depth_mode {
            unsafe { self.visitor.set_depth_func(state.depth_mode)? };
            self.state.depth_mode = state.depth_mode;
            stat!(self.info, state_changes += 1);
        }

        self.set_enable_blending(state.blend, force)?;

        if force || self.state.blend_src != state.blend_src || self.state.blend_dst != state.blend_dst
        {
            unsafe { self.visitor.set_blend_func(state.blend_src, state.blend_dst)? };
            self.state.blend_src = state.blend_src;
            self.state.blend_dst = state.blend_dst;
            stat!(self.info, state_changes += 1);
        }

        if force || self.state.blend_equation != state.blend_equation {
            unsafe { self.visitor.set_blend_equation(state.blend_equation)? };
            self.state.blend_equation = state.blend_equation;
            stat!(self.info, state_changes += 1);
        }

        self.set_enable_culling(state.cull, force)?;

        if force || self.state.cull_face != state.cull_face {
            unsafe { self.visitor.set_cull_face(state.cull_face)? };
            self.state.cull_face = state.cull_face;
            stat!(self.info, state_changes += 1);
        }

        if force || self.state.winding != state.winding {
            unsafe { self.visitor.set_front_face(state.winding)? };
            self.state.winding = state.winding;
            stat!(self.info, state_changes += 1);
        }

        Ok(())
    }

    /// Returns the applied rasterizer state.
    #[inline]
    pub fn get_state(&self) -> RasterizerState {
        self.state
    }

    pub fn set_enable_depth_test(&mut self, enable: bool, force: bool) -> Result<()> {
        self.ensure()?;

        if force || self.state.depth_test != enable {
            unsafe { self.visitor.set_depth_test(enable)? };
            self.state.depth_test = enable;
            stat!(self.info, state_changes += 1);
        }

        Ok(())
    }

    pub fn set_enable_depth_write(&mut self, enable: bool, force: bool) -> Result<()> {
        self.ensure()?;

        if force || self.state.depth_write != enable {
            unsafe { self.visitor.set_depth_write(enable)? };
            self.state.depth_write = enable;
            stat!(self.info, state_changes += 1);
        }

        Ok(())
    }

    pub fn set_enable_blending(&mut self, enable: bool, force: bool) -> Result<()> {
        self.ensure()?;

        if force || self.state.blend != enable {
            unsafe { self.visitor.set_blend(enable)? };
            self.state.blend = enable;
            stat!(self.info, state_changes += 1);
        }

        Ok(())
    }

    pub fn set_enable_culling(&mut self, enable: bool, force: bool) -> Result<()> {
        self.ensure()?;

        if force || self.state.cull != enable {
            unsafe { self.visitor.set_cull(enable)? };
            self.state.cull = enable;
            stat!(self.info, state_changes += 1);
        }

        Ok(())
    }

    pub fn set_enable_scissor_test(&mut self, enable: bool, force: bool) -> Result<()> {
        self.ensure()?;

        if force || self.scissor_test != enable {
            unsafe { self.visitor.set_scissor_test(enable)? };
            self.scissor_test = enable;
            stat!(self.info, state_changes += 1);
        }

        Ok(())
    }

    #[inline]
    pub fn is_scissor_test_enabled(&self) -> bool {
        self.scissor_test
    }

    /// Sets the scissor box in pixels, relative to the lower-left corner.
    pub fn set_scissor_rect(&mut self, rect: Rect) -> Result<()> {
        self.ensure()?;
        unsafe { self.visitor.set_scissor_rect(rect)? };
        Ok(())
    }

    /// Sets the viewport in pixels, relative to the lower-left corner.
    pub fn update_viewport(&mut self, rect: Rect) -> Result<()> {
        self.ensure()?;
        unsafe { self.visitor.set_viewport(rect)? };
        Ok(())
    }

    /// Clears the bound draw framebuffer. Depth writes are enabled for the
    /// duration of a depth clear.
    pub fn clear(&mut self, color: Color, flags: ClearFlags) -> Result<()> {
        self.ensure()?;

        let restore = flags.contains(ClearFlags::DEPTH) && !self.state.depth_write;
        unsafe {
            if restore {
                self.visitor.set_depth_write(true)?;
            }

            self.visitor.clear(color, 1.0, 0, flags)?;

            if restore {
                self.visitor.set_depth_write(false)?;
            }
        }

        Ok(())
    }
}

impl GraphicsDevice {
    /// Creates a buffer with `data` as its initial content.
    pub fn create_buffer<T: Pod>(
        &mut self,
        kind: BufferKind,
        data: &[T],
        dynamic: bool,
    ) -> Result<BufferHandle> {
        let bytes = pod::as_bytes(data);
        self.create_buffer_impl(kind, bytes.len(), Some(bytes), dynamic)
    }

    /// Creates a buffer of `size` bytes with undefined content.
    pub fn allocate_buffer(
        &mut self,
        kind: BufferKind,
        size: usize,
        dynamic: bool,
    ) -> Result<BufferHandle> {
        self.create_buffer_impl(kind, size, None, dynamic)
    }

    fn create_buffer_impl(
        &mut self,
        kind: BufferKind,
        size: usize,
        data: Option<&[u8]>,
        dynamic: bool,
    ) -> Result<BufferHandle> {
        self.ensure()?;
        self.detach_index_buffer(kind)?;

        let params = BufferParams {
            kind,
            hint: BufferHint::from_dynamic(dynamic),
            size,
        };

        let handle = self.buffers.create(params);
        let data = data.filter(|v| !v.is_empty());
        if let Err(err) = unsafe { self.visitor.create_buffer(handle, params, data) } {
            self.buffers.free(handle);
            return Err(err.into());
        }

        self.bound_buffers[kind.index()] = Binding::Bound(Some(handle));
        Ok(handle)
    }

    /// Replaces the whole content of a buffer, its size becomes the size of `data`.
    pub fn set_buffer<T: Pod>(&mut self, handle: BufferHandle, data: &[T]) -> Result<()> {
        self.ensure()?;

        let mut params = *self
            .buffers
            .get(handle)
            .ok_or_else(|| Error::BufferHandleInvalid(handle))?;

        self.detach_index_buffer(params.kind)?;

        let bytes = pod::as_bytes(data);
        params.size = bytes.len();

        unsafe { self.visitor.set_buffer(handle, params, bytes)? };
        if let Some(v) = self.buffers.get_mut(handle) {
            *v = params;
        }

        self.bound_buffers[params.kind.index()] = Binding::Bound(Some(handle));
        Ok(())
    }

    /// Updates the bytes of a buffer starting at `offset`. The range must lie
    /// within the buffer.
    pub fn update_buffer<T: Pod>(
        &mut self,
        handle: BufferHandle,
        offset: usize,
        data: &[T],
    ) -> Result<()> {
        self.ensure()?;

        let params = *self
            .buffers
            .get(handle)
            .ok_or_else(|| Error::BufferHandleInvalid(handle))?;

        let bytes = pod::as_bytes(data);
        if offset.checked_add(bytes.len()).map_or(true, |end| end > params.size) {
            return Err(Error::OutOfBounds(format!(
                "updating {} bytes at offset {} of {} with {} bytes",
                bytes.len(),
                offset,
                handle,
                params.size
            )));
        }

        if bytes.is_empty() {
            return Ok(());
        }

        self.detach_index_buffer(params.kind)?;
        unsafe { self.visitor.update_buffer(handle, offset, bytes)? };
        self.bound_buffers[params.kind.index()] = Binding::Bound(Some(handle));
        Ok(())
    }

    /// Binds a buffer to the slot of `kind`, `None` clears the slot.
    pub fn bind_buffer(&mut self, kind: BufferKind, handle: Option<BufferHandle>) -> Result<()> {
        self.ensure()?;

        if let Some(v) = handle {
            let params = self
                .buffers
                .get(v)
                .ok_or_else(|| Error::BufferHandleInvalid(v))?;

            if params.kind != kind {
                return Err(Error::InvalidOperation(format!(
                    "binding {} of {:?} kind to the {:?} slot",
                    v, params.kind, kind
                )));
            }
        }

        if self.bound_buffers[kind.index()].is(handle) {
            return Ok(());
        }

        self.detach_index_buffer(kind)?;
        unsafe { self.visitor.bind_buffer(kind, handle)? };
        self.bound_buffers[kind.index()] = Binding::Bound(handle);
        stat!(self.info, buffer_binds += 1);
        Ok(())
    }

    /// Deletes a buffer, deleting a dead handle does nothing.
    pub fn delete_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        if let Some(params) = self.buffers.free(handle) {
            let slot = &mut self.bound_buffers[params.kind.index()];
            if slot.is(Some(handle)) {
                *slot = Binding::Bound(None);
            }

            unsafe { self.visitor.delete_buffer(handle)? };
        }

        Ok(())
    }

    #[inline]
    pub fn buffer(&self, handle: BufferHandle) -> Option<BufferParams> {
        self.buffers.get(handle).cloned()
    }

    // The index buffer binding is part of the vertex array state, so index
    // buffer manipulations happen with no vertex array bound.
    fn detach_index_buffer(&mut self, kind: BufferKind) -> Result<()> {
        if kind == BufferKind::Index && !self.bound_vertex_array.is(None) {
            self.bind_vertex_array(None)?;
        }

        Ok(())
    }
}

impl GraphicsDevice {
    /// Associates `layout` with a vertex buffer and an optional index buffer.
    pub fn create_vertex_array(
        &mut self,
        layout: VertexLayout,
        vertex_buffer: BufferHandle,
        index_buffer: Option<BufferHandle>,
    ) -> Result<VertexArrayHandle> {
        self.ensure()?;

        self.expect_buffer(vertex_buffer, BufferKind::Vertex)?;
        if let Some(v) = index_buffer {
            self.expect_buffer(v, BufferKind::Index)?;
        }

        if layout.is_empty() {
            return Err(Error::InvalidOperation(
                "creating vertex array with an empty layout".to_owned(),
            ));
        }

        let params = VertexArrayParams {
            layout,
            vertex_buffer,
            index_buffer,
        };

        let handle = self.vertex_arrays.create(params);
        if let Err(err) = unsafe { self.visitor.create_vertex_array(handle, params) } {
            self.vertex_arrays.free(handle);
            return Err(err.into());
        }

        self.bound_vertex_array = Binding::Unknown;
        self.bound_buffers[BufferKind::Vertex.index()] = Binding::Unknown;
        self.bound_buffers[BufferKind::Index.index()] = Binding::Unknown;
        Ok(handle)
    }

    /// Binds a vertex array, `None` unbinds the current one.
    pub fn bind_vertex_array(&mut self, handle: Option<VertexArrayHandle>) -> Result<()> {
        self.ensure()?;

        let index_buffer = match handle {
            Some(v) => {
                self.vertex_arrays
                    .get(v)
                    .ok_or_else(|| Error::VertexArrayHandleInvalid(v))?
                    .index_buffer
            }
            None => None,
        };

        if self.bound_vertex_array.is(handle) {
            return Ok(());
        }

        unsafe { self.visitor.bind_vertex_array(handle)? };
        self.bound_vertex_array = Binding::Bound(handle);
        self.bound_buffers[BufferKind::Index.index()] = if handle.is_some() {
            Binding::Bound(index_buffer)
        } else {
            Binding::Unknown
        };

        Ok(())
    }

    pub fn delete_vertex_array(&mut self, handle: VertexArrayHandle) -> Result<()> {
        if self.vertex_arrays.free(handle).is_some() {
            if self.bound_vertex_array.is(Some(handle)) {
                self.bound_vertex_array = Binding::Bound(None);
                self.bound_buffers[BufferKind::Index.index()] = Binding::Unknown;
            }

            unsafe { self.visitor.delete_vertex_array(handle)? };
        }

        Ok(())
    }

    #[inline]
    pub fn vertex_array(&self, handle: VertexArrayHandle) -> Option<VertexArrayParams> {
        self.vertex_arrays.get(handle).cloned()
    }

    fn expect_buffer(&self, handle: BufferHandle, kind: BufferKind) -> Result<()> {
        let params = self
            .buffers
            .get(handle)
            .ok_or_else(|| Error::BufferHandleInvalid(handle))?;

        if params.kind != kind {
            return Err(Error::InvalidOperation(format!(
                "{} is a {:?} buffer, {:?} expected",
                handle, params.kind, kind
            )));
        }

        Ok(())
    }
}

impl GraphicsDevice {
    /// Creates a framebuffer out of texture attachments. Color attachments are
    /// numbered in the order they appear.
    pub fn create_framebuffer(&mut self, attachments: &[Attachment]) -> Result<FrameBufferHandle> {
        self.ensure()?;

        if attachments.is_empty() {
            return Err(Error::IncompleteFrameBuffer(
                "no images are attached".to_owned(),
            ));
        }

        let mut dimensions = None;
        let mut colors = 0;
        let mut depths = 0;

        for attachment in attachments {
            let texture = attachment.texture();
            let params = self
                .textures
                .get(texture)
                .ok_or_else(|| Error::TextureHandleInvalid(texture))?;

            if params.kind != TextureKind::Texture2D {
                return Err(Error::IncompleteFrameBuffer(format!(
                    "{} is not a 2D texture",
                    texture
                )));
            }

            if !params.is_allocated() {
                return Err(Error::IncompleteFrameBuffer(format!(
                    "{} has no storage",
                    texture
                )));
            }

            match *attachment {
                Attachment::Color(_) if !params.format.is_color() => {
                    return Err(Error::IncompleteFrameBuffer(format!(
                        "{} is attached as color with {:?} format",
                        texture, params.format
                    )));
                }
                Attachment::Depth(_) if !params.format.is_depth() => {
                    return Err(Error::IncompleteFrameBuffer(format!(
                        "{} is attached as depth with {:?} format",
                        texture, params.format
                    )));
                }
                Attachment::Color(_) => colors += 1,
                Attachment::Depth(_) => depths += 1,
            }

            let dims = (params.dimensions.0, params.dimensions.1);
            if dimensions.is_some() && dimensions != Some(dims) {
                return Err(Error::IncompleteFrameBuffer(format!(
                    "{} has mismatched dimensions {:?}",
                    texture, dims
                )));
            }

            dimensions = Some(dims);
        }

        if depths > 1 {
            return Err(Error::IncompleteFrameBuffer(
                "more than one depth attachment".to_owned(),
            ));
        }

        if colors > super::MAX_COLOR_ATTACHMENTS {
            return Err(Error::IncompleteFrameBuffer(format!(
                "{} color attachments exceed the limit of {}",
                colors,
                super::MAX_COLOR_ATTACHMENTS
            )));
        }

        let params = FrameBufferParams {
            attachments: attachments.iter().cloned().collect(),
            dimensions: dimensions.unwrap_or((0, 0)),
        };

        let handle = self.framebuffers.create(params.clone());
        if let Err(err) = unsafe { self.visitor.create_framebuffer(handle, &params) } {
            self.framebuffers.free(handle);
            return Err(err.into());
        }

        self.bound_read_framebuffer = Binding::Unknown;
        self.bound_draw_framebuffer = Binding::Unknown;
        Ok(handle)
    }

    /// Binds a framebuffer to `target`, `None` stands for the default framebuffer.
    pub fn bind_framebuffer(
        &mut self,
        handle: Option<FrameBufferHandle>,
        target: FrameBufferTarget,
    ) -> Result<()> {
        self.ensure()?;

        if let Some(v) = handle {
            if !self.framebuffers.contains(v) {
                return Err(Error::FrameBufferHandleInvalid(v));
            }
        }

        let skip = match target {
            FrameBufferTarget::Read => self.bound_read_framebuffer.is(handle),
            FrameBufferTarget::Draw => self.bound_draw_framebuffer.is(handle),
            FrameBufferTarget::Framebuffer => {
                self.bound_read_framebuffer.is(handle) && self.bound_draw_framebuffer.is(handle)
            }
        };

        if skip {
            return Ok(());
        }

        unsafe { self.visitor.bind_framebuffer(target, handle)? };

        match target {
            FrameBufferTarget::Read => self.bound_read_framebuffer = Binding::Bound(handle),
            FrameBufferTarget::Draw => self.bound_draw_framebuffer = Binding::Bound(handle),
            FrameBufferTarget::Framebuffer => {
                self.bound_read_framebuffer = Binding::Bound(handle);
                self.bound_draw_framebuffer = Binding::Bound(handle);
            }
        }

        Ok(())
    }

    /// Binds the default framebuffer for both reading and drawing.
    pub fn unbind_framebuffer(&mut self) -> Result<()> {
        self.bind_framebuffer(None, FrameBufferTarget::Framebuffer)
    }

    /// Copies (and rescales) a block of pixels from the bound read framebuffer
    /// into the bound draw framebuffer.
    pub fn blit_framebuffer(
        &mut self,
        src: Rect,
        dst: Rect,
        flags: ClearFlags,
        filter: BlitFilter,
    ) -> Result<()> {
        self.ensure()?;

        if flags.is_empty() {
            return Ok(());
        }

        let depth_or_stencil =
            flags.contains(ClearFlags::DEPTH) || flags.contains(ClearFlags::STENCIL);
        if depth_or_stencil && filter == BlitFilter::Linear {
            return Err(Error::InvalidOperation(
                "depth and stencil blits must use the nearest filter".to_owned(),
            ));
        }

        if self.bound_read_framebuffer == Binding::Unknown
            || self.bound_draw_framebuffer == Binding::Unknown
        {
            return Err(Error::InvalidOperation(
                "blitting without explicit framebuffer bindings".to_owned(),
            ));
        }

        unsafe { self.visitor.blit_framebuffer(src, dst, flags, filter)? };
        Ok(())
    }

    /// Reads a block of pixels from the `attachment`th color attachment of the
    /// bound read framebuffer. This stalls until the GPU catches up.
    pub fn read_pixels(
        &mut self,
        attachment: usize,
        rect: Rect,
        format: TextureFormat,
    ) -> Result<Vec<u8>> {
        self.ensure()?;

        let fb = match self.bound_read_framebuffer {
            Binding::Unknown => {
                return Err(Error::InvalidOperation(
                    "reading pixels without an explicit read framebuffer".to_owned(),
                ));
            }
            Binding::Bound(v) => v,
        };

        if rect.min.x < 0 || rect.min.y < 0 || rect.width() <= 0 || rect.height() <= 0 {
            return Err(Error::OutOfBounds(format!("reading pixels of {:?}", rect)));
        }

        if let Some(fb) = fb {
            let params = self
                .framebuffers
                .get(fb)
                .ok_or_else(|| Error::FrameBufferHandleInvalid(fb))?;

            let texture = params.color(attachment).ok_or_else(|| {
                Error::OutOfBounds(format!("color attachment {} of {}", attachment, fb))
            })?;

            let tparams = self
                .textures
                .get(texture)
                .ok_or_else(|| Error::TextureHandleInvalid(texture))?;

            if tparams.format != format {
                return Err(Error::InvalidOperation(format!(
                    "reading {:?} pixels from a {:?} attachment",
                    format, tparams.format
                )));
            }

            let (w, h) = params.dimensions;
            if rect.max.x as u32 > w || rect.max.y as u32 > h {
                return Err(Error::OutOfBounds(format!(
                    "reading pixels of {:?} from {} with dimensions {:?}",
                    rect, fb, params.dimensions
                )));
            }
        } else if attachment > 0 {
            return Err(Error::OutOfBounds(format!(
                "color attachment {} of the default framebuffer",
                attachment
            )));
        }

        let len = rect.width() as usize * rect.height() as usize * format.size() as usize;
        let mut out = vec![0; len];
        unsafe { self.visitor.read_pixels(attachment, rect, format, &mut out)? };
        Ok(out)
    }

    /// Reads back a single texel as `T`, whose size must match the size of `format`.
    pub fn read_pixel<T: Pod>(
        &mut self,
        attachment: usize,
        x: i32,
        y: i32,
        format: TextureFormat,
    ) -> Result<T> {
        if ::std::mem::size_of::<T>() != format.size() as usize {
            return Err(Error::InvalidOperation(format!(
                "reading a {} bytes value out of a {:?} texel",
                ::std::mem::size_of::<T>(),
                format
            )));
        }

        let rect = match (x.checked_add(1), y.checked_add(1)) {
            (Some(mx), Some(my)) => Rect::new(Point2::new(x, y), Point2::new(mx, my)),
            _ => return Err(Error::OutOfBounds(format!("reading pixel ({}, {})", x, y))),
        };

        let bytes = self.read_pixels(attachment, rect, format)?;
        pod::from_bytes(&bytes)
            .ok_or_else(|| Error::InvalidOperation("malformed texel".to_owned()))
    }

    pub fn delete_framebuffer(&mut self, handle: FrameBufferHandle) -> Result<()> {
        if self.framebuffers.free(handle).is_some() {
            if self.bound_read_framebuffer.is(Some(handle)) {
                self.bound_read_framebuffer = Binding::Bound(None);
            }

            if self.bound_draw_framebuffer.is(Some(handle)) {
                self.bound_draw_framebuffer = Binding::Bound(None);
            }

            unsafe { self.visitor.delete_framebuffer(handle)? };
        }

        Ok(())
    }

    #[inline]
    pub fn framebuffer(&self, handle: FrameBufferHandle) -> Option<&FrameBufferParams> {
        self.framebuffers.get(handle)
    }
}

impl GraphicsDevice {
    /// Compiles and links a program from its stage sources. Nothing survives a
    /// failure, the error carries the stage and the native info log.
    pub fn compile_program(&mut self, sources: &[ShaderSourceDescriptor]) -> Result<ProgramHandle> {
        self.ensure()?;

        let handle = self.programs.create(ProgramData::default());
        if let Err(err) = unsafe { self.visitor.compile_program(handle, sources) } {
            self.programs.free(handle);
            return Err(err.into());
        }

        stat!(self.info, programs_compiled += 1);
        Ok(handle)
    }

    pub fn bind_program(&mut self, handle: Option<ProgramHandle>) -> Result<()> {
        self.ensure()?;

        if let Some(v) = handle {
            if !self.programs.contains(v) {
                return Err(Error::ProgramHandleInvalid(v));
            }
        }

        if self.bound_program.is(handle) {
            return Ok(());
        }

        unsafe { self.visitor.bind_program(handle)? };
        self.bound_program = Binding::Bound(handle);
        stat!(self.info, program_binds += 1);
        Ok(())
    }

    /// Returns the bound program.
    #[inline]
    pub fn program(&self) -> Option<ProgramHandle> {
        self.bound_program.current()
    }

    /// Returns the location of a uniform, or -1 if the program does not use it.
    pub fn get_uniform_location(&mut self, handle: ProgramHandle, name: &str) -> Result<UniformLocation> {
        self.ensure()?;

        let hash = HashValue::from(name);
        let cached = self
            .programs
            .get(handle)
            .ok_or_else(|| Error::ProgramHandleInvalid(handle))?
            .uniforms
            .get(&hash)
            .cloned();

        if let Some(location) = cached {
            return Ok(location);
        }

        let location = unsafe { self.visitor.uniform_location(handle, name)? };
        if let Some(v) = self.programs.get_mut(handle) {
            v.uniforms.insert(hash, location);
        }

        Ok(location)
    }

    /// Returns the location of a vertex attribute, or -1 if the program does not use it.
    pub fn get_attrib_location(&mut self, handle: ProgramHandle, name: &str) -> Result<i32> {
        self.ensure()?;

        let hash = HashValue::from(name);
        let cached = self
            .programs
            .get(handle)
            .ok_or_else(|| Error::ProgramHandleInvalid(handle))?
            .attributes
            .get(&hash)
            .cloned();

        if let Some(location) = cached {
            return Ok(location);
        }

        let location = unsafe { self.visitor.attrib_location(handle, name)? };
        if let Some(v) = self.programs.get_mut(handle) {
            v.attributes.insert(hash, location);
        }

        Ok(location)
    }

    /// Writes a uniform of the bound program by name. Names the program does
    /// not use are ignored.
    pub fn set_uniform<T: Into<UniformVariable>>(&mut self, name: &str, variable: T) -> Result<()> {
        let program = self.program().ok_or(Error::NoProgramBound)?;
        let location = self.get_uniform_location(program, name)?;
        self.set_uniform_at(location, variable)
    }

    /// Writes a uniform of the bound program at a resolved location.
    pub fn set_uniform_at<T: Into<UniformVariable>>(
        &mut self,
        location: UniformLocation,
        variable: T,
    ) -> Result<()> {
        self.ensure()?;

        if self.program().is_none() {
            return Err(Error::NoProgramBound);
        }

        if location < 0 {
            return Ok(());
        }

        unsafe { self.visitor.set_uniform(location, &variable.into())? };
        stat!(self.info, uniform_writes += 1);
        Ok(())
    }

    /// Binds `texture` to the sampler `slot` and points the sampler uniform `name` at it.
    pub fn set_uniform_texture(
        &mut self,
        name: &str,
        slot: usize,
        texture: TextureHandle,
    ) -> Result<()> {
        self.check_texture_slot(slot)?;

        if !self.textures.contains(texture) {
            return Err(Error::TextureHandleInvalid(texture));
        }

        self.bind_texture(slot, Some(texture))?;
        self.set_uniform(name, slot as i32)
    }

    /// Unbinds the texture of sampler `slot`, leaving the sampler uniform `name` empty.
    pub fn clear_uniform_texture(&mut self, name: &str, slot: usize) -> Result<()> {
        self.check_texture_slot(slot)?;
        self.bind_texture(slot, None)?;
        self.set_uniform(name, slot as i32)
    }

    fn check_texture_slot(&self, slot: usize) -> Result<()> {
        if slot >= self.params.max_texture_slots {
            return Err(Error::TextureSlotOutOfRange {
                slot,
                max: self.params.max_texture_slots,
            });
        }

        if slot == 0 {
            return Err(Error::InvalidOperation(
                "texture slot 0 is reserved for texture manipulations".to_owned(),
            ));
        }

        Ok(())
    }

    fn bind_texture(&mut self, slot: usize, texture: Option<TextureHandle>) -> Result<()> {
        self.ensure()?;

        if self.bound_textures[slot].is(texture) {
            return Ok(());
        }

        unsafe { self.visitor.bind_texture(slot, texture)? };
        self.bound_textures[slot] = Binding::Bound(texture);
        stat!(self.info, texture_binds += 1);
        Ok(())
    }

    pub fn delete_program(&mut self, handle: ProgramHandle) -> Result<()> {
        if self.programs.free(handle).is_some() {
            if self.bound_program.is(Some(handle)) {
                self.bound_program = Binding::Bound(None);
            }

            unsafe { self.visitor.delete_program(handle)? };
        }

        Ok(())
    }

    #[inline]
    pub fn is_program_alive(&self, handle: ProgramHandle) -> bool {
        self.programs.contains(handle)
    }
}

impl GraphicsDevice {
    /// Creates a texture object without storage. Storage is established by the
    /// first level 0 `tex_image`.
    pub fn create_texture(&mut self, kind: TextureKind, format: TextureFormat) -> Result<TextureHandle> {
        self.ensure()?;

        let params = TextureParams::new(kind, format);
        let handle = self.textures.create(params);
        if let Err(err) = unsafe { self.visitor.create_texture(handle, params) } {
            self.textures.free(handle);
            return Err(err.into());
        }

        self.manipulated();
        Ok(handle)
    }

    /// Specifies the image of a mip level. A level 0 image (re)defines the
    /// storage of the texture with a complete mip chain, images of other levels
    /// must match the dimensions of that chain. `None` leaves the level content
    /// undefined.
    pub fn tex_image(
        &mut self,
        handle: TextureHandle,
        face: Option<CubemapFace>,
        level: u32,
        dimensions: (u32, u32, u32),
        data: Option<&[u8]>,
    ) -> Result<()> {
        self.ensure()?;

        let mut params = self.texture_params(handle)?;
        check_face(handle, params.kind, face)?;

        let (w, h, d) = dimensions;
        if w == 0 || h == 0 || d == 0 {
            return Err(Error::OutOfBounds(format!(
                "empty image {:?} for {}",
                dimensions, handle
            )));
        }

        if level == 0 {
            match params.kind {
                TextureKind::Texture2D | TextureKind::Cubemap if d != 1 => {
                    return Err(Error::OutOfBounds(format!(
                        "{} can not have a depth of {}",
                        handle, d
                    )));
                }
                TextureKind::CubemapArray if d % 6 != 0 => {
                    return Err(Error::OutOfBounds(format!(
                        "{} needs a multiple of 6 layer-faces, got {}",
                        handle, d
                    )));
                }
                _ => {}
            }

            if params.kind.is_cubemap() && w != h {
                return Err(Error::OutOfBounds(format!(
                    "{} needs square faces, got {}x{}",
                    handle, w, h
                )));
            }

            let depth = if params.kind.is_volume() { d } else { 1 };
            params.dimensions = dimensions;
            params.levels = mip_levels(w, h, depth);
        } else {
            check_level(handle, &params, level)?;
            if params.level_dimensions(level) != dimensions {
                return Err(Error::OutOfBounds(format!(
                    "level {} of {} is {:?}, got {:?}",
                    level,
                    handle,
                    params.level_dimensions(level),
                    dimensions
                )));
            }
        }

        if let Some(bytes) = data {
            let len = params.region_len(w, h, d);
            if bytes.len() != len {
                return Err(Error::OutOfBounds(format!(
                    "{} bytes for a {} bytes image of {}",
                    bytes.len(),
                    len,
                    handle
                )));
            }
        }

        let result = unsafe { self.visitor.tex_image(handle, params, face, level, data) };
        self.manipulated();
        result?;

        if let Some(v) = self.textures.get_mut(handle) {
            *v = params;
        }

        Ok(())
    }

    /// Updates a region of an existing mip level image.
    pub fn tex_sub_image(
        &mut self,
        handle: TextureHandle,
        face: Option<CubemapFace>,
        level: u32,
        offset: (u32, u32, u32),
        size: (u32, u32, u32),
        data: &[u8],
    ) -> Result<()> {
        self.ensure()?;

        let params = self.texture_params(handle)?;
        check_face(handle, params.kind, face)?;
        check_level(handle, &params, level)?;

        let (lw, lh, ld) = params.level_dimensions(level);
        let exceeds = |offset: u32, size: u32, max: u32| {
            offset.checked_add(size).map_or(true, |end| end > max)
        };

        if exceeds(offset.0, size.0, lw)
            || exceeds(offset.1, size.1, lh)
            || exceeds(offset.2, size.2, ld)
        {
            return Err(Error::OutOfBounds(format!(
                "region {:?}+{:?} of level {} of {} with dimensions {:?}",
                offset,
                size,
                level,
                handle,
                (lw, lh, ld)
            )));
        }

        let len = params.region_len(size.0, size.1, size.2);
        if data.len() != len {
            return Err(Error::OutOfBounds(format!(
                "{} bytes for a {} bytes region of {}",
                data.len(),
                len,
                handle
            )));
        }

        if len == 0 {
            return Ok(());
        }

        let result = unsafe {
            self.visitor
                .tex_sub_image(handle, params, face, level, offset, size, data)
        };

        self.manipulated();
        result?;
        Ok(())
    }

    /// Reads back the image of a mip level.
    pub fn get_tex_image(
        &mut self,
        handle: TextureHandle,
        face: Option<CubemapFace>,
        level: u32,
    ) -> Result<Vec<u8>> {
        self.ensure()?;

        let params = self.texture_params(handle)?;
        check_face(handle, params.kind, face)?;
        check_level(handle, &params, level)?;

        let (w, h, d) = params.level_dimensions(level);
        let mut out = vec![0; params.region_len(w, h, d)];

        let result = unsafe { self.visitor.get_tex_image(handle, params, face, level, &mut out) };
        self.manipulated();
        result?;
        Ok(out)
    }

    pub fn set_texture_wrap(
        &mut self,
        handle: TextureHandle,
        axis: TextureAxis,
        wrap: TextureWrap,
    ) -> Result<()> {
        self.ensure()?;
        self.texture_params(handle)?;

        let result = unsafe { self.visitor.set_texture_wrap(handle, axis, wrap) };
        self.manipulated();
        result?;
        Ok(())
    }

    pub fn set_texture_filter(
        &mut self,
        handle: TextureHandle,
        min: TextureFilter,
        mag: TextureFilter,
    ) -> Result<()> {
        self.ensure()?;
        self.texture_params(handle)?;

        if mag.uses_mipmaps() {
            return Err(Error::InvalidOperation(format!(
                "{:?} is not a magnification filter",
                mag
            )));
        }

        let result = unsafe { self.visitor.set_texture_filter(handle, min, mag) };
        self.manipulated();
        result?;
        Ok(())
    }

    /// Fills the mip chain out of the level 0 image.
    pub fn generate_mipmap(&mut self, handle: TextureHandle) -> Result<()> {
        self.ensure()?;

        let params = self.texture_params(handle)?;
        if !params.is_allocated() {
            return Err(Error::InvalidOperation(format!("{} has no storage", handle)));
        }

        let result = unsafe { self.visitor.generate_mipmap(handle, params) };
        self.manipulated();
        result?;
        Ok(())
    }

    pub fn delete_texture(&mut self, handle: TextureHandle) -> Result<()> {
        if self.textures.free(handle).is_some() {
            for v in self.bound_textures.iter_mut() {
                if v.is(Some(handle)) {
                    *v = Binding::Bound(None);
                }
            }

            unsafe { self.visitor.delete_texture(handle)? };
        }

        Ok(())
    }

    #[inline]
    pub fn texture(&self, handle: TextureHandle) -> Option<TextureParams> {
        self.textures.get(handle).cloned()
    }

    #[inline]
    pub fn is_texture_alive(&self, handle: TextureHandle) -> bool {
        self.textures.contains(handle)
    }

    fn texture_params(&self, handle: TextureHandle) -> Result<TextureParams> {
        self.textures
            .get(handle)
            .cloned()
            .ok_or_else(|| Error::TextureHandleInvalid(handle))
    }

    // Texture manipulations go through slot 0.
    fn manipulated(&mut self) {
        self.bound_textures[0] = Binding::Unknown;
    }
}

fn check_face(handle: TextureHandle, kind: TextureKind, face: Option<CubemapFace>) -> Result<()> {
    match (kind == TextureKind::Cubemap, face) {
        (true, None) => Err(Error::InvalidOperation(format!(
            "{} is a cubemap, a face is required",
            handle
        ))),
        (false, Some(v)) => Err(Error::InvalidOperation(format!(
            "{} is not a cubemap, but face {:?} is given",
            handle, v
        ))),
        _ => Ok(()),
    }
}

fn check_level(handle: TextureHandle, params: &TextureParams, level: u32) -> Result<()> {
    if !params.is_allocated() {
        return Err(Error::InvalidOperation(format!("{} has no storage", handle)));
    }

    if level >= params.levels {
        return Err(Error::OutOfBounds(format!(
            "mip level {} of {} with {} levels",
            level, handle, params.levels
        )));
    }

    Ok(())
}

impl GraphicsDevice {
    /// Draws `count` vertices starting at `first` with the bound program and vertex array.
    pub fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) -> Result<()> {
        self.ensure_drawable()?;

        unsafe { self.visitor.draw_arrays(topology, first, count)? };
        stat!(self.info, draw_calls += 1);
        stat!(self.info, triangles += topology.triangles(count));
        Ok(())
    }

    /// Draws `count` indices starting at index `first` of the index buffer of
    /// the bound vertex array. `base_vertex` is added to every index.
    pub fn draw_elements(
        &mut self,
        topology: Topology,
        first: u32,
        count: u32,
        format: IndexFormat,
        base_vertex: Option<i32>,
    ) -> Result<()> {
        let vao = self.ensure_drawable()?;

        let index_buffer = self
            .vertex_arrays
            .get(vao)
            .and_then(|v| v.index_buffer)
            .ok_or_else(|| {
                Error::InvalidOperation(format!("{} has no index buffer", vao))
            })?;

        if let Some(params) = self.buffers.get(index_buffer) {
            let end = (first as usize + count as usize) * format.stride();
            if end > params.size {
                return Err(Error::OutOfBounds(format!(
                    "drawing {} indices from {} of {}",
                    count, first, index_buffer
                )));
            }
        }

        unsafe {
            self.visitor
                .draw_elements(topology, first, count, format, base_vertex)?
        };

        stat!(self.info, draw_calls += 1);
        stat!(self.info, triangles += topology.triangles(count));
        Ok(())
    }

    fn ensure_drawable(&self) -> Result<VertexArrayHandle> {
        self.ensure()?;

        match self.bound_program {
            Binding::Bound(Some(_)) => {}
            _ => return Err(Error::NoProgramBound),
        }

        match self.bound_vertex_array {
            Binding::Bound(Some(v)) => Ok(v),
            _ => Err(Error::NoVertexArrayBound),
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::backends::headless::{HeadlessVisitor, NativeCall};
    use super::*;

    fn device() -> (GraphicsDevice, super::super::backends::headless::CallLog) {
        let visitor = HeadlessVisitor::new();
        let log = visitor.log();
        let mut device = GraphicsDevice::new(Box::new(visitor), GraphicsParams::default()).unwrap();
        device.initialize().unwrap();
        log.clear();
        (device, log)
    }

    #[test]
    fn lifecycle() {
        let visitor = HeadlessVisitor::new();
        let mut device = GraphicsDevice::new(Box::new(visitor), GraphicsParams::default()).unwrap();

        match device.create_texture(TextureKind::Texture2D, TextureFormat::RGBA8) {
            Err(Error::NotInitialized) => {}
            other => panic!("unexpected {:?}", other),
        }

        device.initialize().unwrap();
        match device.initialize() {
            Err(Error::AlreadyInitialized) => {}
            other => panic!("unexpected {:?}", other),
        }

        device.shutdown().unwrap();
        assert!(!device.is_initialized());
    }

    #[test]
    fn binding_cache() {
        let (mut device, log) = device();

        let vbo = device
            .allocate_buffer(BufferKind::Vertex, 64, false)
            .unwrap();

        // Creation leaves the buffer bound.
        device.bind_buffer(BufferKind::Vertex, Some(vbo)).unwrap();
        assert_eq!(log.count(|v| v == &NativeCall::BindBuffer(BufferKind::Vertex, Some(vbo))), 0);

        device.bind_buffer(BufferKind::Vertex, None).unwrap();
        device.bind_buffer(BufferKind::Vertex, None).unwrap();
        assert_eq!(log.count(|v| v == &NativeCall::BindBuffer(BufferKind::Vertex, None)), 1);

        assert!(device.bind_buffer(BufferKind::Index, Some(vbo)).is_err());
    }

    #[test]
    fn clear_depth_restores_write() {
        let (mut device, log) = device();

        device.set_enable_depth_write(false, false).unwrap();
        log.clear();

        device.clear(Color::black(), ClearFlags::COLOR | ClearFlags::DEPTH).unwrap();
        assert_eq!(
            log.calls(),
            vec![
                NativeCall::SetDepthWrite(true),
                NativeCall::Clear(ClearFlags::COLOR | ClearFlags::DEPTH),
                NativeCall::SetDepthWrite(false),
            ]
        );

        assert!(!device.get_state().depth_write);
    }
}
