use std::ffi::CString;
use std::os::raw::c_void;
use std::ptr;

use gl;
use gl::types::*;

use crate::errors::*;
use crate::math::{Color, Rect};
use crate::utils::hash::FastHashMap;

use super::super::super::assets::prelude::*;
use super::super::super::errors::Error;
use super::super::utils::DataVec;
use super::super::Visitor;
use super::types;

#[derive(Debug, Copy, Clone)]
struct GLBufferData {
    id: GLuint,
    params: BufferParams,
}

#[derive(Debug, Copy, Clone)]
struct GLTextureData {
    id: GLuint,
    target: GLenum,
    format: TextureFormat,
}

#[derive(Debug, Clone)]
struct GLProgramData {
    id: GLuint,
}

pub struct GLVisitor {
    buffers: DataVec<GLBufferData>,
    vertex_arrays: DataVec<GLuint>,
    framebuffers: DataVec<GLuint>,
    programs: DataVec<GLProgramData>,
    textures: DataVec<GLTextureData>,
    // The texture unit selected by `glActiveTexture`.
    active_slot: usize,
    // The target each sampler slot has a texture bound to.
    slot_targets: FastHashMap<usize, GLenum>,
    // Whether the default framebuffer is bound for reading.
    reading_default: bool,
}

impl GLVisitor {
    /// Creates a visitor on the current GL context. Function pointers must
    /// have been loaded already.
    pub unsafe fn new() -> Result<Self> {
        let visitor = GLVisitor {
            buffers: DataVec::new(),
            vertex_arrays: DataVec::new(),
            framebuffers: DataVec::new(),
            programs: DataVec::new(),
            textures: DataVec::new(),
            active_slot: 0,
            slot_targets: FastHashMap::default(),
            reading_default: true,
        };

        info!("GLVisitor {}", context_version());
        Ok(visitor)
    }

    fn buffer(&self, handle: BufferHandle) -> Result<GLBufferData> {
        self.buffers
            .get(handle)
            .cloned()
            .ok_or_else(|| Error::BufferHandleInvalid(handle).into())
    }

    fn texture(&self, handle: TextureHandle) -> Result<GLTextureData> {
        self.textures
            .get(handle)
            .cloned()
            .ok_or_else(|| Error::TextureHandleInvalid(handle).into())
    }

    fn program(&self, handle: ProgramHandle) -> Result<GLuint> {
        self.programs
            .get(handle)
            .map(|v| v.id)
            .ok_or_else(|| Error::ProgramHandleInvalid(handle).into())
    }

    unsafe fn active_slot(&mut self, slot: usize) {
        if self.active_slot != slot {
            gl::ActiveTexture(gl::TEXTURE0 + slot as GLuint);
            self.active_slot = slot;
        }
    }

    /// Binds `texture` to the reserved manipulation slot.
    unsafe fn bind_for_update(&mut self, texture: GLTextureData) -> Result<()> {
        self.active_slot(0);
        gl::BindTexture(texture.target, texture.id);
        self.slot_targets.insert(0, texture.target);
        check()
    }

    unsafe fn enable(cap: GLenum, enable: bool) -> Result<()> {
        if enable {
            gl::Enable(cap);
        } else {
            gl::Disable(cap);
        }

        check()
    }
}

impl Visitor for GLVisitor {
    unsafe fn initialize(&mut self) -> Result<()> {
        gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1);
        gl::PixelStorei(gl::PACK_ALIGNMENT, 1);
        gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
        gl::ActiveTexture(gl::TEXTURE0);
        self.active_slot = 0;
        self.reading_default = true;
        check()
    }

    unsafe fn shutdown(&mut self) -> Result<()> {
        gl::BindVertexArray(0);
        gl::UseProgram(0);
        gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
        self.reading_default = true;
        self.slot_targets.clear();
        gl::Finish();
        check()
    }

    unsafe fn set_depth_test(&mut self, enable: bool) -> Result<()> {
        Self::enable(gl::DEPTH_TEST, enable)
    }

    unsafe fn set_depth_write(&mut self, enable: bool) -> Result<()> {
        gl::DepthMask(if enable { gl::TRUE } else { gl::FALSE });
        check()
    }

    unsafe fn set_depth_func(&mut self, comparison: Comparison) -> Result<()> {
        gl::DepthFunc(comparison.into());
        check()
    }

    unsafe fn set_blend(&mut self, enable: bool) -> Result<()> {
        Self::enable(gl::BLEND, enable)
    }

    unsafe fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) -> Result<()> {
        gl::BlendFunc(src.into(), dst.into());
        check()
    }

    unsafe fn set_blend_equation(&mut self, equation: Equation) -> Result<()> {
        gl::BlendEquation(equation.into());
        check()
    }

    unsafe fn set_cull(&mut self, enable: bool) -> Result<()> {
        Self::enable(gl::CULL_FACE, enable)
    }

    unsafe fn set_cull_face(&mut self, face: CullFace) -> Result<()> {
        gl::CullFace(face.into());
        check()
    }

    unsafe fn set_front_face(&mut self, order: FrontFaceOrder) -> Result<()> {
        gl::FrontFace(order.into());
        check()
    }

    unsafe fn set_scissor_test(&mut self, enable: bool) -> Result<()> {
        Self::enable(gl::SCISSOR_TEST, enable)
    }

    unsafe fn set_scissor_rect(&mut self, rect: Rect) -> Result<()> {
        gl::Scissor(rect.min.x, rect.min.y, rect.width(), rect.height());
        check()
    }

    unsafe fn set_viewport(&mut self, rect: Rect) -> Result<()> {
        gl::Viewport(rect.min.x, rect.min.y, rect.width(), rect.height());
        check()
    }

    unsafe fn clear(
        &mut self,
        color: Color,
        depth: f32,
        stencil: i32,
        flags: ClearFlags,
    ) -> Result<()> {
        if flags.contains(ClearFlags::COLOR) {
            gl::ClearColor(color.r, color.g, color.b, color.a);
        }

        if flags.contains(ClearFlags::DEPTH) {
            gl::ClearDepth(f64::from(depth));
        }

        if flags.contains(ClearFlags::STENCIL) {
            gl::ClearStencil(stencil);
        }

        let bits = types::clear_bits(flags);
        if bits != 0 {
            gl::Clear(bits);
        }

        check()
    }

    unsafe fn create_buffer(
        &mut self,
        handle: BufferHandle,
        params: BufferParams,
        data: Option<&[u8]>,
    ) -> Result<()> {
        let mut id = 0;
        gl::GenBuffers(1, &mut id);
        if id == 0 {
            bail!("[GL] Failed to generate buffer object.");
        }

        let target: GLenum = params.kind.into();
        gl::BindBuffer(target, id);
        gl::BufferData(
            target,
            params.size as isize,
            data.map(as_ptr).unwrap_or_else(ptr::null),
            params.hint.into(),
        );

        check()?;
        self.buffers.create(handle, GLBufferData { id, params });
        Ok(())
    }

    unsafe fn set_buffer(
        &mut self,
        handle: BufferHandle,
        params: BufferParams,
        data: &[u8],
    ) -> Result<()> {
        let mut buffer = self.buffer(handle)?;
        let target: GLenum = params.kind.into();

        gl::BindBuffer(target, buffer.id);
        gl::BufferData(target, data.len() as isize, as_ptr(data), params.hint.into());
        check()?;

        buffer.params = params;
        self.buffers.create(handle, buffer);
        Ok(())
    }

    unsafe fn update_buffer(
        &mut self,
        handle: BufferHandle,
        offset: usize,
        data: &[u8],
    ) -> Result<()> {
        let buffer = self.buffer(handle)?;
        let target: GLenum = buffer.params.kind.into();

        gl::BindBuffer(target, buffer.id);
        gl::BufferSubData(target, offset as isize, data.len() as isize, as_ptr(data));
        check()
    }

    unsafe fn bind_buffer(&mut self, kind: BufferKind, handle: Option<BufferHandle>) -> Result<()> {
        let id = match handle {
            Some(v) => self.buffer(v)?.id,
            None => 0,
        };

        gl::BindBuffer(kind.into(), id);
        check()
    }

    unsafe fn delete_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        let buffer = self
            .buffers
            .free(handle)
            .ok_or_else(|| Error::BufferHandleInvalid(handle))?;

        gl::DeleteBuffers(1, &buffer.id);
        check()
    }

    unsafe fn create_vertex_array(
        &mut self,
        handle: VertexArrayHandle,
        params: VertexArrayParams,
    ) -> Result<()> {
        let vbo = self.buffer(params.vertex_buffer)?;
        let ibo = match params.index_buffer {
            Some(v) => Some(self.buffer(v)?),
            None => None,
        };

        let mut vao = 0;
        gl::GenVertexArrays(1, &mut vao);
        if vao == 0 {
            bail!("[GL] Failed to generate vertex array object.");
        }

        gl::BindVertexArray(vao);
        gl::BindBuffer(gl::ARRAY_BUFFER, vbo.id);

        let stride = GLsizei::from(params.layout.stride());
        for (element, offset) in params.layout.iter() {
            let location = element.name.location();
            gl::EnableVertexAttribArray(location);
            gl::VertexAttribPointer(
                location,
                GLint::from(element.size),
                element.format.into(),
                element.normalized as GLboolean,
                stride,
                offset as usize as *const c_void,
            );
        }

        if let Some(ibo) = ibo {
            gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, ibo.id);
        }

        gl::BindVertexArray(0);
        check()?;

        self.vertex_arrays.create(handle, vao);
        Ok(())
    }

    unsafe fn bind_vertex_array(&mut self, handle: Option<VertexArrayHandle>) -> Result<()> {
        let id = match handle {
            Some(v) => *self
                .vertex_arrays
                .get(v)
                .ok_or_else(|| Error::VertexArrayHandleInvalid(v))?,
            None => 0,
        };

        gl::BindVertexArray(id);
        check()
    }

    unsafe fn delete_vertex_array(&mut self, handle: VertexArrayHandle) -> Result<()> {
        let vao = self
            .vertex_arrays
            .free(handle)
            .ok_or_else(|| Error::VertexArrayHandleInvalid(handle))?;

        gl::DeleteVertexArrays(1, &vao);
        check()
    }

    unsafe fn create_framebuffer(
        &mut self,
        handle: FrameBufferHandle,
        params: &FrameBufferParams,
    ) -> Result<()> {
        let mut id = 0;
        gl::GenFramebuffers(1, &mut id);
        if id == 0 {
            bail!("[GL] Failed to generate framebuffer object.");
        }

        gl::BindFramebuffer(gl::FRAMEBUFFER, id);

        let mut colors = 0;
        let mut draw_buffers = Vec::new();
        for attachment in &params.attachments {
            let texture = self.texture(attachment.texture())?;
            let point = match *attachment {
                Attachment::Color(_) => {
                    let point = gl::COLOR_ATTACHMENT0 + colors;
                    draw_buffers.push(point);
                    colors += 1;
                    point
                }
                Attachment::Depth(_) => {
                    if texture.format == TextureFormat::Depth24Stencil8 {
                        gl::DEPTH_STENCIL_ATTACHMENT
                    } else {
                        gl::DEPTH_ATTACHMENT
                    }
                }
            };

            gl::FramebufferTexture(gl::FRAMEBUFFER, point, texture.id, 0);
        }

        if draw_buffers.is_empty() {
            gl::DrawBuffer(gl::NONE);
            gl::ReadBuffer(gl::NONE);
        } else {
            gl::DrawBuffers(draw_buffers.len() as GLsizei, draw_buffers.as_ptr());
        }

        let status = gl::CheckFramebufferStatus(gl::FRAMEBUFFER);
        gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
        self.reading_default = true;

        if status != gl::FRAMEBUFFER_COMPLETE {
            gl::DeleteFramebuffers(1, &id);

            let reason = match status {
                gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => {
                    "not all attachment points are framebuffer attachment complete"
                }
                gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
                    "no images are attached to the framebuffer"
                }
                gl::FRAMEBUFFER_UNSUPPORTED => {
                    "the combination of internal formats of the attached images is unsupported"
                }
                _ => "unknown status",
            };

            return Err(Error::IncompleteFrameBuffer(reason.to_owned()).into());
        }

        check()?;
        self.framebuffers.create(handle, id);
        Ok(())
    }

    unsafe fn bind_framebuffer(
        &mut self,
        target: FrameBufferTarget,
        handle: Option<FrameBufferHandle>,
    ) -> Result<()> {
        let id = match handle {
            Some(v) => *self
                .framebuffers
                .get(v)
                .ok_or_else(|| Error::FrameBufferHandleInvalid(v))?,
            None => 0,
        };

        let target = match target {
            FrameBufferTarget::Read => gl::READ_FRAMEBUFFER,
            FrameBufferTarget::Draw => gl::DRAW_FRAMEBUFFER,
            FrameBufferTarget::Framebuffer => gl::FRAMEBUFFER,
        };

        gl::BindFramebuffer(target, id);
        if target != gl::DRAW_FRAMEBUFFER {
            self.reading_default = id == 0;
        }

        check()
    }

    unsafe fn blit_framebuffer(
        &mut self,
        src: Rect,
        dst: Rect,
        flags: ClearFlags,
        filter: BlitFilter,
    ) -> Result<()> {
        let filter = match filter {
            BlitFilter::Nearest => gl::NEAREST,
            BlitFilter::Linear => gl::LINEAR,
        };

        gl::BlitFramebuffer(
            src.min.x,
            src.min.y,
            src.max.x,
            src.max.y,
            dst.min.x,
            dst.min.y,
            dst.max.x,
            dst.max.y,
            types::clear_bits(flags),
            filter,
        );

        check()
    }

    unsafe fn read_pixels(
        &mut self,
        attachment: usize,
        rect: Rect,
        format: TextureFormat,
        out: &mut [u8],
    ) -> Result<()> {
        let (_, format, pixel_type) = types::texture_format(format);

        if self.reading_default {
            gl::ReadBuffer(gl::BACK);
        } else {
            gl::ReadBuffer(gl::COLOR_ATTACHMENT0 + attachment as GLuint);
        }

        gl::ReadPixels(
            rect.min.x,
            rect.min.y,
            rect.width(),
            rect.height(),
            format,
            pixel_type,
            out.as_mut_ptr() as *mut c_void,
        );

        check()
    }

    unsafe fn delete_framebuffer(&mut self, handle: FrameBufferHandle) -> Result<()> {
        let id = self
            .framebuffers
            .free(handle)
            .ok_or_else(|| Error::FrameBufferHandleInvalid(handle))?;

        gl::DeleteFramebuffers(1, &id);
        check()
    }

    unsafe fn compile_program(
        &mut self,
        handle: ProgramHandle,
        sources: &[ShaderSourceDescriptor],
    ) -> Result<()> {
        let mut shaders = Vec::with_capacity(sources.len());
        for source in sources {
            match compile(source) {
                Ok(v) => shaders.push(v),
                Err(err) => {
                    for &v in &shaders {
                        gl::DeleteShader(v);
                    }

                    return Err(err);
                }
            }
        }

        let id = link(&shaders);
        for &v in &shaders {
            gl::DeleteShader(v);
        }

        let id = id?;
        check()?;

        self.programs.create(handle, GLProgramData { id });
        Ok(())
    }

    unsafe fn bind_program(&mut self, handle: Option<ProgramHandle>) -> Result<()> {
        let id = match handle {
            Some(v) => self.program(v)?,
            None => 0,
        };

        gl::UseProgram(id);
        check()
    }

    unsafe fn uniform_location(
        &mut self,
        handle: ProgramHandle,
        name: &str,
    ) -> Result<UniformLocation> {
        let id = self.program(handle)?;
        let c_name = CString::new(name.as_bytes())?;
        let location = gl::GetUniformLocation(id, c_name.as_ptr());
        check()?;
        Ok(location)
    }

    unsafe fn attrib_location(&mut self, handle: ProgramHandle, name: &str) -> Result<i32> {
        let id = self.program(handle)?;
        let c_name = CString::new(name.as_bytes())?;
        let location = gl::GetAttribLocation(id, c_name.as_ptr());
        check()?;
        Ok(location)
    }

    unsafe fn set_uniform(
        &mut self,
        location: UniformLocation,
        variable: &UniformVariable,
    ) -> Result<()> {
        match *variable {
            UniformVariable::I32(v) => gl::Uniform1i(location, v),
            UniformVariable::F32(v) => gl::Uniform1f(location, v),
            UniformVariable::Vector2f(v) => gl::Uniform2f(location, v[0], v[1]),
            UniformVariable::Vector3f(v) => gl::Uniform3f(location, v[0], v[1], v[2]),
            UniformVariable::Vector4f(v) => gl::Uniform4f(location, v[0], v[1], v[2], v[3]),
            UniformVariable::Matrix3f(ref v) => {
                gl::UniformMatrix3fv(location, 1, gl::FALSE, v[0].as_ptr())
            }
            UniformVariable::Matrix4f(ref v) => {
                gl::UniformMatrix4fv(location, 1, gl::FALSE, v[0].as_ptr())
            }
            UniformVariable::Matrix4fArray(ref v) => {
                if !v.is_empty() {
                    gl::UniformMatrix4fv(location, v.len() as GLsizei, gl::FALSE, v[0][0].as_ptr())
                }
            }
        }

        check()
    }

    unsafe fn delete_program(&mut self, handle: ProgramHandle) -> Result<()> {
        let program = self
            .programs
            .free(handle)
            .ok_or_else(|| Error::ProgramHandleInvalid(handle))?;

        gl::DeleteProgram(program.id);
        check()
    }

    unsafe fn create_texture(&mut self, handle: TextureHandle, params: TextureParams)
        -> Result<()> {
        let mut id = 0;
        gl::GenTextures(1, &mut id);
        if id == 0 {
            bail!("[GL] Failed to generate texture object.");
        }

        let texture = GLTextureData {
            id,
            target: params.kind.into(),
            format: params.format,
        };

        self.bind_for_update(texture)?;
        gl::TexParameteri(texture.target, gl::TEXTURE_MIN_FILTER, gl::LINEAR as GLint);
        gl::TexParameteri(texture.target, gl::TEXTURE_MAG_FILTER, gl::LINEAR as GLint);
        check()?;

        self.textures.create(handle, texture);
        Ok(())
    }

    unsafe fn bind_texture(&mut self, slot: usize, handle: Option<TextureHandle>) -> Result<()> {
        self.active_slot(slot);

        match handle {
            Some(v) => {
                let texture = self.texture(v)?;
                if let Some(previous) = self.slot_targets.get(&slot).cloned() {
                    if previous != texture.target {
                        gl::BindTexture(previous, 0);
                    }
                }

                gl::BindTexture(texture.target, texture.id);
                self.slot_targets.insert(slot, texture.target);
            }
            None => {
                if let Some(previous) = self.slot_targets.remove(&slot) {
                    gl::BindTexture(previous, 0);
                }
            }
        }

        check()
    }

    unsafe fn set_texture_wrap(
        &mut self,
        handle: TextureHandle,
        axis: TextureAxis,
        wrap: TextureWrap,
    ) -> Result<()> {
        let texture = self.texture(handle)?;
        self.bind_for_update(texture)?;

        let axis: GLenum = axis.into();
        let wrap: GLenum = wrap.into();
        gl::TexParameteri(texture.target, axis, wrap as GLint);
        check()
    }

    unsafe fn set_texture_filter(
        &mut self,
        handle: TextureHandle,
        min: TextureFilter,
        mag: TextureFilter,
    ) -> Result<()> {
        let texture = self.texture(handle)?;
        self.bind_for_update(texture)?;

        gl::TexParameteri(
            texture.target,
            gl::TEXTURE_MIN_FILTER,
            types::min_filter(min) as GLint,
        );

        gl::TexParameteri(
            texture.target,
            gl::TEXTURE_MAG_FILTER,
            types::mag_filter(mag) as GLint,
        );

        check()
    }

    unsafe fn generate_mipmap(&mut self, handle: TextureHandle, params: TextureParams)
        -> Result<()> {
        let texture = self.texture(handle)?;
        self.bind_for_update(texture)?;

        gl::TexParameteri(texture.target, gl::TEXTURE_BASE_LEVEL, 0);
        gl::TexParameteri(
            texture.target,
            gl::TEXTURE_MAX_LEVEL,
            (params.levels.max(1) - 1) as GLint,
        );
        gl::GenerateMipmap(texture.target);
        check()
    }

    unsafe fn tex_image(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        face: Option<CubemapFace>,
        level: u32,
        data: Option<&[u8]>,
    ) -> Result<()> {
        let texture = self.texture(handle)?;
        self.bind_for_update(texture)?;

        let (internal_format, format, pixel_type) = types::texture_format(params.format);
        let (w, h, d) = params.level_dimensions(level);
        let pixels = data.map(as_ptr).unwrap_or_else(ptr::null);

        match params.kind {
            TextureKind::Texture2D | TextureKind::Cubemap => {
                let target = face.map(GLenum::from).unwrap_or(texture.target);
                gl::TexImage2D(
                    target,
                    level as GLint,
                    internal_format as GLint,
                    w as GLsizei,
                    h as GLsizei,
                    0,
                    format,
                    pixel_type,
                    pixels,
                );
            }
            TextureKind::Texture2DArray | TextureKind::Texture3D | TextureKind::CubemapArray => {
                gl::TexImage3D(
                    texture.target,
                    level as GLint,
                    internal_format as GLint,
                    w as GLsizei,
                    h as GLsizei,
                    d as GLsizei,
                    0,
                    format,
                    pixel_type,
                    pixels,
                );
            }
        }

        if level == 0 {
            gl::TexParameteri(texture.target, gl::TEXTURE_BASE_LEVEL, 0);
            gl::TexParameteri(
                texture.target,
                gl::TEXTURE_MAX_LEVEL,
                (params.levels.max(1) - 1) as GLint,
            );
        }

        check()
    }

    unsafe fn tex_sub_image(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        face: Option<CubemapFace>,
        level: u32,
        offset: (u32, u32, u32),
        size: (u32, u32, u32),
        data: &[u8],
    ) -> Result<()> {
        let texture = self.texture(handle)?;
        self.bind_for_update(texture)?;

        let (_, format, pixel_type) = types::texture_format(params.format);
        match params.kind {
            TextureKind::Texture2D | TextureKind::Cubemap => {
                let target = face.map(GLenum::from).unwrap_or(texture.target);
                gl::TexSubImage2D(
                    target,
                    level as GLint,
                    offset.0 as GLint,
                    offset.1 as GLint,
                    size.0 as GLsizei,
                    size.1 as GLsizei,
                    format,
                    pixel_type,
                    as_ptr(data),
                );
            }
            TextureKind::Texture2DArray | TextureKind::Texture3D | TextureKind::CubemapArray => {
                gl::TexSubImage3D(
                    texture.target,
                    level as GLint,
                    offset.0 as GLint,
                    offset.1 as GLint,
                    offset.2 as GLint,
                    size.0 as GLsizei,
                    size.1 as GLsizei,
                    size.2 as GLsizei,
                    format,
                    pixel_type,
                    as_ptr(data),
                );
            }
        }

        check()
    }

    unsafe fn get_tex_image(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        face: Option<CubemapFace>,
        level: u32,
        out: &mut [u8],
    ) -> Result<()> {
        let texture = self.texture(handle)?;
        self.bind_for_update(texture)?;

        let (_, format, pixel_type) = types::texture_format(params.format);
        let target = face.map(GLenum::from).unwrap_or(texture.target);
        gl::GetTexImage(
            target,
            level as GLint,
            format,
            pixel_type,
            out.as_mut_ptr() as *mut c_void,
        );

        check()
    }

    unsafe fn delete_texture(&mut self, handle: TextureHandle) -> Result<()> {
        let texture = self
            .textures
            .free(handle)
            .ok_or_else(|| Error::TextureHandleInvalid(handle))?;

        gl::DeleteTextures(1, &texture.id);
        check()
    }

    unsafe fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) -> Result<()> {
        gl::DrawArrays(topology.into(), first as GLint, count as GLsizei);
        check()
    }

    unsafe fn draw_elements(
        &mut self,
        topology: Topology,
        first: u32,
        count: u32,
        format: IndexFormat,
        base_vertex: Option<i32>,
    ) -> Result<()> {
        let offset = (first as usize * format.stride()) as *const c_void;

        match base_vertex {
            Some(base) => gl::DrawElementsBaseVertex(
                topology.into(),
                count as GLsizei,
                format.into(),
                offset,
                base,
            ),
            None => gl::DrawElements(topology.into(), count as GLsizei, format.into(), offset),
        }

        check()
    }
}

unsafe fn compile(source: &ShaderSourceDescriptor) -> Result<GLuint> {
    let shader = gl::CreateShader(source.stage.into());
    let c_str = CString::new(source.source.as_bytes())?;
    gl::ShaderSource(shader, 1, &c_str.as_ptr(), ptr::null());
    gl::CompileShader(shader);

    let mut status = GLint::from(gl::FALSE);
    gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);

    if status != GLint::from(gl::TRUE) {
        let mut len = 0;
        gl::GetShaderiv(shader, gl::INFO_LOG_LENGTH, &mut len);

        let mut buf = vec![0u8; len.max(1) as usize];
        gl::GetShaderInfoLog(
            shader,
            len,
            ptr::null_mut(),
            buf.as_mut_ptr() as *mut GLchar,
        );

        gl::DeleteShader(shader);
        return Err(Error::CompileFailure {
            stage: source.stage,
            log: info_log(&buf),
        }
        .into());
    }

    Ok(shader)
}

unsafe fn link(shaders: &[GLuint]) -> Result<GLuint> {
    let program = gl::CreateProgram();
    for &shader in shaders {
        gl::AttachShader(program, shader);
    }

    // Vertex attributes live at fixed locations shared by every program.
    for &attribute in Attribute::ALL.iter() {
        let c_name = CString::new(attribute.name())?;
        gl::BindAttribLocation(program, attribute.location(), c_name.as_ptr());
    }

    gl::LinkProgram(program);

    for &shader in shaders {
        gl::DetachShader(program, shader);
    }

    let mut status = GLint::from(gl::FALSE);
    gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);

    if status != GLint::from(gl::TRUE) {
        let mut len: GLint = 0;
        gl::GetProgramiv(program, gl::INFO_LOG_LENGTH, &mut len);

        let mut buf = vec![0u8; len.max(1) as usize];
        gl::GetProgramInfoLog(
            program,
            len,
            ptr::null_mut(),
            buf.as_mut_ptr() as *mut GLchar,
        );

        gl::DeleteProgram(program);
        return Err(Error::LinkFailure(info_log(&buf)).into());
    }

    Ok(program)
}

fn info_log(buf: &[u8]) -> String {
    let end = buf.iter().position(|&v| v == 0).unwrap_or_else(|| buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

fn as_ptr(data: &[u8]) -> *const c_void {
    if data.is_empty() {
        ptr::null()
    } else {
        data.as_ptr() as *const c_void
    }
}

unsafe fn context_version() -> String {
    let version = gl::GetString(gl::VERSION);
    if version.is_null() {
        return "(unknown version)".to_owned();
    }

    ::std::ffi::CStr::from_ptr(version as *const _)
        .to_string_lossy()
        .into_owned()
}

unsafe fn check() -> Result<()> {
    match gl::GetError() {
        gl::NO_ERROR => Ok(()),

        gl::INVALID_ENUM => {
            bail!("[GL] An unacceptable value is specified for an enumerated argument.")
        }

        gl::INVALID_VALUE => bail!("[GL] A numeric argument is out of range."),

        gl::INVALID_OPERATION => {
            bail!("[GL] The specified operation is not allowed in the current state.")
        }

        gl::INVALID_FRAMEBUFFER_OPERATION => bail!(
            "[GL] The command is trying to render to or read from the framebuffer while the \
             currently bound framebuffer is not framebuffer complete."
        ),

        gl::OUT_OF_MEMORY => bail!("[GL] There is not enough memory left to execute the command."),
        _ => bail!("[GL] Oops, Unknown OpenGL error."),
    }
}
