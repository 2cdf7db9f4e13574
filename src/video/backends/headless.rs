//! A backend without any native context. It records every native call and
//! emulates just enough of a driver (program compilation, texture storage and
//! pixel readback) to exercise the device layer without a GPU.

use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::*;
use crate::math::{Color, Rect};
use crate::utils::hash::FastHashMap;

use super::super::assets::prelude::*;
use super::super::errors::Error;
use super::Visitor;

/// A native call issued through the `Visitor` interface.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Initialize,
    Shutdown,
    SetDepthTest(bool),
    SetDepthWrite(bool),
    SetDepthFunc(Comparison),
    SetBlend(bool),
    SetBlendFunc(BlendFactor, BlendFactor),
    SetBlendEquation(Equation),
    SetCull(bool),
    SetCullFace(CullFace),
    SetFrontFace(FrontFaceOrder),
    SetScissorTest(bool),
    SetScissorRect(Rect),
    SetViewport(Rect),
    Clear(ClearFlags),
    CreateBuffer(BufferHandle),
    SetBuffer(BufferHandle, usize),
    UpdateBuffer(BufferHandle, usize, usize),
    BindBuffer(BufferKind, Option<BufferHandle>),
    DeleteBuffer(BufferHandle),
    CreateVertexArray(VertexArrayHandle),
    BindVertexArray(Option<VertexArrayHandle>),
    DeleteVertexArray(VertexArrayHandle),
    CreateFrameBuffer(FrameBufferHandle),
    BindFrameBuffer(FrameBufferTarget, Option<FrameBufferHandle>),
    BlitFrameBuffer(ClearFlags),
    ReadPixels(usize, Rect),
    DeleteFrameBuffer(FrameBufferHandle),
    CompileProgram(ProgramHandle),
    BindProgram(Option<ProgramHandle>),
    UniformLocation(ProgramHandle, String),
    AttribLocation(ProgramHandle, String),
    SetUniform(UniformLocation, UniformVariable),
    DeleteProgram(ProgramHandle),
    CreateTexture(TextureHandle),
    BindTexture(usize, Option<TextureHandle>),
    SetTextureWrap(TextureHandle, TextureAxis, TextureWrap),
    SetTextureFilter(TextureHandle, TextureFilter, TextureFilter),
    GenerateMipmap(TextureHandle),
    TexImage(TextureHandle, Option<CubemapFace>, u32),
    TexSubImage(TextureHandle, Option<CubemapFace>, u32),
    GetTexImage(TextureHandle, Option<CubemapFace>, u32),
    DeleteTexture(TextureHandle),
    DrawArrays(Topology, u32, u32),
    DrawElements(Topology, u32, u32),
}

impl NativeCall {
    /// Returns true if this call changes the fixed-function pipeline state.
    pub fn is_state_change(&self) -> bool {
        match *self {
            NativeCall::SetDepthTest(_)
            | NativeCall::SetDepthWrite(_)
            | NativeCall::SetDepthFunc(_)
            | NativeCall::SetBlend(_)
            | NativeCall::SetBlendFunc(_, _)
            | NativeCall::SetBlendEquation(_)
            | NativeCall::SetCull(_)
            | NativeCall::SetCullFace(_)
            | NativeCall::SetFrontFace(_)
            | NativeCall::SetScissorTest(_) => true,
            _ => false,
        }
    }
}

/// The shared record of native calls, cloned out of the visitor before it is
/// handed to a device.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Rc<RefCell<Vec<NativeCall>>>);

impl CallLog {
    #[inline]
    fn push(&self, call: NativeCall) {
        self.0.borrow_mut().push(call);
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Returns a snapshot of the recorded calls.
    pub fn calls(&self) -> Vec<NativeCall> {
        self.0.borrow().clone()
    }

    pub fn contains(&self, call: &NativeCall) -> bool {
        self.0.borrow().iter().any(|v| v == call)
    }

    /// Counts the recorded calls matching `predicate`.
    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&NativeCall) -> bool,
    {
        self.0.borrow().iter().filter(|v| predicate(v)).count()
    }

    pub fn state_changes(&self) -> usize {
        self.count(NativeCall::is_state_change)
    }
}

#[derive(Debug, Default)]
struct HeadlessProgram {
    uniforms: Vec<String>,
    attributes: Vec<String>,
}

#[derive(Debug)]
struct HeadlessTexture {
    params: TextureParams,
    images: FastHashMap<(Option<CubemapFace>, u32), Vec<u8>>,
}

pub struct HeadlessVisitor {
    log: CallLog,
    buffers: FastHashMap<BufferHandle, usize>,
    programs: FastHashMap<ProgramHandle, HeadlessProgram>,
    textures: FastHashMap<TextureHandle, HeadlessTexture>,
    framebuffers: FastHashMap<FrameBufferHandle, FrameBufferParams>,
    read_framebuffer: Option<FrameBufferHandle>,
    draw_framebuffer: Option<FrameBufferHandle>,
}

impl Default for HeadlessVisitor {
    fn default() -> Self {
        HeadlessVisitor::new()
    }
}

impl HeadlessVisitor {
    pub fn new() -> Self {
        HeadlessVisitor {
            log: CallLog::default(),
            buffers: FastHashMap::default(),
            programs: FastHashMap::default(),
            textures: FastHashMap::default(),
            framebuffers: FastHashMap::default(),
            read_framebuffer: None,
            draw_framebuffer: None,
        }
    }

    /// Returns the shared call record of this visitor.
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn texture_mut(&mut self, handle: TextureHandle) -> Result<&mut HeadlessTexture> {
        self.textures
            .get_mut(&handle)
            .ok_or_else(|| Error::TextureHandleInvalid(handle).into())
    }

    fn image_mut(
        &mut self,
        handle: TextureHandle,
        face: Option<CubemapFace>,
        level: u32,
    ) -> Result<(TextureParams, &mut Vec<u8>)> {
        let texture = self.texture_mut(handle)?;
        let params = texture.params;
        let (w, h, d) = params.level_dimensions(level);
        let len = params.region_len(w, h, d);
        let image = texture
            .images
            .entry((face, level))
            .or_insert_with(|| vec![0; len]);

        Ok((params, image))
    }

    fn fill_attachment(&mut self, handle: TextureHandle, texel: &[u8]) -> Result<()> {
        let (params, image) = self.image_mut(handle, None, 0)?;
        let size = params.format.size() as usize;
        for chunk in image.chunks_mut(size) {
            let n = chunk.len().min(texel.len());
            chunk[..n].copy_from_slice(&texel[..n]);
        }

        Ok(())
    }

    fn copy_region(
        &mut self,
        src: TextureHandle,
        src_rect: Rect,
        dst: TextureHandle,
        dst_rect: Rect,
    ) -> Result<()> {
        let (src_params, src_image) = {
            let (params, image) = self.image_mut(src, None, 0)?;
            (params, image.clone())
        };

        let (dst_params, dst_image) = self.image_mut(dst, None, 0)?;
        if src_params.format != dst_params.format {
            bail!("Blit between mismatched formats is not supported by the headless backend.");
        }

        let texel = src_params.format.size() as usize;
        let src_width = src_params.dimensions.0 as usize;
        let dst_width = dst_params.dimensions.0 as usize;
        let row = src_rect.width() as usize * texel;

        for y in 0..src_rect.height() as usize {
            let s = ((src_rect.min.y as usize + y) * src_width + src_rect.min.x as usize) * texel;
            let d = ((dst_rect.min.y as usize + y) * dst_width + dst_rect.min.x as usize) * texel;
            dst_image[d..d + row].copy_from_slice(&src_image[s..s + row]);
        }

        Ok(())
    }
}

/// Encodes a clear color into the texel representation of `format`.
fn encode_color(color: Color, format: TextureFormat) -> Vec<u8> {
    let rgba8 = color.to_rgba8();
    let rgba32f: [f32; 4] = color.into();

    match format {
        TextureFormat::R8 => rgba8[..1].to_vec(),
        TextureFormat::RG8 => rgba8[..2].to_vec(),
        TextureFormat::RGB8 => rgba8[..3].to_vec(),
        TextureFormat::RGBA8 => rgba8.to_vec(),
        TextureFormat::R32F => floats(&rgba32f[..1]),
        TextureFormat::RG32F => floats(&rgba32f[..2]),
        TextureFormat::RGBA32F => floats(&rgba32f),
        _ => vec![0; format.size() as usize],
    }
}

fn encode_depth(depth: f32, format: TextureFormat) -> Vec<u8> {
    match format {
        TextureFormat::Depth16 => ((depth.max(0.0).min(1.0) * 65535.0) as u16)
            .to_ne_bytes()
            .to_vec(),
        _ => depth.to_ne_bytes().to_vec(),
    }
}

fn floats(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_ne_bytes().to_vec()).collect()
}

/// Scans `uniform` declarations, e.g. `uniform highp mat4 a, b[4];`.
fn scan_declarations(source: &str, keywords: &[&str]) -> Vec<String> {
    let mut names = Vec::new();

    for line in source.lines() {
        let line = line.trim();
        let rest = match keywords
            .iter()
            .find(|k| line.starts_with(*k) && line[k.len()..].starts_with(char::is_whitespace))
        {
            Some(k) => &line[k.len()..],
            None => continue,
        };

        let decl = rest.split(';').next().unwrap_or("");
        let mut tokens: Vec<&str> = decl.split_whitespace().collect();
        while let Some(&first) = tokens.first() {
            match first {
                "lowp" | "mediump" | "highp" | "flat" | "smooth" => {
                    tokens.remove(0);
                }
                _ => break,
            }
        }

        if tokens.len() < 2 {
            continue;
        }

        for name in tokens[1..].join(" ").split(',') {
            let name = name.split('[').next().unwrap_or("").trim();
            if !name.is_empty() {
                names.push(name.to_owned());
            }
        }
    }

    names
}

/// Emulates the driver's reaction to `#error` directives.
fn check_errors(source: &ShaderSourceDescriptor) -> Result<()> {
    for (i, line) in source.source.lines().enumerate() {
        let line = line.trim();
        if line.starts_with("#error") {
            let msg = line["#error".len()..].trim();
            return Err(Error::CompileFailure {
                stage: source.stage,
                log: format!("ERROR: 0:{}: '#error' : {}\n", i + 1, msg),
            }
            .into());
        }
    }

    Ok(())
}

impl Visitor for HeadlessVisitor {
    unsafe fn initialize(&mut self) -> Result<()> {
        self.log.push(NativeCall::Initialize);
        Ok(())
    }

    unsafe fn shutdown(&mut self) -> Result<()> {
        self.log.push(NativeCall::Shutdown);
        Ok(())
    }

    unsafe fn set_depth_test(&mut self, enable: bool) -> Result<()> {
        self.log.push(NativeCall::SetDepthTest(enable));
        Ok(())
    }

    unsafe fn set_depth_write(&mut self, enable: bool) -> Result<()> {
        self.log.push(NativeCall::SetDepthWrite(enable));
        Ok(())
    }

    unsafe fn set_depth_func(&mut self, comparison: Comparison) -> Result<()> {
        self.log.push(NativeCall::SetDepthFunc(comparison));
        Ok(())
    }

    unsafe fn set_blend(&mut self, enable: bool) -> Result<()> {
        self.log.push(NativeCall::SetBlend(enable));
        Ok(())
    }

    unsafe fn set_blend_func(&mut self, src: BlendFactor, dst: BlendFactor) -> Result<()> {
        self.log.push(NativeCall::SetBlendFunc(src, dst));
        Ok(())
    }

    unsafe fn set_blend_equation(&mut self, equation: Equation) -> Result<()> {
        self.log.push(NativeCall::SetBlendEquation(equation));
        Ok(())
    }

    unsafe fn set_cull(&mut self, enable: bool) -> Result<()> {
        self.log.push(NativeCall::SetCull(enable));
        Ok(())
    }

    unsafe fn set_cull_face(&mut self, face: CullFace) -> Result<()> {
        self.log.push(NativeCall::SetCullFace(face));
        Ok(())
    }

    unsafe fn set_front_face(&mut self, order: FrontFaceOrder) -> Result<()> {
        self.log.push(NativeCall::SetFrontFace(order));
        Ok(())
    }

    unsafe fn set_scissor_test(&mut self, enable: bool) -> Result<()> {
        self.log.push(NativeCall::SetScissorTest(enable));
        Ok(())
    }

    unsafe fn set_scissor_rect(&mut self, rect: Rect) -> Result<()> {
        self.log.push(NativeCall::SetScissorRect(rect));
        Ok(())
    }

    unsafe fn set_viewport(&mut self, rect: Rect) -> Result<()> {
        self.log.push(NativeCall::SetViewport(rect));
        Ok(())
    }

    unsafe fn clear(
        &mut self,
        color: Color,
        depth: f32,
        _: i32,
        flags: ClearFlags,
    ) -> Result<()> {
        self.log.push(NativeCall::Clear(flags));

        let fb = match self.draw_framebuffer.and_then(|v| self.framebuffers.get(&v)) {
            Some(fb) => fb.clone(),
            None => return Ok(()),
        };

        for attachment in fb.attachments.iter() {
            match *attachment {
                Attachment::Color(texture) if flags.contains(ClearFlags::COLOR) => {
                    let format = self.texture_mut(texture)?.params.format;
                    self.fill_attachment(texture, &encode_color(color, format))?;
                }
                Attachment::Depth(texture) if flags.contains(ClearFlags::DEPTH) => {
                    let format = self.texture_mut(texture)?.params.format;
                    self.fill_attachment(texture, &encode_depth(depth, format))?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    unsafe fn create_buffer(
        &mut self,
        handle: BufferHandle,
        params: BufferParams,
        _: Option<&[u8]>,
    ) -> Result<()> {
        self.log.push(NativeCall::CreateBuffer(handle));
        self.buffers.insert(handle, params.size);
        Ok(())
    }

    unsafe fn set_buffer(
        &mut self,
        handle: BufferHandle,
        params: BufferParams,
        data: &[u8],
    ) -> Result<()> {
        self.log.push(NativeCall::SetBuffer(handle, data.len()));
        self.buffers.insert(handle, params.size);
        Ok(())
    }

    unsafe fn update_buffer(
        &mut self,
        handle: BufferHandle,
        offset: usize,
        data: &[u8],
    ) -> Result<()> {
        self.log
            .push(NativeCall::UpdateBuffer(handle, offset, data.len()));

        match self.buffers.get(&handle) {
            Some(&size) if offset.checked_add(data.len()).map_or(false, |end| end <= size) => Ok(()),
            Some(_) => bail!("[Headless] BufferSubData out of range."),
            None => Err(Error::BufferHandleInvalid(handle).into()),
        }
    }

    unsafe fn bind_buffer(&mut self, kind: BufferKind, handle: Option<BufferHandle>) -> Result<()> {
        self.log.push(NativeCall::BindBuffer(kind, handle));
        Ok(())
    }

    unsafe fn delete_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        self.log.push(NativeCall::DeleteBuffer(handle));
        self.buffers.remove(&handle);
        Ok(())
    }

    unsafe fn create_vertex_array(
        &mut self,
        handle: VertexArrayHandle,
        _: VertexArrayParams,
    ) -> Result<()> {
        self.log.push(NativeCall::CreateVertexArray(handle));
        Ok(())
    }

    unsafe fn bind_vertex_array(&mut self, handle: Option<VertexArrayHandle>) -> Result<()> {
        self.log.push(NativeCall::BindVertexArray(handle));
        Ok(())
    }

    unsafe fn delete_vertex_array(&mut self, handle: VertexArrayHandle) -> Result<()> {
        self.log.push(NativeCall::DeleteVertexArray(handle));
        Ok(())
    }

    unsafe fn create_framebuffer(
        &mut self,
        handle: FrameBufferHandle,
        params: &FrameBufferParams,
    ) -> Result<()> {
        self.log.push(NativeCall::CreateFrameBuffer(handle));
        self.framebuffers.insert(handle, params.clone());
        Ok(())
    }

    unsafe fn bind_framebuffer(
        &mut self,
        target: FrameBufferTarget,
        handle: Option<FrameBufferHandle>,
    ) -> Result<()> {
        self.log.push(NativeCall::BindFrameBuffer(target, handle));

        match target {
            FrameBufferTarget::Read => self.read_framebuffer = handle,
            FrameBufferTarget::Draw => self.draw_framebuffer = handle,
            FrameBufferTarget::Framebuffer => {
                self.read_framebuffer = handle;
                self.draw_framebuffer = handle;
            }
        }

        Ok(())
    }

    unsafe fn blit_framebuffer(
        &mut self,
        src: Rect,
        dst: Rect,
        flags: ClearFlags,
        _: BlitFilter,
    ) -> Result<()> {
        self.log.push(NativeCall::BlitFrameBuffer(flags));

        let (read, draw) = match (
            self.read_framebuffer.and_then(|v| self.framebuffers.get(&v)),
            self.draw_framebuffer.and_then(|v| self.framebuffers.get(&v)),
        ) {
            (Some(read), Some(draw)) => (read.clone(), draw.clone()),
            _ => return Ok(()),
        };

        // Rescaling blits are not emulated.
        if src.width() != dst.width() || src.height() != dst.height() {
            return Ok(());
        }

        if flags.contains(ClearFlags::COLOR) {
            if let (Some(s), Some(d)) = (read.color(0), draw.color(0)) {
                self.copy_region(s, src, d, dst)?;
            }
        }

        if flags.contains(ClearFlags::DEPTH) {
            if let (Some(s), Some(d)) = (read.depth(), draw.depth()) {
                self.copy_region(s, src, d, dst)?;
            }
        }

        Ok(())
    }

    unsafe fn read_pixels(
        &mut self,
        attachment: usize,
        rect: Rect,
        format: TextureFormat,
        out: &mut [u8],
    ) -> Result<()> {
        self.log.push(NativeCall::ReadPixels(attachment, rect));

        let texture = match self
            .read_framebuffer
            .and_then(|v| self.framebuffers.get(&v))
            .and_then(|fb| fb.color(attachment))
        {
            Some(texture) => texture,
            None => {
                for v in out.iter_mut() {
                    *v = 0;
                }

                return Ok(());
            }
        };

        let (params, image) = self.image_mut(texture, None, 0)?;
        let texel = format.size() as usize;
        let width = params.dimensions.0 as usize;
        let row = rect.width() as usize * texel;

        for y in 0..rect.height() as usize {
            let s = ((rect.min.y as usize + y) * width + rect.min.x as usize) * texel;
            out[y * row..(y + 1) * row].copy_from_slice(&image[s..s + row]);
        }

        Ok(())
    }

    unsafe fn delete_framebuffer(&mut self, handle: FrameBufferHandle) -> Result<()> {
        self.log.push(NativeCall::DeleteFrameBuffer(handle));
        self.framebuffers.remove(&handle);

        if self.read_framebuffer == Some(handle) {
            self.read_framebuffer = None;
        }

        if self.draw_framebuffer == Some(handle) {
            self.draw_framebuffer = None;
        }

        Ok(())
    }

    unsafe fn compile_program(
        &mut self,
        handle: ProgramHandle,
        sources: &[ShaderSourceDescriptor],
    ) -> Result<()> {
        self.log.push(NativeCall::CompileProgram(handle));

        let mut program = HeadlessProgram::default();
        for source in sources {
            check_errors(source)?;

            for name in scan_declarations(&source.source, &["uniform"]) {
                if !program.uniforms.contains(&name) {
                    program.uniforms.push(name);
                }
            }

            if source.stage == ShaderStage::Vertex {
                program.attributes = scan_declarations(&source.source, &["in", "attribute"]);
            }
        }

        let has = |stage: ShaderStage| sources.iter().any(|v| v.stage == stage);
        let compute = has(ShaderStage::Compute) && sources.len() == 1;
        if !compute && (!has(ShaderStage::Vertex) || !has(ShaderStage::Fragment)) {
            return Err(Error::LinkFailure(
                "ERROR: Linking: program lacks a vertex or fragment stage.".to_owned(),
            )
            .into());
        }

        self.programs.insert(handle, program);
        Ok(())
    }

    unsafe fn bind_program(&mut self, handle: Option<ProgramHandle>) -> Result<()> {
        self.log.push(NativeCall::BindProgram(handle));
        Ok(())
    }

    unsafe fn uniform_location(
        &mut self,
        handle: ProgramHandle,
        name: &str,
    ) -> Result<UniformLocation> {
        self.log
            .push(NativeCall::UniformLocation(handle, name.to_owned()));

        let program = self
            .programs
            .get(&handle)
            .ok_or_else(|| Error::ProgramHandleInvalid(handle))?;

        Ok(program
            .uniforms
            .iter()
            .position(|v| v == name)
            .map(|v| v as UniformLocation)
            .unwrap_or(-1))
    }

    unsafe fn attrib_location(&mut self, handle: ProgramHandle, name: &str) -> Result<i32> {
        self.log
            .push(NativeCall::AttribLocation(handle, name.to_owned()));

        let program = self
            .programs
            .get(&handle)
            .ok_or_else(|| Error::ProgramHandleInvalid(handle))?;

        if !program.attributes.iter().any(|v| v == name) {
            return Ok(-1);
        }

        Ok(Attribute::ALL
            .iter()
            .find(|v| v.name() == name)
            .map(|v| v.location() as i32)
            .unwrap_or(-1))
    }

    unsafe fn set_uniform(
        &mut self,
        location: UniformLocation,
        variable: &UniformVariable,
    ) -> Result<()> {
        self.log
            .push(NativeCall::SetUniform(location, variable.clone()));
        Ok(())
    }

    unsafe fn delete_program(&mut self, handle: ProgramHandle) -> Result<()> {
        self.log.push(NativeCall::DeleteProgram(handle));
        self.programs.remove(&handle);
        Ok(())
    }

    unsafe fn create_texture(&mut self, handle: TextureHandle, params: TextureParams)
        -> Result<()> {
        self.log.push(NativeCall::CreateTexture(handle));
        self.textures.insert(
            handle,
            HeadlessTexture {
                params,
                images: FastHashMap::default(),
            },
        );

        Ok(())
    }

    unsafe fn bind_texture(&mut self, slot: usize, handle: Option<TextureHandle>) -> Result<()> {
        self.log.push(NativeCall::BindTexture(slot, handle));
        Ok(())
    }

    unsafe fn set_texture_wrap(
        &mut self,
        handle: TextureHandle,
        axis: TextureAxis,
        wrap: TextureWrap,
    ) -> Result<()> {
        self.log
            .push(NativeCall::SetTextureWrap(handle, axis, wrap));
        Ok(())
    }

    unsafe fn set_texture_filter(
        &mut self,
        handle: TextureHandle,
        min: TextureFilter,
        mag: TextureFilter,
    ) -> Result<()> {
        self.log
            .push(NativeCall::SetTextureFilter(handle, min, mag));
        Ok(())
    }

    unsafe fn generate_mipmap(&mut self, handle: TextureHandle, params: TextureParams)
        -> Result<()> {
        self.log.push(NativeCall::GenerateMipmap(handle));

        let texel = params.format.size() as usize;
        let faces: Vec<Option<CubemapFace>> = if params.kind == TextureKind::Cubemap {
            CubemapFace::ALL.iter().map(|&v| Some(v)).collect()
        } else {
            vec![None]
        };

        for face in faces {
            let (_, base) = self.image_mut(handle, face, 0)?;
            let base = base.clone();
            let (bw, bh, _) = params.level_dimensions(0);

            // Nearest sampling of the base level.
            for level in 1..params.levels {
                let (w, h, d) = params.level_dimensions(level);
                let (_, image) = self.image_mut(handle, face, level)?;
                for z in 0..d as usize {
                    let bz = if params.kind.is_volume() { z << level } else { z };
                    for y in 0..h as usize {
                        for x in 0..w as usize {
                            let s = ((bz * bh as usize + (y << level)) * bw as usize
                                + (x << level))
                                * texel;
                            let t = ((z * h as usize + y) * w as usize + x) * texel;
                            image[t..t + texel].copy_from_slice(&base[s..s + texel]);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    unsafe fn tex_image(
        &mut self,
        handle: TextureHandle,
        params: TextureParams,
        face: Option<CubemapFace>,
        level: u32,
        data: Option<&[u8]>,
    ) -> Result<()> {
        self.log.push(NativeCall::TexImage(handle, face, level));

        let texture = self.texture_mut(handle)?;
        texture.params = params;
        if level == 0 {
            texture.images.retain(|&(f, _), _| f != face);
        }

        let (w, h, d) = params.level_dimensions(level);
        let image = match data {
            Some(bytes) => bytes.to_vec(),
            None => vec![0; params.region_len(w, h, d)],
        };

        texture.images.insert((face, level), image);
        Ok(())
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
        self.log.push(NativeCall::TexSubImage(handle, face, level));

        let texel = params.format.size() as usize;
        let (lw, lh, _) = params.level_dimensions(level);
        let (_, image) = self.image_mut(handle, face, level)?;
        let row = size.0 as usize * texel;

        for z in 0..size.2 as usize {
            for y in 0..size.1 as usize {
                let t = (((offset.2 as usize + z) * lh as usize + offset.1 as usize + y)
                    * lw as usize
                    + offset.0 as usize)
                    * texel;
                let s = (z * size.1 as usize + y) * row;
                image[t..t + row].copy_from_slice(&data[s..s + row]);
            }
        }

        Ok(())
    }

    unsafe fn get_tex_image(
        &mut self,
        handle: TextureHandle,
        _: TextureParams,
        face: Option<CubemapFace>,
        level: u32,
        out: &mut [u8],
    ) -> Result<()> {
        self.log.push(NativeCall::GetTexImage(handle, face, level));

        let (_, image) = self.image_mut(handle, face, level)?;
        out.copy_from_slice(&image[..out.len()]);
        Ok(())
    }

    unsafe fn delete_texture(&mut self, handle: TextureHandle) -> Result<()> {
        self.log.push(NativeCall::DeleteTexture(handle));
        self.textures.remove(&handle);
        Ok(())
    }

    unsafe fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) -> Result<()> {
        self.log.push(NativeCall::DrawArrays(topology, first, count));
        Ok(())
    }

    unsafe fn draw_elements(
        &mut self,
        topology: Topology,
        first: u32,
        count: u32,
        _: IndexFormat,
        _: Option<i32>,
    ) -> Result<()> {
        self.log
            .push(NativeCall::DrawElements(topology, first, count));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn declarations() {
        let source = "
            #version 330
            uniform highp mat4 _MatMVP;
            uniform vec4 _Color, _Tint;
            uniform sampler2D _MainTex[4];
            in vec3 Position;
            void main() {}
        ";

        assert_eq!(
            scan_declarations(source, &["uniform"]),
            vec!["_MatMVP", "_Color", "_Tint", "_MainTex"]
        );

        assert_eq!(scan_declarations(source, &["in", "attribute"]), vec!["Position"]);
    }

    #[test]
    fn error_directive() {
        let source = ShaderSourceDescriptor::new(
            ShaderStage::Fragment,
            "#version 330\nvoid main() {}\n#error broken here\n",
        );

        let err = check_errors(&source).unwrap_err();
        match err.downcast::<Error>().unwrap() {
            Error::CompileFailure { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(log, "ERROR: 0:3: '#error' : broken here\n");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
