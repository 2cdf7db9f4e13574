//! The frame-level facade over the device.
//!
//! `Graphics` owns the device together with the state shared by every material
//! and pass: the shader variant cache, the global keywords, the pool of
//! temporary render textures and the queue of work dispatched from other
//! threads. It is confined to the rendering thread like the device.

use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};

use crate::errors;
use crate::math::{Matrix4, Rect, SquareMatrix};

use super::assets::prelude::*;
use super::backends::headless::HeadlessVisitor;
use super::backends::Visitor;
use super::device::{FrameInfo, GraphicsDevice};
use super::dispatch::DispatchQueue;
use super::errors::*;
use super::material::Material;
use super::mesh::Mesh;
use super::property_block::SharedTexture;
use super::render_texture::{RenderTexture, RenderTexturePool};
use super::settings::GraphicsParams;
use super::shader::keywords::{GlobalKeywords, KeywordSet};
use super::shader::variant::{ShaderVariant, VariantCache};
use super::shader::Shader;

const BLIT_VS: &str = "#version 330
in vec2 Position;
in vec2 Texcoord0;
out vec2 v_Texcoord;
void main() {
    gl_Position = vec4(Position, 0.0, 1.0);
    v_Texcoord = Texcoord0;
}";

const BLIT_FS: &str = "#version 330
in vec2 v_Texcoord;
uniform sampler2D _MainTex;
out vec4 o_Color;
void main() {
    o_Color = texture(_MainTex, v_Texcoord);
}";

/// Packs an object id into the RGBA8 texel written by picking passes.
pub fn encode_object_id(id: u32) -> [u8; 4] {
    let mut texel = [0; 4];
    LittleEndian::write_u32(&mut texel, id);
    texel
}

/// Unpacks an object id out of an RGBA8 texel.
pub fn decode_object_id(texel: [u8; 4]) -> u32 {
    LittleEndian::read_u32(&texel)
}

pub struct Graphics {
    quad: Option<Mesh>,
    blit: Rc<Shader>,
    pool: RenderTexturePool,
    variants: VariantCache,
    globals: GlobalKeywords,
    dispatch: DispatchQueue,
    params: GraphicsParams,
    frame: u64,
    time: f32,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    dimensions: (u32, u32),
    // Dropped last, after everything it owns has been queued for release.
    device: GraphicsDevice,
}

impl Graphics {
    /// Creates and initializes a device on top of `visitor`.
    pub fn new(visitor: Box<dyn Visitor>, params: GraphicsParams) -> errors::Result<Self> {
        let mut device = GraphicsDevice::new(visitor, params)?;
        device.initialize()?;

        let quad = Mesh::fullscreen_quad(&mut device)?;
        let blit = Shader::from_sources("Hidden/Blit", RasterizerState::overlay(), BLIT_VS, BLIT_FS)?;

        Ok(Graphics {
            quad: Some(quad),
            blit: Rc::new(blit),
            pool: RenderTexturePool::new(params.pool_eviction_frames),
            variants: VariantCache::new(),
            globals: GlobalKeywords::new(),
            dispatch: DispatchQueue::new(),
            params,
            frame: 0,
            time: 0.0,
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            dimensions: (0, 0),
            device,
        })
    }

    /// Creates a facade over a `HeadlessVisitor`.
    pub fn headless(params: GraphicsParams) -> errors::Result<Self> {
        Graphics::new(Box::new(HeadlessVisitor::new()), params)
    }

    /// Releases the resources owned by the facade, then shuts the device down.
    pub fn shutdown(&mut self) -> errors::Result<()> {
        self.quad = None;
        self.pool.clear();
        self.variants.clear();
        self.device.shutdown()?;
        Ok(())
    }

    #[inline]
    pub fn device(&self) -> &GraphicsDevice {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut GraphicsDevice {
        &mut self.device
    }

    #[inline]
    pub fn params(&self) -> &GraphicsParams {
        &self.params
    }

    #[inline]
    pub fn globals(&self) -> &GlobalKeywords {
        &self.globals
    }

    #[inline]
    pub fn globals_mut(&mut self) -> &mut GlobalKeywords {
        &mut self.globals
    }

    #[inline]
    pub fn variants(&self) -> &VariantCache {
        &self.variants
    }

    #[inline]
    pub fn variants_mut(&mut self) -> &mut VariantCache {
        &mut self.variants
    }

    #[inline]
    pub fn pool(&self) -> &RenderTexturePool {
        &self.pool
    }

    /// Returns a queue other threads can hand work to the rendering thread with.
    #[inline]
    pub fn dispatcher(&self) -> DispatchQueue {
        self.dispatch.clone()
    }

    /// The index of the current frame, starting at 1 with the first `begin_frame`.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Sets the time in seconds fed to the `_Time` uniform.
    #[inline]
    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    pub fn set_camera(&mut self, view: Matrix4<f32>, projection: Matrix4<f32>) {
        self.view = view;
        self.projection = projection;
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Resizes the default framebuffer, the viewport follows.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.dimensions = (width, height);
        self.device.update_viewport(self.screen())
    }

    fn screen(&self) -> Rect {
        Rect::from_size(0, 0, self.dimensions.0 as i32, self.dimensions.1 as i32)
    }

    /// Returns the variant of `shader` with the `keywords` and the global keywords enabled.
    pub fn variant(&mut self, shader: &Shader, keywords: &KeywordSet) -> Result<Rc<ShaderVariant>> {
        self.variants
            .get_or_compile(&mut self.device, shader, keywords, &self.globals)
    }

    /// Starts a frame: runs the dispatched work, releases what has been dropped
    /// and brings the device back to the default state.
    pub fn begin_frame(&mut self) -> errors::Result<()> {
        self.frame += 1;

        let queue = self.dispatch.clone();
        let limit = self.params.max_dispatch_per_frame;
        queue.drain(self, limit);

        self.pool.update(self.frame);
        self.device.collect()?;
        self.device.reset_frame_info();

        self.device.set_state(&RasterizerState::default(), true)?;
        self.device.set_enable_scissor_test(false, true)?;
        self.device.unbind_framebuffer()?;

        if self.dimensions.0 > 0 && self.dimensions.1 > 0 {
            self.device.update_viewport(self.screen())?;
        }

        Ok(())
    }

    /// Ends a frame and returns its counters.
    pub fn end_frame(&mut self) -> errors::Result<FrameInfo> {
        Ok(self.device.frame_info())
    }

    /// Draws `mesh` with pass `pass` of `material` right away. The default
    /// uniforms `_MatModel`, `_MatView`, `_MatProjection`, `_MatMVP` and
    /// `_Time` are written after the material properties.
    pub fn draw_mesh_now(
        &mut self,
        mesh: &Mesh,
        model: Matrix4<f32>,
        material: &mut Material,
        pass: usize,
    ) -> Result<()> {
        material.set_pass(self, pass, true)?;

        let mvp = self.projection * self.view * model;
        self.device.set_uniform("_MatModel", model)?;
        self.device.set_uniform("_MatView", self.view)?;
        self.device.set_uniform("_MatProjection", self.projection)?;
        self.device.set_uniform("_MatMVP", mvp)?;
        self.device.set_uniform("_Time", self.time)?;

        mesh.draw(&mut self.device)
    }

    /// Copies `source` into `dest` with a full-screen pass, `None` stands for
    /// the default framebuffer.
    pub fn blit(&mut self, source: TextureHandle, dest: Option<&RenderTexture>) -> Result<()> {
        let rect = dest.map(|v| v.rect()).unwrap_or_else(|| self.screen());
        self.device
            .bind_framebuffer(dest.map(|v| v.framebuffer()), FrameBufferTarget::Framebuffer)?;
        self.device.update_viewport(rect)?;

        let blit = self.blit.clone();
        let variant = self.variant(&blit, &KeywordSet::new())?;
        let pass = variant
            .pass(0)
            .ok_or_else(|| Error::InvalidOperation("blit shader has no pass".to_owned()))?;

        self.device.set_state(&pass.state, false)?;
        self.device.bind_program(Some(pass.program()))?;
        self.device.set_uniform_texture("_MainTex", 1, source)?;

        let quad = self.quad.as_ref().ok_or(Error::NotInitialized)?;
        quad.draw(&mut self.device)
    }

    /// Copies the depth of `source` into `dest`, `None` stands for the default
    /// framebuffer.
    pub fn blit_depth(&mut self, source: &RenderTexture, dest: Option<&RenderTexture>) -> Result<()> {
        if source.depth().is_none() {
            return Err(Error::InvalidOperation(format!(
                "{} has no depth attachment",
                source.framebuffer()
            )));
        }

        let rect = dest.map(|v| v.rect()).unwrap_or_else(|| self.screen());
        self.device
            .bind_framebuffer(Some(source.framebuffer()), FrameBufferTarget::Read)?;
        self.device
            .bind_framebuffer(dest.map(|v| v.framebuffer()), FrameBufferTarget::Draw)?;

        self.device
            .blit_framebuffer(source.rect(), rect, ClearFlags::DEPTH, BlitFilter::Nearest)
    }

    /// Creates a 2D texture with a complete mip chain, level 0 is filled with `data`.
    pub fn create_texture_2d(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: Option<&[u8]>,
    ) -> Result<SharedTexture> {
        let handle = self.device.create_texture(TextureKind::Texture2D, format)?;
        let texture = Rc::new(self.device.own(handle));
        self.device
            .tex_image(handle, None, 0, (width, height, 1), data)?;
        Ok(texture)
    }

    /// Returns a pooled render texture, see `RenderTexturePool::get_temporary`.
    pub fn get_temporary_rt(
        &mut self,
        width: u32,
        height: u32,
        formats: &[TextureFormat],
    ) -> Result<RenderTexture> {
        self.pool
            .get_temporary(&mut self.device, width, height, formats)
    }

    pub fn release_temporary_rt(&mut self, texture: RenderTexture) -> bool {
        self.pool.release_temporary(texture)
    }

    /// Reads back the object id at `(x, y)` of an RGBA8 color attachment of
    /// `target`. This stalls until the GPU catches up.
    pub fn pick(&mut self, target: &RenderTexture, attachment: usize, x: i32, y: i32) -> Result<u32> {
        self.device
            .bind_framebuffer(Some(target.framebuffer()), FrameBufferTarget::Read)?;

        let texel: [u8; 4] = self
            .device
            .read_pixel(attachment, x, y, TextureFormat::RGBA8)?;

        Ok(decode_object_id(texel))
    }
}

impl Drop for Graphics {
    fn drop(&mut self) {
        if self.device.is_initialized() {
            if let Err(err) = self.shutdown() {
                error!("{}", err);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn object_ids() {
        assert_eq!(encode_object_id(0x0403_0201), [1, 2, 3, 4]);
        assert_eq!(decode_object_id([0xff, 0, 0, 0]), 255);
        assert_eq!(decode_object_id(encode_object_id(77_000)), 77_000);
    }
}
