//! Render targets and the pool recycling temporary ones.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::math::Rect;
use crate::utils::hash::FastHashMap;

use super::assets::prelude::*;
use super::device::GraphicsDevice;
use super::errors::*;
use super::property_block::SharedTexture;
use super::resource::GraphicsObject;

/// The shape of a render texture: dimensions, color formats in attachment
/// order and the depth format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderTextureKey {
    pub width: u32,
    pub height: u32,
    pub formats: SmallVec<[TextureFormat; 4]>,
    pub depth: Option<TextureFormat>,
}

/// Color textures, an optional depth texture and the framebuffer binding them.
#[derive(Debug)]
pub struct RenderTexture {
    framebuffer: GraphicsObject<FrameBufferHandle>,
    colors: Vec<SharedTexture>,
    depth: Option<GraphicsObject<TextureHandle>>,
    key: RenderTextureKey,
}

impl RenderTexture {
    pub fn new(
        device: &mut GraphicsDevice,
        width: u32,
        height: u32,
        formats: &[TextureFormat],
        depth: Option<TextureFormat>,
    ) -> Result<Self> {
        let mut attachments: SmallVec<[Attachment; 4]> = SmallVec::new();

        let mut colors = Vec::with_capacity(formats.len());
        for &format in formats {
            let texture = target(device, width, height, format)?;
            attachments.push(Attachment::Color(texture.handle()));
            colors.push(Rc::new(texture));
        }

        let depth_format = depth;
        let depth = match depth {
            Some(format) => {
                let texture = target(device, width, height, format)?;
                attachments.push(Attachment::Depth(texture.handle()));
                Some(texture)
            }
            None => None,
        };

        let framebuffer = device.create_framebuffer(&attachments)?;

        Ok(RenderTexture {
            framebuffer: device.own(framebuffer),
            colors,
            depth,
            key: RenderTextureKey {
                width,
                height,
                formats: formats.iter().cloned().collect(),
                depth: depth_format,
            },
        })
    }

    #[inline]
    pub fn framebuffer(&self) -> FrameBufferHandle {
        self.framebuffer.handle()
    }

    #[inline]
    pub fn color(&self, index: usize) -> Option<&SharedTexture> {
        self.colors.get(index)
    }

    #[inline]
    pub fn colors(&self) -> &[SharedTexture] {
        &self.colors
    }

    #[inline]
    pub fn depth(&self) -> Option<TextureHandle> {
        self.depth.as_ref().map(|v| v.handle())
    }

    /// Returns true if any of the textures has been disposed by a sharer.
    pub fn is_disposed(&self) -> bool {
        self.colors.iter().any(|v| v.is_disposed())
            || self.depth.as_ref().map_or(false, |v| v.is_disposed())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.key.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.key.height
    }

    #[inline]
    pub fn formats(&self) -> &[TextureFormat] {
        &self.key.formats
    }

    #[inline]
    pub fn key(&self) -> &RenderTextureKey {
        &self.key
    }

    /// The full extent of the render texture in pixels.
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::from_size(0, 0, self.key.width as i32, self.key.height as i32)
    }
}

fn target(
    device: &mut GraphicsDevice,
    width: u32,
    height: u32,
    format: TextureFormat,
) -> Result<GraphicsObject<TextureHandle>> {
    let handle = device.create_texture(TextureKind::Texture2D, format)?;
    let texture = device.own(handle);

    device.tex_image(handle, None, 0, (width, height, 1), None)?;
    device.set_texture_filter(handle, TextureFilter::Linear, TextureFilter::Linear)?;
    device.set_texture_wrap(handle, TextureAxis::S, TextureWrap::Clamp)?;
    device.set_texture_wrap(handle, TextureAxis::T, TextureWrap::Clamp)?;
    Ok(texture)
}

/// The depth format of every pooled render texture.
pub const POOLED_DEPTH_FORMAT: TextureFormat = TextureFormat::Depth24;

#[derive(Debug)]
struct Pooled {
    frame: u64,
    texture: RenderTexture,
}

/// Temporary render textures recycled across frames.
///
/// Released textures wait in a bucket of their shape. A texture released at
/// frame `f` is destroyed by the first `update` past `f + window`.
#[derive(Debug)]
pub struct RenderTexturePool {
    buckets: FastHashMap<RenderTextureKey, Vec<Pooled>>,
    frame: u64,
    window: u64,
    allocations: usize,
}

impl RenderTexturePool {
    pub fn new(window: u64) -> Self {
        RenderTexturePool {
            buckets: FastHashMap::default(),
            frame: 0,
            window,
            allocations: 0,
        }
    }

    /// Returns a render texture of the given shape, recycling a pooled one if
    /// possible. Pooled render textures always carry a 24-bits depth texture.
    pub fn get_temporary(
        &mut self,
        device: &mut GraphicsDevice,
        width: u32,
        height: u32,
        formats: &[TextureFormat],
    ) -> Result<RenderTexture> {
        let key = RenderTextureKey {
            width,
            height,
            formats: formats.iter().cloned().collect(),
            depth: Some(POOLED_DEPTH_FORMAT),
        };

        if let Some(v) = self.buckets.get_mut(&key).and_then(|v| v.pop()) {
            return Ok(v.texture);
        }

        let texture = RenderTexture::new(
            device,
            width,
            height,
            formats,
            Some(POOLED_DEPTH_FORMAT),
        )?;

        self.allocations += 1;
        Ok(texture)
    }

    /// Puts a render texture back into the pool, tagged with the current frame.
    ///
    /// Render textures that `get_temporary` would not hand out, like ones
    /// without the pooled depth texture or with disposed attachments, are
    /// destroyed instead. Returns true if the texture was pooled.
    pub fn release_temporary(&mut self, texture: RenderTexture) -> bool {
        if texture.key.depth != Some(POOLED_DEPTH_FORMAT) {
            warn!(
                "Render texture {} does not carry the pooled depth format, destroyed.",
                texture.framebuffer()
            );
            return false;
        }

        if texture.is_disposed() {
            warn!(
                "Render texture {} has disposed attachments, destroyed.",
                texture.framebuffer()
            );
            return false;
        }

        let frame = self.frame;
        self.buckets
            .entry(texture.key.clone())
            .or_insert_with(Vec::new)
            .push(Pooled { frame, texture });
        true
    }

    /// Advances to `frame` and destroys the textures that stayed unused for
    /// longer than the window. Returns how many were destroyed.
    pub fn update(&mut self, frame: u64) -> usize {
        self.frame = frame;

        let window = self.window;
        let mut evicted = 0;
        for bucket in self.buckets.values_mut() {
            let len = bucket.len();
            bucket.retain(|v| frame.saturating_sub(v.frame) <= window);
            evicted += len - bucket.len();
        }

        self.buckets.retain(|_, v| !v.is_empty());

        if evicted > 0 {
            debug!("{} pooled render textures evicted at frame {}.", evicted, frame);
        }

        evicted
    }

    /// The number of render textures waiting in the pool.
    pub fn len(&self) -> usize {
        self.buckets.values().map(|v| v.len()).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of render textures allocated by `get_temporary` so far.
    #[inline]
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Destroys every pooled render texture.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
