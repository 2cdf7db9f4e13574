//! Framebuffer descriptors.

use std::ops::BitOr;

use smallvec::SmallVec;

use super::texture::TextureHandle;

impl_handle!(FrameBufferHandle);

/// A framebuffer attachment. Color attachments are indexed in declaration order.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Attachment {
    Color(TextureHandle),
    Depth(TextureHandle),
}

impl Attachment {
    #[inline]
    pub fn texture(self) -> TextureHandle {
        match self {
            Attachment::Color(v) | Attachment::Depth(v) => v,
        }
    }
}

/// The bind target of a framebuffer.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum FrameBufferTarget {
    Read,
    Draw,
    /// Both read and draw.
    Framebuffer,
}

/// The tracked description of a framebuffer object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBufferParams {
    pub attachments: SmallVec<[Attachment; 4]>,
    pub dimensions: (u32, u32),
}

impl FrameBufferParams {
    /// Returns the texture of the `index`th color attachment.
    pub fn color(&self, index: usize) -> Option<TextureHandle> {
        self.attachments
            .iter()
            .filter_map(|v| match *v {
                Attachment::Color(h) => Some(h),
                _ => None,
            })
            .nth(index)
    }

    pub fn depth(&self) -> Option<TextureHandle> {
        self.attachments.iter().find_map(|v| match *v {
            Attachment::Depth(h) => Some(h),
            _ => None,
        })
    }
}

/// Buffer bits used by clear and blit operations.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
pub struct ClearFlags(u8);

impl ClearFlags {
    pub const NONE: ClearFlags = ClearFlags(0);
    pub const COLOR: ClearFlags = ClearFlags(0x1);
    pub const DEPTH: ClearFlags = ClearFlags(0x2);
    pub const STENCIL: ClearFlags = ClearFlags(0x4);

    #[inline]
    pub fn contains(self, other: ClearFlags) -> bool {
        (self.0 & other.0) == other.0 && other.0 != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ClearFlags {
    type Output = ClearFlags;

    fn bitor(self, rhs: ClearFlags) -> ClearFlags {
        ClearFlags(self.0 | rhs.0)
    }
}

/// The interpolation applied when a blit rescales.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BlitFilter {
    Nearest,
    Linear,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::handle::HandleLike;

    #[test]
    fn flags() {
        let flags = ClearFlags::COLOR | ClearFlags::DEPTH;
        assert!(flags.contains(ClearFlags::COLOR));
        assert!(flags.contains(ClearFlags::DEPTH));
        assert!(!flags.contains(ClearFlags::STENCIL));
        assert!(!flags.contains(ClearFlags::NONE));
        assert!(ClearFlags::NONE.is_empty());
    }

    #[test]
    fn attachments() {
        let c0 = TextureHandle::new(1, 1);
        let c1 = TextureHandle::new(2, 1);
        let d = TextureHandle::new(3, 1);

        let mut params = FrameBufferParams {
            attachments: SmallVec::new(),
            dimensions: (4, 4),
        };

        params.attachments.push(Attachment::Depth(d));
        params.attachments.push(Attachment::Color(c0));
        params.attachments.push(Attachment::Color(c1));

        assert_eq!(params.color(0), Some(c0));
        assert_eq!(params.color(1), Some(c1));
        assert_eq!(params.color(2), None);
        assert_eq!(params.depth(), Some(d));
    }
}
