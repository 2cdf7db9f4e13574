//! Texture descriptors. A texture is a container of one or more images, it could
//! be sampled by programs or be attached to framebuffers as render target.

impl_handle!(TextureHandle);

/// The dimensionality of a texture, fixed at creation.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum TextureKind {
    Texture2D,
    Texture2DArray,
    Texture3D,
    Cubemap,
    CubemapArray,
}

impl TextureKind {
    #[inline]
    pub fn is_cubemap(self) -> bool {
        match self {
            TextureKind::Cubemap | TextureKind::CubemapArray => true,
            _ => false,
        }
    }

    /// Returns true if the third dimension shrinks along the mip chain.
    #[inline]
    pub fn is_volume(self) -> bool {
        self == TextureKind::Texture3D
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum CubemapFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubemapFace {
    pub const ALL: [CubemapFace; 6] = [
        CubemapFace::PositiveX,
        CubemapFace::NegativeX,
        CubemapFace::PositiveY,
        CubemapFace::NegativeY,
        CubemapFace::PositiveZ,
        CubemapFace::NegativeZ,
    ];
}

/// List of all the possible formats of a texture.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    R8,
    RG8,
    RGB8,
    RGBA8,
    R16F,
    RG16F,
    RGBA16F,
    R32F,
    RG32F,
    RGBA32F,
    R32UI,
    Depth16,
    Depth24,
    Depth32F,
    Depth24Stencil8,
}

impl TextureFormat {
    /// Returns the size in bytes of a single texel.
    pub fn size(self) -> u32 {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::RG8 => 2,
            TextureFormat::RGB8 => 3,
            TextureFormat::RGBA8 => 4,
            TextureFormat::R16F => 2,
            TextureFormat::RG16F => 4,
            TextureFormat::RGBA16F => 8,
            TextureFormat::R32F => 4,
            TextureFormat::RG32F => 8,
            TextureFormat::RGBA32F => 16,
            TextureFormat::R32UI => 4,
            TextureFormat::Depth16 => 2,
            TextureFormat::Depth24 => 4,
            TextureFormat::Depth32F => 4,
            TextureFormat::Depth24Stencil8 => 4,
        }
    }

    #[inline]
    pub fn is_depth(self) -> bool {
        match self {
            TextureFormat::Depth16
            | TextureFormat::Depth24
            | TextureFormat::Depth32F
            | TextureFormat::Depth24Stencil8 => true,
            _ => false,
        }
    }

    #[inline]
    pub fn is_color(self) -> bool {
        !self.is_depth()
    }
}

/// Sets the wrap parameter for texture.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum TextureWrap {
    /// Samples at coord x + 1 map to coord x.
    Repeat,
    /// Samples at coord x + 1 map to coord 1 - x.
    Mirror,
    /// Samples at coord x + 1 map to coord 1.
    Clamp,
}

/// The texture coordinate axis a wrap mode applies to.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TextureAxis {
    S,
    T,
    R,
}

/// Specify how the texture is used whenever the pixel being sampled.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

impl TextureFilter {
    #[inline]
    pub fn uses_mipmaps(self) -> bool {
        match self {
            TextureFilter::Nearest | TextureFilter::Linear => false,
            _ => true,
        }
    }
}

/// The tracked description of a texture object. Storage is established by the
/// first level-0 image upload, not at creation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureParams {
    pub kind: TextureKind,
    pub format: TextureFormat,
    /// The width, height and depth (or layers) of level 0.
    pub dimensions: (u32, u32, u32),
    /// The number of allocated mip levels, zero if there is no storage yet.
    pub levels: u32,
}

impl TextureParams {
    pub fn new(kind: TextureKind, format: TextureFormat) -> Self {
        TextureParams {
            kind,
            format,
            dimensions: (0, 0, 0),
            levels: 0,
        }
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.levels > 0
    }

    /// Returns the dimensions of mip `level`.
    pub fn level_dimensions(&self, level: u32) -> (u32, u32, u32) {
        let (w, h, d) = self.dimensions;
        let d = if self.kind.is_volume() {
            (d >> level).max(1)
        } else {
            d
        };

        ((w >> level).max(1), (h >> level).max(1), d)
    }

    /// Returns the byte length of a region with the texture's format.
    #[inline]
    pub fn region_len(&self, width: u32, height: u32, depth: u32) -> usize {
        self.format.size() as usize * width as usize * height as usize * depth as usize
    }
}

/// Returns the length of a complete mip chain of the given extents.
pub fn mip_levels(width: u32, height: u32, depth: u32) -> u32 {
    let v = width.max(height).max(depth).max(1);
    32 - v.leading_zeros()
}
