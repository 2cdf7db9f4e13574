//! GPU buffer descriptors.

impl_handle!(BufferHandle);

/// The logical slot a buffer is bound to.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
    Structured,
}

impl BufferKind {
    pub const COUNT: usize = 4;

    #[inline]
    pub fn index(self) -> usize {
        match self {
            BufferKind::Vertex => 0,
            BufferKind::Index => 1,
            BufferKind::Uniform => 2,
            BufferKind::Structured => 3,
        }
    }
}

/// Hint abouts the intended update strategy of the data. It only affects the
/// native allocation strategy, updates are never rejected because of it.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum BufferHint {
    /// The resource is initialized with data and cannot be changed later, this
    /// is the most common and most efficient usage.
    Immutable,
    /// The resource is initialized without data, but will be be updated by the
    /// CPU in each frame.
    Stream,
    /// The resource is initialized without data and will be written by the CPU
    /// before use, updates will be infrequent.
    Dynamic,
}

impl BufferHint {
    #[inline]
    pub fn from_dynamic(dynamic: bool) -> Self {
        if dynamic {
            BufferHint::Dynamic
        } else {
            BufferHint::Immutable
        }
    }
}

/// The tracked description of a buffer object.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferParams {
    pub kind: BufferKind,
    pub hint: BufferHint,
    /// Size in bytes of the last full upload.
    pub size: usize,
}
