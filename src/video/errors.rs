use super::assets::prelude::*;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Backend: {}", _0)]
    Backend(String),
    #[fail(display = "{} is invalid.", _0)]
    BufferHandleInvalid(BufferHandle),
    #[fail(display = "{} is invalid.", _0)]
    TextureHandleInvalid(TextureHandle),
    #[fail(display = "{} is invalid.", _0)]
    VertexArrayHandleInvalid(VertexArrayHandle),
    #[fail(display = "{} is invalid.", _0)]
    FrameBufferHandleInvalid(FrameBufferHandle),
    #[fail(display = "{} is invalid.", _0)]
    ProgramHandleInvalid(ProgramHandle),
    #[fail(display = "Failed to compile {} shader, errors: \n{}", stage, log)]
    CompileFailure { stage: ShaderStage, log: String },
    #[fail(display = "Failed to link program, errors: \n{}", _0)]
    LinkFailure(String),
    #[fail(display = "Circular include: {}.", _0)]
    CircularInclude(String),
    #[fail(display = "Can not resolve include \'{}\'.", _0)]
    IncludeNotFound(String),
    #[fail(display = "Out of bounds: {}.", _0)]
    OutOfBounds(String),
    #[fail(display = "Trying to draw without a bound program.")]
    NoProgramBound,
    #[fail(display = "Trying to draw without a bound vertex array.")]
    NoVertexArrayBound,
    #[fail(display = "Texture slot {} exceeds the {} configured slots.", slot, max)]
    TextureSlotOutOfRange { slot: usize, max: usize },
    #[fail(display = "Framebuffer is incomplete: {}.", _0)]
    IncompleteFrameBuffer(String),
    #[fail(display = "The graphics device has not been initialized.")]
    NotInitialized,
    #[fail(display = "The graphics device has been initialized already.")]
    AlreadyInitialized,
    #[fail(display = "{} graphics resources leaked.", _0)]
    ResourceLeak(usize),
    #[fail(display = "Invalid operation: {}.", _0)]
    InvalidOperation(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl From<::failure::Error> for Error {
    fn from(err: ::failure::Error) -> Error {
        match err.downcast::<Error>() {
            Ok(v) => v,
            Err(err) => Error::Backend(format!("{}", err)),
        }
    }
}
