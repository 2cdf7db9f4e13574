//! The low-level graphics layer.
//!
//! Every native graphics object is owned by the `GraphicsDevice` and addressed
//! with a versioned handle. The device validates requests, tracks bindings and
//! pipeline state so redundant native calls are skipped, and forwards what is
//! left to a `backends::Visitor`.
//!
//! All the types in this module are bound to the rendering thread. Work coming
//! from other threads is handed over through the `DispatchQueue` and executed
//! at the beginning of the next frame.
//!
//! On top of the device sit materials with their keyword-driven shader variant
//! cache, a pool of temporary render textures and the `Graphics` facade that
//! orchestrates frames.

pub const MAX_TEXTURE_SLOTS: usize = 16;
pub const MAX_VERTEX_ATTRIBUTES: usize = 12;
pub const MAX_COLOR_ATTACHMENTS: usize = 8;
pub const DEFAULT_POOL_EVICTION_FRAMES: u64 = 10;

pub mod assets;
pub mod backends;
pub mod errors;
pub mod settings;

pub mod device;
pub mod dispatch;
pub mod resource;

pub mod material;
pub mod mesh;
pub mod property_block;
pub mod shader;

pub mod graphics;
pub mod render_texture;

pub use self::settings::GraphicsParams;

pub mod prelude {
    pub use super::assets::prelude::*;
    pub use super::backends::headless::{CallLog, HeadlessVisitor, NativeCall};
    pub use super::backends::Visitor;
    pub use super::device::{FrameInfo, GraphicsDevice};
    pub use super::dispatch::DispatchQueue;
    pub use super::errors::Error as GraphicsError;
    pub use super::graphics::Graphics;
    pub use super::material::Material;
    pub use super::mesh::{IndexData, Mesh, MeshData};
    pub use super::property_block::MaterialPropertyBlock;
    pub use super::render_texture::{RenderTexture, RenderTexturePool};
    pub use super::resource::GraphicsObject;
    pub use super::settings::GraphicsParams;
    pub use super::shader::prelude::*;
}
