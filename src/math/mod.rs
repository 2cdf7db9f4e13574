//! This module contains the math utils that mainly comes from `cgmath`.

pub use cgmath::*;

mod color;
pub use self::color::Color;

mod rect;
pub use self::rect::Rect;

pub mod prelude {
    pub use super::{Color, Rect};
    pub use cgmath::prelude::*;
    pub use cgmath::{Matrix4, Point2, Vector2, Vector3, Vector4};
}
