//! The low-level graphics layer of crayon.
//!
//! A `GraphicsDevice` owns every native resource behind a versioned handle and
//! filters redundant native calls through its state and binding caches. On top
//! of it sit materials with keyword-driven shader variants, a pool of
//! temporary render textures and the `Graphics` frame facade.
//!
//! Everything here is bound to the rendering thread, other threads hand work
//! over with a `DispatchQueue`.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

#[macro_use]
pub mod utils;
pub mod errors;
pub mod math;
pub mod video;

pub mod prelude;
