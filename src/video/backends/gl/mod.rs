pub mod types;
pub mod visitor;

use std::os::raw::c_void;

use gl;

use crate::errors::*;

pub use self::visitor::GLVisitor;

impl GLVisitor {
    /// Loads the GL function pointers with `loader` and creates a visitor on
    /// the context current to this thread.
    pub unsafe fn load_with<F>(loader: F) -> Result<Self>
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);
        Self::new()
    }
}
