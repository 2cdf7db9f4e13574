//! Owning wrappers of device resources.
//!
//! A `GraphicsObject` releases its resource exactly once, either when
//! `dispose` is called or when it is dropped. Releasing only queues the handle,
//! the device deletes the native object on the rendering thread the next time
//! it collects.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::utils::handle::HandleLike;

use super::assets::prelude::*;

/// A resource handle of any kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    Buffer(BufferHandle),
    Texture(TextureHandle),
    VertexArray(VertexArrayHandle),
    FrameBuffer(FrameBufferHandle),
    Program(ProgramHandle),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Resource::Buffer(h) => write!(f, "{}", h),
            Resource::Texture(h) => write!(f, "{}", h),
            Resource::VertexArray(h) => write!(f, "{}", h),
            Resource::FrameBuffer(h) => write!(f, "{}", h),
            Resource::Program(h) => write!(f, "{}", h),
        }
    }
}

/// Handles that name a device resource.
pub trait ResourceHandle: HandleLike + fmt::Display {
    fn resource(self) -> Resource;
}

macro_rules! impl_resource_handle {
    ($handle:ident, $variant:ident) => {
        impl ResourceHandle for $handle {
            #[inline]
            fn resource(self) -> Resource {
                Resource::$variant(self)
            }
        }

        impl From<$handle> for Resource {
            fn from(handle: $handle) -> Self {
                Resource::$variant(handle)
            }
        }
    };
}

impl_resource_handle!(BufferHandle, Buffer);
impl_resource_handle!(TextureHandle, Texture);
impl_resource_handle!(VertexArrayHandle, VertexArray);
impl_resource_handle!(FrameBufferHandle, FrameBuffer);
impl_resource_handle!(ProgramHandle, Program);

/// The resources released since the last collection. It is shared between the
/// device and the objects it hands out, and never leaves the rendering thread.
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue(Rc<RefCell<Vec<Resource>>>);

impl ReleaseQueue {
    pub fn new() -> Self {
        ReleaseQueue::default()
    }

    pub fn push<T: Into<Resource>>(&self, resource: T) {
        self.0.borrow_mut().push(resource.into());
    }

    /// Takes every queued resource in release order.
    pub fn drain(&self) -> Vec<Resource> {
        ::std::mem::replace(&mut *self.0.borrow_mut(), Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An owned device resource.
///
/// The object is neither `Clone` nor `Send`. Shared ownership goes through
/// `Rc`, which is why `dispose` only needs a shared reference.
pub struct GraphicsObject<H: ResourceHandle> {
    handle: H,
    disposed: Cell<bool>,
    queue: ReleaseQueue,
}

impl<H: ResourceHandle> GraphicsObject<H> {
    pub(crate) fn new(handle: H, queue: ReleaseQueue) -> Self {
        GraphicsObject {
            handle,
            disposed: Cell::new(false),
            queue,
        }
    }

    #[inline]
    pub fn handle(&self) -> H {
        self.handle
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Releases the resource. Calling it more than once does nothing.
    pub fn dispose(&self) {
        if !self.disposed.replace(true) {
            self.queue.push(self.handle.resource());
        }
    }
}

impl<H: ResourceHandle> fmt::Debug for GraphicsObject<H> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GraphicsObject")
            .field("handle", &self.handle)
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

impl<H: ResourceHandle> Drop for GraphicsObject<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dispose_once() {
        let queue = ReleaseQueue::new();
        let handle = TextureHandle::new(1, 1);

        let object = GraphicsObject::new(handle, queue.clone());
        assert!(!object.is_disposed());

        object.dispose();
        object.dispose();
        assert!(object.is_disposed());
        assert_eq!(queue.len(), 1);

        drop(object);
        assert_eq!(queue.drain(), vec![Resource::Texture(handle)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drop_releases() {
        let queue = ReleaseQueue::new();
        {
            let _buffer = GraphicsObject::new(BufferHandle::new(3, 1), queue.clone());
        }

        assert_eq!(queue.drain(), vec![Resource::Buffer(BufferHandle::new(3, 1))]);
    }
}
