use std::fmt;
use std::hash::Hash;

/// The type of both halves of a `Handle`; two of them fit one 64-bits word.
pub type HandleIndex = u32;

/// A versioned index into some storage.
///
/// Indices are recycled once a handle is freed, so a stale copy could alias a
/// newer object living at the same index. Every pool bumps the `version` when
/// it frees a slot, which lets it reject stale handles cheaply. Live handles
/// carry odd versions, the default (nil) handle is never alive anywhere.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle {
    index: HandleIndex,
    version: HandleIndex,
}

impl Handle {
    #[inline]
    pub fn new(index: HandleIndex, version: HandleIndex) -> Self {
        Handle { index, version }
    }

    #[inline]
    pub fn nil() -> Self {
        Handle::default()
    }

    /// Returns false for the nil handle.
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Handle::nil()
    }

    /// Resets this handle to nil.
    #[inline]
    pub fn invalidate(&mut self) {
        *self = Handle::nil();
    }

    #[inline]
    pub fn index(self) -> HandleIndex {
        self.index
    }

    #[inline]
    pub fn version(self) -> HandleIndex {
        self.version
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Handle ({}, {})", self.index, self.version)
    }
}

/// Anything that wraps a `Handle`. Pools are generic over it so every resource
/// kind gets its own handle type.
pub trait HandleLike: fmt::Debug + Copy + Hash + Eq + Send + Sync {
    fn from_handle(handle: Handle) -> Self;
    fn handle(&self) -> Handle;

    #[inline]
    fn new(index: HandleIndex, version: HandleIndex) -> Self {
        Self::from_handle(Handle::new(index, version))
    }

    #[inline]
    fn index(&self) -> HandleIndex {
        self.handle().index
    }

    #[inline]
    fn version(&self) -> HandleIndex {
        self.handle().version
    }
}

impl HandleLike for Handle {
    #[inline]
    fn from_handle(handle: Handle) -> Self {
        handle
    }

    #[inline]
    fn handle(&self) -> Handle {
        *self
    }
}

/// Declares a typed handle wrapping `Handle`.
#[macro_export]
macro_rules! impl_handle {
    ($name:ident) => {
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($crate::utils::handle::Handle);

        impl $name {
            #[inline]
            pub fn index(self) -> $crate::utils::handle::HandleIndex {
                self.0.index()
            }

            #[inline]
            pub fn version(self) -> $crate::utils::handle::HandleIndex {
                self.0.version()
            }

            #[inline]
            pub fn is_valid(self) -> bool {
                self.0.is_valid()
            }
        }

        impl $crate::utils::handle::HandleLike for $name {
            #[inline]
            fn from_handle(handle: $crate::utils::handle::Handle) -> Self {
                $name(handle)
            }

            #[inline]
            fn handle(&self) -> $crate::utils::handle::Handle {
                self.0
            }
        }

        impl From<$crate::utils::handle::Handle> for $name {
            fn from(handle: $crate::utils::handle::Handle) -> Self {
                $name(handle)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(
                    f,
                    "{}({}, {})",
                    stringify!($name),
                    self.0.index(),
                    self.0.version()
                )
            }
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nil() {
        let mut h = Handle::new(2, 3);
        assert_eq!((h.index(), h.version()), (2, 3));
        assert!(h.is_valid());

        h.invalidate();
        assert_eq!(h, Handle::nil());
        assert!(!h.is_valid());
        assert!(Handle::new(0, 1).is_valid());
    }

    impl_handle!(SamplerHandle);

    #[test]
    fn typed() {
        let h = SamplerHandle::default();
        assert!(!h.is_valid());
        assert_eq!(h, SamplerHandle::from(Handle::nil()));

        let h = <SamplerHandle as HandleLike>::new(3, 1);
        assert_eq!(h.index(), 3);
        assert_eq!(h.handle(), Handle::new(3, 1));
        assert_eq!(format!("{}", h), "SamplerHandle(3, 1)");
    }
}
