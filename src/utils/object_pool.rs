use super::handle::HandleLike;
use super::handle_pool::{HandlePool, Iter};

/// Values addressed by versioned handles. The device keeps the description of
/// every native object it owns in one of these.
pub struct ObjectPool<H: HandleLike, T> {
    handles: HandlePool<H>,
    slots: Vec<Option<T>>,
}

impl<H: HandleLike, T> Default for ObjectPool<H, T> {
    fn default() -> Self {
        ObjectPool {
            handles: HandlePool::new(),
            slots: Vec::new(),
        }
    }
}

impl<H: HandleLike, T> ObjectPool<H, T> {
    pub fn new() -> Self {
        ObjectPool::default()
    }

    /// Stores `value` under a fresh handle. Freed indices are reused first.
    pub fn create(&mut self, value: T) -> H {
        let handle = self.handles.create();
        let index = handle.index() as usize;

        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }

        self.slots[index] = Some(value);
        handle
    }

    #[inline]
    pub fn get(&self, handle: H) -> Option<&T> {
        if !self.handles.contains(handle) {
            return None;
        }

        self.slots[handle.index() as usize].as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        if !self.handles.contains(handle) {
            return None;
        }

        self.slots[handle.index() as usize].as_mut()
    }

    #[inline]
    pub fn contains(&self, handle: H) -> bool {
        self.handles.contains(handle)
    }

    /// Removes the value of `handle`. Stale handles free nothing.
    pub fn free(&mut self, handle: H) -> Option<T> {
        if !self.handles.free(handle) {
            return None;
        }

        self.slots[handle.index() as usize].take()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Iterates the alive handles.
    #[inline]
    pub fn iter(&self) -> Iter<H> {
        self.handles.iter()
    }

    /// Snapshots the alive handles, which allows freeing while walking them.
    pub fn handles(&self) -> Vec<H> {
        self.handles.iter().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::handle::Handle;

    #[test]
    fn recycled_slots() {
        let mut pool = ObjectPool::<Handle, &'static str>::new();

        let a = pool.create("a");
        assert_eq!(pool.free(a), Some("a"));
        let b = pool.create("b");

        assert_eq!(a.index(), b.index());
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.get(b), Some(&"b"));
        assert_eq!(pool.free(a), None);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn free_while_walking() {
        let mut pool = ObjectPool::<Handle, u32>::new();
        for i in 0..4 {
            pool.create(i);
        }

        for handle in pool.handles() {
            pool.free(handle);
        }

        assert!(pool.is_empty());
        assert_eq!(pool.iter().count(), 0);
    }
}
