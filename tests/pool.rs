extern crate crayon_graphics;
extern crate rand;

use crayon_graphics::prelude::*;

#[test]
fn handle_set() {
    let mut set: HandlePool<Handle> = HandlePool::new();
    assert_eq!(set.len(), 0);

    let e1 = set.create();
    assert!(e1.is_valid());
    assert!(set.contains(e1));
    assert_eq!(set.len(), 1);

    let mut e2 = e1;
    e2.invalidate();
    assert!(!e2.is_valid());
    assert!(!set.contains(e2));
    assert!(set.contains(e1));

    assert!(set.free(e1));
    assert!(!set.free(e1));
    assert!(!set.contains(e1));
    assert_eq!(set.len(), 0);
}

#[test]
fn stale_handles() {
    let mut set: HandlePool<TextureHandle> = HandlePool::new();

    let h1 = set.create();
    set.free(h1);

    // The index is recycled with a newer version.
    let h2 = set.create();
    assert_eq!(h1.index(), h2.index());
    assert_ne!(h1.version(), h2.version());
    assert!(!set.contains(h1));
    assert!(set.contains(h2));
}

#[test]
fn index_compact_reuse() {
    let mut set: HandlePool<Handle> = HandlePool::new();

    let mut v = vec![];
    for _ in 0..5 {
        for _ in 0..50 {
            v.push(set.create());
        }

        let size = v.len() / 2;
        for _ in 0..size {
            let len = v.len();
            set.free(v.swap_remove(rand::random::<usize>() % len));
        }
    }

    for i in v {
        set.free(i);
    }

    assert!(set.is_empty());
    for index in 0..50 {
        let handle = set.create();
        assert_eq!(handle.index(), index);
    }
}

#[test]
fn retain() {
    let mut set: HandlePool<Handle> = HandlePool::new();
    for _ in 0..10 {
        set.create();
    }

    set.retain(|e| e.index() % 2 == 0);
    assert_eq!(set.len(), 5);

    for v in &set {
        assert!(v.index() % 2 == 0);
    }
}

#[test]
fn objects() {
    let mut set = ObjectPool::<BufferHandle, i32>::new();

    let e1 = set.create(3);
    assert_eq!(set.get(e1), Some(&3));
    assert_eq!(set.len(), 1);

    if let Some(v) = set.get_mut(e1) {
        *v = 4;
    }

    assert_eq!(set.free(e1), Some(4));
    assert_eq!(set.len(), 0);
    assert_eq!(set.get(e1), None);
    assert_eq!(set.free(e1), None);

    for i in 0..10 {
        set.create(i);
    }

    assert_eq!(set.iter().count(), 10);
    assert_eq!(set.handles().len(), 10);
    for handle in set.handles() {
        assert!(set.contains(handle));
    }
}
