//! Hands work from any thread over to the rendering thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_deque as deque;

use crate::errors::*;

use super::graphics::Graphics;

/// A callback executed on the rendering thread with the graphics facade.
pub type Task = Box<dyn FnOnce(&mut Graphics) -> Result<()> + Send>;

struct DispatchShared {
    injector: Mutex<deque::Worker<Task>>,
    stealer: deque::Stealer<Task>,
    pending: AtomicUsize,
}

/// A thread-safe FIFO of callbacks, drained once per frame by `Graphics::begin_frame`.
///
/// Cloning the queue is cheap, every clone feeds the same rendering thread.
#[derive(Clone)]
pub struct DispatchQueue {
    shared: Arc<DispatchShared>,
}

impl Default for DispatchQueue {
    fn default() -> Self {
        DispatchQueue::new()
    }
}

impl DispatchQueue {
    pub fn new() -> Self {
        let (w, s) = deque::fifo();
        DispatchQueue {
            shared: Arc::new(DispatchShared {
                injector: Mutex::new(w),
                stealer: s,
                pending: AtomicUsize::new(0),
            }),
        }
    }

    /// Enqueues a callback. It runs at the beginning of a later frame.
    pub fn dispatch<F>(&self, task: F)
    where
        F: FnOnce(&mut Graphics) -> Result<()> + Send + 'static,
    {
        let task: Task = Box::new(task);

        let injector = match self.shared.injector.lock() {
            Ok(v) => v,
            Err(poisoned) => poisoned.into_inner(),
        };

        injector.push(task);
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
    }

    /// The number of callbacks waiting for execution.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs at most `limit` callbacks in submission order and returns how many
    /// ran. A failed callback is logged and does not stop the drain.
    pub fn drain(&self, gfx: &mut Graphics, limit: usize) -> usize {
        let mut executed = 0;

        while executed < limit {
            let task = match self.shared.stealer.steal() {
                Some(v) => v,
                None => break,
            };

            self.shared.pending.fetch_sub(1, Ordering::SeqCst);
            executed += 1;

            if let Err(err) = task(gfx) {
                error!("Dispatched task failed: {}", err);
            }
        }

        if !self.is_empty() {
            debug!("{} dispatched tasks deferred to the next frame.", self.len());
        }

        executed
    }
}
