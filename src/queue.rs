//! The UI-affine execution context that serializes mutation delivery.

use std::{sync::Arc, thread, thread::ThreadId};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

use crate::fault::{raise, Fault};

type Task = Box<dyn FnOnce() + Send>;

/// Handle to the thread that owns all mutation delivery.
///
/// Sources may signal from arbitrary threads; every observer callback is funneled
/// through this queue so the consumer sees a strictly ordered, serialized stream. A
/// dispatch made on the owning thread runs synchronously, anything else is enqueued
/// and runs the next time the owning thread drains the queue.
///
/// Nothing here spins up a thread: the queue is created *on* the designated thread
/// (typically the one running the UI event loop) and that thread is expected to call
/// [`process_pending`](MainQueue::process_pending) whenever it is woken.
#[derive(Clone)]
pub struct MainQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    owner: ThreadId,
    tx: UnboundedSender<Task>,
    rx: Mutex<UnboundedReceiver<Task>>,
}

impl MainQueue {
    /// Creates a queue owned by the calling thread.
    pub fn new() -> MainQueue {
        let (tx, rx) = mpsc::unbounded_channel();
        MainQueue {
            inner: Arc::new(QueueInner {
                owner: thread::current().id(),
                tx,
                rx: Mutex::new(rx),
            }),
        }
    }

    /// Whether the calling thread owns this queue.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.owner
    }

    /// Runs `f` on the owning thread: synchronously if already there, otherwise
    /// enqueued for the next `process_pending`.
    pub fn dispatch(&self, f: impl FnOnce() + Send + 'static) {
        if self.is_current() {
            f();
        } else if self.inner.tx.send(Box::new(f)).is_err() {
            // the receiver lives inside the queue itself
            unreachable!("main queue receiver dropped");
        }
    }

    /// Drains every task queued so far and returns how many ran.
    ///
    /// Must be called on the owning thread.
    pub fn process_pending(&self) -> usize {
        if !self.is_current() {
            raise(Fault::WrongThread);
        }
        let mut ran = 0;
        loop {
            // release the lock before running: a task may dispatch again
            let task = self.inner.rx.lock().try_recv();
            match task {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        if ran > 0 {
            trace!(ran, "drained queued notifications");
        }
        ran
    }
}

impl Default for MainQueue {
    fn default() -> Self {
        MainQueue::new()
    }
}
