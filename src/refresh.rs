//! Parallel refresh fan-out and its join barrier.

use std::{sync::Arc, thread};

use parking_lot::Mutex;

use crate::{queue::MainQueue, source::ListSource};

/// Counting join barrier.
///
/// [`notify`](CompletionGroup::notify) runs its closure exactly once: immediately if
/// nothing is outstanding, otherwise when the last [`Ticket`] is handed back. There
/// is no cancellation; a ticket that is never returned stalls the group forever,
/// mirroring a refresh that never signals completion.
pub struct CompletionGroup {
    inner: Arc<GroupInner>,
}

struct GroupInner {
    state: Mutex<GroupState>,
}

struct GroupState {
    outstanding: usize,
    on_empty: Option<Box<dyn FnOnce() + Send>>,
}

impl CompletionGroup {
    pub fn new() -> CompletionGroup {
        CompletionGroup {
            inner: Arc::new(GroupInner {
                state: Mutex::new(GroupState {
                    outstanding: 0,
                    on_empty: None,
                }),
            }),
        }
    }

    /// Registers one outstanding unit of work.
    pub fn enter(&self) -> Ticket {
        self.inner.state.lock().outstanding += 1;
        Ticket {
            inner: self.inner.clone(),
        }
    }

    /// Consumes the group and arms the completion closure.
    pub fn notify(self, f: impl FnOnce() + Send + 'static) {
        let immediate = {
            let mut state = self.inner.state.lock();
            if state.outstanding == 0 {
                Some(f)
            } else {
                state.on_empty = Some(Box::new(f));
                None
            }
        };
        if let Some(f) = immediate {
            f();
        }
    }
}

impl Default for CompletionGroup {
    fn default() -> Self {
        CompletionGroup::new()
    }
}

/// Outstanding unit of work tracked by a [`CompletionGroup`].
pub struct Ticket {
    inner: Arc<GroupInner>,
}

impl Ticket {
    /// Marks this unit done.
    pub fn leave(self) {
        let on_empty = {
            let mut state = self.inner.state.lock();
            state.outstanding -= 1;
            if state.outstanding == 0 {
                state.on_empty.take()
            } else {
                None
            }
        };
        if let Some(f) = on_empty {
            f();
        }
    }
}

/// Background fan-out shared by the composition engine and the multiplexer.
///
/// Hops off the caller's thread, issues a refresh to every source that supports it
/// in parallel, and runs `completion` on the main queue once every one of them has
/// signalled. The caller never observes partial completion.
pub(crate) fn refresh_fan_out<S>(
    sources: Vec<Arc<S>>,
    queue: MainQueue,
    completion: Box<dyn FnOnce() + Send>,
) where
    S: ListSource + ?Sized + 'static,
{
    thread::spawn(move || {
        let group = CompletionGroup::new();
        for source in &sources {
            if let Some(refreshable) = source.as_refreshable() {
                let ticket = group.enter();
                refreshable.refresh(Box::new(move || ticket.leave()));
            }
        }
        group.notify(move || queue.dispatch(completion));
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn notify_with_nothing_outstanding_runs_immediately() {
        let fired = Arc::new(AtomicBool::new(false));
        let group = CompletionGroup::new();
        let flag = fired.clone();
        group.notify(move || flag.store(true, Ordering::SeqCst));
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn notify_waits_for_every_ticket() {
        let fired = Arc::new(AtomicBool::new(false));
        let group = CompletionGroup::new();
        let a = group.enter();
        let b = group.enter();

        let flag = fired.clone();
        group.notify(move || flag.store(true, Ordering::SeqCst));
        assert!(!fired.load(Ordering::SeqCst));

        a.leave();
        assert!(!fired.load(Ordering::SeqCst));
        b.leave();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn tickets_may_leave_before_notify_is_armed() {
        let count = Arc::new(AtomicUsize::new(0));
        let group = CompletionGroup::new();
        let ticket = group.enter();
        ticket.leave();

        let counter = count.clone();
        group.notify(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tickets_leave_from_other_threads() {
        let fired = Arc::new(AtomicBool::new(false));
        let group = CompletionGroup::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ticket = group.enter();
                thread::spawn(move || ticket.leave())
            })
            .collect();

        let flag = fired.clone();
        group.notify(move || flag.store(true, Ordering::SeqCst));
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(fired.load(Ordering::SeqCst));
    }
}
