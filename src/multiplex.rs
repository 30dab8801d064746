//! Exclusive-selection aggregation: several member sources, one visible at a time.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::{
    cell::{Cell, CellFactory, CellSource},
    event::{Mutation, MutationObserver},
    fault::{raise, Fault},
    path::IndexPath,
    queue::MainQueue,
    refresh::refresh_fan_out,
    source::{Item, ListSource, LoadingState, Notifier, Refreshable, SourceId},
};

/// Presents exactly one of a fixed set of member sources.
///
/// Reads delegate to the active member with no index translation; the members
/// share the coordinate space by construction. The multiplexer stays subscribed to
/// every member so a selection change needs no re-subscription, and events from
/// inactive members are simply dropped.
pub struct MultiplexedSource {
    notifier: Notifier,
    members: Vec<Arc<dyn CellSource>>,
    active: Mutex<usize>,
}

impl MultiplexedSource {
    /// Builds a multiplexer over `members`, with the first member active.
    ///
    /// An empty member set has no meaningful read behavior and faults.
    pub fn new(members: Vec<Arc<dyn CellSource>>, queue: MainQueue) -> Arc<MultiplexedSource> {
        if members.is_empty() {
            raise(Fault::EmptySourceSet);
        }
        let multiplexed = Arc::new(MultiplexedSource {
            notifier: Notifier::new(queue),
            members,
            active: Mutex::new(0),
        });
        let weak = Arc::downgrade(&multiplexed);
        let observer: Weak<dyn MutationObserver> = weak;
        for member in &multiplexed.members {
            member.notifier().subscribe(observer.clone());
        }
        multiplexed
    }

    pub fn active_index(&self) -> usize {
        *self.active.lock()
    }

    pub fn active_source(&self) -> Arc<dyn CellSource> {
        self.members[*self.active.lock()].clone()
    }

    /// Switches the visible member and announces the change as a full reload.
    /// Out-of-range indices are logged and ignored.
    pub fn select_source(&self, index: usize) {
        if index >= self.members.len() {
            warn!(index, members = self.members.len(), "selection out of range");
            return;
        }
        *self.active.lock() = index;
        self.notifier.reloaded();
    }

    /// Refreshes every member that supports it, active or not, and completes once
    /// all of them have. A selection made mid-refresh then presents current data.
    pub fn refresh_content(&self, completion: impl FnOnce() + Send + 'static) {
        let sources = self.members.clone();
        refresh_fan_out(sources, self.notifier.queue().clone(), Box::new(completion));
    }
}

impl ListSource for MultiplexedSource {
    fn section_count(&self) -> usize {
        self.active_source().section_count()
    }

    fn item_count(&self, section: usize) -> usize {
        self.active_source().item_count(section)
    }

    fn total_item_count(&self) -> usize {
        self.active_source().total_item_count()
    }

    fn item(&self, path: IndexPath) -> Item {
        self.active_source().item(path)
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn loading_state(&self) -> Option<LoadingState> {
        self.active_source().loading_state()
    }

    fn as_refreshable(&self) -> Option<&dyn Refreshable> {
        Some(self)
    }
}

impl Refreshable for MultiplexedSource {
    fn refresh(&self, completion: Box<dyn FnOnce() + Send>) {
        self.refresh_content(completion);
    }
}

impl CellSource for MultiplexedSource {
    fn bind_cell(&self, factory: &dyn CellFactory, path: IndexPath) -> Cell {
        self.active_source().bind_cell(factory, path)
    }

    fn supplementary_view(&self, factory: &dyn CellFactory, kind: &str, path: IndexPath) -> Cell {
        self.active_source().supplementary_view(factory, kind, path)
    }

    fn update_cell(&self, cell: &mut Cell, item: &Item, path: IndexPath) {
        self.active_source().update_cell(cell, item, path);
    }

    /// Registers for every member up front; any of them may become active later.
    fn register_reusable_views(&self, surface: &dyn CellFactory) {
        for member in &self.members {
            member.register_reusable_views(surface);
        }
    }
}

impl MutationObserver for MultiplexedSource {
    fn on_mutation(&self, origin: SourceId, mutation: Mutation) {
        let active = self.members[*self.active.lock()].notifier().id();
        if origin != active {
            trace!(?origin, "dropping event from inactive member");
            return;
        }
        self.notifier.post(mutation);
    }
}
