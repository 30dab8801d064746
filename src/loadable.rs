//! Loading/empty-state decorator for a single wrapped source.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::{
    cell::{Cell, CellFactory, CellSource},
    event::{Mutation, MutationObserver},
    path::IndexPath,
    source::{Item, ListSource, LoadingState, Notifier, Refreshable, SourceId},
};

/// The synthetic item presented while the placeholder is visible.
pub struct Placeholder;

const PLACEHOLDER_PATH: IndexPath = IndexPath::new(0, 0);

/// Substitutes a single placeholder cell while the wrapped source is loading or
/// has nothing to show, and passes through 1:1 otherwise.
///
/// A wrapped source that advertises no [`loading_state`](ListSource::loading_state)
/// counts as loaded. Mutations from the wrapped source are compensated so the
/// downstream observer sees the placeholder appear and disappear as ordinary item
/// events; events arriving while the wrapped source is not loaded are dropped,
/// since the placeholder already stands in for whatever they describe.
pub struct LoadableSource {
    notifier: Notifier,
    wrapped: Arc<dyn CellSource>,
    loading_reuse_id: String,
    empty_reuse_id: String,
    /// Whether the previous event left the placeholder visible.
    placeholder_shown: Mutex<bool>,
}

impl LoadableSource {
    /// Wraps `wrapped`, taking over its subscription slot. `loading_reuse_id` and
    /// `empty_reuse_id` name the two placeholder cells on the surface.
    pub fn new(
        wrapped: Arc<dyn CellSource>,
        loading_reuse_id: impl Into<String>,
        empty_reuse_id: impl Into<String>,
    ) -> Arc<LoadableSource> {
        let queue = wrapped.notifier().queue().clone();
        let loadable = Arc::new(LoadableSource {
            notifier: Notifier::new(queue),
            placeholder_shown: Mutex::new(false),
            loading_reuse_id: loading_reuse_id.into(),
            empty_reuse_id: empty_reuse_id.into(),
            wrapped,
        });
        *loadable.placeholder_shown.lock() = loadable.showing_placeholder();
        let weak = Arc::downgrade(&loadable);
        let observer: Weak<dyn MutationObserver> = weak;
        loadable.wrapped.notifier().subscribe(observer);
        loadable
    }

    pub fn wrapped(&self) -> &Arc<dyn CellSource> {
        &self.wrapped
    }

    fn is_loaded(&self) -> bool {
        self.wrapped
            .loading_state()
            .map_or(true, |state| state == LoadingState::Loaded)
    }

    fn has_data(&self) -> bool {
        self.wrapped.total_item_count() > 0
    }

    pub fn showing_placeholder(&self) -> bool {
        !self.is_loaded() || !self.has_data()
    }

    fn placeholder_reuse_id(&self) -> &str {
        if self.is_loaded() {
            &self.empty_reuse_id
        } else {
            &self.loading_reuse_id
        }
    }
}

impl ListSource for LoadableSource {
    fn section_count(&self) -> usize {
        if self.showing_placeholder() {
            1
        } else {
            self.wrapped.section_count()
        }
    }

    fn item_count(&self, section: usize) -> usize {
        if self.showing_placeholder() {
            1
        } else {
            self.wrapped.item_count(section)
        }
    }

    fn total_item_count(&self) -> usize {
        if self.showing_placeholder() {
            1
        } else {
            self.wrapped.total_item_count()
        }
    }

    fn item(&self, path: IndexPath) -> Item {
        if self.showing_placeholder() {
            Arc::new(Placeholder)
        } else {
            self.wrapped.item(path)
        }
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn loading_state(&self) -> Option<LoadingState> {
        self.wrapped.loading_state()
    }

    fn as_refreshable(&self) -> Option<&dyn Refreshable> {
        self.wrapped.as_refreshable().map(|_| self as &dyn Refreshable)
    }
}

impl Refreshable for LoadableSource {
    fn refresh(&self, completion: Box<dyn FnOnce() + Send>) {
        match self.wrapped.as_refreshable() {
            Some(refreshable) => refreshable.refresh(completion),
            None => completion(),
        }
    }
}

impl CellSource for LoadableSource {
    fn bind_cell(&self, factory: &dyn CellFactory, path: IndexPath) -> Cell {
        if self.showing_placeholder() {
            factory.dequeue_cell(self.placeholder_reuse_id(), PLACEHOLDER_PATH)
        } else {
            self.wrapped.bind_cell(factory, path)
        }
    }

    fn supplementary_view(&self, factory: &dyn CellFactory, kind: &str, path: IndexPath) -> Cell {
        if self.showing_placeholder() {
            factory.dequeue_supplementary(kind, self.placeholder_reuse_id(), PLACEHOLDER_PATH)
        } else {
            self.wrapped.supplementary_view(factory, kind, path)
        }
    }

    fn update_cell(&self, cell: &mut Cell, item: &Item, path: IndexPath) {
        // Placeholder cells carry no item content to refresh.
        if !self.showing_placeholder() {
            self.wrapped.update_cell(cell, item, path);
        }
    }

    fn register_reusable_views(&self, surface: &dyn CellFactory) {
        self.wrapped.register_reusable_views(surface);
        surface.register(&self.loading_reuse_id);
        surface.register(&self.empty_reuse_id);
    }
}

impl MutationObserver for LoadableSource {
    /// Compensates the wrapped source's events for the synthetic placeholder.
    ///
    /// The wrapped source notifies after its own change, so `showing_placeholder`
    /// reflects the post-change world while `placeholder_shown` still holds the
    /// pre-change one; the two together decide which compensation applies.
    fn on_mutation(&self, _origin: SourceId, mutation: Mutation) {
        if !self.is_loaded() {
            trace!(?mutation, "wrapped source not loaded, dropping event");
            return;
        }
        let was_shown = *self.placeholder_shown.lock();
        match mutation {
            Mutation::ItemsInserted(paths) => {
                // The first real item takes the placeholder's spot.
                if was_shown && paths.contains(&PLACEHOLDER_PATH) {
                    self.notifier.items_removed(vec![PLACEHOLDER_PATH]);
                }
                self.notifier.items_inserted(paths);
            }
            Mutation::ItemsRemoved(paths) => {
                let reinsert = paths.contains(&PLACEHOLDER_PATH) && self.showing_placeholder();
                self.notifier.items_removed(paths);
                if reinsert {
                    self.notifier.items_inserted(vec![PLACEHOLDER_PATH]);
                }
            }
            Mutation::SectionsInserted(sections) => {
                if was_shown && sections.contains(&0) {
                    // Section 0 already exists downstream as the placeholder
                    // section; it changes content rather than appearing.
                    self.notifier.sections_refreshed(vec![0]);
                    let rest: Vec<usize> = sections.into_iter().filter(|&s| s != 0).collect();
                    self.notifier.sections_inserted(rest);
                } else {
                    self.notifier.sections_inserted(sections);
                }
            }
            Mutation::SectionsRemoved(sections) => {
                let reinsert = sections.contains(&0) && self.showing_placeholder();
                self.notifier.sections_removed(sections);
                if reinsert {
                    self.notifier.sections_inserted(vec![0]);
                }
            }
            other => self.notifier.post(other),
        }
        *self.placeholder_shown.lock() = self.showing_placeholder();
    }
}
