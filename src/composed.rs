//! The composition engine: one globally-indexed source over many children.

use std::sync::{Arc, Weak};

use fnv::FnvHashMap;
use parking_lot::Mutex;

use crate::{
    cell::{Cell, CellFactory, CellSource, MappedCellFactory},
    event::{Mutation, MutationObserver},
    fault::{raise, Fault},
    mapping::SectionMapping,
    path::IndexPath,
    queue::MainQueue,
    refresh::refresh_fan_out,
    source::{Item, ListSource, Notifier, Refreshable, SourceId},
};

/// An ordered composition of child sources presented as a single source.
///
/// Children are appended once and never removed; child N's sections always precede
/// child N+1's in the global space. Each child's coordinates are translated through
/// a [`SectionMapping`], and every mutation a child emits is rewritten from local to
/// global coordinates and re-emitted on the composition's own notifier. Children
/// stay unaware of each other and of the composition itself.
///
/// The derived global-section partition goes stale whenever a child's section count
/// changes; reads rebuild it lazily. [`item`](ListSource::item) is the deliberate
/// exception — see the method.
pub struct ComposedSource {
    notifier: Notifier,
    inner: Mutex<Inner>,
}

struct Inner {
    /// One mapping per child, in display order.
    mappings: Vec<SectionMapping>,
    /// Child lookup by the id its events carry.
    by_source: FnvHashMap<SourceId, usize>,
    /// Derived partition: global section → index into `mappings`. Stale after any
    /// structural change, rebuilt by `update_mappings`.
    global_to_child: FnvHashMap<usize, usize>,
}

impl ComposedSource {
    pub fn new(queue: MainQueue) -> Arc<ComposedSource> {
        Arc::new(ComposedSource {
            notifier: Notifier::new(queue),
            inner: Mutex::new(Inner {
                mappings: Vec::new(),
                by_source: FnvHashMap::default(),
                global_to_child: FnvHashMap::default(),
            }),
        })
    }

    /// Appends `source` and takes over its subscription slot. Display order is
    /// insertion order. There is no removal.
    pub fn add_source(self: &Arc<Self>, source: Arc<dyn CellSource>) {
        let weak = Arc::downgrade(self);
        let observer: Weak<dyn MutationObserver> = weak;
        source.notifier().subscribe(observer);

        let mut inner = self.inner.lock();
        let index = inner.mappings.len();
        inner.by_source.insert(source.notifier().id(), index);
        inner.mappings.push(SectionMapping::new(source));
        inner.update_mappings();
    }

    /// Reverse lookup: the local path in `child` for a global path, or `None` when
    /// that global section does not belong to `child`.
    pub fn local_path_in(&self, child: &Arc<dyn CellSource>, global: IndexPath) -> Option<IndexPath> {
        let mut inner = self.inner.lock();
        inner.update_mappings();
        let &index = inner.by_source.get(&child.notifier().id())?;
        let mapping = &inner.mappings[index];
        mapping
            .contains_global_section(global.section)
            .then(|| mapping.local_path(global))
    }

    /// Issues a parallel refresh to every child that supports it and runs
    /// `completion` on the main queue once all of them have finished.
    pub fn refresh_content(&self, completion: impl FnOnce() + Send + 'static) {
        let sources: Vec<Arc<dyn CellSource>> = {
            let inner = self.inner.lock();
            inner.mappings.iter().map(|m| m.source().clone()).collect()
        };
        refresh_fan_out(sources, self.notifier.queue().clone(), Box::new(completion));
    }
}

impl Inner {
    /// Rebuilds every child mapping and the global partition. Afterwards the
    /// partition covers `[0, total)` with no gaps and no overlaps.
    fn update_mappings(&mut self) {
        self.global_to_child.clear();
        let mut start = 0;
        for index in 0..self.mappings.len() {
            let next = self.mappings[index].rebuild(start);
            for global in start..next {
                self.global_to_child.insert(global, index);
            }
            start = next;
        }
    }

    fn child_for_global(&self, global: usize) -> &SectionMapping {
        match self.global_to_child.get(&global) {
            Some(&index) => &self.mappings[index],
            None => raise(Fault::UnmappedGlobalSection { global }),
        }
    }

    fn mapping_for(&self, origin: SourceId) -> &SectionMapping {
        match self.by_source.get(&origin) {
            Some(&index) => &self.mappings[index],
            None => raise(Fault::UnknownSource(origin)),
        }
    }
}

impl ListSource for ComposedSource {
    fn section_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.update_mappings();
        inner.mappings.iter().map(|m| m.section_count()).sum()
    }

    fn item_count(&self, global_section: usize) -> usize {
        let mut inner = self.inner.lock();
        inner.update_mappings();
        let mapping = inner.child_for_global(global_section);
        mapping.source().item_count(mapping.local_section(global_section))
    }

    fn total_item_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.update_mappings();
        inner.mappings.iter().map(|m| m.source().total_item_count()).sum()
    }

    /// Resolves through the *current* partition without refreshing it: callers must
    /// not interleave this with a structural mutation that has not yet been
    /// followed by a rebuild. Keeping lookups cheap on the hot path is the point.
    fn item(&self, path: IndexPath) -> Item {
        let inner = self.inner.lock();
        let mapping = inner.child_for_global(path.section);
        mapping.source().item(mapping.local_path(path))
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn as_refreshable(&self) -> Option<&dyn Refreshable> {
        Some(self)
    }
}

impl Refreshable for ComposedSource {
    fn refresh(&self, completion: Box<dyn FnOnce() + Send>) {
        self.refresh_content(completion);
    }
}

impl CellSource for ComposedSource {
    fn bind_cell(&self, factory: &dyn CellFactory, path: IndexPath) -> Cell {
        let mut inner = self.inner.lock();
        inner.update_mappings();
        let mapping = inner.child_for_global(path.section);
        let shim = MappedCellFactory::new(factory, mapping);
        mapping.source().bind_cell(&shim, mapping.local_path(path))
    }

    fn supplementary_view(&self, factory: &dyn CellFactory, kind: &str, path: IndexPath) -> Cell {
        let mut inner = self.inner.lock();
        inner.update_mappings();
        let mapping = inner.child_for_global(path.section);
        let shim = MappedCellFactory::new(factory, mapping);
        mapping
            .source()
            .supplementary_view(&shim, kind, mapping.local_path(path))
    }

    fn update_cell(&self, cell: &mut Cell, item: &Item, path: IndexPath) {
        let mut inner = self.inner.lock();
        inner.update_mappings();
        let mapping = inner.child_for_global(path.section);
        mapping.source().update_cell(cell, item, mapping.local_path(path));
    }

    fn register_reusable_views(&self, surface: &dyn CellFactory) {
        let inner = self.inner.lock();
        for mapping in &inner.mappings {
            mapping.source().register_reusable_views(surface);
        }
    }
}

impl MutationObserver for ComposedSource {
    /// Rewrites a child's local coordinates to global ones and re-emits the event
    /// unchanged in kind.
    ///
    /// The rebuild ordering is load-bearing. A child notifies *after* its own
    /// contents changed, so for section insertions the new sections only get global
    /// numbers once the partition is rebuilt; for removals and refreshes the
    /// affected locals are only known to the stale, pre-change mapping and must be
    /// translated before the rebuild discards them.
    fn on_mutation(&self, origin: SourceId, mutation: Mutation) {
        // Translate under the lock, release it before re-emitting: delivery may run
        // the downstream observer synchronously.
        let translated = {
            let mut inner = self.inner.lock();
            match mutation {
                Mutation::ItemsInserted(paths) => {
                    Mutation::ItemsInserted(inner.mapping_for(origin).global_paths(&paths))
                }
                Mutation::ItemsRemoved(paths) => {
                    Mutation::ItemsRemoved(inner.mapping_for(origin).global_paths(&paths))
                }
                Mutation::ItemsRefreshed(paths) => {
                    Mutation::ItemsRefreshed(inner.mapping_for(origin).global_paths(&paths))
                }
                Mutation::ItemsRefreshedWith(items) => {
                    let mapping = inner.mapping_for(origin);
                    Mutation::ItemsRefreshedWith(
                        items
                            .into_iter()
                            .map(|(path, item)| (mapping.global_path(path), item))
                            .collect(),
                    )
                }
                Mutation::ItemMoved { from, to } => {
                    let mapping = inner.mapping_for(origin);
                    Mutation::ItemMoved {
                        from: mapping.global_path(from),
                        to: mapping.global_path(to),
                    }
                }
                Mutation::SectionsInserted(sections) => {
                    inner.update_mappings();
                    Mutation::SectionsInserted(inner.mapping_for(origin).global_sections(&sections))
                }
                Mutation::SectionsRemoved(sections) => {
                    let globals = inner.mapping_for(origin).global_sections(&sections);
                    inner.update_mappings();
                    Mutation::SectionsRemoved(globals)
                }
                Mutation::SectionsRefreshed(sections) => {
                    let globals = inner.mapping_for(origin).global_sections(&sections);
                    inner.update_mappings();
                    Mutation::SectionsRefreshed(globals)
                }
                Mutation::SectionMoved { from, to } => {
                    // A move does not change the section count; both ends translate
                    // through the same mapping.
                    let mapping = inner.mapping_for(origin);
                    let (from, to) = (mapping.global_section(from), mapping.global_section(to));
                    inner.update_mappings();
                    Mutation::SectionMoved { from, to }
                }
                Mutation::Reload => Mutation::Reload,
                Mutation::BatchUpdate { update, completion } => {
                    Mutation::BatchUpdate { update, completion }
                }
            }
        };
        self.notifier.post(translated);
    }
}
