//! Presentation-surface interface and the local→global remapping shim.

use std::any::Any;

use crate::{
    mapping::SectionMapping,
    path::IndexPath,
    source::{Item, ListSource},
};

/// Opaque reusable view handed back by the surface.
///
/// The consumer downcasts to its concrete view type; a mismatch is a programming
/// error, not a runtime condition.
pub type Cell = Box<dyn Any>;

/// Capability set of the presentation surface.
///
/// The surface only ever sees global paths. [`MappedCellFactory`] rewrites local
/// paths on the way in, so a child source dequeues with the only coordinates it
/// understands.
pub trait CellFactory {
    /// One-time registration of a reuse identifier. Path-free.
    fn register(&self, reuse_id: &str);

    fn dequeue_cell(&self, reuse_id: &str, path: IndexPath) -> Cell;

    fn dequeue_supplementary(&self, kind: &str, reuse_id: &str, path: IndexPath) -> Cell;
}

/// A list source that can bind its items to reusable views.
pub trait CellSource: ListSource {
    fn bind_cell(&self, factory: &dyn CellFactory, path: IndexPath) -> Cell;

    fn supplementary_view(&self, factory: &dyn CellFactory, kind: &str, path: IndexPath) -> Cell;

    fn update_cell(&self, cell: &mut Cell, item: &Item, path: IndexPath);

    /// One-time setup hook: register every reuse identifier this source dequeues.
    fn register_reusable_views(&self, surface: &dyn CellFactory);
}

/// Wraps the real surface for one child of a composition: dequeues requested at a
/// local path are rewritten to the corresponding global path before delegating.
pub(crate) struct MappedCellFactory<'a> {
    surface: &'a dyn CellFactory,
    mapping: &'a SectionMapping,
}

impl<'a> MappedCellFactory<'a> {
    pub(crate) fn new(surface: &'a dyn CellFactory, mapping: &'a SectionMapping) -> MappedCellFactory<'a> {
        MappedCellFactory { surface, mapping }
    }
}

impl CellFactory for MappedCellFactory<'_> {
    fn register(&self, reuse_id: &str) {
        self.surface.register(reuse_id);
    }

    fn dequeue_cell(&self, reuse_id: &str, path: IndexPath) -> Cell {
        self.surface.dequeue_cell(reuse_id, self.mapping.global_path(path))
    }

    fn dequeue_supplementary(&self, kind: &str, reuse_id: &str, path: IndexPath) -> Cell {
        self.surface
            .dequeue_supplementary(kind, reuse_id, self.mapping.global_path(path))
    }
}
