//! Bidirectional local↔global section translation for one child of a composition.

use std::sync::Arc;

use fnv::FnvHashMap;

use crate::{
    cell::CellSource,
    fault::{raise, Fault},
    path::IndexPath,
};

/// Per-child section index mapping.
///
/// Holds the child source (a structural association, not lifetime ownership) and a
/// pair of maps that, after [`rebuild`](SectionMapping::rebuild), form a total
/// bijection between the child's local sections and a contiguous global range. A
/// lookup miss means the table was not rebuilt after a structural change — a
/// programming error in the composition, reported as a fault rather than a
/// recoverable result.
pub struct SectionMapping {
    source: Arc<dyn CellSource>,
    global_to_local: FnvHashMap<usize, usize>,
    local_to_global: FnvHashMap<usize, usize>,
}

impl SectionMapping {
    pub fn new(source: Arc<dyn CellSource>) -> SectionMapping {
        SectionMapping {
            source,
            global_to_local: FnvHashMap::default(),
            local_to_global: FnvHashMap::default(),
        }
    }

    pub fn source(&self) -> &Arc<dyn CellSource> {
        &self.source
    }

    /// Current section count of the owned source, read fresh.
    pub fn section_count(&self) -> usize {
        self.source.section_count()
    }

    /// Reassigns global sections `start..start + section_count` to this child's
    /// local sections, fully replacing any previous assignment. Returns the first
    /// unused global section.
    pub fn rebuild(&mut self, start: usize) -> usize {
        self.global_to_local.clear();
        self.local_to_global.clear();

        let mut next = start;
        for local in 0..self.section_count() {
            self.insert(next, local);
            next += 1;
        }
        next
    }

    fn insert(&mut self, global: usize, local: usize) {
        if self.local_to_global.contains_key(&local) {
            raise(Fault::MappingCollision { local });
        }
        self.global_to_local.insert(global, local);
        self.local_to_global.insert(local, global);
    }

    pub fn contains_global_section(&self, global: usize) -> bool {
        self.global_to_local.contains_key(&global)
    }

    pub fn local_section(&self, global: usize) -> usize {
        match self.global_to_local.get(&global) {
            Some(&local) => local,
            None => raise(Fault::GlobalSectionMiss { global }),
        }
    }

    pub fn global_section(&self, local: usize) -> usize {
        match self.local_to_global.get(&local) {
            Some(&global) => global,
            None => raise(Fault::LocalSectionMiss { local }),
        }
    }

    /// Rewrites the section component; the item component passes through unchanged.
    pub fn local_path(&self, global: IndexPath) -> IndexPath {
        global.with_section(self.local_section(global.section))
    }

    pub fn global_path(&self, local: IndexPath) -> IndexPath {
        local.with_section(self.global_section(local.section))
    }

    pub fn local_paths(&self, globals: &[IndexPath]) -> Vec<IndexPath> {
        globals.iter().map(|&p| self.local_path(p)).collect()
    }

    pub fn global_paths(&self, locals: &[IndexPath]) -> Vec<IndexPath> {
        locals.iter().map(|&p| self.global_path(p)).collect()
    }

    pub fn global_sections(&self, locals: &[usize]) -> Vec<usize> {
        locals.iter().map(|&s| self.global_section(s)).collect()
    }
}
