//! Section/item coordinates.

/// Position of an item within a sectioned list: a (section, item) pair.
///
/// The same type is used for two distinct coordinate spaces: *local* paths are
/// meaningful only to the source that produced them, *global* paths are meaningful to
/// the composed whole. A path is never valid across spaces without translation
/// (see [`SectionMapping`](crate::mapping::SectionMapping)).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    pub const fn new(section: usize, item: usize) -> IndexPath {
        IndexPath { section, item }
    }

    /// Same item position, different section.
    pub const fn with_section(self, section: usize) -> IndexPath {
        IndexPath {
            section,
            item: self.item,
        }
    }
}
