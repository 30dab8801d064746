//! The mutation notification protocol.

use std::fmt;

use crate::{
    path::IndexPath,
    source::{Item, SourceId},
};

/// Unit of work the consumer applies atomically.
pub type BatchUpdate = Box<dyn FnOnce() + Send>;

/// Completion signal for a batch update; the flag reports whether the batch ran to
/// the end.
pub type BatchCompletion = Box<dyn FnOnce(bool) + Send>;

/// A structural or content change reported by a list source.
///
/// Paths and section indices are local to the emitting source. The composition
/// engine rewrites them to global coordinates before re-emitting, so events reaching
/// the consumer always carry global coordinates.
pub enum Mutation {
    ItemsInserted(Vec<IndexPath>),
    ItemsRemoved(Vec<IndexPath>),
    /// Refresh in place; the consumer re-reads the affected items.
    ItemsRefreshed(Vec<IndexPath>),
    /// Refresh in place with the new values attached.
    ItemsRefreshedWith(Vec<(IndexPath, Item)>),
    ItemMoved {
        from: IndexPath,
        to: IndexPath,
    },
    SectionsInserted(Vec<usize>),
    SectionsRemoved(Vec<usize>),
    SectionsRefreshed(Vec<usize>),
    SectionMoved {
        from: usize,
        to: usize,
    },
    /// Structural reset; the consumer discards everything and redraws.
    Reload,
    /// Opaque atomic unit of work, relayed without interpretation.
    BatchUpdate {
        update: BatchUpdate,
        completion: BatchCompletion,
    },
}

impl fmt::Debug for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mutation::ItemsInserted(paths) => f.debug_tuple("ItemsInserted").field(paths).finish(),
            Mutation::ItemsRemoved(paths) => f.debug_tuple("ItemsRemoved").field(paths).finish(),
            Mutation::ItemsRefreshed(paths) => f.debug_tuple("ItemsRefreshed").field(paths).finish(),
            Mutation::ItemsRefreshedWith(items) => {
                let paths: Vec<_> = items.iter().map(|(p, _)| p).collect();
                f.debug_tuple("ItemsRefreshedWith").field(&paths).finish()
            }
            Mutation::ItemMoved { from, to } => f
                .debug_struct("ItemMoved")
                .field("from", from)
                .field("to", to)
                .finish(),
            Mutation::SectionsInserted(s) => f.debug_tuple("SectionsInserted").field(s).finish(),
            Mutation::SectionsRemoved(s) => f.debug_tuple("SectionsRemoved").field(s).finish(),
            Mutation::SectionsRefreshed(s) => f.debug_tuple("SectionsRefreshed").field(s).finish(),
            Mutation::SectionMoved { from, to } => f
                .debug_struct("SectionMoved")
                .field("from", from)
                .field("to", to)
                .finish(),
            Mutation::Reload => f.write_str("Reload"),
            Mutation::BatchUpdate { .. } => f.debug_struct("BatchUpdate").finish_non_exhaustive(),
        }
    }
}

/// Receiver side of the protocol.
///
/// A source carries at most one observer at a time (see
/// [`Notifier`](crate::source::Notifier)); this is a single-subscriber registration,
/// not a broadcast.
pub trait MutationObserver: Send + Sync {
    /// Called on the main queue for every mutation the observed source emits.
    fn on_mutation(&self, origin: SourceId, mutation: Mutation);
}
