//! Unrecoverable invariant violations.

use tracing::error;

use crate::source::SourceId;

/// Consistency faults in the composition layer.
///
/// Every variant indicates a programming error in how sources, mappings and
/// aggregators were wired together, never a data condition. Faults are raised at the
/// point of detection and are not meant to be caught anywhere in the stack.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    #[error("global section {global} has no local counterpart (stale mapping table?)")]
    GlobalSectionMiss { global: usize },
    #[error("local section {local} has no global counterpart (stale mapping table?)")]
    LocalSectionMiss { local: usize },
    #[error("mapping collision: local section {local} assigned twice during rebuild")]
    MappingCollision { local: usize },
    #[error("global section {global} is not covered by any child mapping")]
    UnmappedGlobalSection { global: usize },
    #[error("mutation from a source ({0:?}) that was never added")]
    UnknownSource(SourceId),
    #[error("a multiplexed source needs at least one member")]
    EmptySourceSet,
    #[error("section {section} out of range for a single-section source")]
    SectionOutOfRange { section: usize },
    #[error("item {item} out of range in section {section}")]
    ItemOutOfRange { section: usize, item: usize },
    #[error("main queue drained from a thread other than its owner")]
    WrongThread,
}

/// Logs and raises an unrecoverable fault.
pub(crate) fn raise(fault: Fault) -> ! {
    error!("{fault}");
    panic!("{fault}");
}
