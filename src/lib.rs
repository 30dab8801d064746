//! Composition of independent sectioned list sources into a single
//! globally-indexed source.
//!
//! A [`ListSource`] exposes sectioned list data and announces changes to a single
//! observer through its [`Notifier`]; all coordinates it speaks are local to
//! itself. [`ComposedSource`] stitches any number of such sources into one
//! contiguous global section space, translating reads inwards and mutation events
//! outwards, so each child can be written as if it were the only source on
//! screen. [`MultiplexedSource`] presents exactly one of a set of members at a
//! time, and [`LoadableSource`] substitutes a placeholder cell while its wrapped
//! source is loading or empty. Aggregators nest freely; each one is itself a
//! [`CellSource`].
//!
//! Event delivery is serialized on a [`MainQueue`] owned by the consumer's
//! thread. Index-space consistency violations are programming errors and fault
//! immediately (see [`Fault`]); they are never reported as recoverable results.

pub mod cell;
pub mod composed;
pub mod event;
pub mod fault;
pub mod loadable;
pub mod mapping;
pub mod multiplex;
pub mod path;
pub mod queue;
pub mod refresh;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;

pub use cell::{Cell, CellFactory, CellSource};
pub use composed::ComposedSource;
pub use event::{BatchCompletion, BatchUpdate, Mutation, MutationObserver};
pub use fault::Fault;
pub use loadable::{LoadableSource, Placeholder};
pub use mapping::SectionMapping;
pub use multiplex::MultiplexedSource;
pub use path::IndexPath;
pub use queue::MainQueue;
pub use refresh::{CompletionGroup, Ticket};
pub use source::{
    Item, ListSource, LoadingState, Notifier, Refreshable, SourceId, VecSource,
};
