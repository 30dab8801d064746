//! List sources: the provider capability set and its notification channel.

use std::{
    any::Any,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use parking_lot::Mutex;
use tracing::trace;

use crate::{
    event::{BatchCompletion, BatchUpdate, Mutation, MutationObserver},
    fault::{raise, Fault},
    path::IndexPath,
    queue::MainQueue,
};

/// Polymorphic item value.
///
/// Values are always read fresh from the owning source; the composition layer never
/// caches them.
pub type Item = Arc<dyn Any + Send + Sync>;

/// Process-unique identity of a source, used by aggregators to attribute events.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> SourceId {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        SourceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Loading state advertised by sources that track one.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoadingState {
    Unloaded,
    Loading,
    Loaded,
    Error,
}

/// A source of sectioned list data.
///
/// Coordinates passed to and returned by a source are local to it; a source is never
/// aware of the composition it takes part in. Optional capabilities are explicit
/// queries rather than downcasts.
pub trait ListSource: Send + Sync {
    fn section_count(&self) -> usize;
    fn item_count(&self, section: usize) -> usize;
    fn total_item_count(&self) -> usize;
    fn item(&self, path: IndexPath) -> Item;

    /// The source's outgoing notification channel.
    fn notifier(&self) -> &Notifier;

    /// Loading state, for sources that track one.
    fn loading_state(&self) -> Option<LoadingState> {
        None
    }

    /// Refresh capability, for sources that support it.
    fn as_refreshable(&self) -> Option<&dyn Refreshable> {
        None
    }
}

/// Optional capability: re-fetch content and signal completion.
///
/// There is no cancellation or timeout; a refresh that never signals stalls any
/// aggregate completion waiting on it.
pub trait Refreshable {
    fn refresh(&self, completion: Box<dyn FnOnce() + Send>);
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// A source's single-subscriber notification channel.
///
/// Holds at most one observer at a time, by `Weak` reference: the observer co-lives
/// with or outlives the source, and subscribing transfers the one subscription slot
/// rather than adding to a broadcast list. Every posting helper marshals delivery
/// onto the main queue, so observer callbacks are serialized no matter which thread
/// the source signals from.
pub struct Notifier {
    id: SourceId,
    queue: MainQueue,
    observer: Mutex<Option<Weak<dyn MutationObserver>>>,
}

impl Notifier {
    pub fn new(queue: MainQueue) -> Notifier {
        Notifier {
            id: SourceId::next(),
            queue,
            observer: Mutex::new(None),
        }
    }

    /// Identity the owning source's events carry.
    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn queue(&self) -> &MainQueue {
        &self.queue
    }

    /// Installs `observer` as the sole subscriber, replacing any previous one.
    pub fn subscribe(&self, observer: Weak<dyn MutationObserver>) {
        let mut slot = self.observer.lock();
        if slot.is_some() {
            trace!(source = ?self.id, "replacing existing observer");
        }
        *slot = Some(observer);
    }

    pub fn unsubscribe(&self) {
        *self.observer.lock() = None;
    }

    /// Delivers `mutation` to the current observer on the main queue.
    pub fn post(&self, mutation: Mutation) {
        let observer = self.observer.lock().clone();
        let Some(observer) = observer else {
            trace!(source = ?self.id, ?mutation, "no observer, dropping mutation");
            return;
        };
        let id = self.id;
        self.queue.dispatch(move || {
            if let Some(observer) = observer.upgrade() {
                observer.on_mutation(id, mutation);
            } else {
                trace!(source = ?id, "observer expired before delivery");
            }
        });
    }

    // Posting helpers. Empty path/section sets are silently dropped so sources can
    // notify unconditionally.

    pub fn items_inserted(&self, paths: Vec<IndexPath>) {
        if !paths.is_empty() {
            self.post(Mutation::ItemsInserted(paths));
        }
    }

    pub fn items_removed(&self, paths: Vec<IndexPath>) {
        if !paths.is_empty() {
            self.post(Mutation::ItemsRemoved(paths));
        }
    }

    pub fn items_refreshed(&self, paths: Vec<IndexPath>) {
        if !paths.is_empty() {
            self.post(Mutation::ItemsRefreshed(paths));
        }
    }

    pub fn items_refreshed_with(&self, items: Vec<(IndexPath, Item)>) {
        if !items.is_empty() {
            self.post(Mutation::ItemsRefreshedWith(items));
        }
    }

    pub fn item_moved(&self, from: IndexPath, to: IndexPath) {
        self.post(Mutation::ItemMoved { from, to });
    }

    pub fn sections_inserted(&self, sections: Vec<usize>) {
        if !sections.is_empty() {
            self.post(Mutation::SectionsInserted(sections));
        }
    }

    pub fn sections_removed(&self, sections: Vec<usize>) {
        if !sections.is_empty() {
            self.post(Mutation::SectionsRemoved(sections));
        }
    }

    pub fn sections_refreshed(&self, sections: Vec<usize>) {
        if !sections.is_empty() {
            self.post(Mutation::SectionsRefreshed(sections));
        }
    }

    pub fn section_moved(&self, from: usize, to: usize) {
        self.post(Mutation::SectionMoved { from, to });
    }

    pub fn reloaded(&self) {
        self.post(Mutation::Reload);
    }

    pub fn batch_update(&self, update: BatchUpdate, completion: BatchCompletion) {
        self.post(Mutation::BatchUpdate { update, completion });
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// Trivial in-memory source: a fixed list of items in a single section.
pub struct VecSource {
    items: Vec<Item>,
    notifier: Notifier,
}

impl VecSource {
    pub fn new(items: Vec<Item>, queue: MainQueue) -> VecSource {
        VecSource {
            items,
            notifier: Notifier::new(queue),
        }
    }
}

impl ListSource for VecSource {
    fn section_count(&self) -> usize {
        1
    }

    fn item_count(&self, _section: usize) -> usize {
        self.items.len()
    }

    fn total_item_count(&self) -> usize {
        self.items.len()
    }

    fn item(&self, path: IndexPath) -> Item {
        if path.section != 0 {
            raise(Fault::SectionOutOfRange {
                section: path.section,
            });
        }
        match self.items.get(path.item) {
            Some(item) => item.clone(),
            None => raise(Fault::ItemOutOfRange {
                section: path.section,
                item: path.item,
            }),
        }
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::test_support::{observe, RecordingObserver};

    #[test]
    fn vec_source_is_single_section() {
        let queue = MainQueue::new();
        let source = VecSource::new(
            vec![Arc::new("a".to_owned()) as Item, Arc::new("b".to_owned()) as Item],
            queue,
        );
        assert_eq!(source.section_count(), 1);
        assert_eq!(source.item_count(0), 2);
        assert_eq!(source.total_item_count(), 2);
        let item = source.item(IndexPath::new(0, 1));
        assert_eq!(item.downcast_ref::<String>().unwrap(), "b");
    }

    #[test]
    #[should_panic]
    fn vec_source_faults_outside_section_zero() {
        let queue = MainQueue::new();
        let source = VecSource::new(vec![Arc::new(1u32) as Item], queue);
        source.item(IndexPath::new(1, 0));
    }

    #[test]
    #[should_panic(expected = "item 1 out of range")]
    fn vec_source_faults_past_the_last_item() {
        let queue = MainQueue::new();
        let source = VecSource::new(vec![Arc::new(1u32) as Item], queue);
        source.item(IndexPath::new(0, 1));
    }

    #[test]
    fn empty_path_sets_are_dropped() {
        let queue = MainQueue::new();
        let notifier = Notifier::new(queue);
        let observer = RecordingObserver::new();
        observe(&notifier, &observer);

        notifier.items_inserted(vec![]);
        notifier.sections_removed(vec![]);
        assert_eq!(observer.take().len(), 0);

        notifier.items_inserted(vec![IndexPath::new(0, 0)]);
        assert_eq!(observer.take().len(), 1);
    }

    #[test]
    fn subscribe_transfers_the_slot() {
        let queue = MainQueue::new();
        let notifier = Notifier::new(queue);
        let first = RecordingObserver::new();
        let second = RecordingObserver::new();
        observe(&notifier, &first);
        observe(&notifier, &second);

        notifier.reloaded();
        assert_eq!(first.take().len(), 0);
        assert_eq!(second.take().len(), 1);
    }

    #[test]
    fn background_posts_are_marshalled_to_the_owning_thread() {
        let queue = MainQueue::new();
        let notifier = Arc::new(Notifier::new(queue.clone()));
        let observer = RecordingObserver::new();
        observe(&notifier, &observer);

        let n = notifier.clone();
        thread::spawn(move || n.items_inserted(vec![IndexPath::new(0, 0)]))
            .join()
            .unwrap();

        assert_eq!(observer.take().len(), 0);
        queue.process_pending();
        assert_eq!(observer.take().len(), 1);
    }
}
