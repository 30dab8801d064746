//! Shared test fixtures: a scriptable source, a recording observer, and a
//! recording presentation surface.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Weak,
    },
    thread,
    time::Duration,
};

use parking_lot::Mutex;

use crate::{
    cell::{Cell, CellFactory, CellSource},
    event::{Mutation, MutationObserver},
    path::IndexPath,
    queue::MainQueue,
    source::{Item, ListSource, LoadingState, Notifier, Refreshable, SourceId},
};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory source whose contents are mutated from the test body. Every
/// mutation posts the matching local-coordinate event.
pub struct ScriptedSource {
    rows: Mutex<Vec<Vec<Item>>>,
    notifier: Notifier,
    reuse_id: &'static str,
    loading: Mutex<Option<LoadingState>>,
    refresh_delay: Option<Duration>,
    refreshes: Arc<AtomicUsize>,
}

impl ScriptedSource {
    /// One section per entry, populated with `"s{section}i{item}"` strings.
    pub fn with_counts(counts: &[usize], queue: &MainQueue) -> Arc<ScriptedSource> {
        Self::build(counts, None, queue)
    }

    /// Like [`with_counts`](ScriptedSource::with_counts), but refreshable: each
    /// refresh completes from a background thread after `delay`.
    pub fn refreshable(counts: &[usize], delay: Duration, queue: &MainQueue) -> Arc<ScriptedSource> {
        Self::build(counts, Some(delay), queue)
    }

    fn build(
        counts: &[usize],
        refresh_delay: Option<Duration>,
        queue: &MainQueue,
    ) -> Arc<ScriptedSource> {
        init_logging();
        let rows = counts
            .iter()
            .enumerate()
            .map(|(s, &n)| Self::section_items(s, n))
            .collect();
        Arc::new(ScriptedSource {
            rows: Mutex::new(rows),
            notifier: Notifier::new(queue.clone()),
            reuse_id: "scripted",
            loading: Mutex::new(None),
            refresh_delay,
            refreshes: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn section_items(section: usize, count: usize) -> Vec<Item> {
        (0..count)
            .map(|item| Arc::new(format!("s{section}i{item}")) as Item)
            .collect()
    }

    pub fn set_loading(&self, state: LoadingState) {
        *self.loading.lock() = Some(state);
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn insert_item(&self, path: IndexPath, item: Item) {
        self.rows.lock()[path.section].insert(path.item, item);
        self.notifier.items_inserted(vec![path]);
    }

    pub fn remove_item(&self, path: IndexPath) {
        self.rows.lock()[path.section].remove(path.item);
        self.notifier.items_removed(vec![path]);
    }

    pub fn insert_section(&self, index: usize, item_count: usize) {
        self.rows.lock().insert(index, Self::section_items(index, item_count));
        self.notifier.sections_inserted(vec![index]);
    }

    pub fn remove_section(&self, index: usize) {
        self.rows.lock().remove(index);
        self.notifier.sections_removed(vec![index]);
    }

    pub fn move_section(&self, from: usize, to: usize) {
        {
            let mut rows = self.rows.lock();
            let section = rows.remove(from);
            rows.insert(to, section);
        }
        self.notifier.section_moved(from, to);
    }
}

impl ListSource for ScriptedSource {
    fn section_count(&self) -> usize {
        self.rows.lock().len()
    }

    fn item_count(&self, section: usize) -> usize {
        self.rows.lock()[section].len()
    }

    fn total_item_count(&self) -> usize {
        self.rows.lock().iter().map(Vec::len).sum()
    }

    fn item(&self, path: IndexPath) -> Item {
        self.rows.lock()[path.section][path.item].clone()
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    fn loading_state(&self) -> Option<LoadingState> {
        *self.loading.lock()
    }

    fn as_refreshable(&self) -> Option<&dyn Refreshable> {
        self.refresh_delay.map(|_| self as &dyn Refreshable)
    }
}

impl Refreshable for ScriptedSource {
    fn refresh(&self, completion: Box<dyn FnOnce() + Send>) {
        let delay = self.refresh_delay.unwrap_or_default();
        let refreshes = self.refreshes.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            refreshes.fetch_add(1, Ordering::SeqCst);
            completion();
        });
    }
}

impl CellSource for ScriptedSource {
    fn bind_cell(&self, factory: &dyn CellFactory, path: IndexPath) -> Cell {
        factory.dequeue_cell(self.reuse_id, path)
    }

    fn supplementary_view(&self, factory: &dyn CellFactory, kind: &str, path: IndexPath) -> Cell {
        factory.dequeue_supplementary(kind, self.reuse_id, path)
    }

    fn update_cell(&self, cell: &mut Cell, item: &Item, _path: IndexPath) {
        if let Some(cell) = cell.downcast_mut::<DequeuedCell>() {
            cell.bound = item.downcast_ref::<String>().cloned();
        }
    }

    fn register_reusable_views(&self, surface: &dyn CellFactory) {
        surface.register(self.reuse_id);
    }
}

/// Accumulates every delivered mutation, in order.
pub struct RecordingObserver {
    events: Mutex<Vec<(SourceId, Mutation)>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<RecordingObserver> {
        Arc::new(RecordingObserver {
            events: Mutex::new(Vec::new()),
        })
    }

    /// Drains and returns the events recorded so far.
    pub fn take(&self) -> Vec<(SourceId, Mutation)> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl MutationObserver for RecordingObserver {
    fn on_mutation(&self, origin: SourceId, mutation: Mutation) {
        self.events.lock().push((origin, mutation));
    }
}

/// Subscribes `observer` to `notifier`; the test keeps the strong reference.
pub fn observe(notifier: &Notifier, observer: &Arc<RecordingObserver>) {
    let downgraded = Arc::downgrade(observer);
    let weak: Weak<dyn MutationObserver> = downgraded;
    notifier.subscribe(weak);
}

/// What a [`RecordingFactory`] hands back from a dequeue.
pub struct DequeuedCell {
    pub reuse_id: String,
    pub path: IndexPath,
    pub bound: Option<String>,
}

/// Presentation surface that records registrations and dequeues.
#[derive(Default)]
pub struct RecordingFactory {
    pub registered: Mutex<Vec<String>>,
    pub dequeues: Mutex<Vec<(String, IndexPath)>>,
}

impl CellFactory for RecordingFactory {
    fn register(&self, reuse_id: &str) {
        self.registered.lock().push(reuse_id.to_owned());
    }

    fn dequeue_cell(&self, reuse_id: &str, path: IndexPath) -> Cell {
        self.dequeues.lock().push((reuse_id.to_owned(), path));
        Box::new(DequeuedCell {
            reuse_id: reuse_id.to_owned(),
            path,
            bound: None,
        })
    }

    fn dequeue_supplementary(&self, _kind: &str, reuse_id: &str, path: IndexPath) -> Cell {
        self.dequeue_cell(reuse_id, path)
    }
}
