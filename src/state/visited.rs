use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Set of absolute URLs already processed or queued in one crawl run
///
/// The set only grows. Cloning shares the underlying set, so the coordinator
/// and any helper task observe the same membership.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the URL and reports whether it was new
    ///
    /// Check and insert happen under one lock, so two callers racing on the
    /// same URL cannot both see `true`.
    pub fn insert_if_new(&self, url: &str) -> bool {
        self.inner.lock().insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner.lock().contains(url)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
