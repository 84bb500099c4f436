//! Progress hooks for extraction runs.
//!
//! Every extractor reports through an [`ExtractionObserver`]: once before the
//! first merge is replayed, once per object processed, and once with the
//! finished [`Clustering`]. Observers only watch; they cannot change the
//! order in which merges are processed.

use crate::clustering::Clustering;

/// Callbacks invoked while an extractor replays a hierarchy.
///
/// All methods default to no-ops, so implementors override only the hooks
/// they care about.
pub trait ExtractionObserver {
    /// Called once before any merge is processed.
    fn on_start(&mut self, _extractor: &str, _num_objects: usize) {}

    /// Called after each processed object with the running count.
    fn on_progress(&mut self, _processed: usize) {}

    /// Called once with the completed result.
    fn on_complete(&mut self, _clustering: &Clustering) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ExtractionObserver for NoopObserver {}

/// Observer that records what it saw. Mostly useful in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountingObserver {
    pub extractor: Option<String>,
    pub num_objects: usize,
    /// Number of `on_progress` calls
    pub progress_events: usize,
    /// Last reported running count
    pub processed: usize,
    /// Number of clusters in the completed result
    pub clusters: Option<usize>,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once `on_complete` has been called.
    pub fn is_complete(&self) -> bool {
        self.clusters.is_some()
    }
}

impl ExtractionObserver for CountingObserver {
    fn on_start(&mut self, extractor: &str, num_objects: usize) {
        self.extractor = Some(extractor.to_string());
        self.num_objects = num_objects;
    }

    fn on_progress(&mut self, processed: usize) {
        self.progress_events += 1;
        self.processed = processed;
    }

    fn on_complete(&mut self, clustering: &Clustering) {
        self.clusters = Some(clustering.len());
    }
}

impl<O: ExtractionObserver + ?Sized> ExtractionObserver for &mut O {
    fn on_start(&mut self, extractor: &str, num_objects: usize) {
        (**self).on_start(extractor, num_objects);
    }

    fn on_progress(&mut self, processed: usize) {
        (**self).on_progress(processed);
    }

    fn on_complete(&mut self, clustering: &Clustering) {
        (**self).on_complete(clustering);
    }
}
