//! Bounded, deduplicating web crawl feeding the shared index.
//!
//! Each admitted page becomes one task on the work queue:
//! fetch -> extract links -> schedule children -> tokenize -> merge.
//! The frontier (visited set plus scheduled counter) is guarded by the same
//! shared lock as the index, and admission is a single write-lock critical
//! section covering both the check and the mark, so a URL can never be
//! scheduled twice.

use crate::fetch::Fetcher;
use crate::html;
use crate::index::{InvertedIndex, SharedIndex};
use crate::lock::ReadWriteLock;
use crate::tokenizer;
use crate::work_queue::WorkQueue;
use std::cell::UnsafeCell;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// URLs the crawl has committed to visiting, plus the page budget.
struct Frontier {
    lock: Arc<ReadWriteLock>,
    state: UnsafeCell<FrontierState>,
    max_pages: usize,
}

#[derive(Default)]
struct FrontierState {
    visited: HashSet<String>,
    scheduled: usize,
}

// Safety: `state` is only touched while the shared lock is held.
unsafe impl Send for Frontier {}
unsafe impl Sync for Frontier {}

impl Frontier {
    fn new(lock: Arc<ReadWriteLock>, max_pages: usize) -> Self {
        Self {
            lock,
            state: UnsafeCell::new(FrontierState::default()),
            max_pages: max_pages.max(1),
        }
    }

    /// Admits `url` when the budget allows and it has not been seen, marking
    /// it visited and consuming one budget slot in the same critical
    /// section.
    fn admit(&self, url: &Url) -> bool {
        let _guard = self.lock.write();
        // Safety: write lock held.
        let state = unsafe { &mut *self.state.get() };
        if state.scheduled >= self.max_pages || state.visited.contains(url.as_str()) {
            return false;
        }
        state.visited.insert(url.to_string());
        state.scheduled += 1;
        true
    }

    fn scheduled(&self) -> usize {
        let _guard = self.lock.read();
        // Safety: read lock held.
        unsafe { &*self.state.get() }.scheduled
    }
}

pub struct Crawler {
    queue: Arc<WorkQueue>,
    index: Arc<SharedIndex>,
    fetcher: Arc<dyn Fetcher>,
    frontier: Frontier,
}

impl Crawler {
    /// The frontier shares the index's lock: index state and crawl state are
    /// the two resources the shared lock protects.
    pub fn new(
        queue: Arc<WorkQueue>,
        index: Arc<SharedIndex>,
        fetcher: Arc<dyn Fetcher>,
        max_pages: usize,
    ) -> Arc<Self> {
        let frontier = Frontier::new(Arc::clone(index.lock()), max_pages);
        Arc::new(Self {
            queue,
            index,
            fetcher,
            frontier,
        })
    }

    /// Crawls from `seed` until the frontier drains or the page budget is
    /// spent; returns once every spawned page task has completed. The seed
    /// consumes the first budget slot.
    pub fn run(self: &Arc<Self>, seed: Url) {
        let mut seed = seed;
        seed.set_fragment(None);
        if self.frontier.admit(&seed) {
            self.submit(seed);
        }
        self.queue.join();
        tracing::info!(pages = self.pages_scheduled(), "crawl drained");
    }

    /// Pages admitted so far, the seed included. Never exceeds the budget.
    pub fn pages_scheduled(&self) -> usize {
        self.frontier.scheduled()
    }

    fn submit(self: &Arc<Self>, url: Url) {
        let crawler = Arc::clone(self);
        self.queue.execute(move || crawler.visit(&url));
    }

    /// One page task: fetch, schedule children, tokenize and merge. A fetch
    /// failure drops this page only; siblings proceed.
    fn visit(self: &Arc<Self>, url: &Url) {
        let Some(body) = self.fetcher.fetch(url) else {
            tracing::warn!(%url, "page could not be fetched; skipping");
            return;
        };

        for link in html::extract_links(url, &body) {
            if self.frontier.admit(&link) {
                self.submit(link);
            }
        }

        let text = html::strip_markup(&body);
        let stems = tokenizer::stems(&text);
        let mut fragment = InvertedIndex::new();
        fragment.add_stems(&stems, url.as_str());
        self.index.merge(&fragment);
        tracing::debug!(%url, words = stems.len(), "page indexed");
    }
}
