//! Concurrent word-position indexing and query evaluation.
//!
//! The corpus grows from two sources: local text files and pages discovered
//! by crawling from a seed URL. Indexing tasks build private index fragments
//! and merge them into one shared inverted index under a reader/writer lock;
//! the query engine reads that index to answer ranked exact or prefix
//! queries, and may do so while indexing is still running.

pub mod crawler;
pub mod fetch;
pub mod html;
pub mod index;
pub mod lock;
pub mod query;
pub mod tokenizer;
pub mod work_queue;

use crate::crawler::Crawler;
use crate::fetch::Fetcher;
use crate::index::{InvertedIndex, SharedIndex};
use crate::lock::ReadWriteLock;
use crate::query::{QueryEngine, SearchMode};
use crate::work_queue::WorkQueue;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_THREADS: usize = 5;
pub const DEFAULT_MAX_PAGES: usize = 50;

/// Top-level context: the shared lock, the shared index, and the indexing
/// pool, constructed once and passed down explicitly.
pub struct SearchEngine {
    index: Arc<SharedIndex>,
    pool: Arc<WorkQueue>,
    max_pages: usize,
}

impl SearchEngine {
    pub fn new(threads: usize, max_pages: usize) -> Self {
        let lock = Arc::new(ReadWriteLock::new());
        Self {
            index: Arc::new(SharedIndex::new(lock)),
            pool: Arc::new(WorkQueue::new(threads)),
            max_pages: max_pages.max(1),
        }
    }

    pub fn index(&self) -> &Arc<SharedIndex> {
        &self.index
    }

    /// Indexes local files, one task per file. An unreadable file is logged
    /// and skipped; its siblings still complete, leaving a partial index.
    pub fn index_files(&self, paths: &[PathBuf]) {
        for path in paths {
            let index = Arc::clone(&self.index);
            let path = path.clone();
            self.pool.execute(move || match tokenizer::file_stems(&path) {
                Ok(stems) => {
                    let mut fragment = InvertedIndex::new();
                    fragment.add_stems(&stems, &path.to_string_lossy());
                    index.merge(&fragment);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "could not index file; skipping");
                }
            });
        }
        self.pool.join();
    }

    /// Crawls from `seed` on the indexing pool, feeding each page into the
    /// shared index; returns the number of pages scheduled.
    pub fn crawl(&self, seed: Url, fetcher: Arc<dyn Fetcher>) -> usize {
        let crawler = Crawler::new(
            Arc::clone(&self.pool),
            Arc::clone(&self.index),
            fetcher,
            self.max_pages,
        );
        crawler.run(seed);
        crawler.pages_scheduled()
    }

    /// A query engine over this index with its own worker pool, so query
    /// and indexing workloads never starve each other.
    pub fn queries(&self, threads: usize, mode: SearchMode) -> QueryEngine {
        QueryEngine::new(Arc::clone(&self.index), threads, mode)
    }
}
