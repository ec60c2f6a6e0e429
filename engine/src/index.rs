//! The word-position inverted index.
//!
//! [`InvertedIndex`] is the plain structure: word -> document -> ordered
//! 1-based positions, plus a per-document total word count. Indexing tasks
//! build one privately per document (no locking), then replay it into the
//! [`SharedIndex`] through [`SharedIndex::merge`]. Keeping the per-word work
//! outside the lock is the main scalability lever of the design.

use crate::lock::ReadWriteLock;
use std::cell::UnsafeCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Documents and the positions a word occupies in each, sorted by document.
pub type PostingMap = BTreeMap<String, Vec<usize>>;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvertedIndex {
    entries: BTreeMap<String, PostingMap>,
    counts: BTreeMap<String, usize>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `word` exists as a key. Idempotent.
    pub fn add_word(&mut self, word: &str) {
        if !self.entries.contains_key(word) {
            self.entries.insert(word.to_string(), PostingMap::new());
        }
    }

    /// Records one occurrence of `word` at `position` in `document` and
    /// bumps the document's word count. Positions are appended in discovery
    /// order and never removed.
    pub fn add(&mut self, word: &str, document: &str, position: usize) {
        *self.counts.entry(document.to_string()).or_insert(0) += 1;
        self.entries
            .entry(word.to_string())
            .or_default()
            .entry(document.to_string())
            .or_default()
            .push(position);
    }

    /// Indexes an ordered stem sequence for one document, positions 1..=n.
    pub fn add_stems(&mut self, stems: &[String], document: &str) {
        for (i, stem) in stems.iter().enumerate() {
            self.add(stem, document, i + 1);
        }
    }

    pub fn get(&self, word: &str) -> Option<&PostingMap> {
        self.entries.get(word)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.entries.contains_key(word)
    }

    /// All index words sharing `term` as a prefix, from the sorted key set.
    pub fn by_prefix(&self, term: &str) -> BTreeSet<String> {
        self.entries
            .range(term.to_string()..)
            .take_while(|(word, _)| word.starts_with(term))
            .map(|(word, _)| word.clone())
            .collect()
    }

    /// Index words in lexicographic order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, PostingMap> {
        &self.entries
    }

    /// Total word count of `document`, if anything was indexed for it.
    pub fn word_count(&self, document: &str) -> Option<usize> {
        self.counts.get(document).copied()
    }

    pub fn word_counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The shared, thread-safe index: one [`InvertedIndex`] behind the shared
/// lock. Mutation goes through the write side, reads through the read side,
/// and every read returns a snapshot copy rather than a live alias so a
/// caller never observes half-written state after the lock is released.
pub struct SharedIndex {
    lock: Arc<ReadWriteLock>,
    inner: UnsafeCell<InvertedIndex>,
}

// Safety: `inner` is only touched while the shared lock is held on the
// appropriate side; the lock serializes writers against readers.
unsafe impl Send for SharedIndex {}
unsafe impl Sync for SharedIndex {}

impl SharedIndex {
    pub fn new(lock: Arc<ReadWriteLock>) -> Self {
        Self {
            lock,
            inner: UnsafeCell::new(InvertedIndex::new()),
        }
    }

    /// The lock guarding this index; the crawl frontier shares it.
    pub fn lock(&self) -> &Arc<ReadWriteLock> {
        &self.lock
    }

    pub fn add_word(&self, word: &str) {
        let _guard = self.lock.write();
        // Safety: write lock held.
        unsafe { &mut *self.inner.get() }.add_word(word);
    }

    /// One logically atomic unit: ensure the word and document keys exist,
    /// append the position, and bump the word count, all under one write
    /// acquisition.
    pub fn add(&self, word: &str, document: &str, position: usize) {
        let _guard = self.lock.write();
        // Safety: write lock held.
        unsafe { &mut *self.inner.get() }.add(word, document, position);
    }

    /// Replays every (word, document, position) of a privately built
    /// fragment into the shared index. Each `add` is its own critical
    /// section; the merge order across fragments is unspecified, only the
    /// final content is.
    pub fn merge(&self, fragment: &InvertedIndex) {
        for (word, postings) in fragment.entries() {
            self.add_word(word);
            for (document, positions) in postings {
                for &position in positions {
                    self.add(word, document, position);
                }
            }
        }
    }

    /// Snapshot of the posting map for `word`, or `None` if absent.
    pub fn get(&self, word: &str) -> Option<PostingMap> {
        let _guard = self.lock.read();
        // Safety: read lock held.
        unsafe { &*self.inner.get() }.get(word).cloned()
    }

    pub fn contains(&self, word: &str) -> bool {
        let _guard = self.lock.read();
        // Safety: read lock held.
        unsafe { &*self.inner.get() }.contains(word)
    }

    pub fn by_prefix(&self, term: &str) -> BTreeSet<String> {
        let _guard = self.lock.read();
        // Safety: read lock held.
        unsafe { &*self.inner.get() }.by_prefix(term)
    }

    pub fn word_count(&self, document: &str) -> Option<usize> {
        let _guard = self.lock.read();
        // Safety: read lock held.
        unsafe { &*self.inner.get() }.word_count(document)
    }

    /// Snapshot of the per-document word-count table.
    pub fn word_counts(&self) -> BTreeMap<String, usize> {
        let _guard = self.lock.read();
        // Safety: read lock held.
        unsafe { &*self.inner.get() }.word_counts().clone()
    }

    /// Full snapshot for export; internally consistent at the moment of the
    /// call.
    pub fn snapshot(&self) -> InvertedIndex {
        let _guard = self.lock.read();
        // Safety: read lock held.
        unsafe { &*self.inner.get() }.clone()
    }

    pub fn len(&self) -> usize {
        let _guard = self.lock.read();
        // Safety: read lock held.
        unsafe { &*self.inner.get() }.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stems(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn add_word_is_idempotent() {
        let mut once = InvertedIndex::new();
        once.add_word("fox");
        let mut twice = InvertedIndex::new();
        twice.add_word("fox");
        twice.add_word("fox");
        assert_eq!(once, twice);
    }

    #[test]
    fn add_appends_positions_and_counts() {
        let mut index = InvertedIndex::new();
        index.add_stems(&stems("fox jump fox"), "a.txt");
        assert_eq!(index.get("fox").unwrap()["a.txt"], vec![1, 3]);
        assert_eq!(index.get("jump").unwrap()["a.txt"], vec![2]);
        assert_eq!(index.word_count("a.txt"), Some(3));
    }

    #[test]
    fn word_count_equals_sum_of_position_lists() {
        let mut index = InvertedIndex::new();
        index.add_stems(&stems("ant bee ant cow bee ant"), "doc");
        let total: usize = index
            .entries()
            .values()
            .flat_map(|postings| postings.values())
            .map(Vec::len)
            .sum();
        assert_eq!(index.word_count("doc"), Some(total));
    }

    #[test]
    fn by_prefix_matches_only_prefixed_words() {
        let mut index = InvertedIndex::new();
        for word in ["act", "actor", "acu", "apple", "zebra"] {
            index.add_word(word);
        }
        let matched = index.by_prefix("act");
        assert_eq!(
            matched.into_iter().collect::<Vec<_>>(),
            vec!["act".to_string(), "actor".to_string()]
        );
        assert!(index.by_prefix("missing").is_empty());
    }

    #[test]
    fn merge_order_does_not_change_content() {
        let mut a = InvertedIndex::new();
        a.add_stems(&stems("fox jump fox"), "a.txt");
        let mut b = InvertedIndex::new();
        b.add_stems(&stems("lazy fox"), "b.txt");
        let mut c = InvertedIndex::new();
        c.add_stems(&stems("jump high"), "c.txt");

        let forward = SharedIndex::new(Arc::new(ReadWriteLock::new()));
        for fragment in [&a, &b, &c] {
            forward.merge(fragment);
        }
        let backward = SharedIndex::new(Arc::new(ReadWriteLock::new()));
        for fragment in [&c, &b, &a] {
            backward.merge(fragment);
        }
        assert_eq!(forward.snapshot(), backward.snapshot());
    }

    #[test]
    fn concurrent_merges_reach_a_consistent_index() {
        let shared = Arc::new(SharedIndex::new(Arc::new(ReadWriteLock::new())));
        let mut handles = Vec::new();
        for i in 0..8 {
            let shared = Arc::clone(&shared);
            handles.push(std::thread::spawn(move || {
                let document = format!("doc-{i}.txt");
                let mut fragment = InvertedIndex::new();
                fragment.add_stems(&stems("fox jump fox lazy"), &document);
                shared.merge(&fragment);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let fox = shared.get("fox").unwrap();
        assert_eq!(fox.len(), 8);
        for positions in fox.values() {
            assert_eq!(positions, &vec![1, 3]);
        }
        for i in 0..8 {
            assert_eq!(shared.word_count(&format!("doc-{i}.txt")), Some(4));
        }
    }

    #[test]
    fn shared_reads_are_snapshots() {
        let shared = SharedIndex::new(Arc::new(ReadWriteLock::new()));
        shared.add("fox", "a.txt", 1);
        let before = shared.get("fox").unwrap();
        shared.add("fox", "a.txt", 2);
        // The earlier snapshot is a copy and does not see the later write.
        assert_eq!(before["a.txt"], vec![1]);
        assert_eq!(shared.get("fox").unwrap()["a.txt"], vec![1, 2]);
    }
}
