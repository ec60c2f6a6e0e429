//! Text normalization: NFKC, lowercase, punctuation stripping, Snowball
//! stemming. Every stem counts — the scoring model divides match counts by
//! the total word count of a document, so nothing is filtered out.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref STRIP: Regex = Regex::new(r"[^\p{L}\p{N}\s]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Cleans and stems `text` into word stems in document order.
pub fn stems(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let cleaned = STRIP.replace_all(&normalized, "");
    cleaned
        .split_whitespace()
        .map(|word| STEMMER.stem(word).to_string())
        .collect()
}

/// Reads and stems a whole file; fails with the I/O error for the indexing
/// task boundary to catch.
pub fn file_stems(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    Ok(stems(&text))
}
