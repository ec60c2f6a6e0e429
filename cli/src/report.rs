//! JSON export of the index, word counts, and ranked query results. All
//! views are consistent snapshots taken at the moment of the call.

use anyhow::{Context, Result};
use engine::index::SharedIndex;
use engine::query::QueryEngine;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// `{word: {document: [positions]}}`, words and documents sorted.
pub fn write_index(index: &SharedIndex, path: &Path) -> Result<()> {
    let snapshot = index.snapshot();
    let file = create(path)?;
    serde_json::to_writer_pretty(file, snapshot.entries())?;
    Ok(())
}

/// `{document: word_count}`, documents sorted.
pub fn write_counts(index: &SharedIndex, path: &Path) -> Result<()> {
    let counts = index.word_counts();
    let file = create(path)?;
    serde_json::to_writer_pretty(file, &counts)?;
    Ok(())
}

/// `{query: [{count, score, where}]}` in rank order per query.
pub fn write_results(queries: &QueryEngine, path: &Path) -> Result<()> {
    let ranked = queries.all_ranked();
    let file = create(path)?;
    serde_json::to_writer_pretty(file, &ranked)?;
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("could not write {}", path.display()))?;
    Ok(BufWriter::new(file))
}
