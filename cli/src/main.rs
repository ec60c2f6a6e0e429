mod report;

use anyhow::{Context, Result};
use clap::Parser;
use engine::fetch::{HttpFetcher, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT};
use engine::query::SearchMode;
use engine::{tokenizer, SearchEngine};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "search")]
#[command(about = "Build a word-position index from files and crawled pages, then answer ranked queries")]
struct Cli {
    /// Text file or directory of text files to index
    #[arg(long)]
    text: Option<PathBuf>,
    /// Seed URL to crawl from
    #[arg(long)]
    html: Option<String>,
    /// Maximum number of pages to crawl
    #[arg(long, default_value_t = engine::DEFAULT_MAX_PAGES)]
    max_pages: usize,
    /// Worker threads per pool
    #[arg(long, default_value_t = engine::DEFAULT_THREADS)]
    threads: usize,
    /// Exact term matching instead of prefix matching
    #[arg(long, default_value_t = false)]
    exact: bool,
    /// File with one query per line
    #[arg(long)]
    query: Option<PathBuf>,
    /// Write the inverted index as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "index.json")]
    index: Option<PathBuf>,
    /// Write per-document word counts as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "counts.json")]
    counts: Option<PathBuf>,
    /// Write ranked query results as JSON
    #[arg(long, num_args = 0..=1, default_missing_value = "results.json")]
    results: Option<PathBuf>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let engine = SearchEngine::new(cli.threads, cli.max_pages);

    if let Some(text) = &cli.text {
        let files = list_text_files(text);
        if files.is_empty() {
            tracing::warn!(path = %text.display(), "no text files found");
        } else {
            tracing::info!(files = files.len(), "indexing local corpus");
            engine.index_files(&files);
        }
    }

    if let Some(seed) = &cli.html {
        let seed = Url::parse(seed).with_context(|| format!("invalid seed URL {seed}"))?;
        let fetcher = Arc::new(HttpFetcher::new(DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT)?);
        let pages = engine.crawl(seed, fetcher);
        tracing::info!(pages, "crawl complete");
    }

    if let Some(path) = &cli.index {
        report::write_index(engine.index(), path)?;
    }
    if let Some(path) = &cli.counts {
        report::write_counts(engine.index(), path)?;
    }

    if cli.query.is_some() || cli.results.is_some() {
        let mode = if cli.exact {
            SearchMode::Exact
        } else {
            SearchMode::Partial
        };
        let query_engine = engine.queries(cli.threads, mode);
        if let Some(query_file) = &cli.query {
            let queries = read_queries(query_file)?;
            query_engine.search_all(queries);
        }
        if let Some(path) = &cli.results {
            report::write_results(&query_engine, path)?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

/// All .txt/.text files under `root`, or `root` itself when it is a file.
fn list_text_files(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter(|entry| {
            matches!(
                entry.path().extension().and_then(|ext| ext.to_str()),
                Some("txt" | "text")
            )
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// One query per line, stemmed into a sorted term set; lines empty after
/// stemming are skipped.
fn read_queries(path: &Path) -> Result<Vec<BTreeSet<String>>> {
    let file = File::open(path).with_context(|| format!("could not read {}", path.display()))?;
    let mut queries = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let terms: BTreeSet<String> = tokenizer::stems(&line).into_iter().collect();
        if !terms.is_empty() {
            queries.push(terms);
        }
    }
    Ok(queries)
}
