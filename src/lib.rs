//! Download a forum thread into SQLite.
//!
//! Pages are fetched one at a time, split into posts and written to the
//! store before the next page is requested:
//!   1. `fetch`: walk the thread's pages
//!   2. `parser`: pull posts out of each page
//!   3. `db`: write them, resolving re-runs with a duplicate policy
//!
//! `report` reads the finished store.

pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod parser;
pub mod report;

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

pub use crate::config::{DuplicatePolicy, Settings};
pub use db::{Post, Store, WriteOutcome};
pub use error::{Error, FetchError, ParseError, StoreError};
pub use fetch::{canonical_thread_url, fetch_pages, HttpSource, Page, PageSource};

/// Counts from one download run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub pages: u32,
    pub inserted: usize,
    pub replaced: usize,
    pub duplicates: usize,
    pub skipped_blocks: usize,
}

/// Download a thread over HTTP into the database at `store_path`, with a
/// progress spinner on stderr.
pub fn download(thread_url: &str, store_path: &Path, settings: &Settings) -> Result<RunStats, Error> {
    let source = HttpSource::new(settings)?;
    download_from(&source, thread_url, store_path, settings, true)
}

/// Same as [`download`], reading pages from any source.
///
/// Posts are stored under [`canonical_thread_url`] of `thread_url`. Rows
/// written before an error stay in the store.
pub fn download_from<S: PageSource + ?Sized>(
    source: &S,
    thread_url: &str,
    store_path: &Path,
    settings: &Settings,
    show_progress: bool,
) -> Result<RunStats, Error> {
    let thread = canonical_thread_url(&Url::parse(thread_url).map_err(FetchError::from)?);
    let store = Store::open(store_path)?;
    let thread_key = thread.as_str().to_string();

    let pb = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    } else {
        ProgressBar::hidden()
    };

    info!(thread = %thread, db = ?store_path, "Beginning download and processing");
    let mut stats = RunStats::default();

    for page in fetch_pages(source, thread, settings.max_pages) {
        let page = page?;
        if page.number % 10 == 0 {
            info!("Analyzing page {}", page.number);
        }

        let extract = parser::extract_page(&page.html, page.number, settings.posts_per_page)?;
        stats.pages += 1;
        stats.skipped_blocks += extract.skipped;

        for post in &extract.posts {
            match store.save_post(&thread_key, post, settings.duplicate_policy)? {
                WriteOutcome::Inserted => stats.inserted += 1,
                WriteOutcome::Replaced => stats.replaced += 1,
                WriteOutcome::Skipped => stats.duplicates += 1,
            }
        }

        debug!(page = page.number, posts = extract.posts.len(), "page stored");
        pb.set_message(format!("page {} ({} posts)", page.number, stats.inserted + stats.replaced));
    }

    pb.finish_and_clear();
    info!(
        pages = stats.pages,
        inserted = stats.inserted,
        replaced = stats.replaced,
        duplicates = stats.duplicates,
        "Completed webpage parsing"
    );
    Ok(stats)
}
