//! End-to-end runs over fixture pages.

use std::collections::HashMap;
use std::path::PathBuf;

use tempfile::TempDir;
use thread_scraper::report::{posts_per_day, top_posters};
use thread_scraper::{
    download_from, DuplicatePolicy, Error, FetchError, PageSource, ParseError, Settings, Store,
    StoreError,
};
use url::Url;

/// How a thread is stored and requested.
const THREAD: &str = "https://www.ar15.com/forums/general/Test_Thread/5-123456";
const PAGE2: &str = "https://www.ar15.com/forums/general/Test_Thread/5-123456?page=2";
/// The same thread as users usually paste it.
const THREAD_LINK: &str = "https://www.ar15.com/forums/general/Test_Thread/5-123456/";

/// Maps URLs to fixture files, like a tiny offline forum.
struct FixtureSite {
    pages: HashMap<String, String>,
}

impl FixtureSite {
    fn new(pages: &[(&str, &str)]) -> Self {
        let pages = pages
            .iter()
            .map(|(url, file)| {
                let html = std::fs::read_to_string(format!("tests/fixtures/{}.html", file))
                    .expect("fixture");
                (url.to_string(), html)
            })
            .collect();
        FixtureSite { pages }
    }

    fn thread() -> Self {
        Self::new(&[(THREAD, "thread_page1"), (PAGE2, "thread_page2")])
    }
}

impl PageSource for FixtureSite {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

fn setup() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("test.db");
    (dir, path)
}

fn settings(policy: DuplicatePolicy) -> Settings {
    Settings {
        duplicate_policy: policy,
        ..Settings::default()
    }
}

#[test]
fn two_page_thread_lands_in_store() {
    let (_dir, db) = setup();
    let stats = download_from(
        &FixtureSite::thread(),
        THREAD,
        &db,
        &Settings::default(),
        false,
    )
    .unwrap();

    assert_eq!(stats.pages, 2);
    assert_eq!(stats.inserted, 7);
    assert_eq!(stats.duplicates, 0);
    // one thread-header row per page
    assert_eq!(stats.skipped_blocks, 2);

    let store = Store::open(&db).unwrap();
    assert_eq!(store.count_posts(Some(THREAD)).unwrap(), 7);

    let top = top_posters(&store, Some(THREAD), 1).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!((top[0].author.as_str(), top[0].posts), ("alice", 4));

    let days: Vec<i64> = posts_per_day(&store, Some(THREAD))
        .unwrap()
        .iter()
        .map(|d| d.posts)
        .collect();
    assert_eq!(days, vec![3, 2, 2]);

    let ids: Vec<i64> = store.posts(THREAD).unwrap().iter().map(|p| p.post_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 51, 52]);
}

#[test]
fn rerun_with_skip_is_idempotent() {
    let (_dir, db) = setup();
    let site = FixtureSite::thread();
    let s = settings(DuplicatePolicy::Skip);

    download_from(&site, THREAD, &db, &s, false).unwrap();
    let again = download_from(&site, THREAD, &db, &s, false).unwrap();

    assert_eq!(again.inserted, 0);
    assert_eq!(again.duplicates, 7);
    assert_eq!(Store::open(&db).unwrap().count_posts(None).unwrap(), 7);
}

#[test]
fn url_spellings_share_one_thread() {
    let (_dir, db) = setup();
    let site = FixtureSite::thread();
    let s = settings(DuplicatePolicy::Skip);

    let first = download_from(&site, THREAD_LINK, &db, &s, false).unwrap();
    assert_eq!(first.inserted, 7);

    for link in [
        THREAD,
        "https://www.ar15.com/forums/general/Test_Thread/5-123456/#reply",
        "https://www.ar15.com/forums/general/Test_Thread/5-123456/?page=2",
    ] {
        let again = download_from(&site, link, &db, &s, false).unwrap();
        assert_eq!((again.inserted, again.duplicates), (0, 7), "{}", link);
    }

    let store = Store::open(&db).unwrap();
    assert_eq!(store.count_posts(None).unwrap(), 7);
    assert_eq!(store.threads().unwrap(), vec![THREAD.to_string()]);
    let ids: Vec<i64> = store.posts(THREAD).unwrap().iter().map(|p| p.post_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 51, 52]);
}

#[test]
fn rerun_with_overwrite_replaces_rows() {
    let (_dir, db) = setup();
    let site = FixtureSite::thread();
    let s = settings(DuplicatePolicy::Overwrite);

    download_from(&site, THREAD, &db, &s, false).unwrap();
    let again = download_from(&site, THREAD, &db, &s, false).unwrap();

    assert_eq!(again.replaced, 7);
    assert_eq!(Store::open(&db).unwrap().count_posts(None).unwrap(), 7);
}

#[test]
fn rerun_with_abort_fails_on_first_duplicate() {
    let (_dir, db) = setup();
    let site = FixtureSite::thread();
    let s = settings(DuplicatePolicy::Abort);

    download_from(&site, THREAD, &db, &s, false).unwrap();
    let err = download_from(&site, THREAD, &db, &s, false).unwrap_err();

    assert!(matches!(
        err,
        Error::Store(StoreError::DuplicatePost { post_id: 1 })
    ));
    assert_eq!(err.exit_code(), 5);
    assert_eq!(Store::open(&db).unwrap().count_posts(None).unwrap(), 7);
}

#[test]
fn failed_page_keeps_earlier_rows() {
    let (_dir, db) = setup();
    // page 1 advertises page 2, which the site cannot serve
    let site = FixtureSite::new(&[(THREAD, "thread_page1")]);

    let err = download_from(&site, THREAD, &db, &Settings::default(), false).unwrap_err();

    assert!(matches!(
        err,
        Error::Fetch(FetchError::Status { status: 404, .. })
    ));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(Store::open(&db).unwrap().count_posts(Some(THREAD)).unwrap(), 5);
}

#[test]
fn page_without_posts_aborts() {
    let (_dir, db) = setup();
    let mut site = FixtureSite::thread();
    site.pages
        .insert(PAGE2.to_string(), "<html><body>Maintenance</body></html>".to_string());

    let err = download_from(&site, THREAD, &db, &Settings::default(), false).unwrap_err();

    assert!(matches!(err, Error::Parse(ParseError::NoPostMarkup)));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(Store::open(&db).unwrap().count_posts(None).unwrap(), 5);
}

#[test]
fn page_cap_limits_the_run() {
    let (_dir, db) = setup();
    let s = Settings {
        max_pages: 1,
        ..Settings::default()
    };

    let stats = download_from(&FixtureSite::thread(), THREAD, &db, &s, false).unwrap();

    assert_eq!(stats.pages, 1);
    assert_eq!(stats.inserted, 5);
}

#[test]
fn bad_url_is_a_fetch_error() {
    let (_dir, db) = setup();
    let err = download_from(
        &FixtureSite::thread(),
        "not a url",
        &db,
        &Settings::default(),
        false,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Fetch(FetchError::InvalidUrl(_))));
}
