use std::iter::FusedIterator;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Settings;
use crate::error::FetchError;
use crate::parser::{next_page, PageLinks};

/// Where thread pages come from. One call, one retrieval.
pub trait PageSource {
    fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Blocking HTTP GET.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(FetchError::Client)?;
        Ok(HttpSource { client })
    }
}

impl PageSource for HttpSource {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let http = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };
        let resp = self.client.get(url.clone()).send().map_err(http)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().map_err(http)
    }
}

/// One downloaded thread page.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: u32,
    pub url: Url,
    pub html: String,
}

fn query_without_page(url: &Url) -> Vec<(String, String)> {
    url.query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// The one spelling of a thread URL that posts are stored under.
///
/// Drops the fragment and any `page` query pair, and trims trailing slashes
/// from the path, so `.../5-123/`, `.../5-123#reply` and `.../5-123?page=4`
/// all name the same thread.
pub fn canonical_thread_url(url: &Url) -> Url {
    let mut out = url.clone();
    out.set_fragment(None);

    let kept = query_without_page(url);
    if kept.is_empty() {
        out.set_query(None);
    } else {
        out.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = out.path().trim_end_matches('/').to_string();
    if !path.is_empty() {
        out.set_path(&path);
    }
    out
}

/// URL of page `page` of a thread. Page 1 is the thread URL itself.
pub fn page_url(thread: &Url, page: u32) -> Url {
    if page <= 1 {
        return thread.clone();
    }
    let kept = query_without_page(thread);
    let mut url = thread.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("page", &page.to_string());
    url
}

/// Lazy walk over a thread's pages.
///
/// Each `next()` fetches one page and reads its pagination links to decide
/// whether there is another. A fetch error is yielded once and ends the walk.
pub struct Pages<'a, S: ?Sized> {
    source: &'a S,
    thread: Url,
    next: Option<u32>,
    known_count: Option<u32>,
    max_pages: u32,
}

pub fn fetch_pages<S: PageSource + ?Sized>(source: &S, thread: Url, max_pages: u32) -> Pages<'_, S> {
    Pages {
        source,
        thread,
        next: Some(1),
        known_count: None,
        max_pages,
    }
}

impl<S: PageSource + ?Sized> Iterator for Pages<'_, S> {
    type Item = Result<Page, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let number = self.next.take()?;
        if number > self.max_pages {
            warn!(max_pages = self.max_pages, "page limit reached, stopping");
            return None;
        }

        let url = page_url(&self.thread, number);
        debug!(page = number, %url, "fetching");
        let html = match self.source.fetch(&url) {
            Ok(html) => html,
            Err(e) => return Some(Err(e)),
        };

        let links = PageLinks::scan(&html);
        self.next = next_page(links, number, self.known_count);
        if number == 1 {
            if let Some(total) = links.page_count {
                info!("There are a total of {} pages to analyze", total);
            }
        }
        self.known_count = links.page_count.max(self.known_count);

        Some(Ok(Page { number, url, html }))
    }
}

impl<S: PageSource + ?Sized> FusedIterator for Pages<'_, S> {}
