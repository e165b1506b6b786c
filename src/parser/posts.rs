use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::timestamp::split_timestamp;
use crate::config::DEFAULT_POSTS_PER_PAGE;
use crate::db::Post;
use crate::error::ParseError;

static BLOCK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.expanded.row").unwrap());
static MARKER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.text-right").unwrap());
/// Author link inside the profile cell; links in the body never count.
static AUTHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.columns:not(.text-right) a").unwrap());
static STAMP_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.timestamp").unwrap());
static BODY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.body").unwrap());

/// Per-page post number, e.g. `[#12]`.
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[#(\d+)\]").unwrap());

/// Posts found on one page, plus the number of candidate blocks that were
/// not posts (deleted placeholders, thread header rows, ...).
#[derive(Debug, Default)]
pub struct PageExtract {
    pub posts: Vec<Post>,
    pub skipped: usize,
}

/// Extract every post on a thread page, in document order.
///
/// Fails only when the page has no post blocks at all, which means the
/// document is not a thread page.
pub fn extract_page(
    html: &str,
    page: u32,
    posts_per_page: u32,
) -> Result<PageExtract, ParseError> {
    let doc = Html::parse_document(html);
    let mut out = PageExtract::default();
    let mut blocks = 0usize;

    for block in doc.select(&BLOCK_SEL) {
        blocks += 1;
        match parse_block(block, page, posts_per_page) {
            Ok(post) => out.posts.push(post),
            Err(e) => {
                debug!(page, block = blocks, reason = %e, "skipping block");
                out.skipped += 1;
            }
        }
    }

    if blocks == 0 {
        return Err(ParseError::NoPostMarkup);
    }
    Ok(out)
}

/// Posts on a page, with the default page size and no structural check.
pub fn extract_posts(html: &str, page: u32) -> Vec<Post> {
    extract_page(html, page, DEFAULT_POSTS_PER_PAGE)
        .map(|p| p.posts)
        .unwrap_or_default()
}

fn parse_block(block: ElementRef, page: u32, posts_per_page: u32) -> Result<Post, ParseError> {
    let number = block
        .select(&MARKER_SEL)
        .find_map(|cell| {
            let text = element_text(cell);
            let caps = MARKER_RE.captures(&text)?;
            caps[1].parse::<i64>().ok()
        })
        .ok_or(ParseError::MissingField("post number"))?;
    let post_id = i64::from(posts_per_page) * (i64::from(page) - 1) + number;

    let author = block
        .select(&AUTHOR_SEL)
        .next()
        .map(element_text)
        .filter(|a| !a.is_empty())
        .ok_or(ParseError::MissingField("author"))?;

    let stamp = block
        .select(&STAMP_SEL)
        .next()
        .map(element_text)
        .ok_or(ParseError::MissingField("timestamp"))?;
    let (date, time) = split_timestamp(&stamp)?;

    // An empty body is still a post (image-only, or stripped markup).
    let body = block.select(&BODY_SEL).next().map(element_text);

    Ok(Post {
        post_id,
        author,
        date,
        time,
        body,
        page,
    })
}

/// Text content with runs of whitespace collapsed.
fn element_text(el: ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
