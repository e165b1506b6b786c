use std::sync::LazyLock;

use scraper::{Html, Selector};

static NEXT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[rel~="next"], link[rel~="next"]"#).unwrap());
static PAGES_OPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("select.pages option").unwrap());

/// Next-page affordances found on one thread page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub has_next: bool,
    /// Largest page number offered by the page drop-down, if there is one.
    pub page_count: Option<u32>,
}

impl PageLinks {
    pub fn scan(html: &str) -> Self {
        let doc = Html::parse_document(html);
        let has_next = doc.select(&NEXT_SEL).next().is_some();
        let page_count = doc
            .select(&PAGES_OPTION_SEL)
            .filter_map(|opt| {
                let label = opt.text().collect::<String>();
                label
                    .split_whitespace()
                    .last()
                    .and_then(|tok| tok.parse::<u32>().ok())
            })
            .max();
        PageLinks {
            has_next,
            page_count,
        }
    }
}

/// The page after `current`, if the thread has one.
///
/// `known_count` is the largest page count seen on earlier pages; a `rel=next`
/// link wins over the count.
pub fn next_page(links: PageLinks, current: u32, known_count: Option<u32>) -> Option<u32> {
    if links.has_next {
        return Some(current + 1);
    }
    let total = links.page_count.max(known_count)?;
    (current < total).then_some(current + 1)
}
