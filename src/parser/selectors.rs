//! CSS selectors for weekly 99 articles
//!
//! The blog layout changes every few months, so each concern carries a list of
//! selectors tried in order rather than a single one.

use lazy_static::lazy_static;
use scraper::Selector;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

/// Elements that group one book's link, title and blurb
pub const GROUPING_TAGS: &[&str] = &["li", "p", "div", "article", "section"];

lazy_static! {
    static ref LINKS: Selector = parse_selector!("a[href]");

    static ref BLOCK_TITLE: Vec<Selector> = vec![
        parse_selector!("h2"),
        parse_selector!("h3"),
        parse_selector!("h4"),
        parse_selector!("h5"),
        parse_selector!("[class*=\"title\"]"),
        parse_selector!("[class*=\"Title\"]"),
    ];

    static ref PUBLISH_DATE: Vec<Selector> = vec![
        parse_selector!("time[datetime]"),
        parse_selector!(".date"),
        parse_selector!(".published-date"),
        parse_selector!("[class*=\"date\"]"),
        parse_selector!("[class*=\"Date\"]"),
    ];

    static ref ARTICLE_TITLE: Vec<Selector> = vec![
        parse_selector!("h1"),
        parse_selector!("title"),
    ];
}

/// Selectors used by the block locator and title resolver
pub struct BlockSelectors {
    pub links: &'static Selector,
    pub title: &'static [Selector],
}

impl BlockSelectors {
    pub fn new() -> Self {
        Self {
            links: &LINKS,
            title: &BLOCK_TITLE,
        }
    }
}

impl Default for BlockSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Selectors for page-level metadata
pub struct PageSelectors {
    pub publish_date: &'static [Selector],
    pub article_title: &'static [Selector],
}

impl PageSelectors {
    pub fn new() -> Self {
        Self {
            publish_date: &PUBLISH_DATE,
            article_title: &ARTICLE_TITLE,
        }
    }
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self::new()
    }
}
