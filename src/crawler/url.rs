//! URL handling for weekly articles and product links
//!
//! - Product id extraction and canonical product URLs
//! - Region (HK storefront) filtering
//! - ISO week arithmetic and weekly article URL generation

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::config::{ExtractionRules, RegionPolicy};
use crate::utils::error::ParseError;

/// Extract the product identifier following `marker` in `href`.
///
/// The identifier runs up to the next `/`, `?` or `#`.
///
/// # Examples
///
/// ```
/// use kobo99::crawler::url::product_id;
///
/// let id = product_id("https://www.kobo.com/hk/zh/ebook/po-zhou-shi-123?utm_source=blog", "/ebook/");
/// assert_eq!(id.as_deref(), Some("po-zhou-shi-123"));
/// ```
pub fn product_id(href: &str, marker: &str) -> Option<String> {
    let path = link_path(href);
    let start = path.find(marker)? + marker.len();
    let rest = &path[start..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let id = rest[..end].trim();

    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// `href` without its query string and fragment
fn link_path(href: &str) -> &str {
    href.split(['?', '#']).next().unwrap_or(href)
}

/// Whether `href` points at a product page; the marker must sit in the path
///
/// ```
/// use kobo99::crawler::url::is_product_link;
///
/// assert!(is_product_link("/tw/zh/ebook/po-zhou-shi-123?utm_source=blog", "/ebook/"));
/// assert!(!is_product_link("/zh/blog?next=/ebook/po-zhou-shi-123", "/ebook/"));
/// ```
pub fn is_product_link(href: &str, marker: &str) -> bool {
    !marker.is_empty() && link_path(href).contains(marker)
}

/// Canonical product URL for a link: fixed locale prefix, id, no query.
///
/// HK-locale links, short `/zh/` paths, relative hrefs and tracking parameters
/// all collapse onto the same URL.
pub fn canonical_product_url(href: &str, rules: &ExtractionRules) -> Result<String, ParseError> {
    let id = product_id(href, &rules.product_link_marker)
        .ok_or_else(|| ParseError::InvalidProductUrl(href.to_string()))?;

    let canonical = format!("{}{}", rules.canonical_prefix, id);
    let parsed = Url::parse(&canonical).map_err(|_| ParseError::InvalidProductUrl(canonical))?;

    Ok(parsed.to_string())
}

/// Whether a product link survives the region rule
pub fn region_allows(href: &str, link_text: &str, rules: &ExtractionRules) -> bool {
    if rules.region_marker.is_empty() || !href.contains(&rules.region_marker) {
        return true;
    }

    match rules.region_policy {
        RegionPolicy::Normalize => true,
        RegionPolicy::Exclude => false,
        RegionPolicy::ExcludeUnlessCampaign => {
            let href_lower = href.to_lowercase();
            let text_lower = link_text.to_lowercase();
            rules.campaign_markers.iter().any(|m| {
                let m = m.to_lowercase();
                href_lower.contains(&m) || text_lower.contains(&m)
            })
        }
    }
}

/// Number of ISO weeks in `year` (52 or 53)
pub fn weeks_in_year(year: i32) -> u32 {
    if NaiveDate::from_isoywd_opt(year, 53, Weekday::Mon).is_some() {
        53
    } else {
        52
    }
}

/// Monday of ISO week (`year`, `week`).
///
/// Weeks past the end of the ISO year are counted forward from week 1.
pub fn iso_week_monday(year: i32, week: u32) -> Option<NaiveDate> {
    if week == 0 {
        return None;
    }
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).or_else(|| {
        let first = NaiveDate::from_isoywd_opt(year, 1, Weekday::Mon)?;
        first.checked_add_signed(Duration::weeks(i64::from(week) - 1))
    })
}

/// An ISO year/week pair, written `2025-W51`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekId {
    pub year: i32,
    pub week: u32,
}

impl WeekId {
    pub fn new(year: i32, week: u32) -> Option<Self> {
        if week >= 1 && week <= weeks_in_year(year) {
            Some(Self { year, week })
        } else {
            None
        }
    }

    /// ISO week containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn next(self) -> Self {
        if self.week >= weeks_in_year(self.year) {
            Self {
                year: self.year + 1,
                week: 1,
            }
        } else {
            Self {
                year: self.year,
                week: self.week + 1,
            }
        }
    }

    pub fn prev(self) -> Self {
        if self.week <= 1 {
            Self {
                year: self.year - 1,
                week: weeks_in_year(self.year - 1),
            }
        } else {
            Self {
                year: self.year,
                week: self.week - 1,
            }
        }
    }

    pub fn monday(self) -> Option<NaiveDate> {
        iso_week_monday(self.year, self.week)
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, week) = s
            .trim()
            .split_once(['-', 'W', 'w'])
            .ok_or_else(|| format!("expected YYYY-Www, got `{s}`"))?;
        let week = week.trim_start_matches(['W', 'w']);

        let year: i32 = year.parse().map_err(|_| format!("invalid year in `{s}`"))?;
        let week: u32 = week.parse().map_err(|_| format!("invalid week in `{s}`"))?;

        Self::new(year, week).ok_or_else(|| format!("week {week} does not exist in {year}"))
    }
}

/// Article URL for one week under `base_url`
pub fn weekly_article_url(base_url: &str, week: WeekId) -> String {
    format!(
        "{}/weekly-dd99-{}-w{}",
        base_url.trim_end_matches('/'),
        week.year,
        week.week
    )
}

/// Article URLs for every week from `start` to `end` inclusive
pub fn generate_weekly_urls(base_url: &str, start: WeekId, end: WeekId) -> Vec<String> {
    let mut urls = Vec::new();
    let mut current = start;

    while current <= end {
        urls.push(weekly_article_url(base_url, current));
        current = current.next();
    }

    urls
}

/// The `span` weeks ending with the week containing `today`
pub fn default_week_range(today: NaiveDate, span: u32) -> (WeekId, WeekId) {
    let end = WeekId::containing(today);
    let mut start = end;
    for _ in 1..span.max(1) {
        start = start.prev();
    }
    (start, end)
}
