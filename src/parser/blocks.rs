//! Product block location and title resolution
//!
//! A block is the nearest grouping element around a product link. Each
//! product identifier yields at most one block and each grouping element is
//! used at most once, both in document order.

use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use tracing::debug;

use crate::config::ExtractionRules;
use crate::crawler::url::{canonical_product_url, is_product_link, product_id, region_allows};
use crate::models::RawBlock;
use crate::parser::sanitize::{clean_excerpt, clean_title, is_boilerplate};
use crate::parser::selectors::{BlockSelectors, GROUPING_TAGS};
use crate::utils::error::ParseError;
use crate::utils::normalize_whitespace;

/// Result of scanning one document
#[derive(Debug, Clone, Default)]
pub struct LocatedBlocks {
    /// Product links seen before any filtering
    pub links: usize,
    pub blocks: Vec<RawBlock>,
}

/// Finds product blocks and resolves their titles
pub struct BlockLocator {
    rules: ExtractionRules,
    excerpt_strip: Regex,
    selectors: BlockSelectors,
}

impl BlockLocator {
    pub fn new(rules: &ExtractionRules) -> Result<Self, ParseError> {
        let excerpt_strip =
            Regex::new(&rules.excerpt_strip_pattern).map_err(|e| ParseError::InvalidPattern {
                pattern: rules.excerpt_strip_pattern.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            rules: rules.clone(),
            excerpt_strip,
            selectors: BlockSelectors::new(),
        })
    }

    /// Scan `document` for product links and group them into blocks
    pub fn locate(&self, document: &Html) -> LocatedBlocks {
        let marker = &self.rules.product_link_marker;
        let mut located = LocatedBlocks::default();
        let mut seen_ids = HashSet::new();
        let mut seen_groups = HashSet::new();

        for link in document.select(self.selectors.links) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if !is_product_link(href, marker) {
                continue;
            }
            located.links += 1;

            let link_text = element_text(&link);
            if !region_allows(href, &link_text, &self.rules) {
                debug!(href = %href, "Skipping region link");
                continue;
            }

            let Some(id) = product_id(href, marker) else {
                debug!(href = %href, "Product link without identifier");
                continue;
            };
            if !seen_ids.insert(id.clone()) {
                continue;
            }

            let product_url = match canonical_product_url(href, &self.rules) {
                Ok(url) => url,
                Err(e) => {
                    debug!(href = %href, error = %e, "Skipping product link");
                    continue;
                }
            };

            let Some(group) = grouping_ancestor(&link) else {
                debug!(href = %href, "Product link outside any grouping element");
                continue;
            };
            if !seen_groups.insert(group.id()) {
                continue;
            }

            let text = element_text(&group);
            let position = located.blocks.len();
            located.blocks.push(RawBlock {
                product_id: id,
                href: href.to_string(),
                product_url,
                title: self.resolve_title(&group, &link),
                excerpt: clean_excerpt(
                    &text,
                    &self.excerpt_strip,
                    self.rules.excerpt_max_chars,
                    self.rules.excerpt_keep_chars,
                ),
                text,
                position,
            });
        }

        located
    }

    /// First usable title from: link text, heading-like descendant, then the
    /// link's `title` / `aria-label` attributes. Empty when none is usable.
    ///
    /// Link text needs at least `min_title_chars` characters and a heading
    /// more than that; attribute values are taken at any length.
    pub fn resolve_title(&self, group: &ElementRef, link: &ElementRef) -> String {
        let min_chars = self.rules.min_title_chars;

        let link_text = std::iter::once(element_text(link))
            .filter(|text| text.chars().count() >= min_chars);

        let headings = self
            .selectors
            .title
            .iter()
            .filter_map(|selector| group.select(selector).next())
            .map(|el| element_text(&el))
            .filter(|text| text.chars().count() > min_chars);

        let attrs = ["title", "aria-label"]
            .into_iter()
            .filter_map(|name| link.value().attr(name))
            .map(normalize_whitespace);

        link_text
            .chain(headings)
            .chain(attrs)
            .map(|candidate| clean_title(&candidate, &self.rules.boilerplate_phrases))
            .find(|title| self.is_usable(title))
            .unwrap_or_default()
    }

    fn is_usable(&self, title: &str) -> bool {
        !title.is_empty() && !is_boilerplate(title, &self.rules.boilerplate_phrases)
    }
}

fn grouping_ancestor<'a>(link: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    link.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| GROUPING_TAGS.contains(&el.value().name()))
}

fn element_text(el: &ElementRef) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionPolicy;

    fn locate(html: &str) -> LocatedBlocks {
        locate_with(html, &ExtractionRules::default())
    }

    fn locate_with(html: &str, rules: &ExtractionRules) -> LocatedBlocks {
        let locator = BlockLocator::new(rules).unwrap();
        locator.locate(&Html::parse_document(html))
    }

    #[test]
    fn test_no_product_links() {
        let located = locate("<html><body><p><a href='/zh/blog'>blog</a></p></body></html>");
        assert_eq!(located.links, 0);
        assert!(located.blocks.is_empty());
    }

    #[test]
    fn test_dedup_by_product_id() {
        let html = r#"<html><body>
            <div><a href="https://www.kobo.com/tw/zh/ebook/abc">雪國的故事</a></div>
            <div><a href="https://www.kobo.com/hk/zh/ebook/abc?utm_source=x">雪國的故事</a></div>
            <div><a href="https://www.kobo.com/tw/zh/ebook/def">破咒師</a></div>
        </body></html>"#;
        let located = locate(html);

        assert_eq!(located.links, 3);
        assert_eq!(located.blocks.len(), 2);
        assert_eq!(located.blocks[0].product_id, "abc");
        assert_eq!(located.blocks[1].product_url, "https://www.kobo.com/tw/zh/ebook/def");
        assert_eq!(located.blocks[1].position, 1);
    }

    #[test]
    fn test_one_block_per_grouping_element() {
        let html = r#"<html><body>
            <p><a href="/tw/zh/ebook/one">第一本書</a> <a href="/tw/zh/ebook/two">第二本書</a></p>
        </body></html>"#;
        let located = locate(html);
        assert_eq!(located.blocks.len(), 1);
        assert_eq!(located.blocks[0].product_id, "one");
    }

    #[test]
    fn test_title_falls_back_to_heading() {
        let html = r#"<html><body><div>
            <h3>《破咒師》</h3>
            <a href="/tw/zh/ebook/po-zhou-shi-123">查看電子書</a>
        </div></body></html>"#;
        let located = locate(html);
        assert_eq!(located.blocks[0].title, "《破咒師》");
    }

    #[test]
    fn test_title_falls_back_to_aria_label() {
        let html = r#"<html><body><li>
            <a href="/tw/zh/ebook/x" aria-label="邊境的燈塔"><img src="cover.jpg"></a>
        </li></body></html>"#;
        let located = locate(html);
        assert_eq!(located.blocks[0].title, "邊境的燈塔");
    }

    #[test]
    fn test_boilerplate_only_block_has_empty_title() {
        let html = r#"<html><body><li>
            <a href="/tw/zh/ebook/x">查看電子書（HK）</a>
        </li></body></html>"#;
        let located = locate(html);
        assert_eq!(located.blocks.len(), 1);
        assert!(!located.blocks[0].has_title());
    }

    #[test]
    fn test_short_link_text_is_skipped() {
        let html = r#"<html><body><div>
            <h4>長夜將盡</h4><a href="/tw/zh/ebook/x">購</a>
        </div></body></html>"#;
        let located = locate(html);
        assert_eq!(located.blocks[0].title, "長夜將盡");
    }

    #[test]
    fn test_two_char_titles_are_kept() {
        let html = r#"<html><body><ul>
            <li><a href="/tw/zh/ebook/huo-zhe">活著</a></li>
            <li><a href="/tw/zh/ebook/san-ti" aria-label="三體"><img src="cover.jpg"></a></li>
            <li><div><h3>雪國</h3><a href="/tw/zh/ebook/xue-guo">購</a></div></li>
        </ul></body></html>"#;
        let located = locate(html);

        let titles: Vec<_> = located.blocks.iter().map(|b| b.title.as_str()).collect();
        // headings still need more than two characters
        assert_eq!(titles, vec!["活著", "三體", ""]);
    }

    #[test]
    fn test_marker_in_query_is_not_a_product_link() {
        let html = r#"<html><body>
            <p><a href="/zh/blog?next=/ebook/x">上一篇</a></p>
            <p><a href="/zh/blog#/ebook/y">下一篇</a></p>
            <div><a href="/tw/zh/ebook/real-book?from=/ebook/x">真正的書</a></div>
        </body></html>"#;
        let located = locate(html);
        assert_eq!(located.links, 1);
        assert_eq!(located.blocks[0].product_id, "real-book");
    }

    #[test]
    fn test_region_exclusion() {
        let mut rules = ExtractionRules::default();
        rules.region_policy = RegionPolicy::ExcludeUnlessCampaign;
        let html = r#"<html><body>
            <div><a href="https://www.kobo.com/hk/zh/ebook/hk-only">香港限定書</a></div>
            <div><a href="https://www.kobo.com/tw/zh/ebook/tw-book">台灣的書</a></div>
        </body></html>"#;
        let located = locate_with(html, &rules);
        assert_eq!(located.links, 2);
        assert_eq!(located.blocks.len(), 1);
        assert_eq!(located.blocks[0].product_id, "tw-book");
    }

    #[test]
    fn test_excerpt_is_cleaned() {
        let html = r#"<html><body><div>
            <a href="/tw/zh/ebook/x">破咒師</a> 特價 NT$99 購買 一段關於魔法的故事
        </div></body></html>"#;
        let located = locate(html);
        let excerpt = &located.blocks[0].excerpt;
        assert!(!excerpt.contains("NT$99"));
        assert!(!excerpt.contains("購買"));
        assert!(excerpt.contains("一段關於魔法的故事"));
    }

    #[test]
    fn test_invalid_excerpt_pattern() {
        let mut rules = ExtractionRules::default();
        rules.excerpt_strip_pattern = "(".to_string();
        assert!(matches!(
            BlockLocator::new(&rules),
            Err(ParseError::InvalidPattern { .. })
        ));
    }
}
