//! Parser integration tests using HTML fixture files
//!
//! Covers the whole extraction path: block location, date mining,
//! reconciliation, date assignment and the irregular-week override.

mod common;

use common::{article_url, load_fixture, ymd};
use kobo99::config::ExtractionRules;
use kobo99::crawler::url::canonical_product_url;
use kobo99::models::DateSource;
use kobo99::parser::sanitize::clean_title;
use kobo99::parser::ArticleParser;
use kobo99::utils::error::ParseError;
use proptest::prelude::*;
use std::collections::HashSet;

fn parser() -> ArticleParser {
    ArticleParser::new(&ExtractionRules::default()).unwrap()
}

// ============================================================================
// Fixture Tests
// ============================================================================

#[test]
fn test_weekly_fixture_all_dates_mined() {
    let html = load_fixture("weekly_2025_w51.html");
    let batch = parser().try_parse(&html, &article_url(2025, 51)).unwrap();

    let got: Vec<(_, &str)> = batch
        .entries
        .iter()
        .map(|e| (e.date, e.title.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![
            (ymd(2025, 12, 15), "破咒師"),
            (ymd(2025, 12, 16), "長夜將盡"),
            (ymd(2025, 12, 17), "邊境的燈塔"),
            (ymd(2025, 12, 18), "說書人的時代"),
            (ymd(2025, 12, 19), "海邊的卡夫卡"),
            (ymd(2025, 12, 20), "銀河鐵道之夜"),
            (ymd(2025, 12, 21), "夜晚的潛水艇"),
        ]
    );
    assert!(batch.entries.iter().all(|e| e.source == DateSource::Mined));
    assert_eq!(batch.stats.mined, 7);
    assert_eq!(batch.stats.matched_text, 7);
    assert_eq!(batch.stats.fallback, 0);
}

#[test]
fn test_weekly_fixture_metadata() {
    let html = load_fixture("weekly_2025_w51.html");
    let batch = parser().try_parse(&html, &article_url(2025, 51)).unwrap();

    assert_eq!(batch.article.year, 2025);
    assert_eq!(batch.article.week, 51);
    assert_eq!(batch.seed_date, ymd(2025, 12, 15));
    assert_eq!(batch.article_title, "【一週99元書單】Kobo 99 選書 第51週");

    // one duplicate HK link for the same book
    assert_eq!(batch.stats.links, 8);
    assert_eq!(batch.stats.blocks, 7);

    for entry in &batch.entries {
        assert_eq!(entry.article_url, article_url(2025, 51));
        assert_eq!(entry.week, 51);
        assert!(!entry.excerpt.contains("查看電子書"));
    }
}

#[test]
fn test_weekly_fixture_canonical_urls() {
    let html = load_fixture("weekly_2025_w51.html");
    let entries = parser().parse(&html, &article_url(2025, 51));

    let urls: Vec<&str> = entries.iter().map(|e| e.product_url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.kobo.com/tw/zh/ebook/po-zhou-shi-123",
            "https://www.kobo.com/tw/zh/ebook/chang-ye-jiang-jin",
            "https://www.kobo.com/tw/zh/ebook/bian-jing-de-deng-ta",
            "https://www.kobo.com/tw/zh/ebook/shuo-shu-ren-de-shi-dai",
            "https://www.kobo.com/tw/zh/ebook/hai-bian-de-kafka",
            "https://www.kobo.com/tw/zh/ebook/yin-he-tie-dao-zhi-ye",
            "https://www.kobo.com/tw/zh/ebook/ye-wan-de-qian-shui-ting",
        ]
    );
}

#[test]
fn test_script_text_is_not_mined() {
    let html = load_fixture("weekly_2025_w51.html");
    let entries = parser().parse(&html, &article_url(2025, 51));
    assert!(entries.iter().all(|e| e.date != ymd(2025, 12, 25)));
    assert!(entries.iter().all(|e| e.title != "不該出現的書"));
}

#[test]
fn test_no_date_text_uses_positional_dates() {
    let html = load_fixture("weekly_no_dates.html");
    let batch = parser().try_parse(&html, &article_url(2025, 51)).unwrap();

    let got: Vec<(_, &str)> = batch
        .entries
        .iter()
        .map(|e| (e.date, e.title.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![
            (ymd(2025, 12, 15), "第一本好書"),
            (ymd(2025, 12, 16), "第二本好書"),
            (ymd(2025, 12, 17), "第三本好書"),
        ]
    );
    assert!(batch.entries.iter().all(|e| e.source == DateSource::Fallback));
    assert_eq!(batch.stats.fallback, 3);
}

#[test]
fn test_two_char_titles_get_positional_dates() {
    let html = r#"<html><body><ul>
        <li><a href="/tw/zh/ebook/huo-zhe">活著</a></li>
        <li><a href="/tw/zh/ebook/san-ti" aria-label="三體"><img src="cover.jpg"></a></li>
        <li><a href="/tw/zh/ebook/xue-guo-zhi-chun">雪國之春</a></li>
    </ul></body></html>"#;
    let entries = parser().parse(html, &article_url(2025, 51));

    let got: Vec<_> = entries.iter().map(|e| (e.date, e.title.as_str())).collect();
    assert_eq!(
        got,
        vec![
            (ymd(2025, 12, 15), "活著"),
            (ymd(2025, 12, 16), "三體"),
            (ymd(2025, 12, 17), "雪國之春"),
        ]
    );
}

// ============================================================================
// Inline Scenarios
// ============================================================================

#[test]
fn test_single_announced_pick() {
    let html = r#"<html><body>
        <time datetime="2025-12-15T09:00:00+08:00"></time>
        <div class="pick">
            <p>12/20週六Kobo99選書：《破咒師》</p>
            <a href="https://www.kobo.com/tw/zh/ebook/po-zhou-shi-123">查看電子書</a>
        </div>
    </body></html>"#;
    let entries = parser().parse(html, &article_url(2025, 51));

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "破咒師");
    assert_eq!(entries[0].date, ymd(2025, 12, 20));
    assert!(entries[0].product_url.ends_with("/ebook/po-zhou-shi-123"));
}

#[test]
fn test_same_mined_date_keeps_one() {
    let html = r#"<html><body>
        <p>12/20週六Kobo99選書：《甲之書》</p>
        <p>12/20週六Kobo99選書：《乙之書》</p>
        <div><a href="/tw/zh/ebook/jia">甲之書</a></div>
        <div><a href="/tw/zh/ebook/yi">乙之書</a></div>
    </body></html>"#;

    let first = parser().try_parse(html, &article_url(2025, 51)).unwrap();
    let on_20th: Vec<_> = first
        .entries
        .iter()
        .filter(|e| e.date == ymd(2025, 12, 20))
        .collect();
    assert_eq!(on_20th.len(), 1);
    assert_eq!(on_20th[0].title, "甲之書");
    assert_eq!(first.stats.dropped, 1);

    // the released block falls back to the seed date
    let yi = first.entries.iter().find(|e| e.title == "乙之書").unwrap();
    assert_eq!(yi.date, ymd(2025, 12, 15));
    assert_eq!(yi.source, DateSource::Fallback);

    let second = parser().try_parse(html, &article_url(2025, 51)).unwrap();
    assert_eq!(first.entries, second.entries);
}

#[test]
fn test_zero_product_links() {
    let html = "<html><body><h1>本週暫停</h1><p>12/20週六Kobo99選書：《破咒師》</p></body></html>";
    assert!(parser().parse(html, &article_url(2025, 51)).is_empty());
    assert!(matches!(
        parser().try_parse(html, &article_url(2025, 51)),
        Err(ParseError::NoProductLinks(_))
    ));
}

#[test]
fn test_article_url_without_slug() {
    let html = load_fixture("weekly_no_dates.html");
    let url = "https://www.kobo.com/zh/blog/some-other-post";
    assert!(parser().parse(&html, url).is_empty());
    assert!(matches!(
        parser().try_parse(&html, url),
        Err(ParseError::InvalidArticleUrl(_))
    ));
}

#[test]
fn test_january_pick_in_late_december_week() {
    let html = r#"<html><body>
        <p>1/2週五Kobo99選書：《新年之書》</p>
        <div><a href="/tw/zh/ebook/new-year">新年之書</a></div>
    </body></html>"#;
    let entries = parser().parse(html, &article_url(2025, 52));
    assert_eq!(entries[0].date, ymd(2026, 1, 2));
}

#[test]
fn test_december_pick_in_early_january_week() {
    let html = r#"<html><body>
        <p>12/30週二Kobo99選書：《跨年之書》</p>
        <div><a href="/tw/zh/ebook/cross-year">跨年之書</a></div>
    </body></html>"#;
    let entries = parser().parse(html, &article_url(2026, 1));
    assert_eq!(entries[0].date, ymd(2025, 12, 30));
}

#[test]
fn test_override_week_counts_from_start_date() {
    let html = r#"<html><body>
        <p>12/1週一Kobo99選書：《甲之書》</p>
        <p>12/2週二Kobo99選書：《乙之書》</p>
        <div><a href="/tw/zh/ebook/jia">甲之書</a></div>
        <div><a href="/tw/zh/ebook/yi">乙之書</a></div>
        <div><a href="/tw/zh/ebook/bing">丙之書</a></div>
    </body></html>"#;
    let batch = parser().try_parse(html, &article_url(2025, 49)).unwrap();

    assert_eq!(batch.seed_date, ymd(2025, 12, 4));
    let got: Vec<_> = batch
        .entries
        .iter()
        .map(|e| (e.date, e.title.as_str(), e.source))
        .collect();
    assert_eq!(
        got,
        vec![
            (ymd(2025, 12, 4), "甲之書", DateSource::Override),
            (ymd(2025, 12, 5), "乙之書", DateSource::Override),
            (ymd(2025, 12, 6), "丙之書", DateSource::Fallback),
        ]
    );
}

#[test]
fn test_region_exclusion_policy() {
    let mut rules = ExtractionRules::default();
    rules.region_policy = kobo99::config::RegionPolicy::Exclude;
    let parser = ArticleParser::new(&rules).unwrap();

    let html = load_fixture("weekly_2025_w51.html");
    let entries = parser.parse(&html, &article_url(2025, 51));

    assert_eq!(entries.len(), 6);
    assert!(entries.iter().all(|e| e.title != "說書人的時代"));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_dates_unique_within_article(
        days in prop::collection::vec(15u32..=21, 1..8),
        extra in 0usize..4,
    ) {
        let mut html = String::from("<html><body>");
        for (i, day) in days.iter().enumerate() {
            html.push_str(&format!("<p>12/{day}週一Kobo99選書：《書名{i}號》</p>"));
        }
        for i in 0..days.len() + extra {
            html.push_str(&format!("<div><a href=\"/tw/zh/ebook/book-{i}\">書名{i}號</a></div>"));
        }
        html.push_str("</body></html>");

        let entries = parser().parse(&html, &article_url(2025, 51));
        let dates: HashSet<_> = entries.iter().map(|e| e.date).collect();
        prop_assert_eq!(dates.len(), entries.len());
        prop_assert!(entries.len() <= days.len() + extra);
        prop_assert!(!entries.is_empty());
    }

    #[test]
    fn prop_clean_title_idempotent(raw in "\\PC{0,40}") {
        let phrases = ExtractionRules::default().boilerplate_phrases;
        let once = clean_title(&raw, &phrases);
        prop_assert_eq!(clean_title(&once, &phrases), once.clone());
    }

    #[test]
    fn prop_canonical_url_ignores_locale_and_tracking(id in "[a-z0-9][a-z0-9-]{0,30}") {
        let rules = ExtractionRules::default();
        let expected = format!("https://www.kobo.com/tw/zh/ebook/{id}");
        let variants = [
            format!("https://www.kobo.com/tw/zh/ebook/{id}"),
            format!("https://www.kobo.com/hk/zh/ebook/{id}?utm_source=blog&utm_medium=post"),
            format!("https://www.kobo.com/zh/ebook/{id}#details"),
            format!("/tw/zh/ebook/{id}/"),
        ];
        for href in &variants {
            prop_assert_eq!(canonical_product_url(href, &rules).unwrap(), expected.clone());
        }
    }
}
