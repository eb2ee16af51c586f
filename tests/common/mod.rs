//! Common test utilities

use chrono::NaiveDate;
use kobo99::models::{DateSource, ResolvedEntry};
use std::fs;

/// Test fixture directory
pub const FIXTURES_DIR: &str = "tests/fixtures/html";

/// Load an HTML fixture by file name
#[allow(dead_code)]
pub fn load_fixture(filename: &str) -> String {
    let path = format!("{FIXTURES_DIR}/{filename}");
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to load fixture: {path}"))
}

/// Weekly article URL on the production blog
#[allow(dead_code)]
pub fn article_url(year: i32, week: u32) -> String {
    format!("https://www.kobo.com/zh/blog/weekly-dd99-{year}-w{week}")
}

#[allow(dead_code)]
pub fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Create a resolved entry with default values
#[allow(dead_code)]
pub fn create_entry(title: &str, product_id: &str, date: NaiveDate) -> ResolvedEntry {
    ResolvedEntry {
        title: title.to_string(),
        product_url: format!("https://www.kobo.com/tw/zh/ebook/{product_id}"),
        article_url: article_url(2025, 51),
        article_title: "一週99元書單".to_string(),
        excerpt: String::new(),
        date,
        week: 51,
        year: 2025,
        source: DateSource::Mined,
    }
}
