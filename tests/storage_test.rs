//! Entry store and cross-run merge tests

mod common;

use common::{create_entry, ymd};
use kobo99::config::ExtractionRules;
use kobo99::storage::{merge_entries, resolve_date_collisions, EntryStore};
use std::fs;
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> EntryStore {
    EntryStore::new(dir.path().join("events.json"))
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let entries = vec![
        create_entry("破咒師", "po-zhou-shi-123", ymd(2025, 12, 15)),
        create_entry("長夜將盡", "chang-ye-jiang-jin", ymd(2025, 12, 16)),
    ];

    store.save(&entries).unwrap();
    assert_eq!(store.load(), entries);

    let raw = fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("\"date\": \"2025-12-15\""));
    assert!(raw.ends_with('\n'));
}

#[test]
fn test_load_skips_malformed_records() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    fs::write(
        store.path(),
        r#"[
            {
                "title": "破咒師",
                "product_url": "https://www.kobo.com/tw/zh/ebook/po-zhou-shi-123",
                "article_url": "https://www.kobo.com/zh/blog/weekly-dd99-2025-w51",
                "date": "2025-12-15",
                "source": "mined"
            },
            { "title": "沒有日期的書", "product_url": "x", "article_url": "y" },
            {
                "title": "長夜將盡",
                "book_url": "https://www.kobo.com/tw/zh/ebook/chang-ye-jiang-jin",
                "article_url": "https://www.kobo.com/zh/blog/weekly-dd99-2025-w51",
                "content": "一名老偵探的最後一個案子。",
                "date": "2025-12-16",
                "week": 51,
                "year": 2025
            },
            "not even an object"
        ]"#,
    )
    .unwrap();

    let entries = store.load();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].title, "破咒師");
    assert_eq!(
        entries[1].product_url,
        "https://www.kobo.com/tw/zh/ebook/chang-ye-jiang-jin"
    );
    assert_eq!(entries[1].excerpt, "一名老偵探的最後一個案子。");
}

#[test]
fn test_load_non_array_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    fs::write(store.path(), r#"{"entries": []}"#).unwrap();
    assert!(store.load().is_empty());

    fs::write(store.path(), "not json at all").unwrap();
    assert!(store.load().is_empty());
}

#[test]
fn test_merge_and_save_persists_merged_set() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store
        .save(&[create_entry("破咒師", "po-zhou-shi-123", ymd(2025, 12, 15))])
        .unwrap();

    let merged = store
        .merge_and_save(vec![
            create_entry("破咒師", "po-zhou-shi-123", ymd(2025, 12, 20)),
            create_entry("長夜將盡", "chang-ye-jiang-jin", ymd(2025, 12, 16)),
        ])
        .unwrap();

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].date, ymd(2025, 12, 20));
    assert_eq!(store.load(), merged);
}

// ============================================================================
// Merge and collisions
// ============================================================================

#[test]
fn test_merge_never_moves_date_backwards() {
    let stored = vec![create_entry("破咒師", "po-zhou-shi-123", ymd(2025, 12, 20))];
    let incoming = vec![create_entry("破咒師", "po-zhou-shi-123", ymd(2025, 12, 15))];

    let merged = merge_entries(stored.clone(), incoming);
    assert_eq!(merged, stored);
}

#[test]
fn test_merge_is_idempotent_for_same_input() {
    let batch = vec![
        create_entry("破咒師", "po-zhou-shi-123", ymd(2025, 12, 15)),
        create_entry("長夜將盡", "chang-ye-jiang-jin", ymd(2025, 12, 16)),
    ];
    let once = merge_entries(Vec::new(), batch.clone());
    let twice = merge_entries(once.clone(), batch);
    assert_eq!(once, twice);
}

#[test]
fn test_collisions_across_articles() {
    let rules = ExtractionRules::default();
    let mut simplified = create_entry("说书人的时代", "shuo-shu-ren-jian", ymd(2025, 12, 18));
    simplified.article_url = common::article_url(2025, 52);

    let entries = vec![
        simplified,
        create_entry("說書人的時代", "shuo-shu-ren-de-shi-dai", ymd(2025, 12, 18)),
        create_entry("長夜將盡", "chang-ye-jiang-jin", ymd(2025, 12, 16)),
    ];
    let resolved = resolve_date_collisions(entries, &rules);

    let got: Vec<_> = resolved.iter().map(|e| (e.date, e.title.as_str())).collect();
    assert_eq!(
        got,
        vec![
            (ymd(2025, 12, 16), "長夜將盡"),
            (ymd(2025, 12, 18), "說書人的時代"),
        ]
    );
}
