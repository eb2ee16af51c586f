use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;

use kobo99::calendar::CalendarWriter;
use kobo99::config::Config;
use kobo99::crawler::url::default_week_range;
use kobo99::crawler::{WeekId, WeeklyCrawler};
use kobo99::storage::{resolve_date_collisions, EntryStore};

pub async fn crawl(
    config: Config,
    start: Option<WeekId>,
    end: Option<WeekId>,
    weeks: u32,
    no_store: bool,
    ics: Option<PathBuf>,
) -> Result<()> {
    let (start, end) = week_range(start, end, weeks);
    if start > end {
        anyhow::bail!("start week {start} is after end week {end}");
    }

    println!("Kobo 99 Weekly Crawl");
    println!("====================");
    println!("Weeks: {start} .. {end}");

    let crawler = WeeklyCrawler::new(&config)?;
    let (entries, report) = crawler.crawl(start, end).await;

    let all_entries = if no_store {
        entries
    } else {
        let store = EntryStore::new(&config.storage.data_store);
        store
            .merge_and_save(entries)
            .with_context(|| format!("Failed to update entry store {}", store.path().display()))?
    };

    let resolved = resolve_date_collisions(all_entries, &config.extraction);

    let ics_path = ics.unwrap_or_else(|| config.calendar.ics_path.clone());
    let writer = CalendarWriter::new(config.calendar.clone());
    let events = writer
        .write(&ics_path, &resolved, Utc::now())
        .with_context(|| format!("Failed to write calendar {}", ics_path.display()))?;

    println!("\nCrawl Summary");
    println!("=============");
    println!("Articles fetched: {}", report.fetched);
    println!("Not published: {}", report.missing);
    println!("Failed: {}", report.failed);
    println!("Without entries: {}", report.empty);
    println!("New entries: {}", report.entries);
    println!("Dates known: {}", resolved.len());
    println!("Calendar events: {events} -> {}", ics_path.display());

    Ok(())
}

/// Explicit bounds win; otherwise `weeks` weeks ending at `end` (or now)
fn week_range(start: Option<WeekId>, end: Option<WeekId>, weeks: u32) -> (WeekId, WeekId) {
    let today = Utc::now().date_naive();
    let (default_start, default_end) = match end.and_then(|e| e.monday()) {
        Some(monday) => default_week_range(monday, weeks),
        None => default_week_range(today, weeks),
    };
    (start.unwrap_or(default_start), end.unwrap_or(default_end))
}
