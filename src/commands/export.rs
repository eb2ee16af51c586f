use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;

use kobo99::calendar::CalendarWriter;
use kobo99::config::Config;
use kobo99::storage::{resolve_date_collisions, EntryStore};

pub fn export(config: Config, ics: Option<PathBuf>) -> Result<()> {
    let store = EntryStore::new(&config.storage.data_store);
    let entries = store.load();
    if entries.is_empty() {
        println!("Entry store is empty: {}", store.path().display());
        println!("Run a crawl first to fill it.");
    }

    let resolved = resolve_date_collisions(entries, &config.extraction);

    let ics_path = ics.unwrap_or_else(|| config.calendar.ics_path.clone());
    let events = CalendarWriter::new(config.calendar.clone())
        .write(&ics_path, &resolved, Utc::now())
        .with_context(|| format!("Failed to write calendar {}", ics_path.display()))?;

    println!("Calendar events: {events} -> {}", ics_path.display());
    Ok(())
}
