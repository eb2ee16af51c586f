//! iCalendar export
//!
//! One all-day event per date. UIDs are derived from the event content, so
//! regenerating the file never duplicates events in subscribed calendars.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use icalendar::{Calendar, Component, Event, EventLike, Property};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::config::CalendarConfig;
use crate::models::ResolvedEntry;
use crate::utils::error::StoreError;

const UID_DOMAIN: &str = "kobo99-ical";

/// Renders resolved entries as an RFC 5545 calendar
pub struct CalendarWriter {
    config: CalendarConfig,
}

impl CalendarWriter {
    pub fn new(config: CalendarConfig) -> Self {
        Self { config }
    }

    /// Entries inside the retention window around `today`
    pub fn retain(&self, entries: &[ResolvedEntry], today: NaiveDate) -> Vec<ResolvedEntry> {
        let earliest = today - Duration::days(self.config.retention_past_days);
        let latest = today + Duration::days(self.config.retention_future_days);

        entries
            .iter()
            .filter(|e| e.date >= earliest && e.date <= latest)
            .cloned()
            .collect()
    }

    /// Build the calendar; the first titled entry per date wins
    pub fn build(&self, entries: &[ResolvedEntry], dtstamp: DateTime<Utc>) -> Calendar {
        let mut calendar = Calendar::new();
        calendar
            .append_property(Property::new("METHOD", "PUBLISH"))
            .append_property(Property::new("X-WR-CALNAME", &self.config.calendar_name));

        let mut dates = HashSet::new();
        for entry in entries.iter().filter(|e| !e.title.is_empty()) {
            if !dates.insert(entry.date) {
                continue;
            }
            calendar.push(self.event(entry, dtstamp));
        }

        calendar
    }

    /// Render the calendar as text with CRLF line endings
    pub fn render(&self, entries: &[ResolvedEntry], dtstamp: DateTime<Utc>) -> String {
        self.build(entries, dtstamp).to_string()
    }

    fn event(&self, entry: &ResolvedEntry, dtstamp: DateTime<Utc>) -> Event {
        let description = describe(entry);
        let summary = format!("{}{}", self.config.summary_prefix, entry.title);

        Event::new()
            .uid(&event_uid(entry, &description))
            .timestamp(dtstamp)
            .summary(&summary)
            .description(&description)
            .starts(entry.date)
            .ends(entry.date + Duration::days(1))
            .add_property("URL", &entry.product_url)
            .add_property("TRANSP", "TRANSPARENT")
            .done()
    }

    /// Render entries inside the retention window and write them to `path`
    pub fn write(
        &self,
        path: &Path,
        entries: &[ResolvedEntry],
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let kept = self.retain(entries, now.date_naive());
        let body = self.render(&kept, now);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        fs::write(path, body).map_err(|e| StoreError::io(path, e))?;

        let events = event_count(&kept);
        info!(path = %path.display(), events, "Calendar written");
        Ok(events)
    }
}

fn event_count(entries: &[ResolvedEntry]) -> usize {
    entries
        .iter()
        .filter(|e| !e.title.is_empty())
        .map(|e| e.date)
        .collect::<HashSet<_>>()
        .len()
}

/// Plain-text event description
pub fn describe(entry: &ResolvedEntry) -> String {
    let mut description = format!("書名：{}\n\n查看電子書：{}", entry.title, entry.product_url);
    if !entry.article_url.is_empty() {
        let _ = write!(description, "\n\n來源文章：{}", entry.article_url);
    }
    description
}

/// `kobo99-{16 hex}@kobo99-ical`, stable for identical content
pub fn event_uid(entry: &ResolvedEntry, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry.title.as_bytes());
    hasher.update(entry.product_url.as_bytes());
    hasher.update(description.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("kobo99-{}@{UID_DOMAIN}", &digest[..16])
}
