use anyhow::{Context, Result};
use std::path::PathBuf;

use kobo99::config::Config;
use kobo99::parser::ArticleParser;

pub fn parse(config: Config, file: PathBuf, url: String, json: bool) -> Result<()> {
    let html = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read HTML file: {}", file.display()))?;

    let parser = ArticleParser::new(&config.extraction).context("Invalid extraction rules")?;
    let batch = parser
        .try_parse(&html, &url)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    if json {
        let out = serde_json::to_string_pretty(&batch.entries).context("Failed to serialize entries")?;
        println!("{out}");
        return Ok(());
    }

    println!("{}", batch.article_title);
    println!("Week {}-W{:02}, seed date {}", batch.article.year, batch.article.week, batch.seed_date);
    println!(
        "Links: {}  Blocks: {}  Mined: {}  Fallback: {}  Dropped: {}",
        batch.stats.links, batch.stats.blocks, batch.stats.mined, batch.stats.fallback, batch.stats.dropped
    );
    println!();

    for entry in &batch.entries {
        println!("{}  [{:<8}] {}", entry.date, entry.source, entry.title);
        println!("            {}", entry.product_url);
    }

    Ok(())
}
