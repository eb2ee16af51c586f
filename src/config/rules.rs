//! Extraction rule tables
//!
//! Every phrase list, character set and irregular-week override used by the
//! parser lives here as data, so a site copy change is a config edit rather
//! than a code change.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How links into the Hong Kong storefront are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegionPolicy {
    /// Keep the link and rewrite it to the base locale
    #[default]
    Normalize,
    /// Always drop region links
    Exclude,
    /// Drop region links unless they belong to a coin campaign
    ExcludeUnlessCampaign,
}

/// A week whose published dates are known to be wrong
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekOverride {
    /// Substring matched against the article URL
    pub url_pattern: String,

    /// First day of the week's promotion
    pub start_date: NaiveDate,
}

/// Data tables driving block location, title cleaning and date mining
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    /// Regex with two groups (year, week) matched against article URLs
    pub article_slug_pattern: String,

    /// Path fragment that marks a product link
    pub product_link_marker: String,

    /// Canonical product URL prefix; the product id is appended
    pub canonical_prefix: String,

    /// Path fragment identifying region storefront links
    pub region_marker: String,

    pub region_policy: RegionPolicy,

    /// Markers that keep a region link under `ExcludeUnlessCampaign`
    pub campaign_markers: Vec<String>,

    /// Link captions that are never a book title
    pub boilerplate_phrases: Vec<String>,

    /// A usable title must be longer than this many characters
    pub min_title_chars: usize,

    /// Announcement labels preceding a daily pick, e.g. `Kobo 99 選書`.
    /// Spaces match any run of whitespace, including none.
    pub selection_labels: Vec<String>,

    /// Bracket characters removed when building a mining key
    pub title_bracket_chars: String,

    /// Characters removed (with all whitespace) when comparing titles
    pub canonical_strip_chars: String,

    /// Regex of price/call-to-action text removed from excerpts
    pub excerpt_strip_pattern: String,

    pub excerpt_max_chars: usize,
    pub excerpt_keep_chars: usize,

    /// Characters only found in traditional script
    pub traditional_markers: String,

    /// Simplified counterparts of `traditional_markers`
    pub simplified_markers: String,

    /// Upper bound of picks per week for positional fallback
    pub days_per_week: usize,

    pub week_overrides: Vec<WeekOverride>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            article_slug_pattern: r"weekly-dd99-(\d{4})-w(\d+)".to_string(),
            product_link_marker: "/ebook/".to_string(),
            canonical_prefix: "https://www.kobo.com/tw/zh/ebook/".to_string(),
            region_marker: "/hk/".to_string(),
            region_policy: RegionPolicy::Normalize,
            campaign_markers: vec!["coin99".to_string(), "99coin".to_string()],
            boilerplate_phrases: [
                "查看電子書（HK）",
                "查看電子書 (HK)",
                "查看電子書",
                "閱讀電子書",
                "電子書",
                "View e-book",
                "view e-book",
                "Read e-book",
                "read e-book",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            min_title_chars: 2,
            selection_labels: vec!["Kobo 99 選書".to_string()],
            title_bracket_chars: "《》「」『』【】[]".to_string(),
            canonical_strip_chars: "《》「」『』【】[]（）()：:，,。!！？、-–—".to_string(),
            excerpt_strip_pattern: r"99元|NT\$?\s*99|HK\$?\s*99|購買|查看電子書（HK）|查看電子書"
                .to_string(),
            excerpt_max_chars: 400,
            excerpt_keep_chars: 380,
            traditional_markers: "與鉅電腦體國愛說寫時講師驗證戰爭".to_string(),
            simplified_markers: "与巨电脑体国爱说写时讲师验证战争".to_string(),
            days_per_week: 7,
            week_overrides: NaiveDate::from_ymd_opt(2025, 12, 4)
                .map(|start_date| WeekOverride {
                    url_pattern: "weekly-dd99-2025-w49".to_string(),
                    start_date,
                })
                .into_iter()
                .collect(),
        }
    }
}

impl ExtractionRules {
    /// Start date of the first override whose pattern occurs in `article_url`
    pub fn override_for(&self, article_url: &str) -> Option<NaiveDate> {
        self.week_overrides
            .iter()
            .find(|o| article_url.contains(&o.url_pattern))
            .map(|o| o.start_date)
    }

    /// Structural checks that do not need regex compilation
    pub fn validate(&self) -> Result<(), String> {
        if self.product_link_marker.is_empty() {
            return Err("product_link_marker must not be empty".to_string());
        }
        if self.selection_labels.iter().all(|l| l.trim().is_empty()) {
            return Err("at least one selection label is required".to_string());
        }
        if self.excerpt_keep_chars > self.excerpt_max_chars {
            return Err("excerpt_keep_chars must not exceed excerpt_max_chars".to_string());
        }
        if self.days_per_week == 0 {
            return Err("days_per_week must be greater than 0".to_string());
        }
        Ok(())
    }
}
