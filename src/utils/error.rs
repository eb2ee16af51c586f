//! Error types for the kobo99 crawler
//!
//! This module defines the domain error types used throughout the application.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Article does not exist (yet)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded (last status: {0:?})")]
    MaxRetriesExceeded(Option<u16>),

    /// Content decoding error
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Transient failures worth another attempt later
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Timeout | Self::MaxRetriesExceeded(_) | Self::ServerError(_)
        )
    }
}

/// Errors that can occur while extracting entries from an article
#[derive(Error, Debug)]
pub enum ParseError {
    /// Article URL does not carry the year/week slug
    #[error("Article URL has no weekly slug: {0}")]
    InvalidArticleUrl(String),

    /// A product link without a usable identifier
    #[error("Invalid product URL: {0}")]
    InvalidProductUrl(String),

    /// No publication date could be inferred
    #[error("No date anchor found for article: {0}")]
    NoDateAnchor(String),

    /// The page contains no product links
    #[error("No product links found in article: {0}")]
    NoProductLinks(String),

    /// A configured extraction pattern does not compile
    #[error("Invalid extraction pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl ParseError {
    /// Parse failures are deterministic for a given page
    pub fn is_recoverable(&self) -> bool {
        false
    }
}

/// Errors raised by the entry store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure
    #[error("Store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization failure
    #[error("Store serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
