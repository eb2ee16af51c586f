//! Crate-level error type
//!
//! Domain errors live in [`crate::utils::error`]. Library entry points that
//! combine several of them ([`ArticleParser::new`](crate::parser::ArticleParser::new),
//! [`WeeklyCrawler::new`](crate::crawler::WeeklyCrawler::new)) return
//! [`Error`], which folds them together and sorts them into an
//! [`ErrorCategory`].
//!
//! Rule tables that fail to compile are configuration mistakes, not page
//! problems, so `ParseError::InvalidPattern` converts to [`Error::Config`].

use thiserror::Error;

pub use crate::utils::error::{FetchError, ParseError, StoreError};

/// Coarse grouping used in logs and by callers deciding whether to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Network,
    Parsing,
    Storage,
    Config,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Config => "config",
        })
    }
}

/// Unified error type for the kobo99 crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Page-level extraction failure
    #[error("Parse error: {0}")]
    Parse(ParseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration or extraction rules
    #[error("Config error: {0}")]
    Config(String),
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidPattern { .. } => Self::Config(err.to_string()),
            other => Self::Parse(other),
        }
    }
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Worth trying again on a later run
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Parse(e) => e.is_recoverable(),
            Self::Store(_) | Self::Config(_) => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Parse(_) => ErrorCategory::Parsing,
            Self::Store(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
