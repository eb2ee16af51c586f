pub mod crawl;
pub mod export;
pub mod parse;

// Re-export command functions for convenience
pub use crawl::crawl;
pub use export::export;
pub use parse::parse;
