//! Markup extraction: turns fetched HTML into structured page signals.

pub mod page_extractor;

pub use page_extractor::PageExtractor;
