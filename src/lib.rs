//! Product page scraper: a headless Chrome session per request, and a
//! first-match-wins field extractor driven by per-marketplace profiles.

pub mod api;
pub mod browser;
pub mod config;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod orchestrator;
pub mod profiles;
