//! Retrieval and extraction engine for the Stardew Valley wiki.
//!
//! [`WikiClient`] talks to the MediaWiki API behind a cache, a rate limiter and a
//! retry policy. Fetched pages are tagged by [`classify`] and turned into typed
//! records by the [`extract`] module.

pub mod api;
pub mod cache;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod markup;
pub mod preprocess;
pub mod rate_limit;
pub mod retry;

use std::sync::Arc;

pub use classify::{classify, PageType};
pub use client::{ClientConfig, PageFetchResult, PageSource, SearchHit, SearchResult, WikiClient};
pub use config::Config;
pub use error::{Result, WikiError};
pub use extract::ExtractedRecord;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<WikiClient>,
}
