//! MediaWiki client: cache, rate limiter and retry policy around two API calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, ClientBuilder, Url};
use scraper::Selector;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheStats, ResponseCache, DEFAULT_MAX_SIZE, DEFAULT_TTL};
use crate::error::{Result, WikiError};
use crate::extract::{self, ExtractedRecord};
use crate::preprocess::preprocess;
use crate::rate_limit::RateLimiter;
use crate::retry::{RetryError, RetryPolicy};

pub const DEFAULT_API_URL: &str = "https://stardewvalleywiki.com/mediawiki/api.php";
pub const WIKI_BASE_URL: &str = "https://stardewvalleywiki.com";
pub const DEFAULT_USER_AGENT: &str = concat!("StardewWikiClient/", env!("CARGO_PKG_VERSION"));
pub const MAX_SEARCH_LIMIT: u32 = 50;

static REDIRECT_LINK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.redirectMsg a").expect("Failed to parse redirect selector")
});

static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("Failed to compile tag regex"));

/// A fetched wiki page. Cached values are returned as clones, so two reads of the
/// same cached page compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFetchResult {
    pub title: String,
    pub html: String,
    pub categories: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

impl SearchHit {
    /// Snippet without search-match markup or HTML entities.
    pub fn clean_snippet(&self) -> String {
        let stripped = TAG.replace_all(&self.snippet, "");
        stripped
            .replace("&quot;", "\"")
            .replace("&#039;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&")
    }

    pub fn url(&self) -> String {
        format!("{}/{}", WIKI_BASE_URL, self.title.replace(' ', "_"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub success: bool,
    pub query: String,
    /// The search term that produced `items`, set by smart search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_used: Option<String>,
    pub items: Vec<SearchHit>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResult {
    fn found(query: &str, items: Vec<SearchHit>) -> Self {
        Self {
            success: true,
            query: query.to_string(),
            strategy_used: None,
            count: items.len(),
            items,
            error: None,
        }
    }

    fn failure(query: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            query: query.to_string(),
            strategy_used: None,
            items: Vec::new(),
            count: 0,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_max_size: usize,
    pub requests_per_second: f64,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            cache_ttl: DEFAULT_TTL,
            cache_max_size: DEFAULT_MAX_SIZE,
            requests_per_second: 5.0,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache(mut self, ttl: Duration, max_size: usize) -> Self {
        self.cache_ttl = ttl;
        self.cache_max_size = max_size;
        self
    }

    pub fn with_rate_limit(mut self, requests_per_second: f64) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Anything that can hand out wiki pages by title. Extractors that need a second
/// page (bundle, quest and achievement listings) go through this.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, title: &str) -> Result<PageFetchResult>;
}

// MediaWiki's legacy JSON format wraps strings as {"*": "..."}.
#[derive(Deserialize)]
struct Star {
    #[serde(rename = "*")]
    value: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct ParseResponse {
    parse: Option<ParsedPage>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct ParsedPage {
    title: Option<String>,
    text: Option<Star>,
    #[serde(default)]
    categories: Vec<Star>,
}

/// Target title of a MediaWiki redirect stub, if the page is one.
fn redirect_target(html: &str) -> Option<String> {
    let doc = scraper::Html::parse_fragment(html);
    let link = doc.select(&REDIRECT_LINK).next()?;
    let target = link
        .value()
        .attr("title")
        .map(str::to_string)
        .unwrap_or_else(|| link.text().collect::<String>());
    let target = target.trim().to_string();
    (!target.is_empty()).then_some(target)
}

pub struct WikiClient {
    http: Client,
    config: ClientConfig,
    cache: ResponseCache<PageFetchResult>,
    limiter: RateLimiter,
    cancel: CancellationToken,
}

impl WikiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = ClientBuilder::new()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| WikiError::Config(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(api_url = %config.api_url, "wiki client initialized");

        Ok(Self {
            http,
            cache: ResponseCache::new(config.cache_ttl, config.cache_max_size),
            limiter: RateLimiter::new(config.requests_per_second),
            cancel: CancellationToken::new(),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Cancelling this token aborts pending waits, backoffs and requests.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Full-text search. Failures come back as `success = false` rather than an error.
    pub async fn search(&self, query: &str, limit: u32) -> SearchResult {
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        if query.trim().is_empty() {
            return SearchResult::failure(query, "Invalid input: empty search query");
        }

        tracing::debug!(query = %query, limit, "searching wiki");
        match self.try_search(query, limit).await {
            Ok(items) => {
                tracing::info!(query = %query, count = items.len(), "search finished");
                SearchResult::found(query, items)
            }
            Err(e) => {
                tracing::error!(query = %query, error = %e, "search failed");
                SearchResult::failure(query, e.to_string())
            }
        }
    }

    async fn try_search(&self, query: &str, limit: u32) -> Result<Vec<SearchHit>> {
        self.wait_for_slot().await?;

        let limit = limit.to_string();
        let params = [
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("srlimit", limit.as_str()),
            ("format", "json"),
        ];
        let response: SearchResponse = self.get_json(&params).await?;

        if let Some(err) = response.error {
            return Err(WikiError::Unexpected(format!("{}: {}", err.code, err.info)));
        }
        Ok(response.query.map(|q| q.search).unwrap_or_default())
    }

    /// Rendered HTML and categories of a page. Served from the cache when possible;
    /// a redirect stub is followed once.
    pub async fn fetch_page(&self, title: &str) -> Result<PageFetchResult> {
        let title = title.trim();
        if title.is_empty() {
            return Err(WikiError::InvalidInput("page title is empty".to_string()));
        }

        if let Some(page) = self.cache.get(title) {
            tracing::debug!(title = %title, "cache hit");
            return Ok(page);
        }
        tracing::debug!(title = %title, "cache miss");

        let mut page = self.fetch_uncached(title).await?;
        if let Some(target) = redirect_target(&page.html) {
            tracing::info!(title = %title, target = %target, "following redirect");
            page = self.fetch_uncached(&target).await?;
            if redirect_target(&page.html).is_some() {
                return Err(WikiError::Redirect {
                    source_page: title.to_string(),
                    target_page: target,
                });
            }
        }

        self.cache.set(title, page.clone());
        tracing::info!(title = %title, categories = page.categories.len(), "fetched page");
        Ok(page)
    }

    async fn fetch_uncached(&self, title: &str) -> Result<PageFetchResult> {
        self.wait_for_slot().await?;

        let params = [
            ("action", "parse"),
            ("page", title),
            ("format", "json"),
            ("prop", "text|categories"),
        ];
        let response: ParseResponse = self.get_json(&params).await?;

        if let Some(err) = response.error {
            tracing::warn!(title = %title, code = %err.code, info = %err.info, "page not found");
            return Err(WikiError::PageNotFound { title: title.to_string() });
        }

        let Some(ParsedPage { title: parsed_title, text: Some(text), categories }) = response.parse
        else {
            tracing::warn!(title = %title, "parse response has no page text");
            return Err(WikiError::PageNotFound { title: title.to_string() });
        };

        Ok(PageFetchResult {
            title: parsed_title.unwrap_or_else(|| title.to_string()),
            html: text.value,
            categories: categories.into_iter().map(|c| c.value).collect(),
            fetched_at: Utc::now(),
        })
    }

    /// Tries the preprocessed search terms in order and returns the first search with
    /// results. When none has any, the raw query is searched as a last resort.
    pub async fn smart_search(&self, query: &str, limit: u32) -> SearchResult {
        let terms = preprocess(query);
        tracing::info!(query = %query, terms = ?terms, "smart search");

        let mut raw_result = None;
        for term in &terms {
            if self.cancel.is_cancelled() {
                return SearchResult::failure(query, WikiError::Cancelled.to_string());
            }

            let mut result = self.search(term, limit).await;
            if result.success && result.count > 0 {
                tracing::info!(
                    query = %query,
                    term = %term,
                    count = result.count,
                    "smart search matched"
                );
                result.query = query.to_string();
                result.strategy_used = Some(term.clone());
                return result;
            }
            if term == query {
                raw_result = Some(result);
            }
        }

        let mut result = match raw_result {
            Some(result) => result,
            None => self.search(query, limit).await,
        };
        if result.success {
            result.strategy_used = Some(query.to_string());
        }
        result
    }

    /// Fetches, classifies and extracts a page.
    pub async fn page_data(&self, title: &str) -> Result<ExtractedRecord> {
        let page = self.fetch_page(title).await?;
        Ok(extract::extract_page(&page, self).await)
    }

    async fn wait_for_slot(&self) -> Result<()> {
        if self.limiter.wait_cancellable(&self.cancel).await {
            Ok(())
        } else {
            Err(WikiError::Cancelled)
        }
    }

    /// One API call under the retry policy. Only transport failures are retried.
    async fn get_json<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let url = Url::parse_with_params(&self.config.api_url, params).map_err(|e| {
            WikiError::Config(format!("Invalid API URL '{}': {}", self.config.api_url, e))
        })?;

        let outcome = self
            .config
            .retry
            .run(&self.cancel, |attempt| {
                let request = self.http.get(url.clone());
                async move {
                    tracing::trace!(attempt, "sending request");
                    request.send().await?.error_for_status()?.json::<T>().await
                }
            })
            .await;

        match outcome {
            Ok(value) => Ok(value),
            Err(RetryError::Exhausted { last, .. }) => Err(WikiError::Network {
                url: url.to_string(),
                source: last,
            }),
            Err(RetryError::Fatal(e)) => Err(WikiError::Unexpected(e.to_string())),
            Err(RetryError::Cancelled) => Err(WikiError::Cancelled),
        }
    }
}

#[async_trait]
impl PageSource for WikiClient {
    async fn fetch_page(&self, title: &str) -> Result<PageFetchResult> {
        WikiClient::fetch_page(self, title).await
    }
}
