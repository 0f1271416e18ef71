use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use reqwest::StatusCode as HttpStatusCode;
use reqwest::header::{ACCEPT, HeaderMap, RETRY_AFTER};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::models::Article;

pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 10;
pub const MAX_RESULTS_PER_QUERY: usize = 20;
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.8;
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct ResearchOptions {
    pub country: String,
    pub search_lang: String,
    pub safe_search: String,
    pub freshness_days: i64,
    pub max_retries: u32,
    /// Minimum spacing between consecutive requests.
    pub request_delay: Duration,
    pub retry_base: Duration,
    pub retry_max: Duration,
    /// Upper bound applied to server-provided `retry-after` values.
    pub retry_after_cap: Duration,
    pub timeout: Duration,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self {
            country: "US".to_string(),
            search_lang: "en".to_string(),
            safe_search: "moderate".to_string(),
            freshness_days: 30,
            max_retries: 3,
            request_delay: Duration::from_secs(1),
            retry_base: Duration::from_secs(1),
            retry_max: Duration::from_secs(8),
            retry_after_cap: Duration::from_secs(60),
            timeout: Duration::from_secs(DEFAULT_SEARCH_TIMEOUT_SECS),
        }
    }
}

/// Brave web search client. Every failure mode degrades to an empty result.
#[derive(Debug)]
pub struct ResearchClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    options: ResearchOptions,
    last_request: Mutex<Option<Instant>>,
}

impl ResearchClient {
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        options: ResearchOptions,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            options,
            last_request: Mutex::new(None),
        })
    }

    pub fn from_config(config: &Config) -> Option<Result<Self, reqwest::Error>> {
        let api_key = config.brave_api_key.as_ref()?;
        let options = ResearchOptions {
            max_retries: config.research_max_retries,
            request_delay: config.research_request_delay,
            ..ResearchOptions::default()
        };
        Some(Self::new(api_key, &config.brave_api_url, options))
    }

    /// Search for recent articles on `query`, deduplicated and truncated to `count`.
    pub async fn search(&self, query: &str, count: usize) -> Vec<Article> {
        if count == 0 || query.trim().is_empty() {
            return Vec::new();
        }

        let today = Utc::now().date_naive();
        let params = self.query_params(query, count, today);
        tracing::info!(query, count, freshness = %params[4].1, "Searching for articles");

        let Some(data) = self.request_with_retry(&params).await else {
            tracing::warn!(query, "Research returned no data; continuing without sources");
            return Vec::new();
        };

        let mut articles = dedupe_articles(extract_articles(&data));
        articles.truncate(count);
        tracing::info!(query, found = articles.len(), "Research completed");
        articles
    }

    fn query_params(&self, query: &str, count: usize, today: NaiveDate) -> Vec<(&'static str, String)> {
        vec![
            ("q", query.to_string()),
            ("count", count.min(MAX_RESULTS_PER_QUERY).to_string()),
            ("country", self.options.country.clone()),
            ("search_lang", self.options.search_lang.clone()),
            ("freshness", freshness_range(today, self.options.freshness_days)),
            ("safesearch", self.options.safe_search.clone()),
        ]
    }

    async fn wait_for_rate_limit(&self) {
        let mut last_request = self.last_request.lock().await;
        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.options.request_delay {
                let wait = self.options.request_delay - elapsed;
                tracing::debug!(wait_ms = wait.as_millis(), "Rate limiting search request");
                tokio::time::sleep(wait).await;
            }
        }
        *last_request = Some(Instant::now());
    }

    async fn request_with_retry(&self, params: &[(&'static str, String)]) -> Option<Value> {
        let total_attempts = self.options.max_retries + 1;

        for attempt in 1..=total_attempts {
            let can_retry = attempt < total_attempts;
            self.wait_for_rate_limit().await;

            let response = self
                .http
                .get(&self.endpoint)
                .header(ACCEPT, "application/json")
                .header("X-Subscription-Token", &self.api_key)
                .query(params)
                .send()
                .await;

            let response = match response {
                Ok(resp) => resp,
                Err(error) => {
                    if can_retry {
                        let delay = self.backoff(attempt);
                        tracing::warn!(
                            attempt,
                            total_attempts,
                            delay_ms = delay.as_millis(),
                            "Search request failed (network/transport): {}. Retrying...",
                            error
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        "Search request failed after {} attempt(s): {}",
                        attempt,
                        error
                    );
                    return None;
                }
            };

            let status = response.status();
            if status == HttpStatusCode::TOO_MANY_REQUESTS {
                let delay = retry_after(response.headers())
                    .unwrap_or(Duration::from_secs(DEFAULT_RETRY_AFTER_SECS))
                    .min(self.options.retry_after_cap);
                if can_retry {
                    tracing::warn!(
                        attempt,
                        total_attempts,
                        delay_ms = delay.as_millis(),
                        "Search rate limited. Retrying..."
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                tracing::warn!("Search rate limit retries exhausted");
                return None;
            }

            if status.is_server_error() && can_retry {
                let delay = self.backoff(attempt);
                tracing::warn!(
                    attempt,
                    total_attempts,
                    status = %status,
                    delay_ms = delay.as_millis(),
                    "Search transient API error. Retrying..."
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                tracing::warn!(status = %status, "Search API returned an error status");
                return None;
            }

            return match response.json::<Value>().await {
                Ok(data) => Some(data),
                Err(error) => {
                    tracing::warn!("Failed to decode search response: {}", error);
                    None
                }
            };
        }

        None
    }

    fn backoff(&self, attempt: u32) -> Duration {
        retry_delay_for_attempt(attempt, self.options.retry_base, self.options.retry_max)
    }
}

fn retry_delay_for_attempt(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(max)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Brave `freshness` date range, e.g. `2024-05-01to2024-05-31`.
pub fn freshness_range(today: NaiveDate, days_back: i64) -> String {
    let start = today - chrono::Duration::days(days_back.max(0));
    format!("{}to{}", start.format("%Y-%m-%d"), today.format("%Y-%m-%d"))
}

/// Pull article records out of a Brave search response; results without a URL are skipped.
pub fn extract_articles(data: &Value) -> Vec<Article> {
    let Some(results) = data
        .get("web")
        .and_then(|web| web.get("results"))
        .and_then(|results| results.as_array())
    else {
        tracing::warn!("No web results found in search response");
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|result| {
            let url = result.get("url").and_then(|v| v.as_str())?.trim();
            if url.is_empty() {
                return None;
            }
            let title = result
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("No title available");
            let snippet = result
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("No description available");
            let age = result
                .get("age")
                .and_then(|v| v.as_str())
                .map(str::to_string);

            Some(Article {
                title: title.to_string(),
                url: url.to_string(),
                snippet: snippet.to_string(),
                age,
            })
        })
        .collect()
}

/// Drop repeated URLs and near-duplicate titles, keeping the first occurrence.
pub fn dedupe_articles(articles: Vec<Article>) -> Vec<Article> {
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut seen_titles: Vec<String> = Vec::new();
    let mut deduplicated = Vec::with_capacity(articles.len());

    for article in articles {
        let url = article.url.to_lowercase();
        if seen_urls.contains(&url) {
            continue;
        }

        let title = article.title.to_lowercase();
        let is_similar = seen_titles
            .iter()
            .any(|seen| is_similar_title(&title, seen, TITLE_SIMILARITY_THRESHOLD));
        if is_similar {
            continue;
        }

        seen_urls.insert(url);
        seen_titles.push(title);
        deduplicated.push(article);
    }

    deduplicated
}

/// Jaccard similarity of the lower-cased word sets.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let words_a: HashSet<&str> = a_lower.split_whitespace().collect();
    let words_b: HashSet<&str> = b_lower.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    intersection as f64 / union as f64
}

pub fn is_similar_title(a: &str, b: &str, threshold: f64) -> bool {
    let words_present = a.split_whitespace().next().is_some() && b.split_whitespace().next().is_some();
    words_present && title_similarity(a, b) >= threshold
}
