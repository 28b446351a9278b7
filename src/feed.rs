//! CiNii OpenSearch feed client.
//!
//! Builds one request per (keyword, offset), validates the response, and
//! normalizes Atom entries into candidate items. There is no retry here:
//! a failed fetch aborts the whole invocation, and every call costs one
//! request against the run's outbound budget.

use crate::config::{Config, SearchFieldMode};
use crate::error::{Result, WatchError};
use crate::item::{normalize_entry, CandidateItem};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// CiNii OpenSearch endpoint
const CINII_SEARCH_BASE: &str = "https://ci.nii.ac.jp/opensearch/search";

/// How much of an unparseable body to log for diagnosis
const PARSE_LOG_PREFIX_CHARS: usize = 500;

/// Search capability consumed by the pagination controller.
///
/// The real implementation is [`FeedClient`]; tests drive the pipeline with
/// an in-memory fake.
#[async_trait]
pub trait SearchBackend {
    /// Fetch one page of results for one keyword at the given offset.
    async fn search(&self, keyword: &str, start: u32) -> Result<Vec<CandidateItem>>;
}

/// HTTP client for the CiNii OpenSearch endpoint.
pub struct FeedClient {
    client: Client,
    config: Config,
}

impl FeedClient {
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("ciniiwatch/0.1 (dream papers watcher)")
            .build()
            .map_err(|e| WatchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl SearchBackend for FeedClient {
    async fn search(&self, keyword: &str, start: u32) -> Result<Vec<CandidateItem>> {
        let url = build_search_url(keyword, &self.config, start)?;
        debug!(url = %url, keyword = keyword, start = start, "Fetching CiNii page");

        let body = fetch_feed(&self.client, url.as_str()).await?;
        let items = parse_atom(&body)?;

        info!(keyword = keyword, start = start, count = items.len(), "Parsed CiNii results");
        Ok(items)
    }
}

/// Build the OpenSearch URL for one keyword (or the free-text query) at `start`.
pub fn build_search_url(keyword_or_query: &str, config: &Config, start: u32) -> Result<Url> {
    let mut url = Url::parse(CINII_SEARCH_BASE)
        .map_err(|e| WatchError::Config(format!("Bad endpoint URL: {}", e)))?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("count", &config.per_keyword_count.to_string())
            .append_pair("start", &start.to_string())
            .append_pair("sortorder", "1")
            .append_pair("format", "atom")
            .append_pair("lang", &config.lang)
            .append_pair("appid", &config.app_id);

        match config.search_field_mode {
            SearchFieldMode::FreeText => pairs.append_pair("q", keyword_or_query),
            SearchFieldMode::Title => pairs.append_pair("title", keyword_or_query),
        };
    }

    Ok(url)
}

/// Fetch the feed body, validating status and content shape.
async fn fetch_feed(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .header(
            "Accept",
            "application/atom+xml, application/xml;q=0.9, */*;q=0.8",
        )
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(WatchError::Transport {
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    if looks_like_html(&body) {
        return Err(WatchError::UnexpectedContent(
            "check query/appid".to_string(),
        ));
    }

    Ok(body)
}

/// Parse an Atom body into candidate items.
///
/// On failure, logs a bounded prefix of the raw body before propagating.
fn parse_atom(body: &str) -> Result<Vec<CandidateItem>> {
    let feed = feed_rs::parser::parse(body.as_bytes()).map_err(|e| {
        let head: String = body.chars().take(PARSE_LOG_PREFIX_CHARS).collect();
        error!(head = %head, "Feed parse failed");
        WatchError::Parse(format!("Failed to parse Atom feed: {}", e))
    })?;

    Ok(feed.entries.iter().map(normalize_entry).collect())
}

fn looks_like_html(body: &str) -> bool {
    body.to_lowercase().contains("<html")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ExcludeMode;
    use chrono::Weekday;
    use std::path::PathBuf;

    fn test_config() -> Config {
        Config {
            store_path: PathBuf::from("/tmp/papers.csv"),
            notify_email: "me@example.com".to_string(),
            mail_endpoint: None,
            app_id: "app-123".to_string(),
            query: "夢 OR dream".to_string(),
            keywords: vec!["夢".to_string()],
            search_field_mode: SearchFieldMode::Title,
            max_items: 10,
            per_keyword_count: 5,
            max_fetch_requests: 10,
            abstract_max_chars: 200,
            max_pages_per_run: 3,
            send_when_zero: false,
            send_backfill_email: false,
            lang: "ja".to_string(),
            require_abstract: false,
            exclude_title_keywords: vec![],
            exclude_mode: ExcludeMode::Exclude,
            daily_hour: 9,
            weekly_hour: 9,
            weekly_weekday: Weekday::Mon,
        }
    }

    #[test]
    fn test_build_search_url_title_mode() {
        let url = build_search_url("lucid dream", &test_config(), 20).expect("url");
        let query = url.query().expect("query");
        assert!(query.contains("count=5"));
        assert!(query.contains("start=20"));
        assert!(query.contains("sortorder=1"));
        assert!(query.contains("format=atom"));
        assert!(query.contains("lang=ja"));
        assert!(query.contains("appid=app-123"));
        assert!(query.contains("title=lucid+dream"));
        assert!(!query.contains("q="));
    }

    #[test]
    fn test_build_search_url_free_text_mode() {
        let mut config = test_config();
        config.search_field_mode = SearchFieldMode::FreeText;
        let url = build_search_url("夢 OR dream", &config, 0).expect("url");
        let query = url.query().expect("query");
        assert!(query.contains("q=%E5%A4%A2+OR+dream"));
        assert!(!query.contains("title="));
    }

    #[test]
    fn test_parse_atom_entries() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>CiNii Research</title>
  <id>urn:feed</id>
  <updated>2026-01-01T00:00:00Z</updated>
  <entry>
    <id>urn:e1</id>
    <title>夢の研究</title>
    <link rel="alternate" href="https://ci.nii.ac.jp/naid/1"/>
    <summary>An abstract about dreams.</summary>
    <published>2025-12-01T00:00:00Z</published>
    <updated>2025-12-02T00:00:00Z</updated>
  </entry>
  <entry>
    <id>urn:e2</id>
    <title>Untitled link-less entry</title>
    <updated>2025-12-03T00:00:00Z</updated>
  </entry>
</feed>"#;

        let items = parse_atom(body).expect("items");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source, "CiNii");
        assert_eq!(items[0].title, "夢の研究");
        assert_eq!(items[0].link, "https://ci.nii.ac.jp/naid/1");
        assert_eq!(items[0].abstract_text, "An abstract about dreams.");
        assert!(items[0].published.starts_with("2025-12-01"));
        assert!(items[1].link.is_empty());
        // updated stands in when published is missing
        assert!(items[1].published.starts_with("2025-12-03"));
    }

    #[test]
    fn test_parse_atom_rejects_garbage() {
        assert!(matches!(
            parse_atom("this is not xml at all"),
            Err(WatchError::Parse(_))
        ));
    }

    #[test]
    fn test_html_detection() {
        assert!(looks_like_html("<!DOCTYPE html><HTML><body>login</body>"));
        assert!(!looks_like_html("<?xml version=\"1.0\"?><feed/>"));
    }
}
