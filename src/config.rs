//! Run configuration.
//!
//! A [`Config`] is built once per run from the property store and passed
//! explicitly to every component; nothing else reads properties. Defaults
//! and clamps match what the watcher has always used in production:
//! per-keyword counts clamp to 1-10, the request budget to 1-20, schedule
//! hours to 0-23.

use crate::error::{Result, WatchError};
use crate::merge::ExcludeMode;
use crate::props::PropertyStore;
use chrono::Weekday;
use std::path::PathBuf;
use std::str::FromStr;

/// Which CiNii query parameter carries the search term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchFieldMode {
    /// `title=` search (precise, per keyword)
    #[default]
    Title,
    /// `q=` free-text search (the whole query string at once)
    FreeText,
}

/// Configuration value object for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// CSV store file path
    pub store_path: PathBuf,
    /// Recipient for run notifications
    pub notify_email: String,
    /// Optional HTTP mail-relay endpoint; when unset, sends are logged only
    pub mail_endpoint: Option<String>,
    /// CiNii OpenSearch application id
    pub app_id: String,
    /// Free-text query used when the keyword list is empty in free-text mode
    pub query: String,
    /// Comma-separated keyword list, already split and trimmed
    pub keywords: Vec<String>,
    pub search_field_mode: SearchFieldMode,
    /// Result cap per run
    pub max_items: usize,
    /// Page size per keyword fetch (also the cursor step), clamped 1-10
    pub per_keyword_count: u32,
    /// Outbound request budget per invocation, clamped 1-20
    pub max_fetch_requests: u32,
    /// Abstract character budget
    pub abstract_max_chars: usize,
    /// Backfill round budget per invocation
    pub max_pages_per_run: u32,
    pub send_when_zero: bool,
    pub send_backfill_email: bool,
    /// Output language, `ja` or `en`
    pub lang: String,
    pub require_abstract: bool,
    pub exclude_title_keywords: Vec<String>,
    pub exclude_mode: ExcludeMode,
    /// Hour of day for the daily backfill trigger, clamped 0-23
    pub daily_hour: u32,
    /// Hour of day for the weekly new-arrivals trigger, clamped 0-23
    pub weekly_hour: u32,
    pub weekly_weekday: Weekday,
}

/// Default exclusion list: editorial/entertainment genres that drown out
/// research results for 夢/dream queries.
const DEFAULT_EXCLUDE_TITLE_KEYWORDS: &str =
    "映画,ブックガイド,特別鼎談,ニュース,連載,ガイド,旅,小説,エッセイ,随筆,対談,座談会,書評,特集";

const DEFAULT_QUERY: &str = "夢 OR dream OR dreaming OR \"lucid dream\" OR nightmare";
const DEFAULT_KEYWORDS: &str = "夢,悪夢,dream,dreaming,lucid dream,nightmare";

impl Config {
    /// Build the run configuration from the property store.
    ///
    /// Fails with a `Config` error naming every missing required property;
    /// this runs before any network call.
    pub fn from_props(props: &PropertyStore) -> Result<Self> {
        let store_path = props.get("STORE_PATH").unwrap_or("").to_string();
        let notify_email = props.get("NOTIFY_EMAIL").unwrap_or("").to_string();
        let app_id = props.get("CINII_APP_ID").unwrap_or("").to_string();

        let mut missing = Vec::new();
        if store_path.is_empty() {
            missing.push("STORE_PATH");
        }
        if notify_email.is_empty() {
            missing.push("NOTIFY_EMAIL");
        }
        if app_id.is_empty() {
            missing.push("CINII_APP_ID");
        }
        if !missing.is_empty() {
            return Err(WatchError::Config(format!(
                "Missing properties: {}",
                missing.join(", ")
            )));
        }

        let search_field_mode = match props.get("SEARCH_FIELD_MODE").unwrap_or("title") {
            m if m.eq_ignore_ascii_case("q") => SearchFieldMode::FreeText,
            _ => SearchFieldMode::Title,
        };

        let lang = match props.get("LANG").unwrap_or("ja") {
            l if l.eq_ignore_ascii_case("en") => "en".to_string(),
            _ => "ja".to_string(),
        };

        let exclude_mode = match props.get("EXCLUDE_MODE").unwrap_or("exclude") {
            m if m.eq_ignore_ascii_case("demote") => ExcludeMode::Demote,
            _ => ExcludeMode::Exclude,
        };

        let weekly_weekday = props
            .get("WEEKLY_WEEKDAY")
            .and_then(|v| Weekday::from_str(v).ok())
            .unwrap_or(Weekday::Mon);

        Ok(Self {
            store_path: PathBuf::from(store_path),
            notify_email,
            mail_endpoint: props
                .get("MAIL_ENDPOINT")
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string()),
            app_id,
            query: props.get("QUERY_STRING").unwrap_or(DEFAULT_QUERY).to_string(),
            keywords: parse_csv(props.get("KEYWORDS_LIST").unwrap_or(DEFAULT_KEYWORDS)),
            search_field_mode,
            max_items: parse_or(props.get("MAX_ITEMS"), 10),
            per_keyword_count: clamp_int(props.get("PER_KEYWORD_COUNT"), 1, 10, 5),
            max_fetch_requests: clamp_int(props.get("MAX_FETCH_REQUESTS"), 1, 20, 10),
            abstract_max_chars: parse_or(props.get("ABSTRACT_MAX_CHARS"), 200),
            max_pages_per_run: parse_or(props.get("MAX_PAGES_PER_RUN"), 3),
            send_when_zero: parse_bool(props.get("SEND_WHEN_ZERO")),
            send_backfill_email: parse_bool(props.get("SEND_BACKFILL_EMAIL")),
            lang,
            require_abstract: parse_bool(props.get("REQUIRE_ABSTRACT")),
            exclude_title_keywords: parse_csv(
                props
                    .get("EXCLUDE_TITLE_KEYWORDS")
                    .unwrap_or(DEFAULT_EXCLUDE_TITLE_KEYWORDS),
            ),
            exclude_mode,
            daily_hour: clamp_int(props.get("DAILY_HOUR"), 0, 23, 9),
            weekly_hour: clamp_int(props.get("WEEKLY_HOUR"), 0, 23, 9),
            weekly_weekday,
        })
    }

    /// Keywords to query this round, in configured order.
    ///
    /// An empty keyword list falls back to the free-text query string in
    /// free-text mode, or to the single default keyword otherwise.
    pub fn search_keywords(&self) -> Vec<String> {
        if !self.keywords.is_empty() {
            return self.keywords.clone();
        }
        if self.search_field_mode == SearchFieldMode::FreeText {
            return vec![self.query.clone()];
        }
        vec!["夢".to_string()]
    }
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn parse_csv(text: &str) -> Vec<String> {
    text.split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

fn parse_bool(value: Option<&str>) -> bool {
    value.map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

fn parse_or<T: FromStr>(value: Option<&str>, fallback: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(fallback)
}

fn clamp_int(value: Option<&str>, min: u32, max: u32, fallback: u32) -> u32 {
    match value.and_then(|v| v.trim().parse::<u32>().ok()) {
        Some(v) => v.clamp(min, max),
        None => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props_with(pairs: &[(&str, &str)]) -> (tempfile::TempDir, PropertyStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("properties.json");
        let mut store = PropertyStore::open(path).expect("open");
        for (k, v) in pairs {
            store.set(k, v).expect("set");
        }
        (dir, store)
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("STORE_PATH", "/tmp/papers.csv"),
            ("NOTIFY_EMAIL", "me@example.com"),
            ("CINII_APP_ID", "app-123"),
        ]
    }

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let (_dir, props) = props_with(pairs);
        Config::from_props(&props).expect("config")
    }

    #[test]
    fn test_missing_required_keys_listed() {
        let (_dir, props) = props_with(&[("NOTIFY_EMAIL", "me@example.com")]);
        let err = Config::from_props(&props).expect_err("should fail");
        let msg = err.to_string();
        assert!(msg.contains("STORE_PATH"));
        assert!(msg.contains("CINII_APP_ID"));
        assert!(!msg.contains("NOTIFY_EMAIL"));
    }

    #[test]
    fn test_defaults_and_clamps() {
        let mut pairs = required();
        pairs.push(("PER_KEYWORD_COUNT", "50"));
        pairs.push(("MAX_FETCH_REQUESTS", "0"));
        pairs.push(("DAILY_HOUR", "99"));
        let config = config_from(&pairs);

        assert_eq!(config.per_keyword_count, 10);
        assert_eq!(config.max_fetch_requests, 1);
        assert_eq!(config.daily_hour, 23);
        assert_eq!(config.weekly_hour, 9);
        assert_eq!(config.max_items, 10);
        assert_eq!(config.abstract_max_chars, 200);
        assert_eq!(config.max_pages_per_run, 3);
        assert_eq!(config.lang, "ja");
        assert_eq!(config.weekly_weekday, Weekday::Mon);
        assert_eq!(config.exclude_mode, ExcludeMode::Exclude);
        assert!(!config.send_when_zero);
        assert_eq!(config.store_path, PathBuf::from("/tmp/papers.csv"));
    }

    #[test]
    fn test_keyword_fallbacks() {
        let mut pairs = required();
        pairs.push(("KEYWORDS_LIST", " 夢 , , dream "));
        let config = config_from(&pairs);
        assert_eq!(config.search_keywords(), vec!["夢", "dream"]);

        let mut pairs = required();
        pairs.push(("KEYWORDS_LIST", ""));
        pairs.push(("SEARCH_FIELD_MODE", "q"));
        let config = config_from(&pairs);
        assert_eq!(config.search_keywords(), vec![config.query.clone()]);

        let mut pairs = required();
        pairs.push(("KEYWORDS_LIST", ""));
        let config = config_from(&pairs);
        assert_eq!(config.search_keywords(), vec!["夢"]);
    }

    #[test]
    fn test_weekday_parsing() {
        let mut pairs = required();
        pairs.push(("WEEKLY_WEEKDAY", "friday"));
        let config = config_from(&pairs);
        assert_eq!(config.weekly_weekday, Weekday::Fri);

        let mut pairs = required();
        pairs.push(("WEEKLY_WEEKDAY", "notaday"));
        let config = config_from(&pairs);
        assert_eq!(config.weekly_weekday, Weekday::Mon);
    }
}
