//! Candidate item model and identity normalization.
//!
//! A [`CandidateItem`] is one discovered record from the CiNii feed. Items
//! are deduplicated by their identity key: the canonical link when present,
//! otherwise a normalized form of the title. Two items with the same key are
//! treated as the same real-world record.

use feed_rs::model::Entry;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Origin label stamped on every item
pub const SOURCE_LABEL: &str = "CiNii";

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static regex"));
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));
static KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\W]+").expect("static regex"));

/// One discovered record from the search feed.
///
/// All fields are plain strings; empty means absent. Items live only for the
/// duration of a run and are either discarded or promoted into a stored row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateItem {
    pub source: String,
    pub title: String,
    pub link: String,
    pub abstract_text: String,
    /// Best-effort ISO date/time string, may be empty
    pub published: String,
}

impl CandidateItem {
    /// Deduplication key: canonical link, falling back to normalized title.
    ///
    /// Empty when the item has neither a link nor any title content that
    /// survives normalization; such items are dropped by the merge engine.
    pub fn identity_key(&self) -> String {
        if !self.link.is_empty() {
            self.link.clone()
        } else {
            normalize_key(&self.title)
        }
    }
}

/// Normalize a title into a deduplication key.
///
/// Lowercased, with runs of whitespace and punctuation collapsed to single
/// spaces and the ends trimmed. Deterministic and case/whitespace-insensitive.
pub fn normalize_key(title: &str) -> String {
    if title.is_empty() {
        return String::new();
    }
    let lowered = title.to_lowercase();
    KEY_RE.replace_all(&lowered, " ").trim().to_string()
}

/// Strip markup tags and collapse whitespace in an abstract.
pub fn clean_abstract(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let stripped = TAG_RE.replace_all(text, " ");
    WS_RE.replace_all(&stripped, " ").trim().to_string()
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
///
/// This is a character-count cut, not word-boundary aware; mid-word
/// truncation is expected.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Turn a raw feed entry into a canonical candidate record.
///
/// Never fails: missing fields become empty strings. Takes the first
/// non-empty of summary/content as the abstract, the first of
/// published/updated as the timestamp, and the link preferring the
/// `alternate` relation (a link with no relation also qualifies).
pub fn normalize_entry(entry: &Entry) -> CandidateItem {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.clone())
        .unwrap_or_default();

    let summary = entry
        .summary
        .as_ref()
        .map(|t| t.content.clone())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            entry
                .content
                .as_ref()
                .and_then(|c| c.body.clone())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_default();

    let published = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();

    let link = entry
        .links
        .iter()
        .find(|l| match l.rel.as_deref() {
            None | Some("alternate") => !l.href.is_empty(),
            _ => false,
        })
        .map(|l| l.href.clone())
        .unwrap_or_default();

    CandidateItem {
        source: SOURCE_LABEL.to_string(),
        title,
        link,
        abstract_text: summary,
        published,
    }
}
