//! Merge/filter engine.
//!
//! Combines candidate items from all keyword fetches in one round into a
//! single ordered, deduplicated, policy-filtered, size-capped list. A single
//! pass with a call-scoped seen-key set; no error conditions, empty input
//! yields empty output.

use crate::item::{clean_abstract, CandidateItem};
use std::collections::HashSet;

/// What to do with an item whose title matches an exclusion term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExcludeMode {
    /// Drop the item entirely
    #[default]
    Exclude,
    /// Keep the item but place it after all non-matching items
    Demote,
}

/// Inclusion/exclusion policy for one round.
#[derive(Debug, Clone, Default)]
pub struct FilterPolicy {
    /// Drop items whose cleaned abstract is empty
    pub require_abstract: bool,
    /// Title substrings that mark an item as excluded (matched case-sensitively
    /// against the raw title, by deliberate contrast with key normalization)
    pub exclude_title_keywords: Vec<String>,
    pub exclude_mode: ExcludeMode,
    /// Hard cap on the result set size for one run
    pub max_items: usize,
}

/// Produce the run's result set from the concatenated per-keyword candidates.
///
/// Order of operations matters: dedup by identity key first, then the
/// require-abstract gate, then the exclusion policy. Primary-bucket items
/// come out in encounter order followed by demoted items in encounter order,
/// and the whole list is prefix-cut to `max_items`.
pub fn merge_and_filter(items: Vec<CandidateItem>, policy: &FilterPolicy) -> Vec<CandidateItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<CandidateItem> = Vec::new();
    let mut demoted: Vec<CandidateItem> = Vec::new();

    for item in items {
        let key = item.identity_key();
        if key.is_empty() || !seen.insert(key) {
            continue;
        }

        if policy.require_abstract && clean_abstract(&item.abstract_text).is_empty() {
            continue;
        }

        let excluded = is_excluded_title(&item.title, &policy.exclude_title_keywords);
        match (excluded, policy.exclude_mode) {
            (true, ExcludeMode::Exclude) => continue,
            (true, ExcludeMode::Demote) => demoted.push(item),
            (false, _) => kept.push(item),
        }
    }

    kept.append(&mut demoted);
    kept.truncate(policy.max_items);
    kept
}

/// Case-sensitive substring match of any exclusion term against the raw title.
fn is_excluded_title(title: &str, exclude_keywords: &[String]) -> bool {
    if title.is_empty() {
        return false;
    }
    exclude_keywords
        .iter()
        .filter(|k| !k.is_empty())
        .any(|k| title.contains(k.as_str()))
}
