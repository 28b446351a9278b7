//! Persistence gate.
//!
//! Decides which items of a run's result set are genuinely new relative to
//! the historical key set, and shapes them into store rows. The merge engine
//! already dedups within a run, but the gate dedups independently against
//! historical state, which the merge engine never sees.

use crate::item::{clean_abstract, truncate, CandidateItem};
use crate::store::StoreRow;
use std::collections::HashSet;

/// Select the items not yet recorded, marking their keys as seen.
///
/// For each item in order: skip if its identity key is already in
/// `historical_keys`, otherwise insert the key and emit a row with the
/// abstract cleaned and cut to `abstract_max_chars`. The caller hands the
/// returned rows to the store as a single bulk append and to the notifier;
/// `run_timestamp` is shared by every row.
pub fn select_new(
    items: &[CandidateItem],
    historical_keys: &mut HashSet<String>,
    abstract_max_chars: usize,
    run_timestamp: &str,
) -> Vec<StoreRow> {
    let mut new_rows = Vec::new();

    for item in items {
        let key = item.identity_key();
        if key.is_empty() || historical_keys.contains(&key) {
            continue;
        }
        historical_keys.insert(key.clone());

        new_rows.push(StoreRow {
            timestamp: run_timestamp.to_string(),
            source: item.source.clone(),
            title: item.title.clone(),
            link: item.link.clone(),
            abstract_text: truncate(&clean_abstract(&item.abstract_text), abstract_max_chars),
            published: item.published.clone(),
            id_key: key,
        });
    }

    new_rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_with_link(link: &str) -> CandidateItem {
        CandidateItem {
            source: "CiNii".to_string(),
            title: format!("title for {}", link),
            link: link.to_string(),
            abstract_text: "<p>An abstract</p>".to_string(),
            published: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn skips_historical_and_dedups_within_run() {
        let mut historical: HashSet<String> = ["k1".to_string()].into_iter().collect();
        let items = vec![item_with_link("k1"), item_with_link("k2"), item_with_link("k2")];

        let rows = select_new(&items, &mut historical, 200, "2026-01-02T00:00:00Z");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id_key, "k2");
        assert_eq!(historical.len(), 2);
        assert!(historical.contains("k2"));
    }

    #[test]
    fn rows_carry_shared_timestamp_and_truncated_abstract() {
        let mut historical = HashSet::new();
        let mut item = item_with_link("https://x/1");
        item.abstract_text = "<b>abcdefgh</b>".to_string();

        let rows = select_new(&[item], &mut historical, 5, "ts-shared");

        assert_eq!(rows[0].timestamp, "ts-shared");
        assert_eq!(rows[0].abstract_text, "abcde...");
    }

    #[test]
    fn empty_key_never_recorded() {
        let mut historical = HashSet::new();
        let item = CandidateItem::default();
        let rows = select_new(&[item], &mut historical, 200, "ts");
        assert!(rows.is_empty());
        assert!(historical.is_empty());
    }
}
