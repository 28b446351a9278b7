//! Pagination controller.
//!
//! Orchestrates request-budgeted fetch rounds over the configured keywords
//! and owns the backfill cursor state machine. Two entry points share the
//! round logic: [`run_backfill`] walks a persisted offset through the
//! historical result space a bounded number of rounds per invocation, and
//! [`run_weekly`] checks only the most recent page.
//!
//! Any fetch failure aborts the invocation before the cursor or the store
//! is written; "zero new items" is a normal outcome, not an error.

use crate::config::Config;
use crate::error::Result;
use crate::feed::SearchBackend;
use crate::gate::select_new;
use crate::item::CandidateItem;
use crate::merge::{merge_and_filter, FilterPolicy};
use crate::notify::Notifier;
use crate::props::{PropertyStore, BACKFILL_START_KEY};
use crate::store::{Store, StoreRow};
use chrono::Utc;
use tracing::{info, warn};

/// Subject prefix for backfill notifications
const BACKFILL_SUBJECT_PREFIX: &str = "[Dream Papers][Backfill]";
/// Subject prefix for weekly new-arrivals notifications
const WEEKLY_SUBJECT_PREFIX: &str = "[Dream Papers][Weekly]";

/// Outcome of one invocation, for CLI reporting.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Newly recorded items
    pub added: usize,
    /// Persisted cursor after the run (backfill mode only)
    pub next_start: Option<u32>,
}

fn filter_policy(config: &Config) -> FilterPolicy {
    FilterPolicy {
        require_abstract: config.require_abstract,
        exclude_title_keywords: config.exclude_title_keywords.clone(),
        exclude_mode: config.exclude_mode,
        max_items: config.max_items,
    }
}

/// Run one fetch round over the configured keywords at `start`.
///
/// `attempts` is the request count already consumed this invocation; the
/// round stops silently once it reaches the budget, skipping the remaining
/// keywords (best-effort truncation, not an error). Returns the round's
/// merged/filtered result set and the updated request count.
pub async fn fetch_round(
    backend: &dyn SearchBackend,
    start: u32,
    config: &Config,
    mut attempts: u32,
) -> Result<(Vec<CandidateItem>, u32)> {
    let keywords = config.search_keywords();
    let mut all_items = Vec::new();

    for keyword in &keywords {
        if attempts >= config.max_fetch_requests {
            warn!(
                budget = config.max_fetch_requests,
                keyword = %keyword,
                "Request budget exhausted; skipping remaining keywords"
            );
            break;
        }
        let items = backend.search(keyword, start).await?;
        attempts += 1;
        all_items.extend(items);
    }

    Ok((merge_and_filter(all_items, &filter_policy(config)), attempts))
}

/// Incremental historical crawl: one invocation of the daily backfill.
///
/// Reads the persisted cursor, runs up to `max_pages_per_run` rounds, and
/// stops at the first round that records at least one new item. Rounds that
/// record nothing advance the cursor by one page so that empty stretches are
/// skipped forward instead of being polled forever. The final cursor is
/// persisted unconditionally after the loop.
pub async fn run_backfill(
    backend: &dyn SearchBackend,
    store: &dyn Store,
    notifier: &dyn Notifier,
    props: &mut PropertyStore,
    config: &Config,
) -> Result<RunReport> {
    let mut historical_keys = store.read_identity_keys()?;
    let mut start: u32 = props
        .get(BACKFILL_START_KEY)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);
    let run_timestamp = Utc::now().to_rfc3339();

    let mut added: Vec<StoreRow> = Vec::new();
    let mut attempts: u32 = 0;

    for _page in 0..config.max_pages_per_run {
        let (merged, spent) = fetch_round(backend, start, config, attempts).await?;
        attempts = spent;

        let new_rows = select_new(
            &merged,
            &mut historical_keys,
            config.abstract_max_chars,
            &run_timestamp,
        );
        start += config.per_keyword_count;

        if !new_rows.is_empty() {
            store.append_rows(&new_rows)?;
            added = new_rows;
            break;
        }
    }

    props.set(BACKFILL_START_KEY, &start.to_string())?;
    info!(added = added.len(), next_start = start, "Backfill run complete");

    if config.send_backfill_email {
        notifier
            .send(BACKFILL_SUBJECT_PREFIX, &added, config.send_when_zero)
            .await?;
    }

    Ok(RunReport {
        added: added.len(),
        next_start: Some(start),
    })
}

/// New-arrivals check: a single round at offset 0.
///
/// No cursor bookkeeping; notification is always attempted, and the
/// zero-item suppression is the notifier's decision.
pub async fn run_weekly(
    backend: &dyn SearchBackend,
    store: &dyn Store,
    notifier: &dyn Notifier,
    config: &Config,
) -> Result<RunReport> {
    let mut historical_keys = store.read_identity_keys()?;
    let run_timestamp = Utc::now().to_rfc3339();

    let (merged, _attempts) = fetch_round(backend, 0, config, 0).await?;
    let new_rows = select_new(
        &merged,
        &mut historical_keys,
        config.abstract_max_chars,
        &run_timestamp,
    );

    store.append_rows(&new_rows)?;
    info!(added = new_rows.len(), "Weekly run complete");

    notifier
        .send(WEEKLY_SUBJECT_PREFIX, &new_rows, config.send_when_zero)
        .await?;

    Ok(RunReport {
        added: new_rows.len(),
        next_start: None,
    })
}
