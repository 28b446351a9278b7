//! Run notification.
//!
//! One email per run: a mode-specific subject prefix with the new-item
//! count, and an HTML body listing each item's linked title and truncated
//! abstract. Delivery goes through a pluggable backend; the HTML and the
//! zero-item suppression rule live here so every backend behaves the same.

use crate::error::{Result, WatchError};
use crate::store::StoreRow;
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

/// Pluggable notification backend.
#[async_trait]
pub trait Notifier {
    /// Send the run report for `items` under `subject_prefix`.
    ///
    /// Suppressed entirely when `items` is empty and `send_when_zero` is
    /// false; that decision is made here, at notification time.
    async fn send(&self, subject_prefix: &str, items: &[StoreRow], send_when_zero: bool)
        -> Result<()>;
}

/// Subject line shared by all backends.
fn build_subject(subject_prefix: &str, count: usize) -> String {
    format!("{} New items: {} (CiNii)", subject_prefix, count)
}

/// Build the HTML body for a run report.
pub fn build_email_html(items: &[StoreRow]) -> String {
    let mut parts = Vec::new();
    parts.push(format!("<p>New items: {}</p>", items.len()));

    for item in items {
        let title = escape_html(&item.title);
        let link = escape_html(&item.link);
        let abstract_text = escape_html(&item.abstract_text);

        parts.push("<div style=\"margin-bottom:16px;\">".to_string());
        if link.is_empty() {
            parts.push(format!("<div>{}</div>", title));
        } else {
            parts.push(format!("<div><a href=\"{}\">{}</a></div>", link, title));
        }
        if !abstract_text.is_empty() {
            parts.push(format!("<div style=\"color:#444;\">{}</div>", abstract_text));
        }
        parts.push("</div>".to_string());
    }

    parts.join("")
}

/// Escape `&`, `<`, `>`, `"`, `'` for HTML output.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Backend that POSTs the message to an HTTP mail-relay endpoint.
pub struct MailApiNotifier {
    endpoint: String,
    to: String,
    http: reqwest::Client,
}

impl MailApiNotifier {
    pub fn new(endpoint: String, to: String) -> Self {
        Self {
            endpoint,
            to,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for MailApiNotifier {
    async fn send(
        &self,
        subject_prefix: &str,
        items: &[StoreRow],
        send_when_zero: bool,
    ) -> Result<()> {
        if items.is_empty() && !send_when_zero {
            return Ok(());
        }

        let subject = build_subject(subject_prefix, items.len());
        let payload = json!({
            "to": self.to,
            "subject": subject,
            "html": build_email_html(items),
        });

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Mail relay returned non-success");
            return Err(WatchError::Notify(format!("Mail relay returned {}", status)));
        }

        info!(subject = %subject, items = items.len(), "Notification sent");
        Ok(())
    }
}

/// Backend used when no mail endpoint is configured: logs the would-be send.
pub struct LogNotifier {
    to: String,
}

impl LogNotifier {
    pub fn new(to: String) -> Self {
        Self { to }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        subject_prefix: &str,
        items: &[StoreRow],
        send_when_zero: bool,
    ) -> Result<()> {
        if items.is_empty() && !send_when_zero {
            return Ok(());
        }
        info!(
            to = %self.to,
            subject = %build_subject(subject_prefix, items.len()),
            items = items.len(),
            "No MAIL_ENDPOINT configured; logging notification instead"
        );
        Ok(())
    }
}
