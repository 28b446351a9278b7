//! Recurring trigger installation.
//!
//! The pipeline itself never schedules anything; it exposes a narrow
//! capability to install a recurring trigger for a named handler, and a
//! crontab-fragment adapter that implements it. Each managed entry carries a
//! `# ciniiwatch:<handler>` tag so reinstalling replaces the previous entry
//! for the same handler instead of stacking duplicates.

use crate::error::Result;
use chrono::Weekday;
use std::path::PathBuf;
use tracing::info;

/// When a handler should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSpec {
    /// Every day at the given hour
    Daily { hour: u32 },
    /// Every week on the given weekday at the given hour
    Weekly { weekday: Weekday, hour: u32 },
}

impl ScheduleSpec {
    /// Render the five cron time fields.
    fn cron_fields(&self) -> String {
        match self {
            ScheduleSpec::Daily { hour } => format!("0 {} * * *", hour),
            ScheduleSpec::Weekly { weekday, hour } => {
                format!("0 {} * * {}", hour, weekday.num_days_from_sunday())
            }
        }
    }
}

/// Recurring-trigger capability.
pub trait Scheduler {
    /// Install (or replace) the recurring trigger for `handler`.
    fn install_recurring(&self, handler: &str, spec: &ScheduleSpec) -> Result<()>;
}

/// Crontab-fragment file scheduler.
///
/// Maintains a cron-format file the host points its cron at. Non-managed
/// lines are left untouched.
pub struct CrontabScheduler {
    path: PathBuf,
    /// Command prefix for managed entries, e.g. the installed binary path
    command: String,
}

impl CrontabScheduler {
    pub fn new(path: PathBuf, command: String) -> Self {
        Self { path, command }
    }

    fn tag(handler: &str) -> String {
        format!("# ciniiwatch:{}", handler)
    }
}

impl Scheduler for CrontabScheduler {
    fn install_recurring(&self, handler: &str, spec: &ScheduleSpec) -> Result<()> {
        let tag = Self::tag(handler);

        let existing = if self.path.exists() {
            std::fs::read_to_string(&self.path)?
        } else {
            String::new()
        };

        let mut lines: Vec<String> = existing
            .lines()
            .filter(|line| !line.ends_with(tag.as_str()))
            .map(|line| line.to_string())
            .collect();

        lines.push(format!(
            "{} {} {} {}",
            spec.cron_fields(),
            self.command,
            handler,
            tag
        ));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, lines.join("\n") + "\n")?;

        info!(handler = handler, spec = ?spec, path = ?self.path, "Trigger installed");
        Ok(())
    }
}
