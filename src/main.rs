//! ciniiwatch - CiNii dream-papers watcher
//!
//! Periodically searches CiNii OpenSearch by keyword, dedups against a CSV
//! store, and emails genuinely new items.
//!
//! ## Usage
//!
//! ### One backfill step (daily trigger target)
//! ```bash
//! ciniiwatch backfill
//! ```
//!
//! ### New-arrivals check (weekly trigger target)
//! ```bash
//! ciniiwatch weekly
//! ```

use anyhow::{Context, Result};
use ciniiwatch::config::Config;
use ciniiwatch::feed::FeedClient;
use ciniiwatch::notify::{LogNotifier, MailApiNotifier, Notifier};
use ciniiwatch::pipeline::{run_backfill, run_weekly};
use ciniiwatch::props::PropertyStore;
use ciniiwatch::schedule::{CrontabScheduler, ScheduleSpec, Scheduler};
use ciniiwatch::store::CsvStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// CiNii dream-papers watcher - backfill + weekly new-arrivals pipeline
#[derive(Parser)]
#[command(name = "ciniiwatch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Property file path (default: the user config dir)
    #[arg(long, global = true)]
    props: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backfill invocation (advances the persisted cursor)
    Backfill,

    /// Run one new-arrivals check (most recent page only)
    Weekly,

    /// Install the daily backfill and weekly new-arrivals cron triggers
    InstallTriggers {
        /// Crontab-fragment file to manage
        #[arg(long, default_value = "/etc/cron.d/ciniiwatch")]
        crontab: PathBuf,

        /// Command cron should invoke
        #[arg(long, default_value = "ciniiwatch")]
        command: String,
    },

    /// Inspect or edit the property store
    Props {
        #[command(subcommand)]
        action: PropsAction,
    },
}

#[derive(Subcommand)]
enum PropsAction {
    /// Show the property file path
    Path,
    /// Get a property value
    Get { key: String },
    /// Set a property value
    Set { key: String, value: String },
    /// List all properties
    List,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    let mut props = open_props(cli.props)?;

    match cli.command {
        Commands::Backfill => {
            let config = Config::from_props(&props).context("Invalid configuration")?;
            let backend = FeedClient::new(config.clone())?;
            let store = CsvStore::new(config.store_path.clone());
            let notifier = make_notifier(&config);

            let report =
                run_backfill(&backend, &store, notifier.as_ref(), &mut props, &config).await?;
            println!(
                "Backfill added: {}, next start={}",
                report.added,
                report.next_start.unwrap_or(0)
            );
        }
        Commands::Weekly => {
            let config = Config::from_props(&props).context("Invalid configuration")?;
            let backend = FeedClient::new(config.clone())?;
            let store = CsvStore::new(config.store_path.clone());
            let notifier = make_notifier(&config);

            let report = run_weekly(&backend, &store, notifier.as_ref(), &config).await?;
            println!("Weekly new items: {}", report.added);
        }
        Commands::InstallTriggers { crontab, command } => {
            let config = Config::from_props(&props).context("Invalid configuration")?;
            let scheduler = CrontabScheduler::new(crontab, command);

            scheduler.install_recurring(
                "backfill",
                &ScheduleSpec::Daily {
                    hour: config.daily_hour,
                },
            )?;
            scheduler.install_recurring(
                "weekly",
                &ScheduleSpec::Weekly {
                    weekday: config.weekly_weekday,
                    hour: config.weekly_hour,
                },
            )?;

            info!(
                daily_hour = config.daily_hour,
                weekly = %config.weekly_weekday,
                weekly_hour = config.weekly_hour,
                "Triggers installed"
            );
            println!(
                "Triggers installed: daily hour={}, weekly={} {}:00",
                config.daily_hour, config.weekly_weekday, config.weekly_hour
            );
        }
        Commands::Props { action } => handle_props(&mut props, action)?,
    }

    Ok(())
}

fn open_props(path: Option<PathBuf>) -> Result<PropertyStore> {
    let store = match path {
        Some(p) => PropertyStore::open(p)?,
        None => PropertyStore::open_default()?,
    };
    Ok(store)
}

/// Pick the notifier backend: the mail relay when configured, logging otherwise.
fn make_notifier(config: &Config) -> Box<dyn Notifier> {
    match &config.mail_endpoint {
        Some(endpoint) => Box::new(MailApiNotifier::new(
            endpoint.clone(),
            config.notify_email.clone(),
        )),
        None => Box::new(LogNotifier::new(config.notify_email.clone())),
    }
}

// ============================================================================
// Property Maintenance
// ============================================================================

fn handle_props(props: &mut PropertyStore, action: PropsAction) -> Result<()> {
    match action {
        PropsAction::Path => {
            println!("Property file: {:?}", props.path());
        }
        PropsAction::Get { key } => match props.get(&key) {
            Some(value) => println!("{}", value),
            None => println!("(unset)"),
        },
        PropsAction::Set { key, value } => {
            props.set(&key, &value)?;
            println!("Set {}", key);
        }
        PropsAction::List => {
            for (key, value) in props.iter() {
                println!("{}={}", key, value);
            }
        }
    }
    Ok(())
}
