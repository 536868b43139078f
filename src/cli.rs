//! Command-line runners behind the `license-notify` and `license-clients`
//! binaries.
//!
//! Runners take the argument iterator, an environment lookup, and an output
//! sink so they can be driven from tests without touching the process
//! environment.

use std::error::Error;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, error::ErrorKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::classify::{DueClassifier, NotifyPolicy};
use crate::config::{
    ConfigRequirements, MailSettings, Preferences, WatchConfig, load_env_files, preferences_path,
};
use crate::constants::dates::ISO_FORMAT;
use crate::constants::remote::SYNC_COMMIT_MESSAGE;
use crate::data::DisplayRow;
use crate::errors::WatchError;
use crate::notify::{MailTransport, Notification, SmtpMailer, compose};
use crate::parser::render_records;
use crate::source::{SourceDescriptor, SourceResolver};
use crate::store::{ClientStore, SaveOutcome};
use crate::sync::RemoteSyncClient;
use crate::transport::snapshot::{ServerSnapshot, post_snapshot};

/// Install the stderr `tracing` subscriber (`RUST_LOG`, default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Debug, Parser)]
#[command(
    name = "license-notify",
    version,
    disable_help_subcommand = true,
    about = "Send the license expiration summary",
    long_about = "Resolve the client list (GitHub, secret file, local file), select overdue records and records reaching a notification milestone, and mail the summary.",
    after_help = "Credentials, recipient and thresholds come from the environment only (SMTP_EMAIL, SMTP_APP_PASSWORD, OWNER_EMAIL, DAYS_THRESHOLDS)."
)]
struct NotifyCli {
    #[arg(long = "dry-run", help = "Classify and print the summary without sending it")]
    dry_run: bool,
    #[arg(
        long = "only-expired",
        help = "Only report overdue records, ignoring threshold milestones"
    )]
    only_expired: bool,
    #[arg(
        long,
        value_name = "YYYY-MM-DD",
        value_parser = parse_today_arg,
        help = "Override today's date"
    )]
    today: Option<NaiveDate>,
}

/// What a notifier run resolved, composed, and delivered.
#[derive(Debug)]
pub struct NotifierReport {
    /// Provider that supplied the records.
    pub source: SourceDescriptor,
    /// All records loaded, dated or not.
    pub records: usize,
    /// Records with a missing or malformed date.
    pub undated: usize,
    /// Composed summary, sent or printed.
    pub notification: Notification,
    /// False for dry runs.
    pub sent: bool,
}

/// `license-notify` against the process environment, SMTP, and stdout.
///
/// Env files in the working directory are loaded first.
pub fn run_notifier<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    load_env_files(Path::new("."));
    let lookup = |key: &str| std::env::var(key).ok();
    run_notifier_with(
        args_iter,
        &lookup,
        |settings, timeout| Box::new(SmtpMailer::new(settings, timeout)),
        &mut io::stdout(),
    )?;
    Ok(())
}

/// `license-notify` with injected environment, mail transport, and output.
///
/// Returns `Ok(None)` when help or version output was requested.
pub fn run_notifier_with<I, E, Build>(
    args_iter: I,
    lookup: &E,
    build_mailer: Build,
    out: &mut dyn Write,
) -> Result<Option<NotifierReport>, Box<dyn Error>>
where
    I: Iterator<Item = String>,
    E: Fn(&str) -> Option<String>,
    Build: FnOnce(MailSettings, Duration) -> Box<dyn MailTransport>,
{
    let Some(cli) = parse_cli::<NotifyCli, _>(
        std::iter::once("license-notify".to_string()).chain(args_iter),
    )?
    else {
        return Ok(None);
    };

    let preferences = Preferences::load_or_default(&preferences_path(lookup));
    let requirements = ConfigRequirements {
        mail: !cli.dry_run,
        ..ConfigRequirements::default()
    };
    let config = WatchConfig::from_lookup(lookup, &preferences, requirements)?;

    let resolved = SourceResolver::from_config(&config).resolve()?;
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let policy = if cli.only_expired {
        NotifyPolicy::OnlyExpired
    } else {
        NotifyPolicy::Milestones
    };
    let classifier = DueClassifier::new(today, config.thresholds.clone()).with_policy(policy);
    let classification = classifier.classify(&resolved.records);
    let eligible: Vec<_> = classification
        .dated
        .iter()
        .filter(|record| classifier.is_eligible(record))
        .cloned()
        .collect();
    let notification = compose(&eligible, &config.from_name);

    writeln!(out, "source: {}", resolved.source)?;
    writeln!(
        out,
        "records: {} ({} undated) | {} overdue | {} upcoming",
        resolved.records.len(),
        classification.undated.len(),
        notification.overdue,
        notification.upcoming
    )?;
    writeln!(out, "subject: {}", notification.subject)?;
    writeln!(out, "{}", notification.body)?;

    let sent = if cli.dry_run {
        writeln!(out, "dry run: notification not sent")?;
        false
    } else {
        let settings = config
            .mail
            .clone()
            .ok_or_else(|| WatchError::config("mail settings are incomplete"))?;
        let mailer = build_mailer(settings, config.http_timeout);
        mailer.send(&notification)?;
        writeln!(out, "notification sent")?;
        true
    };

    Ok(Some(NotifierReport {
        source: resolved.source,
        records: resolved.records.len(),
        undated: classification.undated.len(),
        notification,
        sent,
    }))
}

#[derive(Debug, Parser)]
#[command(
    name = "license-clients",
    version,
    disable_help_subcommand = true,
    about = "Manage the client license list",
    long_about = "List the banded client table, edit the local client file, and push it to the GitHub repository or the companion server."
)]
struct ClientsCli {
    #[command(subcommand)]
    command: ClientsCommand,
}

#[derive(Debug, Subcommand)]
enum ClientsCommand {
    /// Show every client with its urgency band; undated clients last.
    List {
        #[arg(
            long,
            value_name = "YYYY-MM-DD",
            value_parser = parse_today_arg,
            help = "Override today's date"
        )]
        today: Option<NaiveDate>,
    },
    /// Add a client to the local file.
    Add {
        #[arg(long, help = "Company name")]
        company: String,
        #[arg(long, value_name = "DD/MM/YYYY", default_value = "", help = "Due date")]
        due: String,
    },
    /// Replace a client identified by company and due date.
    Edit {
        #[arg(long, help = "Current company name")]
        company: String,
        #[arg(long, value_name = "DATE", default_value = "", help = "Current due date")]
        due: String,
        #[arg(long = "new-company", help = "New company name (defaults to the current one)")]
        new_company: Option<String>,
        #[arg(long = "new-due", value_name = "DD/MM/YYYY", help = "New due date")]
        new_due: Option<String>,
    },
    /// Remove a client identified by company and due date.
    Remove {
        #[arg(long, help = "Company name")]
        company: String,
        #[arg(long, value_name = "DATE", default_value = "", help = "Due date")]
        due: String,
    },
    /// Push the local file to the GitHub repository.
    Push,
    /// Upload a JSON snapshot of the local file to the companion server.
    SyncServer,
    /// Persist the sender display name in the preferences file.
    SetSender {
        #[arg(long, help = "Sender display name")]
        name: String,
    },
}

/// `license-clients` against the process environment and stdout.
///
/// Env files in the working directory are loaded first.
pub fn run_clients<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    load_env_files(Path::new("."));
    let lookup = |key: &str| std::env::var(key).ok();
    run_clients_with(args_iter, &lookup, &mut io::stdout())
}

/// `license-clients` with injected environment and output.
pub fn run_clients_with<I, E>(args_iter: I, lookup: &E, out: &mut dyn Write) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
    E: Fn(&str) -> Option<String>,
{
    let Some(cli) = parse_cli::<ClientsCli, _>(
        std::iter::once("license-clients".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    if let ClientsCommand::SetSender { name } = &cli.command {
        let name = name.trim();
        if name.is_empty() {
            return Err(WatchError::InvalidInput("sender name must not be empty".into()).into());
        }
        let path = preferences_path(lookup);
        let preferences = Preferences {
            from_name: Some(name.to_string()),
        };
        preferences.save(&path)?;
        writeln!(out, "sender name saved to {}", path.display())?;
        return Ok(());
    }

    let preferences = Preferences::load_or_default(&preferences_path(lookup));
    let requirements = ConfigRequirements {
        remote: matches!(cli.command, ClientsCommand::Push),
        server_sync: matches!(cli.command, ClientsCommand::SyncServer),
        ..ConfigRequirements::default()
    };
    let config = WatchConfig::from_lookup(lookup, &preferences, requirements)?;

    match cli.command {
        ClientsCommand::List { today } => {
            let resolved = SourceResolver::from_config(&config).resolve()?;
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let rows = DueClassifier::new(today, config.thresholds.clone()).display_rows(&resolved.records);
            writeln!(out, "source: {}", resolved.source)?;
            for row in &rows {
                writeln!(out, "{}", render_row(row))?;
            }
            writeln!(out, "{} clients", rows.len())?;
        }
        ClientsCommand::Add { company, due } => {
            let mut store = open_store(&config)?;
            let added = store.add(&company, &due)?.clone();
            writeln!(out, "added {} ({})", added.company, added.display_due())?;
            finish_save(store.save()?, out)?;
        }
        ClientsCommand::Edit {
            company,
            due,
            new_company,
            new_due,
        } => {
            let mut store = open_store(&config)?;
            let new_company = new_company.unwrap_or_else(|| company.clone());
            // Without --new-due the stored date is kept verbatim.
            let updated = store
                .edit(&company, &due, &new_company, new_due.as_deref())?
                .clone();
            writeln!(out, "updated {} ({})", updated.company, updated.display_due())?;
            finish_save(store.save()?, out)?;
        }
        ClientsCommand::Remove { company, due } => {
            let mut store = open_store(&config)?;
            let removed = store.remove(&company, &due)?;
            writeln!(out, "removed {} ({})", removed.company, removed.display_due())?;
            finish_save(store.save()?, out)?;
        }
        ClientsCommand::Push => {
            let sync = RemoteSyncClient::from_config(&config)
                .ok_or_else(|| WatchError::config("GITHUB_REPO is required to push to the remote store"))?;
            let store = ClientStore::open(&config.local_file)?;
            let content = render_records(store.records())?;
            let outcome = sync.push(content.as_bytes(), SYNC_COMMIT_MESSAGE)?;
            writeln!(
                out,
                "pushed {} clients to {} ({:?})",
                store.records().len(),
                sync.location(),
                outcome.mode
            )?;
        }
        ClientsCommand::SyncServer => {
            let server = config
                .server_sync
                .as_ref()
                .ok_or_else(|| WatchError::config("server sync URL is not configured"))?;
            let store = ClientStore::open(&config.local_file)?;
            let snapshot = ServerSnapshot::build(store.records(), Local::now().naive_local());
            post_snapshot(server, &snapshot, config.http_timeout)?;
            writeln!(out, "uploaded {} clients to {}", snapshot.clients.len(), server.url)?;
        }
        ClientsCommand::SetSender { .. } => {}
    }
    Ok(())
}

fn open_store(config: &WatchConfig) -> Result<ClientStore, WatchError> {
    let store = ClientStore::open(&config.local_file)?;
    if !config.push_on_save {
        return Ok(store);
    }
    match RemoteSyncClient::from_config(config) {
        Some(sync) => Ok(store.with_remote_push(sync)),
        None => {
            warn!("[license-watch:cli] push on save requested but GITHUB_REPO is not set");
            Ok(store)
        }
    }
}

/// Report the save, then wait for the background push so its outcome is
/// printed before the process exits. A failed push is not an error.
fn finish_save(outcome: SaveOutcome, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "saved {}", outcome.path.display())?;
    if let Some(push) = outcome.push {
        match push.wait() {
            Ok(result) => writeln!(out, "remote push: {:?}", result.mode)?,
            Err(err) => {
                info!("[license-watch:cli] local save kept after push failure");
                writeln!(out, "remote push failed: {err}")?;
            }
        }
    }
    Ok(())
}

fn render_row(row: &DisplayRow) -> String {
    let days = row
        .days_until_due
        .map(|days| days.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<8} {} | {} | {}",
        row.band.label(),
        row.record.company,
        row.record.display_due(),
        days
    )
}

fn parse_today_arg(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), ISO_FORMAT)
        .map_err(|_| format!("could not parse '{raw}' as a YYYY-MM-DD date"))
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
