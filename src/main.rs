use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use debtbomb::jira::{JiraClient, TicketTracker};
use debtbomb::notify::WebhookNotifier;
use debtbomb::reconcile::{ReconcileOptions, Reconciler};
use debtbomb::reporter::CheckResult;
use debtbomb::state::TicketStateStore;
use debtbomb::{cli, config, engine, filters, git, models, reporter};
use log::{LevelFilter, debug, warn};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = cli::Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            warn!("Failed to load .env: {}", err);
        }
    }

    let today = Local::now().date_naive();

    match cli.command {
        cli::Commands::List(args) => list_command(args, today)?,
        cli::Commands::Check(args) => return check_command(args, today),
        cli::Commands::Report(args) => report_command(args, today)?,
        cli::Commands::Notify(args) => notify_command(args, today)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn list_command(args: cli::ListArgs, today: NaiveDate) -> Result<()> {
    let mut items = engine::run(&args.path, today).context("Failed to scan directory")?;

    if args.expired {
        items = filters::filter_expired(items);
    }
    if let Some(window) = &args.expiring_within {
        items = filters::filter_expiring_within(items, window, today)?;
    }
    if let Some(owner) = &args.owner {
        items = filters::filter_by_owner(items, owner);
    }
    if args.blame {
        git::enrich_items(&args.path, &mut items, today);
    }

    let output = reporter::render_items(&items, args.format, today)?;
    reporter::write_output(&output, args.output.as_deref())
}

fn check_command(args: cli::CheckArgs, today: NaiveDate) -> Result<ExitCode> {
    let items = engine::run(&args.path, today).context("Failed to scan directory")?;
    let result = CheckResult::new(&items, args.warn_in_days, today);

    let output = reporter::render_check(&result, args.json, today)?;
    reporter::write_output(&output, None)?;

    Ok(if result.has_expired() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn report_command(args: cli::ReportArgs, today: NaiveDate) -> Result<()> {
    let items = engine::run(&args.path, today).context("Failed to scan directory")?;
    let report = models::DebtReport::new(&items, args.path.clone(), today);

    let output = reporter::render_report(&report, args.format)?;
    reporter::write_output(&output, args.output.as_deref())
}

fn notify_command(args: cli::NotifyArgs, today: NaiveDate) -> Result<()> {
    let config = config::load_config(&args.path, args.config.as_deref())?;
    let items = engine::run(&args.path, today).context("Failed to scan directory")?;
    let mut store = TicketStateStore::load(&args.path)?;

    let jira = match &config.jira.credentials {
        Some(credentials) => Some(JiraClient::new(credentials).context("Failed to build Jira client")?),
        None => {
            debug!("Jira credentials not set, tickets will not be managed");
            None
        }
    };
    let notifier = WebhookNotifier::new(config.webhooks.clone())?;

    let reconciler = Reconciler::new(
        &config,
        jira.as_ref().map(|client| client as &dyn TicketTracker),
        &notifier,
        today,
    );
    let options = ReconcileOptions {
        expired_only: args.expired,
        warn_within_days: args.warn_within_days(),
    };
    let summary = reconciler.sync_and_notify(&items, &mut store, &options)?;

    println!(
        "Opened: {}  Kept: {}  Warned: {}  Closed: {}  Tickets created: {}  Notifications sent: {}  Failures: {}",
        summary.opened,
        summary.kept,
        summary.warned,
        summary.closed,
        summary.tickets_created,
        summary.notifications_sent,
        summary.failures
    );

    Ok(())
}
