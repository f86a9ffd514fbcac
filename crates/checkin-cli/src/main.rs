use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use checkin_cli::commands::{
    App, auto_checkout, avg_checkout, check, checks, daemon, overview, people, status, summary,
    weekly,
};
use checkin_cli::{Cli, Commands, Config, PeopleAction};
use checkin_core::{Contact, Tracker, TrackerConfig};
use checkin_db::Database;
use checkin_notify::AnyNotifier;

/// Load config and open the engine, ensuring the database directory exists.
fn open_app(config_path: Option<&Path>) -> Result<(App, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = Database::open(&config.database_path).context("failed to open database")?;
    let notifier = AnyNotifier::from_url(config.notify.webhook_url.as_deref())
        .context("failed to set up notifier")?;
    let tracker_config = TrackerConfig {
        cache_ttl: config.cache_ttl(),
    };
    Ok((Tracker::with_config(db, notifier, &tracker_config), config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (app, config) = open_app(cli.config.as_deref())?;
    let mut stdout = std::io::stdout().lock();
    let trainer = config.notify.trainer.as_deref();

    match command {
        Commands::Check { uid } => check::run(&mut stdout, &app, uid)?,
        Commands::Status { uid } => status::run(&mut stdout, &app, uid)?,
        Commands::Summary { json } => summary::run(&mut stdout, &app, *json)?,
        Commands::People(action) => match action {
            PeopleAction::List => people::list(&mut stdout, &app)?,
            PeopleAction::Add {
                uid,
                name,
                email,
                slack,
            } => {
                let contact = Contact {
                    email: email.clone(),
                    slack_handle: slack.clone(),
                };
                people::add(&mut stdout, &app, uid, name, contact)?;
            }
            PeopleAction::Enable { uid } => people::set_enabled(&mut stdout, &app, uid, Some(true))?,
            PeopleAction::Disable { uid } => {
                people::set_enabled(&mut stdout, &app, uid, Some(false))?;
            }
            PeopleAction::Toggle { uid } => people::set_enabled(&mut stdout, &app, uid, None)?,
            PeopleAction::Delete { uid } => people::delete(&mut stdout, &app, uid)?,
        },
        Commands::Overview { month, json } => overview::run(&mut stdout, &app, *month, *json)?,
        Commands::Checks { uid, month } => checks::run(&mut stdout, &app, uid, *month)?,
        Commands::AvgCheckout { day } => avg_checkout::run(&mut stdout, &app, *day)?,
        Commands::AutoCheckout => auto_checkout::run(&mut stdout, &app)?,
        Commands::WeeklySummary => weekly::run(&mut stdout, &app, trainer)?,
        Commands::Daemon => {
            daemon::run(&app, &daemon::Schedule::from_config(&config), trainer);
        }
    }

    stdout.flush()?;
    Ok(())
}
