use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use switchyard_channels::message_queue;
use switchyard_core::config::SwitchyardConfig;
use switchyard_relay::{run_pool, RelayContext};
use switchyard_store::AssociationStore;
use switchyard_telegram::allow::default_chat;
use switchyard_telegram::{HandlerState, TelegramAdapter, TelegramMaster};

mod app;

#[derive(Parser)]
#[command(
    name = "switchyard",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SWITCHYARD_GIT_SHA"), ")"),
    about = "Relay chats from many platforms into one Telegram bot"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Append logs to this file instead of stderr.
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Config file (default: SWITCHYARD_CONFIG, then ~/.switchyard/switchyard.toml).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("SWITCHYARD_GIT_SHA"),
        "switchyard starting"
    );

    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("SWITCHYARD_CONFIG").ok());
    let config = SwitchyardConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        SwitchyardConfig::default()
    });
    let telegram = config
        .telegram
        .clone()
        .context("a [telegram] section with bot_token and admins is required")?;
    if telegram.admins.is_empty() {
        warn!("telegram.admins is empty: nobody can use the bot");
    }

    // single SQLite file for associations and the message log
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    switchyard_store::db::init_db(&db)?;
    let store = Arc::new(AssociationStore::new(db));

    let storage_dir = PathBuf::from(&config.relay.storage_dir);
    std::fs::create_dir_all(&storage_dir)
        .with_context(|| format!("creating storage dir {}", storage_dir.display()))?;

    let slaves = app::build_slaves(&config.slaves);
    let master = Arc::new(TelegramMaster::connect(&telegram, storage_dir.clone()).await?);
    let relay = Arc::new(RelayContext::new(
        config.relay.clone(),
        default_chat(&telegram.admins),
        store,
        master.clone(),
        slaves.clone(),
    ));

    let cancel = CancellationToken::new();
    let (queue, rx) = message_queue();
    let mut pollers = slaves.spawn_pollers(queue, cancel.clone());
    let pool = tokio::spawn(run_pool(relay.clone(), rx));

    let adapter = TelegramAdapter::new(
        master,
        HandlerState {
            relay,
            admins: telegram.admins.clone(),
            storage_dir,
        },
    );
    let dispatcher = tokio::spawn(adapter.run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    cancel.cancel();

    // pollers own the queue senders; once they stop the pool drains and exits
    while pollers.join_next().await.is_some() {}
    if let Err(e) = pool.await {
        warn!(error = %e, "relay pool task failed");
    }
    if let Err(e) = dispatcher.await {
        warn!(error = %e, "Telegram dispatcher task failed");
    }
    info!("bye");
    Ok(())
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| app::filter_directives(cli.verbose).into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match &cli.log {
        Some(path) => {
            ensure_parent_dir(&path.to_string_lossy());
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.init(),
    }
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
