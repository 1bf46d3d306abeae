// Cadence
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

pub mod api;
pub mod catalog;
pub mod channels;
pub mod content;
pub mod conversation;
pub mod db;
pub mod delivery;
pub mod eligibility;
pub mod scheduler;
pub mod services;
pub mod settings;
pub mod telemetry;
pub mod texts;
#[cfg(test)]
pub mod utils;

use cadence_common::{
    api::ManualSendResponse,
    error::{CadenceErrorKind, Result},
    touch::TouchType,
};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use sea_orm::{Database, DatabaseConnection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teloxide::Bot;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use channels::{Messenger, telegram::TelegramMessenger};
use conversation::{Dialogue, sequencer::Sequencer, store::ConversationStore};
use delivery::DeliveryExecutor;
use scheduler::{PurgeJob, Scheduler, TouchJob};
use services::{
    FeedbackService, Transcriber,
    http::{HttpFeedback, HttpTranscriber},
};
use settings::{DatabaseSettings, Settings};

/// Cadence coaching-course bot
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the bot: Telegram polling, the touch scheduler and the admin API
    Serve,
    /// Deliver a touch to the given users right now
    SendTouch(SendTouchArgs),
    /// Load course days and touch contents from a JSON catalog
    Import {
        /// Path to the catalog file
        path: PathBuf,
    },
    /// Apply pending database migrations
    Migrate,
}

#[derive(Debug, Args)]
struct SendTouchArgs {
    /// morning, day or evening
    #[arg(short, long)]
    touch: TouchType,

    /// Telegram user id, may be repeated
    #[arg(short, long = "user", required = true)]
    users: Vec<i64>,

    /// Send even if the touch already went out today
    #[arg(long)]
    force: bool,
}

fn ensure_sqlite_dir(url: &str) -> Result<()> {
    let Some(rest) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn connect(settings: &DatabaseSettings) -> Result<DatabaseConnection> {
    ensure_sqlite_dir(&settings.url)?;
    let db = Database::connect(&settings.url).await?;
    db::migration::migrate(&db).await?;
    Ok(db)
}

fn bot(settings: &Settings) -> Result<Bot> {
    if settings.bot.token.trim().is_empty() {
        return Err(CadenceErrorKind::Config("bot.token is required".into()).into());
    }
    Ok(Bot::new(settings.bot.token.clone()))
}

fn shutdown_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("Received SIGINT, shutting down"),
                        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                    }
                }
                Err(err) => {
                    error!("Failed to install SIGTERM handler: {err}");
                    let _ = ctrl_c.await;
                    info!("Received SIGINT, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("Received Ctrl+C, shutting down");
        }

        trigger.cancel();
    });

    token
}

async fn serve(settings: Settings) -> Result<()> {
    settings.validate_for_serve()?;
    let offset = settings.schedule.offset()?;
    let db = connect(&settings.database).await?;
    let bot = bot(&settings)?;

    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot.clone()));
    let store = ConversationStore::new(
        db.clone(),
        settings.bot.instance_id.clone(),
        settings.conversation.ttl(),
    );
    let executor = DeliveryExecutor::new(
        db.clone(),
        messenger.clone(),
        store.clone(),
        offset,
        settings.schedule.concurrency,
    );

    let feedback = settings
        .feedback
        .clone()
        .map(|s| Arc::new(HttpFeedback::new(s)) as Arc<dyn FeedbackService>);
    let transcriber = settings
        .transcription
        .clone()
        .map(|s| Arc::new(HttpTranscriber::new(s)) as Arc<dyn Transcriber>);
    let sequencer = Sequencer::new(db.clone(), messenger.clone(), feedback, transcriber);
    let dialogue = Dialogue::new(db.clone(), messenger, store.clone(), sequencer);

    let scheduler = TouchType::ALL
        .into_iter()
        .fold(Scheduler::new(), |scheduler, touch| {
            scheduler.with_job(TouchJob::new(touch, executor.clone()))
        })
        .with_job(PurgeJob::new(store.clone()));

    let cancel = shutdown_signal();
    let mut tasks = JoinSet::new();
    tasks.spawn(scheduler.run(cancel.clone()));
    tasks.spawn(channels::telegram::run_polling(bot, dialogue, cancel.clone()));
    if let Some(api_settings) = settings.api.clone() {
        let state = api::ApiState {
            db: db.clone(),
            auth: api_settings.auth,
            executor,
            store,
        };
        let cancel = cancel.clone();
        tasks.spawn(async move {
            if let Err(err) = api::serve(&api_settings.bind, state, cancel.clone()).await {
                error!("Admin API stopped: {err}");
            }
        });
    }

    info!(instance = %settings.bot.instance_id, "Cadence is running");
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            error!("Task failed: {err}");
        }
        // any component stopping takes the rest down with it
        cancel.cancel();
    }
    info!("Cadence stopped");
    Ok(())
}

async fn send_touch(args: SendTouchArgs, settings: Settings) -> Result<()> {
    let offset = settings.schedule.offset()?;
    let db = connect(&settings.database).await?;
    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot(&settings)?));
    let store = ConversationStore::new(
        db.clone(),
        settings.bot.instance_id.clone(),
        settings.conversation.ttl(),
    );
    let concurrency = settings.schedule.concurrency;
    let executor = DeliveryExecutor::new(db, messenger, store, offset, concurrency);

    let reports = executor
        .deliver_manual(args.touch, &args.users, args.force, Utc::now())
        .await;
    println!(
        "{}",
        serde_json::to_string_pretty(&ManualSendResponse { reports })?
    );
    Ok(())
}

async fn run(command: Commands, settings: Settings) -> Result<()> {
    match command {
        Commands::Serve => serve(settings).await,
        Commands::SendTouch(args) => send_touch(args, settings).await,
        Commands::Import { path } => {
            let catalog = catalog::Catalog::from_path(&path)?;
            let db = connect(&settings.database).await?;
            catalog::import(catalog, Utc::now(), &db).await?;
            Ok(())
        }
        Commands::Migrate => {
            connect(&settings.database).await?;
            info!("Migrations applied");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let provider = telemetry::init(&cli.verbose, &settings.telemetry)?;

    let result = run(cli.command, settings).await;
    if let Err(err) = &result {
        error!("{err}");
    }
    telemetry::shutdown(provider);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_send_touch() {
        let cli = Cli::try_parse_from([
            "cadence", "-c", "cadence.toml", "send-touch", "--touch", "evening", "--user", "1",
            "--user", "2", "--force",
        ])
        .unwrap();
        let Commands::SendTouch(args) = cli.command else {
            panic!("expected send-touch");
        };
        assert_eq!(args.touch, TouchType::Evening);
        assert_eq!(args.users, vec![1, 2]);
        assert!(args.force);
        assert_eq!(cli.config, Some(PathBuf::from("cadence.toml")));
    }

    #[test]
    fn send_touch_needs_users() {
        assert!(Cli::try_parse_from(["cadence", "send-touch", "--touch", "day"]).is_err());
    }

    #[test]
    fn sqlite_parent_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/cadence.db");
        ensure_sqlite_dir(&format!("sqlite://{}?mode=rwc", path.display())).unwrap();
        assert!(dir.path().join("nested").is_dir());
        ensure_sqlite_dir("sqlite::memory:").unwrap();
    }
}
