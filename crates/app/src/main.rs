//! Terminal trivia entry point.
mod args;
mod game;
mod logging;
mod terminal;

use std::path::PathBuf;

use directories::ProjectDirs;
use services::{AppServices, FetchSettings, ProviderConfig};
use tracing::info;

use args::{Args, Parsed, prepare_sqlite_file, print_usage};
use game::TriviaApp;
use logging::setup_logging;
use terminal::TerminalGuard;

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let dirs = ProjectDirs::from("", "", "trivia");
    let data_dir = dirs
        .as_ref()
        .map_or_else(|| PathBuf::from("."), |dirs| dirs.data_dir().to_path_buf());

    let parsed = Args::parse(
        std::env::args().skip(1),
        |key| std::env::var(key).ok(),
        &data_dir.join("trivia.sqlite3"),
    )
    .map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let args = match parsed {
        Parsed::Help => {
            print_usage();
            return Ok(());
        }
        Parsed::Run(args) => args,
    };

    let log_dir = dirs.as_ref().map_or_else(
        || data_dir.join("logs"),
        |dirs| dirs.data_local_dir().join("logs"),
    );
    let _log_guard = setup_logging(&log_dir)?;

    // Open + migrate SQLite at startup.
    prepare_sqlite_file(&args.db_url)?;
    let mut provider = ProviderConfig::from_env();
    if let Some(base_url) = &args.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    let fetch = FetchSettings::default()
        .with_amount(args.amount)
        .with_request_spacing(args.request_spacing)
        .with_zero_result_fallback(args.fallback);
    let services = AppServices::new_sqlite(&args.db_url, provider, fetch).await?;

    let preferences_service = services.preferences();
    let mut preferences = preferences_service.load().await?;
    if !args.categories.is_empty() || args.difficulty.is_some() {
        let mut draft = preferences.to_draft();
        if !args.categories.is_empty() {
            draft.categories.clone_from(&args.categories);
        }
        if let Some(difficulty) = args.difficulty {
            draft.difficulty = difficulty;
        }
        preferences = preferences_service.save(draft).await?;
    }
    info!(
        db = %args.db_url,
        timeout_secs = args.answer_timeout.as_secs(),
        "trivia starting"
    );

    let screen = terminal::init()?;
    let _terminal = TerminalGuard;
    TriviaApp::new(services, preferences, args.answer_timeout, screen)
        .run()
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
