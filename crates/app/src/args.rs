use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use services::{DEFAULT_BATCH_AMOUNT, DEFAULT_REQUEST_SPACING, ZeroResultFallback};
use trivia_core::model::{CategoryId, Difficulty};

/// Open Trivia DB serves at most this many questions per request.
const MAX_AMOUNT: u32 = 50;
const DEFAULT_ANSWER_TIMEOUT: Duration = Duration::from_secs(7);

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidDifficulty { raw: String },
    InvalidCategory { raw: String },
    InvalidAmount { raw: String },
    InvalidSeconds { flag: &'static str, raw: String },
    InvalidBaseUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDifficulty { raw } => {
                write!(f, "invalid --difficulty value: {raw} (any, easy, medium, hard)")
            }
            ArgsError::InvalidCategory { raw } => write!(f, "invalid --category value: {raw}"),
            ArgsError::InvalidAmount { raw } => {
                write!(f, "invalid --amount value: {raw} (1-{MAX_AMOUNT})")
            }
            ArgsError::InvalidSeconds { flag, raw } => {
                write!(f, "invalid {flag} value: {raw} (whole seconds)")
            }
            ArgsError::InvalidBaseUrl { raw } => write!(f, "invalid --base-url value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_seconds(raw: &str, flag: &'static str, allow_zero: bool) -> Result<Duration, ArgsError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| allow_zero || *secs > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| ArgsError::InvalidSeconds {
            flag,
            raw: raw.to_string(),
        })
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  trivia [--db <sqlite_url>] [--difficulty <level>] [--category <id>]...");
    eprintln!("         [--amount <n>] [--timeout <secs>] [--spacing <secs>]");
    eprintln!("         [--base-url <url>] [--fallback]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db        trivia.sqlite3 in the platform data directory");
    eprintln!("  --amount    {DEFAULT_BATCH_AMOUNT}");
    eprintln!("  --timeout   {}", DEFAULT_ANSWER_TIMEOUT.as_secs());
    eprintln!("  --spacing   {}", DEFAULT_REQUEST_SPACING.as_secs());
    eprintln!();
    eprintln!("--difficulty and --category override the saved preferences.");
    eprintln!("--fallback retries an empty category once without the difficulty filter.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TRIVIA_DB_URL, TRIVIA_API_BASE_URL, TRIVIA_ANSWER_TIMEOUT_SECS,");
    eprintln!("  TRIVIA_REQUEST_SPACING_SECS, TRIVIA_REQUEST_TIMEOUT_SECS, RUST_LOG");
}

/// Outcome of argument parsing.
#[derive(Debug, PartialEq, Eq)]
pub enum Parsed {
    Run(Args),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub db_url: String,
    pub difficulty: Option<Difficulty>,
    pub categories: Vec<CategoryId>,
    pub amount: u32,
    pub answer_timeout: Duration,
    pub request_spacing: Duration,
    pub base_url: Option<String>,
    pub fallback: ZeroResultFallback,
}

impl Args {
    /// Parse flags over environment values over defaults.
    ///
    /// `env` looks up a variable by name; `default_db` is used when neither
    /// `--db` nor `TRIVIA_DB_URL` is given.
    pub fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
        default_db: &Path,
    ) -> Result<Parsed, ArgsError> {
        let mut db_url = env("TRIVIA_DB_URL")
            .filter(|value| !value.trim().is_empty())
            .map_or_else(
                || format!("sqlite://{}", default_db.display()),
                normalize_sqlite_url,
            );
        let mut answer_timeout = env("TRIVIA_ANSWER_TIMEOUT_SECS")
            .and_then(|value| parse_seconds(&value, "TRIVIA_ANSWER_TIMEOUT_SECS", false).ok())
            .unwrap_or(DEFAULT_ANSWER_TIMEOUT);
        let mut request_spacing = env("TRIVIA_REQUEST_SPACING_SECS")
            .and_then(|value| parse_seconds(&value, "TRIVIA_REQUEST_SPACING_SECS", true).ok())
            .unwrap_or(DEFAULT_REQUEST_SPACING);
        let mut difficulty = None;
        let mut categories = Vec::new();
        let mut amount = DEFAULT_BATCH_AMOUNT;
        let mut base_url = None;
        let mut fallback = ZeroResultFallback::None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--difficulty" => {
                    let value = require_value(&mut args, "--difficulty")?;
                    let parsed = value
                        .parse::<Difficulty>()
                        .map_err(|_| ArgsError::InvalidDifficulty { raw: value.clone() })?;
                    difficulty = Some(parsed);
                }
                "--category" => {
                    let value = require_value(&mut args, "--category")?;
                    let parsed = value
                        .parse::<CategoryId>()
                        .map_err(|_| ArgsError::InvalidCategory { raw: value.clone() })?;
                    categories.push(parsed);
                }
                "--amount" => {
                    let value = require_value(&mut args, "--amount")?;
                    amount = value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|n| (1..=MAX_AMOUNT).contains(n))
                        .ok_or_else(|| ArgsError::InvalidAmount { raw: value.clone() })?;
                }
                "--timeout" => {
                    let value = require_value(&mut args, "--timeout")?;
                    answer_timeout = parse_seconds(&value, "--timeout", false)?;
                }
                "--spacing" => {
                    let value = require_value(&mut args, "--spacing")?;
                    request_spacing = parse_seconds(&value, "--spacing", true)?;
                }
                "--base-url" => {
                    let value = require_value(&mut args, "--base-url")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidBaseUrl { raw: value });
                    }
                    base_url = Some(value.trim().to_string());
                }
                "--fallback" => {
                    fallback = ZeroResultFallback::RetryWithoutDifficulty {
                        reduced_amount: None,
                    };
                }
                "--help" | "-h" => return Ok(Parsed::Help),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Parsed::Run(Self {
            db_url,
            difficulty,
            categories,
            amount,
            answer_timeout,
            request_spacing,
            base_url,
            fallback,
        }))
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file (and its directory) so `SQLite` can open it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}
