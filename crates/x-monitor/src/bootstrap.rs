use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use monitor_core::settings::Settings;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure the profile directory and the state file's parent exist.
pub fn ensure_directories(settings: &Settings) -> anyhow::Result<()> {
    ensure_directories_for(&settings.session_dir(), &settings.last_seen_file())
}

/// Create `session_dir` and the parent of `state_file`, including any missing
/// ancestors.
pub fn ensure_directories_for(session_dir: &Path, state_file: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(session_dir)?;
    if let Some(parent) = state_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map upper-case level names such as `WARNING` onto `tracing` directives.
pub fn normalise_level(log_level: &str) -> String {
    let upper = log_level.to_uppercase();
    match upper.as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output always goes to stderr; when `log_file` is given the same events are
/// appended there without ANSI colours.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(normalise_level(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr = fmt::layer().with_target(false).with_thread_ids(false);

    let file = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .init();

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
