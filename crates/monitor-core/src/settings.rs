use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use clap::{Parser, Subcommand};
use regex::Regex;

use crate::error::{MonitorError, Result};
use crate::models::{Target, DEFAULT_BASE_URL};
use crate::notifications::DEFAULT_NTFY_SERVER;

/// Name of the per-user directory holding the profile and state file.
pub const APP_DIR_NAME: &str = ".x-monitor";

/// Upper bound for either poll interval, in seconds.
pub const MAX_POLL_INTERVAL_SECS: u64 = 86_400;

// ── Settings (CLI + environment) ───────────────────────────────────────────────

/// Watch an X account and push a notification when it posts
#[derive(Parser, Debug, Clone)]
#[command(
    name = "x-monitor",
    about = "Watch an X account and push a notification when it posts",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Account to watch (without the leading @)
    #[arg(long, env = "TARGET_USERNAME", default_value = "brenthewolf")]
    pub target_username: String,

    /// Minimum seconds between checks
    #[arg(long, env = "POLL_INTERVAL_MIN", default_value = "5")]
    pub poll_interval_min: u64,

    /// Maximum seconds between checks
    #[arg(long, env = "POLL_INTERVAL_MAX", default_value = "7")]
    pub poll_interval_max: u64,

    /// Run the browser without a visible window
    #[arg(
        long,
        env = "HEADLESS",
        default_value = "true",
        action = clap::ArgAction::Set,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub headless: bool,

    /// ntfy topic to publish to (keep it private and random)
    #[arg(long, env = "NTFY_TOPIC", default_value = "x-alerts-change-this-to-random-string")]
    pub ntfy_topic: String,

    /// ntfy server URL
    #[arg(long, env = "NTFY_SERVER", default_value = DEFAULT_NTFY_SERVER)]
    pub ntfy_server: String,

    /// Browser profile directory holding the logged-in session
    #[arg(long, env = "SESSION_DIR")]
    pub session_dir: Option<PathBuf>,

    /// File storing the last seen post id
    #[arg(long, env = "LAST_SEEN_FILE")]
    pub last_seen_file: Option<PathBuf>,

    /// Default timeout for browser operations, in milliseconds
    #[arg(long, env = "BROWSER_TIMEOUT_MS", default_value = "30000")]
    pub browser_timeout_ms: u64,

    /// Site root used to build profile and post URLs
    #[arg(long, env = "X_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Logging level
    #[arg(long, env = "LOG_LEVEL", default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Poll the target account until interrupted (default)
    Run,
    /// Open a visible browser to log in once and save the session
    Setup,
    /// Send a test notification and exit
    TestNotify,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments and environment, then resolve defaults.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`load`](Self::load) but with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    /// `--debug` overrides the log level.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Reject values the poll loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_username(&self.target_username) {
            return Err(MonitorError::Config(format!(
                "invalid target username: {:?}",
                self.target_username
            )));
        }
        if self.poll_interval_min > self.poll_interval_max {
            return Err(MonitorError::Config(format!(
                "poll interval min ({}) exceeds max ({})",
                self.poll_interval_min, self.poll_interval_max
            )));
        }
        if self.poll_interval_max > MAX_POLL_INTERVAL_SECS {
            return Err(MonitorError::Config(format!(
                "poll interval max ({}) exceeds {} seconds",
                self.poll_interval_max, MAX_POLL_INTERVAL_SECS
            )));
        }
        if self.ntfy_topic.trim().is_empty() {
            return Err(MonitorError::Config("ntfy topic must not be empty".to_string()));
        }
        if self.browser_timeout_ms == 0 {
            return Err(MonitorError::Config(
                "browser timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn selected_command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }

    pub fn target(&self) -> Target {
        Target::new(self.target_username.clone(), self.base_url.clone())
    }

    pub fn poll_interval_min(&self) -> Duration {
        Duration::from_secs(self.poll_interval_min)
    }

    pub fn poll_interval_max(&self) -> Duration {
        Duration::from_secs(self.poll_interval_max)
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_millis(self.browser_timeout_ms)
    }

    /// Profile directory, defaulting to `~/.x-monitor/session`.
    pub fn session_dir(&self) -> PathBuf {
        self.session_dir
            .clone()
            .unwrap_or_else(|| app_dir().join("session"))
    }

    /// State file, defaulting to `~/.x-monitor/last_seen.txt`.
    pub fn last_seen_file(&self) -> PathBuf {
        self.last_seen_file
            .clone()
            .unwrap_or_else(|| app_dir().join("last_seen.txt"))
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────────

/// `~/.x-monitor`, or `./.x-monitor` when no home directory is known.
pub fn app_dir() -> PathBuf {
    app_dir_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
}

/// The app directory rooted at `base_dir` (used for testing).
pub fn app_dir_in(base_dir: &Path) -> PathBuf {
    base_dir.join(APP_DIR_NAME)
}

fn is_valid_username(name: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{1,15}$").expect("static regex"))
        .is_match(name)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
