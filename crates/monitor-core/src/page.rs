//! Contract between the poll loop and a rendering engine.
//!
//! The runtime never talks to a browser directly. It drives a
//! [`PageController`] and reacts to the [`ErrorKind`] carried by every
//! failure, so classifying "the session is dead" is the adapter's job.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

/// Coarse classification of a page-controller failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The browser, target or page is gone; only a relaunch helps.
    SessionClosed,
    /// An operation did not complete within its deadline.
    Timeout,
    /// Navigation or transport failed while the session stayed usable.
    Network,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::SessionClosed => write!(f, "session closed"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct PageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_session_closed(&self) -> bool {
        self.kind == ErrorKind::SessionClosed
    }
}

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitUntil {
    /// The `load` event fired.
    Load,
    /// No network activity for a short quiet period.
    #[default]
    NetworkIdle,
}

/// A node in the rendered document.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// First descendant matching `selector`, if any.
    async fn query_one(&self, selector: &str) -> Result<Option<Box<dyn ElementHandle>>, PageError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, PageError>;

    async fn inner_text(&self) -> Result<String, PageError>;
}

/// A single live page in a rendering session.
#[async_trait]
pub trait PageController: Send + Sync {
    async fn goto(&self, url: &str, wait: WaitUntil) -> Result<(), PageError>;

    /// Resolve once at least one node matches `selector`, or fail with
    /// [`ErrorKind::Timeout`].
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), PageError>;

    /// All nodes matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, PageError>;
}

// ── Sessions ──────────────────────────────────────────────────────────────────

/// Desktop Chrome on Windows; matches what a real visitor sends.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_VIEWPORT: (u32, u32) = (1280, 720);

pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a launcher needs to start one rendering session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Durable profile directory produced by the login setup.
    pub profile_dir: PathBuf,
    pub headless: bool,
    /// `(width, height)` in CSS pixels.
    pub viewport: (u32, u32),
    pub user_agent: String,
    /// Shared deadline for every page operation.
    pub default_timeout: Duration,
}

impl LaunchOptions {
    pub fn new(profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile_dir: profile_dir.into(),
            headless: true,
            viewport: DEFAULT_VIEWPORT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            default_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

/// A live browser together with the single page the monitor drives.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    fn page(&self) -> &dyn PageController;

    /// Shut the browser down, flushing the profile to disk.
    async fn close(self: Box<Self>) -> Result<(), PageError>;
}

/// Starts rendering sessions.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>, PageError>;
}
