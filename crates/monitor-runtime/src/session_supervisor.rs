//! Lifecycle of the rendering session.
//!
//! [`SessionSupervisor`] owns the one live browser session, hands its page to
//! the poll loop, and tears it down and relaunches it when a failure is
//! classified as session death.

use monitor_core::{BrowserSession, LaunchOptions, PageController, PageError, SessionLauncher};
use tracing::Instrument;

// ── Public types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing launched yet.
    Uninitialized,
    /// A session is up and its page can be driven.
    Live,
    /// The previous session died; a relaunch is pending or failed.
    Reinitializing,
    /// Released on shutdown.
    Closed,
}

// ── SessionSupervisor ─────────────────────────────────────────────────────────

/// Owner of the single rendering session.
///
/// `Uninitialized → Live → Reinitializing → Live`, and `→ Closed` on shutdown.
/// The poll loop is the only caller, so no locking is involved.
pub struct SessionSupervisor {
    launcher: Box<dyn SessionLauncher>,
    options: LaunchOptions,
    session: Option<Box<dyn BrowserSession>>,
    state: SessionState,
    /// Number of successful launches.
    launches: u32,
    /// Number of `recover` calls.
    recoveries: u32,
}

impl SessionSupervisor {
    pub fn new(launcher: Box<dyn SessionLauncher>, options: LaunchOptions) -> Self {
        Self {
            launcher,
            options,
            session: None,
            state: SessionState::Uninitialized,
            launches: 0,
            recoveries: 0,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == SessionState::Live && self.session.is_some()
    }

    pub fn launch_count(&self) -> u32 {
        self.launches
    }

    pub fn recovery_attempts(&self) -> u32 {
        self.recoveries
    }

    pub fn options(&self) -> &LaunchOptions {
        &self.options
    }

    /// The live page, or `None` when no session is up.
    pub fn page(&self) -> Option<&dyn PageController> {
        self.session.as_deref().map(|s| s.page())
    }

    /// Whether `error` means the session is gone and must be relaunched.
    pub fn is_death_signal(error: &PageError) -> bool {
        error.is_session_closed()
    }

    /// Launch the browser with the durable profile and take its page.
    ///
    /// Any session still held is released first.
    pub async fn initialize(&mut self) -> Result<(), PageError> {
        let span = self.span();
        self.launch().instrument(span).await
    }

    /// Release the current session (best effort) and launch a new one.
    pub async fn recover(&mut self) -> Result<(), PageError> {
        let span = self.span();
        async {
            self.recoveries += 1;
            self.state = SessionState::Reinitializing;
            tracing::info!(attempt = self.recoveries, "reinitializing browser");

            match self.launch().await {
                Ok(()) => {
                    tracing::info!("browser reinitialized");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to reinitialize browser");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Release the session on shutdown. Safe to call more than once.
    pub async fn close(&mut self) {
        let span = self.span();
        async {
            if self.release().await {
                tracing::info!("browser closed");
            }
            self.state = SessionState::Closed;
        }
        .instrument(span)
        .await
    }

    // ── Private helpers ───────────────────────────────────────────────────

    /// Opened per call so it nests under whatever span the caller is in.
    fn span(&self) -> tracing::Span {
        tracing::info_span!("session", profile = %self.options.profile_dir.display())
    }

    async fn launch(&mut self) -> Result<(), PageError> {
        self.release().await;

        tracing::info!(
            headless = self.options.headless,
            timeout_ms = self.options.default_timeout.as_millis() as u64,
            "launching browser"
        );
        let session = self.launcher.launch(&self.options).await?;

        self.session = Some(session);
        self.state = SessionState::Live;
        self.launches += 1;
        tracing::info!(launches = self.launches, "browser initialized");
        Ok(())
    }

    /// Close the held session, if any. Returns whether one was held.
    async fn release(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        if let Err(e) = session.close().await {
            // A crashed browser usually cannot be closed cleanly.
            tracing::warn!(error = %e, "failed to close browser session");
        }
        true
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
