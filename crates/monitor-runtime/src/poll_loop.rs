//! The long-running poll loop.
//!
//! Each cycle reloads the target's profile, extracts the newest post, and
//! compares it with the last seen id. A change is pushed through the
//! [`NotificationDispatcher`] and then persisted. Between cycles the loop
//! sleeps for a [`Jitter`]ed interval. A dead browser session is handed to the
//! [`SessionSupervisor`] and the loop carries on with the next cycle.

use monitor_core::notifications::NotificationDispatcher;
use monitor_core::state_store::StateStore;
use monitor_core::{
    ErrorKind, MonitorError, NotificationEvent, PageError, Target, WaitUntil,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::extractor::{Extraction, ItemExtractor};
use crate::jitter::Jitter;
use crate::session_supervisor::SessionSupervisor;

// ── Public types ──────────────────────────────────────────────────────────────

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// First observation; recorded without notifying.
    Baseline(String),
    /// A new post was announced and recorded.
    Changed(String),
    /// The newest post is the one already seen.
    Unchanged(String),
    /// Posts rendered but no id could be read.
    NoItem,
    /// A new post was seen but the alert did not go out; state is unchanged
    /// so the next cycle tries again.
    NotifyFailed(String),
    /// Navigation or extraction failed without killing the session.
    Transient,
    /// The session died and was relaunched.
    SessionRecovered,
    /// The session died and could not be relaunched.
    RecoveryFailed,
}

// ── PollLoop ──────────────────────────────────────────────────────────────────

pub struct PollLoop {
    target: Target,
    supervisor: SessionSupervisor,
    extractor: ItemExtractor,
    notifier: Box<dyn NotificationDispatcher>,
    store: StateStore,
    jitter: Jitter,
    /// Most recently recorded post id; `None` until the baseline cycle.
    last_seen_id: Option<String>,
    span: tracing::Span,
}

impl PollLoop {
    pub fn new(
        target: Target,
        supervisor: SessionSupervisor,
        notifier: Box<dyn NotificationDispatcher>,
        store: StateStore,
        jitter: Jitter,
    ) -> Self {
        let span = tracing::info_span!("poll_loop", account = %target.account);
        let extractor = ItemExtractor::default().with_base_url(target.base_url.clone());
        Self {
            target,
            supervisor,
            extractor,
            notifier,
            store,
            jitter,
            last_seen_id: None,
            span,
        }
    }

    pub fn with_extractor(mut self, extractor: ItemExtractor) -> Self {
        self.extractor = extractor.with_base_url(self.target.base_url.clone());
        self
    }

    pub fn last_seen_id(&self) -> Option<&str> {
        self.last_seen_id.as_deref()
    }

    pub fn supervisor(&self) -> &SessionSupervisor {
        &self.supervisor
    }

    /// Launch the browser and load the persisted baseline.
    ///
    /// A launch failure here is fatal.
    pub async fn start(&mut self) -> Result<(), MonitorError> {
        let span = self.span.clone();
        async {
            tracing::info!(url = %self.target.profile_url(), "starting monitor");
            self.supervisor.initialize().await?;
            self.last_seen_id = self.store.load();
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Run until `cancel` fires, then close the session.
    ///
    /// Cancellation is observed between cycles only; a cycle in flight always
    /// completes.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), MonitorError> {
        if let Err(e) = self.start().await {
            tracing::error!(parent: &self.span, error = %e, "fatal error during startup");
            self.supervisor.close().instrument(self.span.clone()).await;
            return Err(e);
        }

        while !cancel.is_cancelled() {
            self.run_cycle().await;

            let delay = self.jitter.sample();
            tracing::info!(
                parent: &self.span,
                delay_secs = format_args!("{:.1}", delay.as_secs_f64()),
                "waiting before next check"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {}
            }
        }

        tracing::info!(parent: &self.span, "monitoring stopped");
        self.supervisor.close().instrument(self.span.clone()).await;
        Ok(())
    }

    /// One full check. Never fails: every error is classified and logged.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let span = self.span.clone();
        self.cycle().instrument(span).await
    }

    // ── Private implementation ────────────────────────────────────────────

    async fn cycle(&mut self) -> CycleOutcome {
        // A failed relaunch leaves no page; retry it once per cycle instead of
        // calling into a dead session.
        if !self.supervisor.is_live() {
            tracing::warn!(state = ?self.supervisor.state(), "no live session; relaunching");
            if self.supervisor.recover().await.is_err() {
                return CycleOutcome::RecoveryFailed;
            }
        }

        match self.check_for_new_post().await {
            Ok(outcome) => outcome,
            Err(e) if SessionSupervisor::is_death_signal(&e) => {
                tracing::error!(error = %e, "browser crashed");
                match self.supervisor.recover().await {
                    Ok(()) => CycleOutcome::SessionRecovered,
                    Err(_) => CycleOutcome::RecoveryFailed,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "error checking for new post");
                CycleOutcome::Transient
            }
        }
    }

    async fn check_for_new_post(&mut self) -> Result<CycleOutcome, PageError> {
        let page = self
            .supervisor
            .page()
            .ok_or_else(|| PageError::new(ErrorKind::SessionClosed, "no live page"))?;

        let url = self.target.profile_url();
        tracing::info!(%url, "reloading profile");
        page.goto(&url, WaitUntil::NetworkIdle).await?;

        let item = match self.extractor.extract_latest(page).await? {
            Extraction::Found(item) => item,
            Extraction::NotFound => {
                tracing::warn!("could not extract post id");
                return Ok(CycleOutcome::NoItem);
            }
            Extraction::TransientError(e) => {
                tracing::warn!(error = %e, "extraction failed; treating as no change");
                return Ok(CycleOutcome::Transient);
            }
        };
        let latest = item.id;

        let previous = self.last_seen_id.clone();
        match previous {
            None => {
                tracing::info!(id = %latest, "first run; setting baseline");
                self.record(&latest);
                Ok(CycleOutcome::Baseline(latest))
            }
            Some(prev) if prev == latest => {
                tracing::info!(id = %latest, "no new posts");
                Ok(CycleOutcome::Unchanged(latest))
            }
            Some(prev) => {
                let post_url = self.target.post_url(&latest);
                tracing::info!(url = %post_url, previous = %prev, "new post detected");

                let event = NotificationEvent::new(post_url, self.target.account.clone());
                if let Err(e) = self.notifier.dispatch(&event).await {
                    tracing::warn!(error = %e, id = %latest, "notification failed; will retry next cycle");
                    return Ok(CycleOutcome::NotifyFailed(latest));
                }

                self.record(&latest);
                Ok(CycleOutcome::Changed(latest))
            }
        }
    }

    /// Update the in-memory id and persist it. A failed write is already
    /// logged by the store; memory stays authoritative.
    fn record(&mut self, id: &str) {
        self.last_seen_id = Some(id.to_string());
        self.store.save(id);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
