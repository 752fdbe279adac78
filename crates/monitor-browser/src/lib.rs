//! Chromium adapter for the page-controller contract.
//!
//! Launches Chrome through the DevTools protocol with a persistent profile
//! directory and maps every protocol failure onto an [`ErrorKind`], so the
//! runtime can tell a dead session from a slow page.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures_util::StreamExt;
use monitor_core::{
    BrowserSession, ElementHandle, ErrorKind, LaunchOptions, PageController, PageError,
    SessionLauncher, WaitUntil,
};
use tokio::task::JoinHandle;

/// Extra Chrome command-line flags applied to every launch.
const CHROME_ARGS: &[&str] = &[
    "--disable-dev-shm-usage",
    "--disable-blink-features=AutomationControlled",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-gpu",
    "--disable-software-rasterizer",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-breakpad",
    "--disable-component-extensions-with-background-pages",
    "--disable-features=TranslateUI,BlinkGenPropertyTrees",
    "--disable-ipc-flooding-protection",
    "--disable-renderer-backgrounding",
    "--force-color-profile=srgb",
    "--hide-scrollbars",
    "--metrics-recording-only",
    "--mute-audio",
    "--no-first-run",
    "--disable-crash-reporter",
];

/// Error text that means the browser or its target is gone.
const DEATH_MARKERS: &[&str] = &[
    "target closed",
    "page crashed",
    "session closed",
    "browser closed",
    "connection closed",
    "channel closed",
    "no target with given id",
    "receiver is gone",
];

/// Quiet period after the load event that stands in for network idle.
const NETWORK_IDLE_QUIET: Duration = Duration::from_millis(500);

const SELECTOR_POLL: Duration = Duration::from_millis(250);

// ── Error classification ──────────────────────────────────────────────────────

/// Map a protocol error onto the runtime's error kinds.
pub fn classify(err: CdpError) -> PageError {
    let message = err.to_string();
    let kind = match &err {
        CdpError::Timeout => ErrorKind::Timeout,
        CdpError::Ws(_) => ErrorKind::SessionClosed,
        _ if is_death_message(&message) => ErrorKind::SessionClosed,
        CdpError::Io(_) => ErrorKind::Network,
        _ if message.contains("net::ERR_") => ErrorKind::Network,
        _ => ErrorKind::Other,
    };
    PageError::new(kind, message)
}

pub fn is_death_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    DEATH_MARKERS.iter().any(|m| lower.contains(m))
}

// ── ChromeLauncher ────────────────────────────────────────────────────────────

/// [`SessionLauncher`] backed by a locally installed Chrome/Chromium.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    /// Explicit browser binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
}

impl ChromeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    fn config(&self, options: &LaunchOptions) -> Result<BrowserConfig, PageError> {
        let (width, height) = options.viewport;
        let mut builder = BrowserConfig::builder()
            .user_data_dir(&options.profile_dir)
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Viewport::default()
            })
            .request_timeout(options.default_timeout)
            .arg(format!("--user-agent={}", options.user_agent))
            .args(CHROME_ARGS.iter().copied());

        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(exe) = &self.executable {
            builder = builder.chrome_executable(exe);
        }

        builder
            .build()
            .map_err(|e| PageError::new(ErrorKind::Other, format!("invalid browser config: {e}")))
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>, PageError> {
        let config = self.config(options)?;
        let (mut browser, mut handler) = Browser::launch(config).await.map_err(classify)?;

        // The CDP handler must be polled for the browser to make progress.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    if matches!(e, CdpError::Ws(_)) {
                        tracing::warn!(error = %e, "devtools connection lost");
                        break;
                    }
                    tracing::debug!(error = %e, "devtools handler error");
                }
            }
            tracing::debug!("devtools handler exited");
        });

        let page = match open_page(&browser).await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(e);
            }
        };

        Ok(Box::new(ChromeSession {
            browser,
            page: ChromePage { page },
            handler,
            profile_dir: options.profile_dir.clone(),
        }))
    }
}

/// Reuse the tab a persistent profile opens with, or create one.
async fn open_page(browser: &Browser) -> Result<Page, PageError> {
    let pages = browser.pages().await.map_err(classify)?;
    match pages.into_iter().next() {
        Some(page) => Ok(page),
        None => browser.new_page("about:blank").await.map_err(classify),
    }
}

// ── ChromeSession ─────────────────────────────────────────────────────────────

pub struct ChromeSession {
    browser: Browser,
    page: ChromePage,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl ChromeSession {
    pub fn profile_dir(&self) -> &std::path::Path {
        &self.profile_dir
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    fn page(&self) -> &dyn PageController {
        &self.page
    }

    async fn close(self: Box<Self>) -> Result<(), PageError> {
        let ChromeSession {
            mut browser,
            handler,
            profile_dir,
            ..
        } = *self;

        let closed = browser.close().await.map(|_| ()).map_err(classify);
        if closed.is_ok() {
            let _ = browser.wait().await;
        }
        handler.abort();
        tracing::debug!(profile = %profile_dir.display(), "browser process released");
        closed
    }
}

// ── ChromePage ────────────────────────────────────────────────────────────────

pub struct ChromePage {
    page: Page,
}

#[async_trait]
impl PageController for ChromePage {
    async fn goto(&self, url: &str, wait: WaitUntil) -> Result<(), PageError> {
        self.page.goto(url).await.map_err(classify)?;
        if wait == WaitUntil::NetworkIdle {
            self.page.wait_for_navigation().await.map_err(classify)?;
            tokio::time::sleep(NETWORK_IDLE_QUIET).await;
        }
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        let poll = async {
            loop {
                match self.page.find_elements(selector).await {
                    Ok(found) if !found.is_empty() => return Ok(()),
                    Ok(_) => {}
                    Err(e) => {
                        let err = classify(e);
                        if err.is_session_closed() {
                            return Err(err);
                        }
                    }
                }
                tokio::time::sleep(SELECTOR_POLL).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(PageError::new(
                ErrorKind::Timeout,
                format!("timed out after {}ms waiting for {selector}", timeout.as_millis()),
            )),
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, PageError> {
        let found = self.page.find_elements(selector).await.map_err(classify)?;
        Ok(found
            .into_iter()
            .map(|element| Box::new(ChromeElement { element }) as Box<dyn ElementHandle>)
            .collect())
    }
}

// ── ChromeElement ─────────────────────────────────────────────────────────────

struct ChromeElement {
    element: Element,
}

#[async_trait]
impl ElementHandle for ChromeElement {
    async fn query_one(&self, selector: &str) -> Result<Option<Box<dyn ElementHandle>>, PageError> {
        let found = self.element.find_elements(selector).await.map_err(classify)?;
        Ok(found
            .into_iter()
            .next()
            .map(|element| Box::new(ChromeElement { element }) as Box<dyn ElementHandle>))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, PageError> {
        self.element.attribute(name).await.map_err(classify)
    }

    async fn inner_text(&self) -> Result<String, PageError> {
        Ok(self
            .element
            .inner_text()
            .await
            .map_err(classify)?
            .unwrap_or_default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
