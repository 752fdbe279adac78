//! Scripted in-memory stand-ins for the browser and the notifier.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use monitor_core::notifications::{NotificationDispatcher, NotifyError};
use monitor_core::{
    BrowserSession, ElementHandle, ErrorKind, LaunchOptions, NotificationEvent, PageController,
    PageError, SessionLauncher, WaitUntil,
};

use crate::extractor::{ITEM_SELECTOR, SOCIAL_CONTEXT_SELECTOR, STATUS_LINK_SELECTOR};

// ── Feed content ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub(crate) struct FakePost {
    pub social_context: Option<String>,
    pub href: Option<String>,
    /// The status-link lookup fails as if the node were detached.
    pub link_error: bool,
}

pub(crate) fn post(id: &str) -> FakePost {
    FakePost {
        social_context: None,
        href: Some(format!("/someone/status/{id}")),
        link_error: false,
    }
}

pub(crate) fn pinned(id: &str) -> FakePost {
    FakePost {
        social_context: Some("Pinned".to_string()),
        ..post(id)
    }
}

/// What the next `goto` produces.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Feed(Vec<FakePost>),
    /// `goto` itself fails.
    NavFail(ErrorKind),
    /// `goto` succeeds but the page dies before anything renders.
    CrashAfterLoad,
}

#[derive(Debug, Clone)]
enum Rendered {
    Feed(Vec<FakePost>),
    Crashed,
}

// ── Shared script ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub(crate) struct Script {
    pub steps: VecDeque<Step>,
    pub visited: Vec<String>,
    pub launches: usize,
    pub closes: usize,
    /// Number of upcoming launches that fail.
    pub failing_launches: usize,
    pub last_options: Option<LaunchOptions>,
}

pub(crate) type SharedScript = Arc<Mutex<Script>>;

pub(crate) fn script(steps: Vec<Step>) -> SharedScript {
    Arc::new(Mutex::new(Script {
        steps: steps.into(),
        ..Default::default()
    }))
}

// ── Launcher / session / page ─────────────────────────────────────────────────

pub(crate) struct FakeLauncher {
    pub script: SharedScript,
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>, PageError> {
        let mut script = self.script.lock().unwrap();
        script.last_options = Some(options.clone());
        if script.failing_launches > 0 {
            script.failing_launches -= 1;
            return Err(PageError::new(ErrorKind::Other, "failed to launch browser"));
        }
        script.launches += 1;
        Ok(Box::new(FakeSession {
            script: self.script.clone(),
            page: FakePage {
                script: self.script.clone(),
                rendered: Mutex::new(Rendered::Feed(Vec::new())),
            },
        }))
    }
}

struct FakeSession {
    script: SharedScript,
    page: FakePage,
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn page(&self) -> &dyn PageController {
        &self.page
    }

    async fn close(self: Box<Self>) -> Result<(), PageError> {
        self.script.lock().unwrap().closes += 1;
        Ok(())
    }
}

pub(crate) struct FakePage {
    script: SharedScript,
    rendered: Mutex<Rendered>,
}

impl FakePage {
    /// A page already showing `posts`, detached from any launcher.
    pub fn showing(posts: Vec<FakePost>) -> Self {
        Self {
            script: script(Vec::new()),
            rendered: Mutex::new(Rendered::Feed(posts)),
        }
    }

    pub fn crashed() -> Self {
        Self {
            script: script(Vec::new()),
            rendered: Mutex::new(Rendered::Crashed),
        }
    }

    fn crashed_error() -> PageError {
        PageError::new(ErrorKind::SessionClosed, "Target closed")
    }
}

#[async_trait]
impl PageController for FakePage {
    async fn goto(&self, url: &str, _wait: WaitUntil) -> Result<(), PageError> {
        let step = {
            let mut script = self.script.lock().unwrap();
            script.visited.push(url.to_string());
            script.steps.pop_front()
        };
        let next = match step {
            Some(Step::Feed(posts)) => Rendered::Feed(posts),
            Some(Step::NavFail(kind)) => {
                return Err(PageError::new(kind, "navigation failed"));
            }
            Some(Step::CrashAfterLoad) => Rendered::Crashed,
            None => Rendered::Feed(Vec::new()),
        };
        *self.rendered.lock().unwrap() = next;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<(), PageError> {
        match &*self.rendered.lock().unwrap() {
            Rendered::Crashed => Err(Self::crashed_error()),
            Rendered::Feed(posts) if selector == ITEM_SELECTOR && !posts.is_empty() => Ok(()),
            Rendered::Feed(_) => Err(PageError::new(
                ErrorKind::Timeout,
                format!("waiting for selector {selector}"),
            )),
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>, PageError> {
        match &*self.rendered.lock().unwrap() {
            Rendered::Crashed => Err(Self::crashed_error()),
            Rendered::Feed(posts) if selector == ITEM_SELECTOR => Ok(posts
                .iter()
                .cloned()
                .map(|p| Box::new(FakeElement::Article(p)) as Box<dyn ElementHandle>)
                .collect()),
            Rendered::Feed(_) => Ok(Vec::new()),
        }
    }
}

enum FakeElement {
    Article(FakePost),
    Label(String),
    Link(String),
}

#[async_trait]
impl ElementHandle for FakeElement {
    async fn query_one(&self, selector: &str) -> Result<Option<Box<dyn ElementHandle>>, PageError> {
        let FakeElement::Article(post) = self else {
            return Ok(None);
        };
        let found = match selector {
            SOCIAL_CONTEXT_SELECTOR => post.social_context.clone().map(FakeElement::Label),
            STATUS_LINK_SELECTOR if post.link_error => {
                return Err(PageError::new(
                    ErrorKind::Other,
                    "Node is detached from document",
                ));
            }
            STATUS_LINK_SELECTOR => post
                .href
                .clone()
                .filter(|h| h.contains("/status/"))
                .map(FakeElement::Link),
            _ => None,
        };
        Ok(found.map(|e| Box::new(e) as Box<dyn ElementHandle>))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, PageError> {
        match self {
            FakeElement::Link(href) if name == "href" => Ok(Some(href.clone())),
            _ => Ok(None),
        }
    }

    async fn inner_text(&self) -> Result<String, PageError> {
        match self {
            FakeElement::Label(text) => Ok(text.clone()),
            _ => Ok(String::new()),
        }
    }
}

// ── Notifier ──────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub(crate) struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<NotificationEvent>>>,
    /// Number of upcoming dispatches that fail.
    pub failing: Arc<Mutex<usize>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<NotificationEvent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_next(&self, n: usize) {
        *self.failing.lock().unwrap() = n;
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn dispatch(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        let mut failing = self.failing.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(NotifyError::Status {
                status: 500,
                body: "boom".to_string(),
            });
        }
        self.sent.lock().unwrap().push(event.clone());
        Ok(())
    }
}
