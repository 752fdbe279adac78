//! Newest-post extraction from a rendered profile page.
//!
//! The feed is scanned top to bottom. Pinned posts are skipped, and the first
//! remaining post whose status link carries a numeric id wins.

use std::sync::OnceLock;
use std::time::Duration;

use monitor_core::models::DEFAULT_BASE_URL;
use monitor_core::{ElementHandle, Item, PageController, PageError};
use regex::Regex;
use tracing::Instrument;

/// One post container in the timeline.
pub const ITEM_SELECTOR: &str = r#"article[data-testid="tweet"]"#;
/// Label above a post ("Pinned", "Reposted", ...).
pub const SOCIAL_CONTEXT_SELECTOR: &str = r#"[data-testid="socialContext"]"#;
/// Permalink of a post.
pub const STATUS_LINK_SELECTOR: &str = r#"a[href*="/status/"]"#;

const PINNED_MARKER: &str = "Pinned";

/// How long to wait for the first post container to render.
pub const DEFAULT_ITEM_WAIT: Duration = Duration::from_secs(10);

// ── Extraction ────────────────────────────────────────────────────────────────

/// Result of scanning one rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The newest non-pinned post.
    Found(Item),
    /// Posts rendered, but none yielded an id.
    NotFound,
    /// The page misbehaved (nothing rendered in time, a query failed) while
    /// the session itself stayed usable.
    TransientError(PageError),
}

impl Extraction {
    pub fn id(&self) -> Option<&str> {
        match self {
            Extraction::Found(item) => Some(&item.id),
            _ => None,
        }
    }
}

// ── ItemExtractor ─────────────────────────────────────────────────────────────

pub struct ItemExtractor {
    wait_timeout: Duration,
    /// Site root that relative permalinks are resolved against.
    base_url: String,
}

impl ItemExtractor {
    pub fn new(wait_timeout: Duration) -> Self {
        Self {
            wait_timeout,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Scan `page` for the newest non-pinned post.
    ///
    /// Only a dead session is returned as `Err`; every other failure is folded
    /// into [`Extraction::TransientError`] so the caller treats it as "no
    /// change".
    pub async fn extract_latest(&self, page: &dyn PageController) -> Result<Extraction, PageError> {
        self.scan(page).instrument(tracing::info_span!("extractor")).await
    }

    async fn scan(&self, page: &dyn PageController) -> Result<Extraction, PageError> {
        if let Err(e) = page.wait_for_selector(ITEM_SELECTOR, self.wait_timeout).await {
            tracing::warn!(error = %e, "no posts rendered in time");
            return soft(e);
        }

        let containers = match page.query_all(ITEM_SELECTOR).await {
            Ok(c) => c,
            Err(e) => return soft(e),
        };

        for (index, container) in containers.iter().enumerate() {
            match inspect(container.as_ref()).await {
                Ok(Container::Pinned) => {
                    tracing::debug!(index, "skipping pinned post");
                }
                Ok(Container::Unlinked) => {}
                Ok(Container::Post(link)) => {
                    tracing::debug!(index, id = %link.id, "found post id");
                    return Ok(Extraction::Found(Item {
                        url: self.permalink(&link.href),
                        id: link.id,
                        pinned: false,
                    }));
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "failed to inspect post");
                    return soft(e);
                }
            }
        }

        tracing::warn!(containers = containers.len(), "no non-pinned posts found");
        Ok(Extraction::NotFound)
    }

    /// Absolute form of a permalink `href`.
    fn permalink(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{}", self.base_url, href)
        } else {
            format!("{}/{}", self.base_url, href)
        }
    }
}

impl Default for ItemExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_ITEM_WAIT)
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Dead sessions propagate; anything else becomes a soft failure.
fn soft(e: PageError) -> Result<Extraction, PageError> {
    if e.is_session_closed() {
        Err(e)
    } else {
        Ok(Extraction::TransientError(e))
    }
}

/// What one timeline container turned out to be.
enum Container {
    /// Carries the pinned label; its link is never looked at.
    Pinned,
    /// No status link with a numeric id.
    Unlinked,
    Post(StatusLink),
}

struct StatusLink {
    id: String,
    href: String,
}

/// Classify one container. The pinned label is checked before the link.
async fn inspect(container: &dyn ElementHandle) -> Result<Container, PageError> {
    if let Some(label) = container.query_one(SOCIAL_CONTEXT_SELECTOR).await? {
        if label.inner_text().await?.contains(PINNED_MARKER) {
            return Ok(Container::Pinned);
        }
    }

    let Some(link) = container.query_one(STATUS_LINK_SELECTOR).await? else {
        return Ok(Container::Unlinked);
    };
    let Some(href) = link.attribute("href").await? else {
        return Ok(Container::Unlinked);
    };

    Ok(match status_id(&href) {
        Some(id) => Container::Post(StatusLink { id, href }),
        None => Container::Unlinked,
    })
}

/// Numeric id from a permalink such as `/someone/status/1234567890`.
pub fn status_id(href: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/status/(\d+)").expect("static regex"))
        .captures(href)
        .map(|caps| caps[1].to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
