use serde::{Deserialize, Serialize};

/// Default site root for profile and post URLs.
pub const DEFAULT_BASE_URL: &str = "https://x.com";

/// The single account being watched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Account handle without the leading `@`.
    pub account: String,
    /// Site root, e.g. `https://x.com` (no trailing slash).
    pub base_url: String,
}

impl Target {
    pub fn new(account: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            account: account.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The account's public page, reloaded every cycle.
    pub fn profile_url(&self) -> String {
        format!("{}/{}", self.base_url, self.account)
    }

    /// Public URL of a single post on this account.
    pub fn post_url(&self, id: &str) -> String {
        format!("{}/status/{}", self.profile_url(), id)
    }

    /// Login page used by the one-time session setup.
    pub fn login_url(&self) -> String {
        format!("{}/login", self.base_url)
    }
}

/// A post discovered on the rendered feed.
///
/// Built per extraction and never persisted beyond its `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Numeric post identifier, kept as a string.
    pub id: String,
    /// The `href` the identifier was parsed from.
    pub url: String,
    /// Whether the author pinned this post to the top of the feed.
    pub pinned: bool,
}

/// Payload handed to the notification transport for one detected change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Click-through URL of the new post.
    pub url: String,
    /// Account that published it.
    pub account_name: String,
}

impl NotificationEvent {
    pub fn new(url: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            account_name: account_name.into(),
        }
    }
}
