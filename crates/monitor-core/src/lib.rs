//! Core types for the X account monitor.
//!
//! Holds the data model, the error taxonomy, the page-controller contract the
//! runtime drives, the last-seen state store, the push notifier and the
//! configuration surface.

pub mod error;
pub mod models;
pub mod notifications;
pub mod page;
pub mod settings;
pub mod state_store;

pub use error::{MonitorError, Result};
pub use models::{Item, NotificationEvent, Target};
pub use page::{
    BrowserSession, ElementHandle, ErrorKind, LaunchOptions, PageController, PageError,
    SessionLauncher, WaitUntil,
};
