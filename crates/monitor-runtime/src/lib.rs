//! Runtime layer for the X monitor.
//!
//! Drives the poll loop: keeps a rendering session alive, extracts the newest
//! post from the target's page, and notifies and persists on change.

pub mod extractor;
pub mod jitter;
pub mod poll_loop;
pub mod session_supervisor;

#[cfg(test)]
pub(crate) mod fakes;

pub use monitor_core as core;
