//! One-time interactive login.
//!
//! Opens a visible browser on the login page with the durable profile
//! directory. Once the user has signed in and confirms, the browser is closed
//! so the session is flushed to disk for later headless runs.

use std::future::Future;

use monitor_core::{LaunchOptions, SessionLauncher, Target, WaitUntil};
use tokio::io::{AsyncBufReadExt, BufReader};

const INSTRUCTIONS: &str = "\
============================================================
1. Log into your X account in the browser window
2. Complete any 2FA or verification steps
3. Wait until you see your home feed
4. Press ENTER in this terminal to save the session
============================================================";

pub async fn run_setup<F>(
    launcher: &dyn SessionLauncher,
    options: LaunchOptions,
    target: &Target,
    confirm: F,
) -> anyhow::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let options = options.headless(false);
    tracing::info!(profile = %options.profile_dir.display(), "starting session setup");

    let session = launcher.launch(&options).await?;

    let login = target.login_url();
    tracing::info!(url = %login, "navigating to login page");
    let visited = session.page().goto(&login, WaitUntil::Load).await;
    if let Err(e) = visited {
        let _ = session.close().await;
        return Err(e.into());
    }

    println!("\n{INSTRUCTIONS}\n");
    let confirmed = confirm.await;

    tracing::info!("saving session");
    session.close().await?;
    confirmed?;

    tracing::info!(profile = %options.profile_dir.display(), "session saved; run `x-monitor` to start watching");
    Ok(())
}

/// Resolve once a line is read from stdin.
pub async fn wait_for_enter() -> std::io::Result<()> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(())
}
