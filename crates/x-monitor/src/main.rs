mod bootstrap;
mod setup;

use anyhow::Result;
use monitor_browser::ChromeLauncher;
use monitor_core::notifications::NtfyNotifier;
use monitor_core::settings::{Command, Settings};
use monitor_core::state_store::StateStore;
use monitor_core::LaunchOptions;
use monitor_runtime::jitter::Jitter;
use monitor_runtime::poll_loop::PollLoop;
use monitor_runtime::session_supervisor::SessionSupervisor;
use tokio_util::sync::CancellationToken;

// A single worker: one poll cycle in flight, suspension only at I/O awaits.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::ensure_directories(&settings)?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;
    settings.validate()?;

    tracing::info!("X Monitor v{} starting", env!("CARGO_PKG_VERSION"));

    match settings.selected_command() {
        Command::Run => run_monitor(&settings).await,
        Command::Setup => {
            setup::run_setup(
                &ChromeLauncher::new(),
                launch_options(&settings),
                &settings.target(),
                setup::wait_for_enter(),
            )
            .await
        }
        Command::TestNotify => {
            let notifier = NtfyNotifier::new(&settings.ntfy_server, &settings.ntfy_topic)?;
            notifier.send_test().await?;
            println!("Test notification sent to {}", notifier.endpoint());
            Ok(())
        }
    }
}

fn launch_options(settings: &Settings) -> LaunchOptions {
    LaunchOptions::new(settings.session_dir())
        .headless(settings.headless)
        .default_timeout(settings.browser_timeout())
}

async fn run_monitor(settings: &Settings) -> Result<()> {
    tracing::info!(
        "Target: @{}, interval: {}-{}s, headless: {}",
        settings.target_username,
        settings.poll_interval_min,
        settings.poll_interval_max,
        settings.headless
    );

    let notifier = NtfyNotifier::new(&settings.ntfy_server, &settings.ntfy_topic)?;
    let supervisor =
        SessionSupervisor::new(Box::new(ChromeLauncher::new()), launch_options(settings));
    let jitter = Jitter::new(settings.poll_interval_min(), settings.poll_interval_max())?;

    let poll = PollLoop::new(
        settings.target(),
        supervisor,
        Box::new(notifier),
        StateStore::new(settings.last_seen_file()),
        jitter,
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received; stopping after the current cycle");
            on_signal.cancel();
        }
    });

    poll.run(cancel).await?;
    Ok(())
}
