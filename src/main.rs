//! murmur daemon.
//!
//! Runs the voice-capture pipeline headless. SIGUSR1 toggles recording
//! (the hotkey mechanism lives outside this process); SIGTERM or Ctrl-C
//! shuts down, stopping an in-flight recording best-effort first.

use anyhow::Result;
use tokio::sync::broadcast;

use murmur::app::App;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = App::new().map_err(anyhow::Error::msg)?;
    log::info!("murmur {} starting", env!("CARGO_PKG_VERSION"));

    // Stand-in for the presentation layer: surface lifecycle events in the
    // log. The handle is kept so shutdown can drop the task deterministically.
    let mut events = app.subscribe_events();
    let event_logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log::info!("event: {}", event.name()),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("event receiver lagged by {}", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut toggle = signal(SignalKind::user_defined1())?;
        let mut terminate = signal(SignalKind::terminate())?;
        log::info!("send SIGUSR1 to toggle recording, SIGTERM or Ctrl-C to quit");

        loop {
            tokio::select! {
                _ = toggle.recv() => {
                    let status = app.toggle_recording().await;
                    log::info!("toggle: {}", status);
                }
                _ = terminate.recv() => {
                    log::info!("received SIGTERM");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    log::info!("received Ctrl-C");
                    break;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        log::info!("press Ctrl-C to quit");
        tokio::signal::ctrl_c().await?;
    }

    app.shutdown().await;
    event_logger.abort();
    log::info!("murmur stopped");
    Ok(())
}
