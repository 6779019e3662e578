//! # Stop requests from the operating system.
//!
//! [`wait_for_shutdown_signal`] completes on the first termination signal:
//! `SIGINT`, `SIGTERM` or `SIGQUIT` on Unix, Ctrl-C elsewhere. Children run in
//! their own process groups, so these reach only the supervisor, which then
//! cancels the whole group itself.

/// Completes when a termination signal arrives; errors if handlers cannot be installed.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Completes when Ctrl-C is pressed; errors if the handler cannot be installed.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
