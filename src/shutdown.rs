use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Cancel the returned token on the first SIGINT or SIGTERM.
///
/// Monitors check the token between and during polls and hand back the
/// job split they had reached. Signal registration happens before this
/// returns, so a failure surfaces here instead of inside the spawned task.
pub fn install_shutdown_handler() -> std::io::Result<CancellationToken> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, stopping job monitoring");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, stopping job monitoring");
            }
        }
        trigger.cancel();
    });

    Ok(token)
}
