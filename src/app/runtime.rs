use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancel `token` on SIGTERM or Ctrl+C
pub(super) fn setup_signal_handlers(token: CancellationToken) {
    // Handle SIGTERM (systemd stop) - Unix only
    #[cfg(unix)]
    {
        let sigterm_token = token.clone();
        tokio::spawn(async move {
            let mut sigterm =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(signal) => signal,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

            tokio::select! {
                Some(()) = sigterm.recv() => {
                    info!("Received SIGTERM signal");
                    request_stop(&sigterm_token, "SIGTERM");
                }
                _ = sigterm_token.cancelled() => {}
            }
        });
    }

    // Handle SIGINT (Ctrl+C) - Cross-platform
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    info!("Received SIGINT signal (Ctrl+C)");
                    request_stop(&token, "SIGINT");
                }
            }
            _ = token.cancelled() => {}
        }
    });
}

fn request_stop(token: &CancellationToken, signal: &str) {
    if !token.is_cancelled() {
        info!("Shutdown initiated by {}", signal);
        token.cancel();
    }
}
