use super::{Session, StopReason};
use tokio::signal;
use tracing::{info, warn};

impl Session {
    /// Cancel the session on SIGINT (Ctrl+C) or SIGTERM
    pub fn install_signal_handlers(&self) {
        // Handle SIGTERM (systemd stop) - Unix only
        #[cfg(unix)]
        {
            let token = self.cancellation_token.clone();
            let stop_signal = std::sync::Arc::clone(&self.stop_signal);
            tokio::spawn(async move {
                let mut sigterm =
                    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                        Ok(sigterm) => sigterm,
                        Err(e) => {
                            warn!("Failed to register SIGTERM handler: {}", e);
                            return;
                        }
                    };
                if let Some(()) = sigterm.recv().await {
                    info!("Received SIGTERM signal");
                    stop_signal
                        .lock()
                        .await
                        .get_or_insert(StopReason::Signal("SIGTERM".to_string()));
                    token.cancel();
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let token = self.cancellation_token.clone();
        let stop_signal = std::sync::Arc::clone(&self.stop_signal);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                stop_signal
                    .lock()
                    .await
                    .get_or_insert(StopReason::Signal("SIGINT".to_string()));
                token.cancel();
            }
        });
    }
}
