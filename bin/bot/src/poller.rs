//! Long-polling loop.
//!
//! One `getUpdates` call is in flight at a time. Each update is handled on
//! its own task; ordering within a conversation is kept by the
//! orchestrator's per-conversation lock.

use crate::config::PollingConfig;
use crate::handler::Handler;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use visage_telegram::{TelegramClient, Update};

/// Fetches updates and dispatches them to the handler.
pub struct Poller {
    client: TelegramClient,
    handler: Arc<Handler>,
    config: PollingConfig,
}

impl Poller {
    /// Creates a poller.
    pub fn new(client: TelegramClient, handler: Arc<Handler>, config: PollingConfig) -> Self {
        Self {
            client,
            handler,
            config,
        }
    }

    /// Polls until `shutdown` resolves, then waits for in-flight handlers.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut offset = None;
        let mut tasks = JoinSet::new();
        let error_pause = Duration::from_secs(self.config.error_pause_seconds);

        info!(
            timeout_seconds = self.config.timeout_seconds,
            "polling for updates"
        );
        loop {
            let fetched = tokio::select! {
                () = &mut shutdown => break,
                fetched = self.client.get_updates(offset, self.config.timeout_seconds) => fetched,
            };

            match fetched {
                Ok(updates) => {
                    if !updates.is_empty() {
                        debug!(count = updates.len(), "received updates");
                    }
                    offset = next_offset(offset, &updates);
                    for update in updates {
                        let handler = Arc::clone(&self.handler);
                        tasks.spawn(async move { handler.handle(update).await });
                    }
                }
                Err(e) => {
                    warn!(error = %e, pause_seconds = error_pause.as_secs(), "getUpdates failed");
                    tokio::select! {
                        () = &mut shutdown => break,
                        () = tokio::time::sleep(error_pause) => {}
                    }
                }
            }

            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    error!(error = %e, "update handler panicked");
                }
            }
        }

        info!(in_flight = tasks.len(), "polling stopped, waiting for handlers");
        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                error!(error = %e, "update handler panicked");
            }
        }
    }
}

/// Offset that acknowledges every update in `updates`.
fn next_offset(current: Option<i64>, updates: &[Update]) -> Option<i64> {
    updates
        .iter()
        .map(|update| update.update_id + 1)
        .max()
        .max(current)
}

/// Resolves on ctrl-c or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(update_id: i64) -> Update {
        Update {
            update_id,
            message: None,
        }
    }

    #[test]
    fn offset_moves_past_last_update() {
        assert_eq!(next_offset(None, &[update(10), update(11)]), Some(12));
    }

    #[test]
    fn empty_batch_keeps_offset() {
        assert_eq!(next_offset(Some(12), &[]), Some(12));
        assert_eq!(next_offset(None, &[]), None);
    }

    #[test]
    fn offset_never_moves_backwards() {
        assert_eq!(next_offset(Some(50), &[update(3)]), Some(50));
    }
}
