use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::core::state::AppState;
use crate::tasks::expiry;

const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handles = vec![tokio::spawn(expire_idle_loop(state.clone(), shutdown_rx.clone()))];
    tracing::info!(
        sweep_interval_secs = EXPIRY_SWEEP_INTERVAL.as_secs(),
        "Tutor worker started"
    );

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn expire_idle_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(EXPIRY_SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = expiry::expire_idle_sessions(&state).await {
                    tracing::error!(error = %err, "expire_idle_sessions failed");
                }
            }
        }
    }
}
