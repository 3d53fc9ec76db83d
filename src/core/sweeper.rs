//! Expiry sweeper - Polls for steals whose defend window has closed.
//!
//! Expiry has no external trigger, so a fixed-interval loop drives
//! [`StealEngine::sweep_expired`] until shutdown.

use crate::core::{
    steal::StealEngine,
    traits::{Clock, Notifier, Roller, SkillStore},
};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Sweeps every `period` until `shutdown` resolves.
pub async fn run_sweeper<S, N, C, R>(
    engine: StealEngine<S, N, C, R>,
    period: Duration,
    shutdown: impl Future<Output = ()>,
) where
    S: SkillStore,
    N: Notifier,
    C: Clock,
    R: Roller,
{
    let mut tick = tokio::time::interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(period_secs = period.as_secs(), "Expiry sweeper started");
    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Expiry sweeper stopping");
                break;
            }
            _ = tick.tick() => {
                if let Err(e) = engine.sweep_expired().await {
                    error!(error = %e, "Expiry sweep failed");
                }
            }
        }
    }
}

/// Resolves when the process receives a shutdown signal (SIGINT or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}
