//! Periodic user-count log.
//!
//! Read-only and independent of the request path. Stops when the shutdown
//! token is cancelled, including while a count query is in flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::db::AccountRepository;

/// Spawn the task that logs the number of stored accounts every `every`.
///
/// A failed count is logged and the task carries on with the next tick.
pub fn spawn_user_count_logger(
    repo: Arc<dyn AccountRepository>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                result = repo.count() => match result {
                    Ok(users) => info!(users, "user count"),
                    Err(e) => error!(error = %e, "user count failed"),
                },
            }
        }

        info!("user count logger stopped");
    })
}
