//! Periodic cycle driver.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::process::UpdateProcess;
use crate::sink::NotificationSink;

/// Spawn the background loop that runs one cycle immediately and then one
/// every `interval`, until `shutdown_tx` flips to `true`.
///
/// Failed cycles and failed deliveries are logged, never fatal; the next
/// tick starts from scratch.
pub fn spawn_update_driver(
    process: Arc<UpdateProcess>,
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
    shutdown_tx: &watch::Sender<bool>,
) -> JoinHandle<()> {
    let mut rx = shutdown_tx.subscribe();
    tokio::spawn(async move {
        loop {
            let probe = process.probe().await;
            if !probe.reachable {
                warn!("remote unreachable, skipping this cycle");
            } else {
                if !probe.authenticated {
                    warn!("session no longer authenticated, the roster may come back empty");
                }
                match process.run_cycle().await {
                    Ok(report) => {
                        if !report.records.is_empty() {
                            if let Err(err) = sink.deliver(&report.records).await {
                                warn!(?err, "record delivery failed");
                            }
                        }
                    }
                    Err(err) => warn!(?err, "reconciliation cycle failed"),
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = rx.changed() => {
                    if changed.is_ok() && *rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("update driver stopped");
    })
}
