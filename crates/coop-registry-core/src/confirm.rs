//! Bounded, cancellable confirmation polling.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::domain::{TxId, TxStatus};
use crate::error::{classify, ErrorKind, Phase, RegistryError};
use crate::ports::LedgerPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Confirmed { block_height: Option<u64> },
    /// Outcome unknown: the transaction may still land.
    TimedOut,
    Cancelled,
}

/// Creates a linked cancel handle and token.
pub fn cancellation() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx: Some(rx) })
}

/// Dropping the handle cancels every linked token.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelToken {
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.rx {
            Some(rx) => *rx.borrow() || rx.has_changed().is_err(),
            None => false,
        }
    }

    /// Resolves once the handle cancels or is dropped.
    pub async fn cancelled(&mut self) {
        let Some(rx) = self.rx.as_mut() else {
            return std::future::pending().await;
        };
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub struct ConfirmationTracker<'a, L> {
    ledger: &'a L,
    config: TrackerConfig,
}

impl<'a, L: LedgerPort> ConfirmationTracker<'a, L> {
    pub fn new(ledger: &'a L, config: TrackerConfig) -> Self {
        Self { ledger, config }
    }

    /// Polls until the ledger reports `id`, the deadline passes, or `cancel`
    /// fires. An in-flight query is dropped when either of the latter wins.
    pub async fn await_confirmation(
        &self,
        id: &TxId,
        timeout: Duration,
        mut cancel: CancelToken,
    ) -> Result<ConfirmationOutcome, RegistryError> {
        let deadline = Instant::now() + timeout;
        let mut interval = self.config.initial_interval;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(tx_id = %id, attempt, "confirmation tracking cancelled");
                    return Ok(ConfirmationOutcome::Cancelled);
                }
                _ = sleep_until(deadline) => {
                    warn!(tx_id = %id, attempt, ?timeout, "confirmation timed out");
                    return Ok(ConfirmationOutcome::TimedOut);
                }
                status = self.ledger.tx_status(id) => status,
            };

            match status {
                Ok(TxStatus::Confirmed { block_height }) => {
                    info!(tx_id = %id, attempt, ?block_height, "transaction confirmed");
                    return Ok(ConfirmationOutcome::Confirmed { block_height });
                }
                Ok(TxStatus::Pending) => debug!(tx_id = %id, attempt, "transaction pending"),
                Err(e) => {
                    let err = classify(Phase::Query, e);
                    if err.kind() != ErrorKind::NetworkError {
                        return Err(err);
                    }
                    warn!(tx_id = %id, attempt, error = %err, "status query failed, will retry");
                }
            }

            let wake = (Instant::now() + interval).min(deadline);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(tx_id = %id, attempt, "confirmation tracking cancelled");
                    return Ok(ConfirmationOutcome::Cancelled);
                }
                _ = sleep_until(wake) => {}
            }
            interval = (interval * 2).min(self.config.max_interval);
        }
    }
}
