mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time::Instant;

use coop_registry_core::confirm::ConfirmationTracker;
use coop_registry_core::domain::{TxId, TxStatus};
use coop_registry_core::{
    cancellation, CancelToken, ConfirmationOutcome, ErrorKind, PortError, TrackerConfig,
};

use common::MockLedger;

fn config() -> TrackerConfig {
    TrackerConfig {
        initial_interval: Duration::from_secs(1),
        max_interval: Duration::from_secs(8),
    }
}

const ID: TxId = TxId([0x5a; 32]);

#[tokio::test(start_paused = true)]
async fn confirms_on_first_positive_observation() {
    let ledger = MockLedger::new(vec![]);
    ledger.push_status(Ok(TxStatus::Pending));
    ledger.push_status(Ok(TxStatus::Pending));
    ledger.push_status(Ok(TxStatus::Confirmed {
        block_height: Some(77),
    }));

    let outcome = ConfirmationTracker::new(&ledger, config())
        .await_confirmation(&ID, Duration::from_secs(60), CancelToken::never())
        .await
        .expect("track");
    assert_eq!(
        outcome,
        ConfirmationOutcome::Confirmed {
            block_height: Some(77)
        }
    );
    assert_eq!(ledger.status_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn times_out_at_the_bound() {
    let ledger = MockLedger::new(vec![]);
    let start = Instant::now();

    let outcome = ConfirmationTracker::new(&ledger, config())
        .await_confirmation(&ID, Duration::from_secs(30), CancelToken::never())
        .await
        .expect("track");
    assert_eq!(outcome, ConfirmationOutcome::TimedOut);

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(30));
    assert!(elapsed < Duration::from_secs(31));
}

#[tokio::test(start_paused = true)]
async fn backoff_is_bounded_by_max_interval() {
    let ledger = MockLedger::new(vec![]);

    ConfirmationTracker::new(&ledger, config())
        .await_confirmation(&ID, Duration::from_secs(60), CancelToken::never())
        .await
        .expect("track");
    // Polls at 0, 1, 3, 7, 15, 23, 31, 39, 47, 55.
    assert_eq!(ledger.status_calls.load(Ordering::SeqCst), 10);
}

#[tokio::test(start_paused = true)]
async fn transient_errors_keep_polling() {
    let ledger = MockLedger::new(vec![]);
    ledger.push_status(Err(PortError::Transport("502 bad gateway".to_owned())));
    ledger.push_status(Err(PortError::Timeout("read".to_owned())));
    ledger.push_status(Ok(TxStatus::Confirmed { block_height: None }));

    let outcome = ConfirmationTracker::new(&ledger, config())
        .await_confirmation(&ID, Duration::from_secs(60), CancelToken::never())
        .await
        .expect("track");
    assert_eq!(outcome, ConfirmationOutcome::Confirmed { block_height: None });
}

#[tokio::test(start_paused = true)]
async fn non_transient_error_aborts() {
    let ledger = MockLedger::new(vec![]);
    ledger.push_status(Err(PortError::Policy("project id rejected".to_owned())));

    let err = ConfirmationTracker::new(&ledger, config())
        .await_confirmation(&ID, Duration::from_secs(60), CancelToken::never())
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_polling_within_one_interval() {
    let ledger = MockLedger::new(vec![]);
    let (handle, token) = cancellation();

    let tracker = ConfirmationTracker::new(&ledger, config());
    let wait = tracker.await_confirmation(&ID, Duration::from_secs(600), token);
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        handle.cancel();
    };
    let start = Instant::now();
    let (outcome, ()) = tokio::join!(wait, cancel);
    assert_eq!(outcome.expect("track"), ConfirmationOutcome::Cancelled);
    assert!(start.elapsed() < Duration::from_secs(4));

    let calls = ledger.status_calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(ledger.status_calls.load(Ordering::SeqCst), calls);
}

#[tokio::test(start_paused = true)]
async fn dropped_handle_cancels_tracking() {
    let ledger = MockLedger::new(vec![]);
    let (handle, token) = cancellation();
    drop(handle);

    let outcome = ConfirmationTracker::new(&ledger, config())
        .await_confirmation(&ID, Duration::from_secs(60), token)
        .await
        .expect("track");
    assert_eq!(outcome, ConfirmationOutcome::Cancelled);
    assert_eq!(ledger.status_calls.load(Ordering::SeqCst), 0);
}
