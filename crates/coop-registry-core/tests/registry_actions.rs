mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use coop_registry_core::codec::ToPlutusData;
use coop_registry_core::domain::{
    Member, MemberStatus, OutputRef, RegistryAction, RegistryState, SubmissionStatus, TimestampMs,
    TxId, TxStatus, UnspentOutput, Value,
};
use coop_registry_core::tx::RedeemerTag;
use coop_registry_core::{
    cancellation, CancelToken, CapabilityAdapter, ConfirmationOutcome, ErrorKind, RegistryClient,
    RegistryCommand, TrackerConfig, TxBuilder,
};

use common::{
    founder_address, founder_key, member_key, utxo, validator, MockLedger, MockWallet, TestClock,
};

fn registry_ref() -> OutputRef {
    OutputRef::new(TxId([0x77; 32]), 0)
}

fn genesis() -> RegistryState {
    RegistryState::genesis("Coop A", "desc", TimestampMs(1_000), founder_key())
}

fn registry_utxo(state: &RegistryState) -> UnspentOutput {
    let mut value = Value::lovelace(1_500_000);
    value.assets.insert(validator().registry_token(), 1);
    UnspentOutput {
        reference: registry_ref(),
        address: validator().address,
        value,
        inline_datum: Some(state.to_plutus_data()),
    }
}

fn member(seed: u8) -> Member {
    Member {
        name: format!("member-{seed}"),
        verification_key_hash: member_key(seed),
        join_time: TimestampMs(2_000),
        status: MemberStatus::Active,
    }
}

fn funded_wallet() -> MockWallet {
    MockWallet::with_utxos(vec![
        utxo(1, 0, &founder_address(), 8_000_000),
        utxo(2, 1, &founder_address(), 5_000_000),
    ])
}

#[tokio::test]
async fn add_member_spends_and_recreates_registry() {
    let ledger = MockLedger::new(vec![registry_utxo(&genesis())]);
    let adapter = CapabilityAdapter::new(funded_wallet(), ledger);
    let clock = TestClock::default();
    let validator = validator();

    let tx = TxBuilder::new(&adapter, &clock, &validator)
        .build_action_tx(
            &founder_address(),
            registry_ref(),
            RegistryAction::AddMember { member: member(0x31) },
        )
        .await
        .expect("build");

    assert!(tx.body.inputs.contains(&registry_ref()));
    assert_eq!(tx.body.required_signers, vec![founder_key()]);
    let redeemer = &tx.redeemers[0];
    assert_eq!(redeemer.tag, RedeemerTag::Spend);
    assert_eq!(
        tx.body.inputs[redeemer.index as usize],
        registry_ref(),
        "spend redeemer points at the registry input"
    );

    assert!(tx.body.mint.is_empty());
    assert_eq!(tx.body.reference_inputs, vec![validator.reference_script.expect("script")]);

    let output = tx.registry_output().expect("registry output");
    assert_eq!(output.address, validator.address);
    assert!(output.value.lovelace >= 1_500_000);
    assert_eq!(output.value.assets.get(&validator.registry_token()), Some(&1));
    assert_eq!(tx.state.members.len(), 1);
    assert_eq!(tx.state.entity.member_count, 1);
    assert_eq!(output.datum, Some(tx.state.to_plutus_data()));
}

#[tokio::test]
async fn registry_output_is_topped_up_when_datum_grows() {
    let mut state = genesis();
    let mut registry = registry_utxo(&state);
    for seed in 0x40..0x50 {
        state = state
            .apply(&RegistryAction::AddMember { member: member(seed) })
            .expect("apply");
    }
    registry.inline_datum = Some(state.to_plutus_data());
    registry.value.lovelace = 1_000_000;

    let adapter = CapabilityAdapter::new(funded_wallet(), MockLedger::new(vec![registry]));
    let clock = TestClock::default();
    let validator = validator();
    let tx = TxBuilder::new(&adapter, &clock, &validator)
        .build_action_tx(
            &founder_address(),
            registry_ref(),
            RegistryAction::AddMember { member: member(0x60) },
        )
        .await
        .expect("build");
    let output = tx.registry_output().expect("registry output");
    let minimum = output.min_lovelace(4_310).expect("minimum");
    assert_eq!(output.value.lovelace, minimum);
    assert!(minimum > 1_000_000);
}

#[tokio::test]
async fn impossible_projections_are_invalid_actions() {
    let state = genesis()
        .apply(&RegistryAction::AddMember { member: member(0x31) })
        .expect("apply");
    let cases = vec![
        RegistryAction::AddMember { member: member(0x31) },
        RegistryAction::UpdateMemberStatus {
            key: member_key(0x99),
            status: MemberStatus::Suspended,
        },
        RegistryAction::AddAdmin { key: founder_key() },
        RegistryAction::RemoveAdmin { key: member_key(0x31) },
        RegistryAction::RemoveAdmin { key: founder_key() },
        RegistryAction::CreateEntity {
            name: "again".to_owned(),
            description: String::new(),
        },
    ];
    for action in cases {
        let adapter = CapabilityAdapter::new(
            funded_wallet(),
            MockLedger::new(vec![registry_utxo(&state)]),
        );
        let clock = TestClock::default();
        let validator = validator();
        let label = action.label();
        let err = TxBuilder::new(&adapter, &clock, &validator)
            .build_action_tx(&founder_address(), registry_ref(), action)
            .await
            .expect_err(label);
        assert_eq!(err.kind(), ErrorKind::InvalidAction, "{label}");
        assert_eq!(adapter.wallet().sign_count(), 0);
    }
}

#[tokio::test]
async fn missing_registry_output_is_invalid_action() {
    let adapter = CapabilityAdapter::new(funded_wallet(), MockLedger::new(vec![]));
    let clock = TestClock::default();
    let validator = validator();
    let err = TxBuilder::new(&adapter, &clock, &validator)
        .build_action_tx(
            &founder_address(),
            registry_ref(),
            RegistryAction::AddAdmin { key: member_key(0x31) },
        )
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::InvalidAction);
}

#[tokio::test]
async fn foreign_datum_is_an_encoding_error() {
    let mut registry = registry_utxo(&genesis());
    registry.inline_datum = Some(coop_registry_core::PlutusData::Integer(5));
    let adapter = CapabilityAdapter::new(funded_wallet(), MockLedger::new(vec![registry]));
    let clock = TestClock::default();
    let validator = validator();
    let err = TxBuilder::new(&adapter, &clock, &validator)
        .build_action_tx(
            &founder_address(),
            registry_ref(),
            RegistryAction::AddAdmin { key: member_key(0x31) },
        )
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::EncodingError);
}

#[tokio::test(start_paused = true)]
async fn client_runs_command_through_confirmation() {
    let ledger = MockLedger::new(vec![registry_utxo(&genesis())]);
    ledger.push_status(Ok(TxStatus::Pending));
    ledger.push_status(Ok(TxStatus::Confirmed {
        block_height: Some(12),
    }));
    let client = RegistryClient::new(funded_wallet(), ledger, TestClock::default(), validator())
        .with_tracker_config(TrackerConfig {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(4),
        });

    let result = client
        .handle_and_confirm(
            RegistryCommand::AddAdmin {
                signer: founder_address(),
                registry: registry_ref(),
                key: member_key(0x31),
            },
            Duration::from_secs(60),
            CancelToken::never(),
        )
        .await
        .expect("confirmed");
    assert_eq!(result.submission.status, SubmissionStatus::Confirmed);
    assert_eq!(result.registry.tx_id, result.submission.id);
    assert!(result.state.admins.contains(&member_key(0x31)));
}

#[tokio::test(start_paused = true)]
async fn client_timeout_surfaces_as_timed_out() {
    let ledger = MockLedger::new(vec![]);
    let client = RegistryClient::new(funded_wallet(), ledger, TestClock::default(), validator());

    let mut result = client
        .handle(RegistryCommand::CreateEntity {
            founder: founder_address(),
            name: "Coop A".to_owned(),
            description: "desc".to_owned(),
        })
        .await
        .expect("submitted");
    assert_eq!(result.submission.status, SubmissionStatus::Submitted);

    let (outcome, transition) = client
        .await_confirmation(
            &mut result.submission,
            Duration::from_secs(10),
            CancelToken::never(),
        )
        .await
        .expect("track");
    assert_eq!(outcome, ConfirmationOutcome::TimedOut);
    assert_eq!(result.submission.status, SubmissionStatus::TimedOut);
    assert_eq!(transition.expect("transition").reason, "deadline_elapsed");
    assert!(ErrorKind::TimedOut.is_retryable());
}

#[tokio::test]
async fn cancelled_wait_is_not_reported_as_confirmed() {
    let ledger = MockLedger::new(vec![]);
    ledger.push_status(Ok(TxStatus::Confirmed {
        block_height: Some(3),
    }));
    let client = RegistryClient::new(funded_wallet(), ledger, TestClock::default(), validator());
    let (handle, token) = cancellation();
    drop(handle);

    let result = client
        .handle_and_confirm(
            RegistryCommand::CreateEntity {
                founder: founder_address(),
                name: "Coop A".to_owned(),
                description: "desc".to_owned(),
            },
            Duration::from_secs(60),
            token,
        )
        .await
        .expect("submitted");
    assert_eq!(result.outcome, Some(ConfirmationOutcome::Cancelled));
    assert_eq!(result.submission.status, SubmissionStatus::Submitted);
}

#[tokio::test]
async fn clock_failure_stops_before_submission() {
    let ledger = MockLedger::new(vec![]);
    let adapter = CapabilityAdapter::new(funded_wallet(), ledger);
    let clock = TestClock::default();
    let validator = validator();
    let tx = TxBuilder::new(&adapter, &clock, &validator)
        .build_create_entity_tx(&founder_address(), "Coop A", "desc")
        .await
        .expect("build");

    let client = RegistryClient::new(
        funded_wallet(),
        MockLedger::new(vec![]),
        TestClock::broken(),
        validator.clone(),
    );
    let err = client.submit(&tx).await.expect_err("must fail");
    assert!(err.is_retryable());
    assert_eq!(client.capability().ledger().submissions(), 0);
    assert_eq!(client.capability().wallet().sign_count(), 0);
}

#[tokio::test]
async fn script_spend_without_reference_script_is_a_configuration_error() {
    let ledger = MockLedger::new(vec![registry_utxo(&genesis())]);
    let adapter = CapabilityAdapter::new(funded_wallet(), ledger);
    let clock = TestClock::default();
    let mut validator = validator();
    validator.reference_script = None;

    let err = TxBuilder::new(&adapter, &clock, &validator)
        .build_action_tx(
            &founder_address(),
            registry_ref(),
            RegistryAction::AddAdmin {
                key: member_key(0x31),
            },
        )
        .await
        .expect_err("must fail");
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(adapter.ledger().utxo_queries.load(Ordering::SeqCst), 0);
}
