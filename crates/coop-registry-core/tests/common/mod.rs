#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use minicbor::Encoder;

use coop_registry_core::domain::{
    Address, AssetUnit, BalanceEntry, Credential, KeyHash, Network, OutputRef, PlutusVersion,
    ProtocolParams, ScriptHash, TxId, TxStatus, UnspentOutput, ValidatorRef, Value,
};
use coop_registry_core::tx::decode_tx_effects;
use coop_registry_core::{ClockPort, LedgerPort, PortError, WalletPort};

pub const NOW_MS: u64 = 1_739_750_400_000;

#[derive(Debug, Default)]
pub struct TestClock {
    now: AtomicU64,
    broken: bool,
}

impl TestClock {
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        if self.broken {
            return Err(PortError::Transport("clock unavailable".to_owned()));
        }
        Ok(self.now.fetch_add(1, Ordering::SeqCst) + NOW_MS)
    }
}

pub fn founder_key() -> KeyHash {
    KeyHash([0x11; 28])
}

pub fn member_key(seed: u8) -> KeyHash {
    KeyHash([seed; 28])
}

pub fn key_address(key: KeyHash) -> Address {
    Address::new(Network::Preview, Credential::Key(key), None)
}

pub fn founder_address() -> Address {
    key_address(founder_key())
}

pub fn validator() -> ValidatorRef {
    let script_hash = ScriptHash([0xcc; 28]);
    ValidatorRef {
        script_hash,
        address: Address::new(Network::Preview, Credential::Script(script_hash), None),
        plutus_version: PlutusVersion::V2,
        reference_script: Some(OutputRef::new(TxId([0xee; 32]), 0)),
    }
}

pub fn utxo(seed: u8, index: u32, address: &Address, lovelace: u64) -> UnspentOutput {
    UnspentOutput {
        reference: OutputRef::new(TxId([seed; 32]), index),
        address: address.clone(),
        value: Value::lovelace(lovelace),
        inline_datum: None,
    }
}

/// `{0: [[vkey, signature]]}` with dummy key material.
pub fn witness_set() -> Vec<u8> {
    let mut e = Encoder::new(Vec::new());
    e.map(1)
        .and_then(|e| e.u8(0))
        .and_then(|e| e.array(1))
        .and_then(|e| e.array(2))
        .and_then(|e| e.bytes(&[7u8; 32]))
        .and_then(|e| e.bytes(&[9u8; 64]))
        .expect("encode witness set");
    e.into_writer()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignBehaviour {
    Witness,
    Unsupported,
    Declined,
    Rejected,
}

/// Wallet whose optional capabilities are switched off by leaving them `None`.
pub struct MockWallet {
    pub lovelace: Option<u64>,
    pub listing: Option<Vec<BalanceEntry>>,
    pub assets: Option<Vec<(AssetUnit, u64)>>,
    pub utxos: Option<Vec<UnspentOutput>>,
    pub used: Option<Vec<Address>>,
    pub change: Option<Address>,
    pub partial_sign: SignBehaviour,
    pub full_sign: SignBehaviour,
    pub sign_delay: Duration,
    pub sign_calls: Mutex<Vec<bool>>,
    pub reads: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockWallet {
    /// Supports only the methods a wallet must implement.
    pub fn minimal() -> Self {
        Self {
            lovelace: None,
            listing: None,
            assets: None,
            utxos: None,
            used: None,
            change: None,
            partial_sign: SignBehaviour::Witness,
            full_sign: SignBehaviour::Witness,
            sign_delay: Duration::ZERO,
            sign_calls: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_utxos(utxos: Vec<UnspentOutput>) -> Self {
        Self {
            utxos: Some(utxos),
            change: Some(founder_address()),
            ..Self::minimal()
        }
    }

    pub fn sign_count(&self) -> usize {
        self.sign_calls.lock().expect("sign log").len()
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl WalletPort for MockWallet {
    async fn lovelace_balance(&self) -> Result<u64, PortError> {
        self.read();
        self.lovelace
            .ok_or(PortError::Unsupported("wallet.lovelace_balance"))
    }

    async fn balance_listing(&self) -> Result<Vec<BalanceEntry>, PortError> {
        self.read();
        self.listing
            .clone()
            .ok_or(PortError::Unsupported("wallet.balance_listing"))
    }

    async fn assets(&self) -> Result<Vec<(AssetUnit, u64)>, PortError> {
        self.read();
        self.assets
            .clone()
            .ok_or(PortError::Unsupported("wallet.assets"))
    }

    async fn utxos(&self) -> Result<Vec<UnspentOutput>, PortError> {
        self.read();
        self.utxos
            .clone()
            .ok_or(PortError::Unsupported("wallet.utxos"))
    }

    async fn used_addresses(&self) -> Result<Vec<Address>, PortError> {
        self.read();
        self.used
            .clone()
            .ok_or(PortError::Unsupported("wallet.used_addresses"))
    }

    async fn change_address(&self) -> Result<Address, PortError> {
        self.read();
        self.change
            .clone()
            .ok_or(PortError::Unsupported("wallet.change_address"))
    }

    async fn sign_tx(&self, _tx_cbor: &[u8], partial: bool) -> Result<Vec<u8>, PortError> {
        self.sign_calls.lock().expect("sign log").push(partial);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.sign_delay.is_zero() {
            tokio::time::sleep(self.sign_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let behaviour = if partial {
            self.partial_sign
        } else {
            self.full_sign
        };
        match behaviour {
            SignBehaviour::Witness => Ok(witness_set()),
            SignBehaviour::Unsupported => Err(PortError::Unsupported("wallet.sign_tx")),
            SignBehaviour::Declined => Err(PortError::Declined("user declined".to_owned())),
            SignBehaviour::Rejected => Err(PortError::Rejected("internal error".to_owned())),
        }
    }
}

/// Scripted ledger: UTxOs by address, a submission log and queued statuses.
pub struct MockLedger {
    pub utxos: Mutex<Vec<UnspentOutput>>,
    pub params: ProtocolParams,
    pub submitted: Mutex<Vec<Vec<u8>>>,
    /// Overrides the id echoed by `submit_tx` when set.
    pub submit_response: Mutex<Option<Result<TxId, PortError>>>,
    /// Consumed front to back; `Pending` once empty.
    pub statuses: Mutex<VecDeque<Result<TxStatus, PortError>>>,
    pub status_calls: AtomicUsize,
    pub utxo_queries: AtomicUsize,
}

impl MockLedger {
    pub fn new(utxos: Vec<UnspentOutput>) -> Self {
        Self {
            utxos: Mutex::new(utxos),
            params: ProtocolParams::default(),
            submitted: Mutex::new(Vec::new()),
            submit_response: Mutex::new(None),
            statuses: Mutex::new(VecDeque::new()),
            status_calls: AtomicUsize::new(0),
            utxo_queries: AtomicUsize::new(0),
        }
    }

    pub fn push_status(&self, status: Result<TxStatus, PortError>) {
        self.statuses.lock().expect("statuses").push_back(status);
    }

    pub fn submissions(&self) -> usize {
        self.submitted.lock().expect("submitted").len()
    }
}

#[async_trait]
impl LedgerPort for MockLedger {
    async fn utxos_at(&self, address: &Address) -> Result<Vec<UnspentOutput>, PortError> {
        self.utxo_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .utxos
            .lock()
            .expect("utxos")
            .iter()
            .filter(|u| &u.address == address)
            .cloned()
            .collect())
    }

    async fn protocol_params(&self) -> Result<ProtocolParams, PortError> {
        Ok(self.params.clone())
    }

    async fn submit_tx(&self, signed_cbor: &[u8]) -> Result<TxId, PortError> {
        self.submitted
            .lock()
            .expect("submitted")
            .push(signed_cbor.to_vec());
        if let Some(response) = self.submit_response.lock().expect("response").clone() {
            return response;
        }
        decode_tx_effects(signed_cbor)
            .map(|effects| effects.id)
            .map_err(|e| PortError::Validation(e.to_string()))
    }

    async fn tx_status(&self, _id: &TxId) -> Result<TxStatus, PortError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .expect("statuses")
            .pop_front()
            .unwrap_or(Ok(TxStatus::Pending))
    }
}
