#![allow(dead_code)]

use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use async_trait::async_trait;
use tiny_http::{Header, Method, Response, Server, StatusCode};

use coop_registry_adapters::{LedgerAdapter, RegistryConfig};
use coop_registry_core::domain::{
    Address, BalanceEntry, Credential, KeyHash, Network, OutputRef, PlutusVersion, ScriptHash,
    TxId, UnspentOutput, ValidatorRef, Value,
};
use coop_registry_core::{ClockPort, LedgerPort, PortError, WalletPort};

pub const NOW_MS: u64 = 1_739_750_400_000;

#[derive(Debug, Default)]
pub struct TestClock {
    now: AtomicU64,
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.now.fetch_add(1, Ordering::SeqCst) + NOW_MS)
    }
}

/// One request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub project_id: Option<String>,
    pub body: Vec<u8>,
}

pub type Calls = Arc<Mutex<Vec<RecordedCall>>>;

/// Serves up to 64 requests, answering each with `route(call) -> (status, body)`.
pub fn spawn_mock_server<F>(calls: Calls, route: F) -> (String, thread::JoinHandle<()>)
where
    F: Fn(&RecordedCall) -> (u16, String) + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").expect("start server");
    let addr = format!("http://{}", server.server_addr());

    let join = thread::spawn(move || {
        for _ in 0..64 {
            let mut req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let header = |name: &str| {
                req.headers()
                    .iter()
                    .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
                    .map(|h| h.value.as_str().to_owned())
            };
            let content_type = header("Content-Type");
            let project_id = header("project_id");
            let mut body = Vec::new();
            let _ = req.as_reader().read_to_end(&mut body);
            let call = RecordedCall {
                method: req.method().clone(),
                path: req.url().to_owned(),
                content_type,
                project_id,
                body,
            };
            let (code, payload) = route(&call);
            if let Ok(mut g) = calls.lock() {
                g.push(call);
            }
            let json = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("header");
            let response = Response::from_string(payload)
                .with_status_code(StatusCode(code))
                .with_header(json);
            let _ = req.respond(response);
        }
    });

    (addr, join)
}

pub fn config_for(base_url: &str) -> RegistryConfig {
    RegistryConfig {
        ledger_base_url: Some(base_url.to_owned()),
        ledger_project_id: Some("preview-test-project".to_owned()),
        wallet_bridge_url: Some(format!("{base_url}/rpc")),
        http_timeout_ms: 5_000,
        ..RegistryConfig::default()
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
    let mut out = vec![0xa1, 0x00, 0x81, 0x82, 0x58, 0x20];
    out.extend([7u8; 32]);
    out.extend([0x58, 0x40]);
    out.extend([9u8; 64]);
    out
}

/// Wallet that reads its outputs from a shared in-memory ledger and signs
/// with dummy witnesses.
pub struct LedgerWallet {
    pub ledger: LedgerAdapter,
    pub address: Address,
}

#[async_trait]
impl WalletPort for LedgerWallet {
    async fn balance_listing(&self) -> Result<Vec<BalanceEntry>, PortError> {
        let mut total = Value::default();
        for u in self.ledger.utxos_at(&self.address).await? {
            total = total
                .checked_add(&u.value)
                .ok_or_else(|| PortError::Validation("balance overflow".to_owned()))?;
        }
        Ok(total.to_listing())
    }

    async fn utxos(&self) -> Result<Vec<UnspentOutput>, PortError> {
        self.ledger.utxos_at(&self.address).await
    }

    async fn change_address(&self) -> Result<Address, PortError> {
        Ok(self.address.clone())
    }

    async fn sign_tx(&self, _tx_cbor: &[u8], _partial: bool) -> Result<Vec<u8>, PortError> {
        Ok(witness_set())
    }
}
