//! Ledger access over a Blockfrost-compatible HTTP API, plus an in-memory
//! ledger used by tests and offline runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use coop_registry_core::domain::{
    Address, CostModel, Credential, OutputRef, PlutusVersion, ProtocolParams, Ratio, TxId,
    TxStatus, Unit, UnspentOutput, Value,
};
use coop_registry_core::tx::{decode_tx_effects, RedeemerTag, TxEffects};
use coop_registry_core::{LedgerPort, PlutusData, PortError};

use crate::RegistryConfig;

const PAGE_SIZE: usize = 100;
const PRICE_DENOMINATOR: u64 = 10_000_000;
const GENESIS_HEIGHT: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct LedgerAdapter {
    mode: LedgerMode,
}

#[derive(Debug, Clone)]
enum LedgerMode {
    Disabled(String),
    Http(HttpRuntime),
    InMemory(Arc<Mutex<MemoryLedger>>),
}

#[derive(Debug, Clone)]
struct HttpRuntime {
    base_url: String,
    project_id: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug)]
struct MemoryLedger {
    params: ProtocolParams,
    utxos: Vec<UnspentOutput>,
    txs: HashMap<TxId, MemoryTx>,
    confirm_after: u32,
    height: u64,
}

#[derive(Debug)]
struct MemoryTx {
    polls_left: u32,
    block_height: Option<u64>,
}

impl LedgerAdapter {
    pub fn with_config(config: &RegistryConfig) -> Self {
        let mode = match reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
        {
            Ok(client) => LedgerMode::Http(HttpRuntime {
                base_url: config.ledger_url(),
                project_id: config.ledger_project_id.clone(),
                client,
            }),
            Err(e) => LedgerMode::Disabled(format!("failed to build ledger client: {e}")),
        };
        Self { mode }
    }

    /// Ledger held in process memory. Submitted transactions are applied to
    /// the UTxO set at once and report `Confirmed` after `confirm_after`
    /// further status polls.
    pub fn in_memory(params: ProtocolParams, utxos: Vec<UnspentOutput>) -> Self {
        Self {
            mode: LedgerMode::InMemory(Arc::new(Mutex::new(MemoryLedger {
                params,
                utxos,
                txs: HashMap::new(),
                confirm_after: 1,
                height: GENESIS_HEIGHT,
            }))),
        }
    }

    pub fn with_confirm_after(self, polls: u32) -> Self {
        if let LedgerMode::InMemory(state) = &self.mode {
            if let Ok(mut g) = state.lock() {
                g.confirm_after = polls;
            }
        }
        self
    }

    /// Adds outputs to an in-memory ledger; a no-op for remote ledgers.
    pub fn fund(&self, outputs: impl IntoIterator<Item = UnspentOutput>) -> Result<(), PortError> {
        match &self.mode {
            LedgerMode::InMemory(state) => with_memory(state, |m| m.utxos.extend(outputs)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerPort for LedgerAdapter {
    async fn utxos_at(&self, address: &Address) -> Result<Vec<UnspentOutput>, PortError> {
        match &self.mode {
            LedgerMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            LedgerMode::Http(http) => http.utxos_at(address).await,
            LedgerMode::InMemory(state) => with_memory(state, |m| {
                m.utxos
                    .iter()
                    .filter(|u| &u.address == address)
                    .cloned()
                    .collect()
            }),
        }
    }

    async fn protocol_params(&self) -> Result<ProtocolParams, PortError> {
        match &self.mode {
            LedgerMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            LedgerMode::Http(http) => http.protocol_params().await,
            LedgerMode::InMemory(state) => with_memory(state, |m| m.params.clone()),
        }
    }

    async fn submit_tx(&self, signed_cbor: &[u8]) -> Result<TxId, PortError> {
        match &self.mode {
            LedgerMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            LedgerMode::Http(http) => http.submit_tx(signed_cbor).await,
            LedgerMode::InMemory(state) => with_memory(state, |m| m.submit(signed_cbor))?,
        }
    }

    async fn tx_status(&self, id: &TxId) -> Result<TxStatus, PortError> {
        match &self.mode {
            LedgerMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            LedgerMode::Http(http) => http.tx_status(id).await,
            LedgerMode::InMemory(state) => with_memory(state, |m| m.status(id)),
        }
    }
}

fn with_memory<T>(
    state: &Mutex<MemoryLedger>,
    f: impl FnOnce(&mut MemoryLedger) -> T,
) -> Result<T, PortError> {
    let mut guard = state
        .lock()
        .map_err(|_| PortError::Transport("in-memory ledger lock poisoned".to_owned()))?;
    Ok(f(&mut guard))
}

impl MemoryLedger {
    fn submit(&mut self, signed_cbor: &[u8]) -> Result<TxId, PortError> {
        let effects = decode_tx_effects(signed_cbor)
            .map_err(|e| PortError::Rejected(format!("DeserialiseFailure: {e}")))?;
        if self.txs.contains_key(&effects.id) {
            return Ok(effects.id);
        }
        let missing: Vec<String> = effects
            .inputs
            .iter()
            .filter(|input| !self.utxos.iter().any(|u| &u.reference == *input))
            .map(OutputRef::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(PortError::Rejected(format!(
                "BadInputsUTxO: {}",
                missing.join(", ")
            )));
        }
        if let Some(failure) = self.script_failure(&effects) {
            warn!(tx = %effects.id, %failure, "in-memory ledger rejected transaction");
            return Err(PortError::Rejected(failure));
        }
        self.utxos.retain(|u| !effects.inputs.contains(&u.reference));
        self.utxos.extend(effects.created_outputs());
        self.txs.insert(
            effects.id,
            MemoryTx {
                polls_left: self.confirm_after,
                block_height: None,
            },
        );
        info!(tx = %effects.id, "in-memory ledger accepted transaction");
        Ok(effects.id)
    }

    /// Every script input and minting policy needs exactly one redeemer, every
    /// redeemer needs a purpose, and scripts must be reachable. Scripts are
    /// not evaluated.
    fn script_failure(&self, effects: &TxEffects) -> Option<String> {
        let mut inputs = effects.inputs.clone();
        inputs.sort();
        let script_inputs: Vec<u32> = inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| {
                self.utxos.iter().any(|u| {
                    &u.reference == *input
                        && matches!(u.address.payment_credential(), Credential::Script(_))
                })
            })
            .map(|(i, _)| i as u32)
            .collect();
        let policies = effects.mint_policies().len() as u32;

        let mut extra = Vec::new();
        for (tag, index) in &effects.redeemers {
            let has_purpose = match tag {
                RedeemerTag::Spend => script_inputs.contains(index),
                RedeemerTag::Mint => *index < policies,
            };
            if !has_purpose {
                extra.push(format!("{tag:?}#{index}"));
            }
        }
        if !extra.is_empty() {
            return Some(format!("ExtraRedeemers: {}", extra.join(", ")));
        }

        let has = |tag: RedeemerTag, index: u32| effects.redeemers.contains(&(tag, index));
        let missing: Vec<String> = script_inputs
            .iter()
            .filter(|i| !has(RedeemerTag::Spend, **i))
            .map(|i| format!("Spend#{i}"))
            .chain(
                (0..policies)
                    .filter(|i| !has(RedeemerTag::Mint, *i))
                    .map(|i| format!("Mint#{i}")),
            )
            .collect();
        if !missing.is_empty() {
            return Some(format!("MissingRedeemers: {}", missing.join(", ")));
        }

        if !effects.redeemers.is_empty()
            && effects.reference_inputs.is_empty()
            && !effects.witness_scripts
        {
            return Some("MissingScriptWitnesses".to_owned());
        }
        None
    }

    fn status(&mut self, id: &TxId) -> TxStatus {
        let Some(tx) = self.txs.get_mut(id) else {
            return TxStatus::Pending;
        };
        if tx.block_height.is_none() {
            if tx.polls_left > 0 {
                tx.polls_left -= 1;
                return TxStatus::Pending;
            }
            self.height += 1;
            tx.block_height = Some(self.height);
        }
        TxStatus::Confirmed {
            block_height: tx.block_height,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AmountEntry {
    unit: String,
    quantity: String,
}

#[derive(Debug, Deserialize)]
struct UtxoEntry {
    address: String,
    tx_hash: String,
    output_index: u32,
    amount: Vec<AmountEntry>,
    #[serde(default)]
    inline_datum: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ParamsEntry {
    min_fee_a: u64,
    min_fee_b: u64,
    max_tx_size: u32,
    coins_per_utxo_size: Option<String>,
    collateral_percent: Option<u64>,
    max_collateral_inputs: Option<u32>,
    price_mem: Option<f64>,
    price_step: Option<f64>,
    #[serde(default)]
    cost_models_raw: Option<HashMap<String, Vec<i64>>>,
}

#[derive(Debug, Deserialize)]
struct TxEntry {
    block_height: Option<u64>,
}

impl HttpRuntime {
    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(format!("{}{path}", self.base_url)))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.project_id {
            Some(id) => req.header("project_id", id),
            None => req,
        }
    }

    async fn utxos_at(&self, address: &Address) -> Result<Vec<UnspentOutput>, PortError> {
        let bech32 = address.to_bech32();
        let mut outputs = Vec::new();
        for page in 1.. {
            let path = format!("/addresses/{bech32}/utxos?page={page}&count={PAGE_SIZE}");
            let response = self
                .get(&path)
                .send()
                .await
                .map_err(|e| read_error("ledger.utxos_at", e))?;
            let status = response.status();
            // Blockfrost answers 404 for addresses it has never seen.
            if status == StatusCode::NOT_FOUND {
                break;
            }
            if !status.is_success() {
                return Err(status_error("ledger.utxos_at", status, response).await);
            }
            let entries: Vec<UtxoEntry> = response
                .json()
                .await
                .map_err(|e| PortError::Validation(format!("ledger.utxos_at: {e}")))?;
            let count = entries.len();
            for entry in entries {
                outputs.push(entry.into_output()?);
            }
            if count < PAGE_SIZE {
                break;
            }
        }
        debug!(address = %bech32, count = outputs.len(), "fetched ledger utxos");
        Ok(outputs)
    }

    async fn protocol_params(&self) -> Result<ProtocolParams, PortError> {
        let response = self
            .get("/epochs/latest/parameters")
            .send()
            .await
            .map_err(|e| read_error("ledger.protocol_params", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error("ledger.protocol_params", status, response).await);
        }
        let entry: ParamsEntry = response
            .json()
            .await
            .map_err(|e| PortError::Validation(format!("ledger.protocol_params: {e}")))?;
        entry.into_params()
    }

    async fn submit_tx(&self, signed_cbor: &[u8]) -> Result<TxId, PortError> {
        let request = self
            .client
            .post(format!("{}/tx/submit", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/cbor")
            .body(signed_cbor.to_vec());
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                PortError::Timeout(format!("ledger.submit_tx: {e}"))
            } else if e.is_connect() {
                PortError::Transport(format!("ledger.submit_tx: {e}"))
            } else {
                PortError::Ambiguous(format!("ledger.submit_tx: {e}"))
            }
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            PortError::Ambiguous(format!("ledger.submit_tx: response body lost: {e}"))
        })?;
        match status {
            s if s.is_success() => {
                let raw: String = serde_json::from_str(&body).map_err(|e| {
                    PortError::Ambiguous(format!("ledger.submit_tx: unreadable id {body:?}: {e}"))
                })?;
                raw.parse()
                    .map_err(|e| PortError::Ambiguous(format!("ledger.submit_tx: {e}")))
            }
            StatusCode::BAD_REQUEST => {
                warn!(%status, "ledger rejected transaction");
                Err(PortError::Rejected(error_message(&body)))
            }
            StatusCode::FORBIDDEN => Err(PortError::Policy(error_message(&body))),
            StatusCode::TOO_MANY_REQUESTS => Err(PortError::Transport(error_message(&body))),
            s => Err(PortError::Ambiguous(format!(
                "ledger.submit_tx: status {s}: {}",
                error_message(&body)
            ))),
        }
    }

    async fn tx_status(&self, id: &TxId) -> Result<TxStatus, PortError> {
        let response = self
            .get(&format!("/txs/{id}"))
            .send()
            .await
            .map_err(|e| read_error("ledger.tx_status", e))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(TxStatus::Pending);
        }
        if !status.is_success() {
            return Err(status_error("ledger.tx_status", status, response).await);
        }
        let entry: TxEntry = response
            .json()
            .await
            .map_err(|e| PortError::Validation(format!("ledger.tx_status: {e}")))?;
        Ok(TxStatus::Confirmed {
            block_height: entry.block_height,
        })
    }
}

impl UtxoEntry {
    fn into_output(self) -> Result<UnspentOutput, PortError> {
        let invalid = |what: String| PortError::Validation(format!("ledger utxo: {what}"));
        let tx_id: TxId = self.tx_hash.parse().map_err(|e| invalid(format!("{e}")))?;
        let address = Address::from_bech32(&self.address).map_err(|e| invalid(format!("{e}")))?;
        let mut value = Value::default();
        for amount in self.amount {
            let quantity: u64 = amount
                .quantity
                .parse()
                .map_err(|e| invalid(format!("quantity {:?}: {e}", amount.quantity)))?;
            match amount.unit.parse().map_err(|e| invalid(format!("{e}")))? {
                Unit::Lovelace => value.lovelace = quantity,
                Unit::Asset(asset) => {
                    value.assets.insert(asset, quantity);
                }
            }
        }
        let inline_datum = match self.inline_datum {
            Some(raw) => {
                let bytes = hex::decode(&raw).map_err(|e| invalid(format!("datum hex: {e}")))?;
                Some(PlutusData::from_cbor(&bytes).map_err(|e| invalid(format!("datum: {e}")))?)
            }
            None => None,
        };
        Ok(UnspentOutput {
            reference: OutputRef::new(tx_id, self.output_index),
            address,
            value,
            inline_datum,
        })
    }
}

impl ParamsEntry {
    fn into_params(self) -> Result<ProtocolParams, PortError> {
        let defaults = ProtocolParams::default();
        let coins_per_utxo_byte = match self.coins_per_utxo_size {
            Some(raw) => raw.parse().map_err(|e| {
                PortError::Validation(format!("coins_per_utxo_size {raw:?}: {e}"))
            })?,
            None => defaults.coins_per_utxo_byte,
        };
        let mut cost_models = Vec::new();
        for (name, costs) in self.cost_models_raw.unwrap_or_default() {
            let version = match name.as_str() {
                "PlutusV2" => PlutusVersion::V2,
                "PlutusV3" => PlutusVersion::V3,
                _ => continue,
            };
            cost_models.push(CostModel { version, costs });
        }
        cost_models.sort_by_key(|m| m.version as u8);
        Ok(ProtocolParams {
            min_fee_a: self.min_fee_a,
            min_fee_b: self.min_fee_b,
            coins_per_utxo_byte,
            max_tx_size: self.max_tx_size,
            collateral_percent: self.collateral_percent.unwrap_or(defaults.collateral_percent),
            max_collateral_inputs: self
                .max_collateral_inputs
                .unwrap_or(defaults.max_collateral_inputs),
            price_mem: self.price_mem.map_or(Ok(defaults.price_mem), price_ratio)?,
            price_steps: self.price_step.map_or(Ok(defaults.price_steps), price_ratio)?,
            cost_models,
        })
    }
}

fn price_ratio(price: f64) -> Result<Ratio, PortError> {
    let scaled = (price * PRICE_DENOMINATOR as f64).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled > u64::MAX as f64 {
        return Err(PortError::Validation(format!("execution price {price} out of range")));
    }
    Ok(Ratio {
        numerator: scaled as u64,
        denominator: PRICE_DENOMINATOR,
    })
}

fn read_error(op: &str, e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Timeout(format!("{op}: {e}"))
    } else {
        PortError::Transport(format!("{op}: {e}"))
    }
}

async fn status_error(op: &str, status: StatusCode, response: reqwest::Response) -> PortError {
    let body = response.text().await.unwrap_or_default();
    let message = format!("{op}: status {status}: {}", error_message(&body));
    match status {
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => PortError::Policy(message),
        StatusCode::NOT_FOUND => PortError::NotFound(message),
        StatusCode::BAD_REQUEST => PortError::Validation(message),
        _ => PortError::Transport(message),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(JsonValue::as_str).map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_owned())
}
