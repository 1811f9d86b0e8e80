//! CIP-30 wallet reached through a JSON-RPC bridge.
//!
//! The bridge forwards `{"method": "<cip30 name>", "params": [...]}` to the
//! wallet's enabled API and returns its result or error unchanged. Binary
//! values travel as hex-encoded CBOR, as CIP-30 specifies.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use coop_registry_core::domain::{Address, AssetUnit, BalanceEntry, Unit, UnspentOutput};
use coop_registry_core::tx::{decode_unspent_output, decode_value_cbor};
use coop_registry_core::{PortError, WalletPort};

use crate::RegistryConfig;

const METHOD_NOT_FOUND: i64 = -32601;
const API_INVALID_REQUEST: i64 = -1;
const API_REFUSED: i64 = -3;
const SIGN_PROOF_GENERATION: i64 = 1;
const SIGN_USER_DECLINED: i64 = 2;

#[derive(Debug)]
pub struct Cip30Adapter {
    mode: WalletMode,
    next_id: AtomicU64,
}

#[derive(Debug)]
enum WalletMode {
    Disabled(String),
    Bridge(BridgeRuntime),
}

#[derive(Debug)]
struct BridgeRuntime {
    url: String,
    client: reqwest::Client,
}

impl Cip30Adapter {
    pub fn with_config(config: &RegistryConfig) -> Self {
        let mode = match &config.wallet_bridge_url {
            Some(url) => match reqwest::Client::builder()
                .timeout(config.http_timeout())
                .build()
            {
                Ok(client) => WalletMode::Bridge(BridgeRuntime {
                    url: url.clone(),
                    client,
                }),
                Err(e) => WalletMode::Disabled(format!("failed to build wallet bridge client: {e}")),
            },
            None => WalletMode::Disabled("wallet bridge URL not configured".to_owned()),
        };
        Self {
            mode,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &'static str, params: Value) -> Result<Value, PortError> {
        let bridge = match &self.mode {
            WalletMode::Bridge(bridge) => bridge,
            WalletMode::Disabled(reason) => return Err(PortError::Policy(reason.clone())),
        };
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "wallet bridge request");
        let response = bridge
            .client
            .post(&bridge.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(method, e))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("{method}: bridge json decode failed: {e}")))?;
        if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
            return Err(map_rpc_error(method, err));
        }
        if !status.is_success() {
            return Err(PortError::Transport(format!(
                "{method}: bridge status {status}: {body}"
            )));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| PortError::Validation(format!("{method}: bridge response missing result")))
    }
}

#[async_trait]
impl WalletPort for Cip30Adapter {
    async fn lovelace_balance(&self) -> Result<u64, PortError> {
        let result = self.call("getLovelace", json!([])).await?;
        json_u64("getLovelace", &result)
    }

    async fn balance_listing(&self) -> Result<Vec<BalanceEntry>, PortError> {
        let result = self.call("getBalance", json!([])).await?;
        let bytes = hex_field("getBalance", &result)?;
        let value = decode_value_cbor(&bytes)
            .map_err(|e| PortError::Validation(format!("getBalance: {e}")))?;
        Ok(value.to_listing())
    }

    async fn assets(&self) -> Result<Vec<(AssetUnit, u64)>, PortError> {
        let result = self.call("getAssets", json!([])).await?;
        let items = result
            .as_array()
            .ok_or_else(|| PortError::Validation("getAssets: result must be an array".to_owned()))?;
        let mut assets = Vec::with_capacity(items.len());
        for item in items {
            let unit = item
                .get("unit")
                .and_then(Value::as_str)
                .ok_or_else(|| PortError::Validation("getAssets: entry without unit".to_owned()))?;
            let quantity = json_u64(
                "getAssets",
                item.get("quantity").unwrap_or(&Value::Null),
            )?;
            match Unit::from_str(unit).map_err(|e| PortError::Validation(format!("getAssets: {e}")))? {
                Unit::Asset(asset) => assets.push((asset, quantity)),
                Unit::Lovelace => {}
            }
        }
        Ok(assets)
    }

    async fn utxos(&self) -> Result<Vec<UnspentOutput>, PortError> {
        let result = self.call("getUtxos", json!([])).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        let items = result
            .as_array()
            .ok_or_else(|| PortError::Validation("getUtxos: result must be an array".to_owned()))?;
        items
            .iter()
            .map(|item| {
                let bytes = hex_field("getUtxos", item)?;
                decode_unspent_output(&bytes)
                    .map_err(|e| PortError::Validation(format!("getUtxos: {e}")))
            })
            .collect()
    }

    async fn used_addresses(&self) -> Result<Vec<Address>, PortError> {
        let result = self.call("getUsedAddresses", json!([])).await?;
        let items = result.as_array().ok_or_else(|| {
            PortError::Validation("getUsedAddresses: result must be an array".to_owned())
        })?;
        items
            .iter()
            .map(|item| address_field("getUsedAddresses", item))
            .collect()
    }

    async fn change_address(&self) -> Result<Address, PortError> {
        let result = self.call("getChangeAddress", json!([])).await?;
        address_field("getChangeAddress", &result)
    }

    async fn sign_tx(&self, tx_cbor: &[u8], partial: bool) -> Result<Vec<u8>, PortError> {
        let result = self
            .call("signTx", json!([hex::encode(tx_cbor), partial]))
            .await?;
        hex_field("signTx", &result)
    }
}

fn transport_error(method: &str, e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Timeout(format!("{method}: {e}"))
    } else {
        PortError::Transport(format!("{method}: bridge request failed: {e}"))
    }
}

fn map_rpc_error(method: &'static str, err: &Value) -> PortError {
    let code = err.get("code").and_then(Value::as_i64).unwrap_or_default();
    let info = err
        .get("info")
        .or_else(|| err.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("no details")
        .to_owned();
    match code {
        METHOD_NOT_FOUND => PortError::Unsupported(method),
        API_REFUSED => PortError::Declined(format!("{method}: {info}")),
        SIGN_USER_DECLINED if method == "signTx" => PortError::Declined(format!("{method}: {info}")),
        SIGN_PROOF_GENERATION if method == "signTx" => {
            PortError::Rejected(format!("{method}: {info}"))
        }
        API_INVALID_REQUEST => PortError::Validation(format!("{method}: {info}")),
        _ => PortError::Rejected(format!("{method}: code {code}: {info}")),
    }
}

fn hex_field(method: &str, value: &Value) -> Result<Vec<u8>, PortError> {
    let raw = value
        .as_str()
        .ok_or_else(|| PortError::Validation(format!("{method}: expected hex string")))?;
    hex::decode(raw).map_err(|e| PortError::Validation(format!("{method}: invalid hex: {e}")))
}

fn address_field(method: &str, value: &Value) -> Result<Address, PortError> {
    let bytes = hex_field(method, value)?;
    Address::from_bytes(bytes).map_err(|e| PortError::Validation(format!("{method}: {e}")))
}

fn json_u64(method: &str, value: &Value) -> Result<u64, PortError> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| PortError::Validation(format!("{method}: expected unsigned integer, got {value}")))
}
